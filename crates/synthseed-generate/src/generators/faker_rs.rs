use fake::Fake;
use fake::faker::address::raw::{CityName, CountryName, StreetName, ZipCode};
use fake::faker::company::raw::CompanyName;
use fake::faker::internet::raw::{SafeEmail, Username};
use fake::faker::lorem::raw::{Paragraph, Sentence, Word, Words};
use fake::faker::name::raw::{FirstName, LastName, Name};
use fake::faker::phone_number::raw::PhoneNumber;
use fake::locales::{EN, PT_BR};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::Value;

use synthseed_core::GeneratedValue;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};
use crate::params::{ParamKind, ParamSpec, validate_params};

const FAKER_PARAMS: &[ParamSpec] = &[ParamSpec::new("locale", ParamKind::String, false)];

/// `(id, kind)` pairs of the `faker.*` catalog.
const CATALOG: &[(&str, FakerKind)] = &[
    ("faker.name", FakerKind::Name),
    ("faker.first_name", FakerKind::FirstName),
    ("faker.last_name", FakerKind::LastName),
    ("faker.email", FakerKind::Email),
    ("faker.username", FakerKind::Username),
    ("faker.company", FakerKind::Company),
    ("faker.city", FakerKind::City),
    ("faker.country", FakerKind::Country),
    ("faker.street", FakerKind::Street),
    ("faker.zip", FakerKind::Zip),
    ("faker.phone", FakerKind::Phone),
    ("faker.word", FakerKind::Word),
    ("faker.words", FakerKind::Words),
    ("faker.sentence", FakerKind::Sentence),
    ("faker.paragraph", FakerKind::Paragraph),
];

pub fn register(registry: &mut GeneratorRegistry) {
    for &(id, kind) in CATALOG {
        registry.register_generator(Box::new(FakerGenerator { id, kind }));
    }
}

pub fn list_ids() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(id, _)| *id)
}

#[derive(Clone, Copy, Debug)]
enum FakerKind {
    Name,
    FirstName,
    LastName,
    Email,
    Username,
    Company,
    City,
    Country,
    Street,
    Zip,
    Phone,
    Word,
    Words,
    Sentence,
    Paragraph,
}

#[derive(Clone, Copy, Debug)]
enum Locale {
    En,
    PtBr,
}

impl Locale {
    fn parse(id: &str, value: Option<&str>) -> Result<Self, GenerationError> {
        match value.map(str::to_ascii_lowercase).as_deref() {
            None | Some("en") | Some("en_us") => Ok(Locale::En),
            Some("pt_br") => Ok(Locale::PtBr),
            Some(other) => Err(GenerationError::invalid_params(
                id,
                format!("unsupported locale '{other}'"),
            )),
        }
    }
}

struct FakerGenerator {
    id: &'static str,
    kind: FakerKind,
}

impl Generator for FakerGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, FAKER_PARAMS, self.id)?;
        let locale = Locale::parse(self.id, params.get_str("locale"))?;

        // fake wants a sized rng; derive one from the table stream.
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        let mut fake_rng = ChaCha8Rng::from_seed(seed);

        Ok(GeneratedValue::Text(fake_text(
            self.kind,
            locale,
            &mut fake_rng,
        )))
    }
}

macro_rules! localized {
    ($locale:expr, $rng:expr, $faker:ident $(, $arg:expr)*) => {
        match $locale {
            Locale::En => $faker(EN $(, $arg)*).fake_with_rng::<String, _>($rng),
            Locale::PtBr => $faker(PT_BR $(, $arg)*).fake_with_rng::<String, _>($rng),
        }
    };
}

fn fake_text(kind: FakerKind, locale: Locale, rng: &mut ChaCha8Rng) -> String {
    match kind {
        FakerKind::Name => localized!(locale, rng, Name),
        FakerKind::FirstName => localized!(locale, rng, FirstName),
        FakerKind::LastName => localized!(locale, rng, LastName),
        FakerKind::Email => localized!(locale, rng, SafeEmail),
        FakerKind::Username => localized!(locale, rng, Username),
        FakerKind::Company => localized!(locale, rng, CompanyName),
        FakerKind::City => localized!(locale, rng, CityName),
        FakerKind::Country => localized!(locale, rng, CountryName),
        FakerKind::Street => localized!(locale, rng, StreetName),
        FakerKind::Zip => localized!(locale, rng, ZipCode),
        FakerKind::Phone => localized!(locale, rng, PhoneNumber),
        FakerKind::Word => localized!(locale, rng, Word),
        FakerKind::Words => {
            let words: Vec<String> = match locale {
                Locale::En => Words(EN, 2..5).fake_with_rng(rng),
                Locale::PtBr => Words(PT_BR, 2..5).fake_with_rng(rng),
            };
            words.join(" ")
        }
        FakerKind::Sentence => localized!(locale, rng, Sentence, 4..10),
        FakerKind::Paragraph => localized!(locale, rng, Paragraph, 2..4),
    }
}
