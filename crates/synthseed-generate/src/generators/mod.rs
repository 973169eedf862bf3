use std::collections::BTreeMap;
use std::fmt;

use rand::RngCore;
use serde_json::Value;

use synthseed_core::GeneratedValue;

use crate::errors::GenerationError;

pub mod faker_rs;
pub mod primitives;

/// Where a value is being generated.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
    pub table: &'a str,
    pub column: &'a str,
    /// Zero-based index of the row inside its table.
    pub row_index: u64,
}

/// A named value generator referenced from `faker_schema` rules.
pub trait Generator: Send + Sync {
    fn id(&self) -> &'static str;

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError>;
}

/// Registry of generators keyed by id.
pub struct GeneratorRegistry {
    generators: BTreeMap<&'static str, Box<dyn Generator>>,
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("ids", &self.generators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl GeneratorRegistry {
    pub fn empty() -> Self {
        Self {
            generators: BTreeMap::new(),
        }
    }

    /// Primitives plus the `faker.*` catalog.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        primitives::register(&mut registry);
        faker_rs::register(&mut registry);
        registry
    }

    pub fn register_generator(&mut self, generator: Box<dyn Generator>) {
        self.generators.insert(generator.id(), generator);
    }

    pub fn get(&self, id: &str) -> Option<&dyn Generator> {
        self.generators.get(id).map(Box::as_ref)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.generators.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.generators.keys().copied()
    }

    pub fn generate(
        &self,
        id: &str,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let generator = self
            .get(id)
            .ok_or_else(|| GenerationError::UnknownGenerator {
                generator: id.to_string(),
                table: ctx.table.to_string(),
                column: ctx.column.to_string(),
            })?;
        generator.generate(ctx, params, rng)
    }
}
