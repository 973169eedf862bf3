use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};
use rand_regex::Regex as RandRegex;
use serde_json::Value;

use synthseed_core::GeneratedValue;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};
use crate::params::{ParamKind, ParamSpec, validate_params};

const DEFAULT_INT_MIN: i64 = 0;
const DEFAULT_INT_MAX: i64 = 10000;
const DEFAULT_FLOAT_MIN: f64 = 0.0;
const DEFAULT_FLOAT_MAX: f64 = 10000.0;
const DEFAULT_TEXT_MIN: usize = 8;
const DEFAULT_TEXT_MAX: usize = 16;
const DEFAULT_MAX_REPEAT: u32 = 32;
const DEFAULT_CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const BOOL_PARAMS: &[ParamSpec] = &[ParamSpec::new("probability", ParamKind::Float, false)];
const INT_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Int, false),
    ParamSpec::new("max", ParamKind::Int, false),
];
const INT_SEQUENCE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("start", ParamKind::Int, false),
    ParamSpec::new("step", ParamKind::Int, false),
];
const FLOAT_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Float, false),
    ParamSpec::new("max", ParamKind::Float, false),
    ParamSpec::new("scale", ParamKind::Int, false),
];
const TEXT_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min_len", ParamKind::Int, false),
    ParamSpec::new("max_len", ParamKind::Int, false),
    ParamSpec::new("charset", ParamKind::String, false),
];
const TEXT_PATTERN_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("pattern", ParamKind::String, true),
    ParamSpec::new("max_repeat", ParamKind::Int, false),
];
const CHOICE_PARAMS: &[ParamSpec] = &[ParamSpec::new("values", ParamKind::Array, true)];
const CONSTANT_PARAMS: &[ParamSpec] = &[ParamSpec::new("value", ParamKind::Any, true)];
const DATE_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Date, false),
    ParamSpec::new("max", ParamKind::Date, false),
];
const TIME_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Time, false),
    ParamSpec::new("max", ParamKind::Time, false),
];
const TIMESTAMP_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Timestamp, false),
    ParamSpec::new("max", ParamKind::Timestamp, false),
];

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(BoolGenerator));
    registry.register_generator(Box::new(IntRangeGenerator));
    registry.register_generator(Box::new(IntSequenceGenerator));
    registry.register_generator(Box::new(FloatRangeGenerator));
    registry.register_generator(Box::new(TextGenerator));
    registry.register_generator(Box::new(TextPatternGenerator));
    registry.register_generator(Box::new(ChoiceGenerator));
    registry.register_generator(Box::new(ConstantGenerator));
    registry.register_generator(Box::new(UuidGenerator));
    registry.register_generator(Box::new(DateRangeGenerator));
    registry.register_generator(Box::new(TimeRangeGenerator));
    registry.register_generator(Box::new(TimestampRangeGenerator));
}

struct BoolGenerator;

impl Generator for BoolGenerator {
    fn id(&self) -> &'static str {
        "bool"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, BOOL_PARAMS, self.id())?;
        let probability = params.get_f64("probability").unwrap_or(0.5);
        if !(0.0..=1.0).contains(&probability) {
            return Err(GenerationError::invalid_params(
                self.id(),
                "probability must be within [0, 1]",
            ));
        }
        Ok(GeneratedValue::Bool(rng.random_bool(probability)))
    }
}

struct IntRangeGenerator;

impl Generator for IntRangeGenerator {
    fn id(&self) -> &'static str {
        "int.range"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, INT_RANGE_PARAMS, self.id())?;
        let min = params.get_i64("min").unwrap_or(DEFAULT_INT_MIN);
        let max = params.get_i64("max").unwrap_or(DEFAULT_INT_MAX);
        if min > max {
            return Err(GenerationError::invalid_params(self.id(), "min must be <= max"));
        }
        Ok(GeneratedValue::Int(rng.random_range(min..=max)))
    }
}

/// `start + row_index * step`; useful for client-side primary keys.
struct IntSequenceGenerator;

impl Generator for IntSequenceGenerator {
    fn id(&self) -> &'static str {
        "int.sequence"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        _rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, INT_SEQUENCE_PARAMS, self.id())?;
        let start = params.get_i64("start").unwrap_or(1);
        let step = params.get_i64("step").unwrap_or(1);
        if step == 0 {
            return Err(GenerationError::invalid_params(self.id(), "step must be non-zero"));
        }
        let index = i64::try_from(ctx.row_index).unwrap_or(i64::MAX);
        Ok(GeneratedValue::Int(
            start.saturating_add(index.saturating_mul(step)),
        ))
    }
}

struct FloatRangeGenerator;

impl Generator for FloatRangeGenerator {
    fn id(&self) -> &'static str {
        "float.range"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, FLOAT_RANGE_PARAMS, self.id())?;
        let min = params.get_f64("min").unwrap_or(DEFAULT_FLOAT_MIN);
        let max = params.get_f64("max").unwrap_or(DEFAULT_FLOAT_MAX);
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(GenerationError::invalid_params(self.id(), "min must be <= max"));
        }
        let value = if min == max {
            min
        } else {
            rng.random_range(min..=max)
        };
        let value = match params.get_i64("scale") {
            Some(scale) if (0..=15).contains(&scale) => {
                let factor = 10f64.powi(scale as i32);
                (value * factor).round() / factor
            }
            Some(_) => {
                return Err(GenerationError::invalid_params(
                    self.id(),
                    "scale must be within [0, 15]",
                ));
            }
            None => value,
        };
        Ok(GeneratedValue::Float(value))
    }
}

struct TextGenerator;

impl Generator for TextGenerator {
    fn id(&self) -> &'static str {
        "text"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, TEXT_PARAMS, self.id())?;
        let min_len = non_negative(&params, "min_len", self.id())?.unwrap_or(DEFAULT_TEXT_MIN);
        let max_len = non_negative(&params, "max_len", self.id())?
            .unwrap_or(DEFAULT_TEXT_MAX.max(min_len));
        if min_len > max_len {
            return Err(GenerationError::invalid_params(
                self.id(),
                "min_len must be <= max_len",
            ));
        }
        let chars: Vec<char> = params
            .get_str("charset")
            .unwrap_or(DEFAULT_CHARSET)
            .chars()
            .collect();
        if chars.is_empty() {
            return Err(GenerationError::invalid_params(
                self.id(),
                "charset must not be empty",
            ));
        }

        let len = if min_len == max_len {
            min_len
        } else {
            rng.random_range(min_len..=max_len)
        };
        let value: String = (0..len)
            .filter_map(|_| chars.choose(&mut *rng).copied())
            .collect();
        Ok(GeneratedValue::Text(value))
    }
}

struct TextPatternGenerator;

impl Generator for TextPatternGenerator {
    fn id(&self) -> &'static str {
        "text.pattern"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, TEXT_PATTERN_PARAMS, self.id())?;
        let pattern = params
            .get_str("pattern")
            .ok_or_else(|| GenerationError::invalid_params(self.id(), "pattern is required"))?;
        let max_repeat = match params.get_i64("max_repeat") {
            Some(value) => u32::try_from(value).map_err(|_| {
                GenerationError::invalid_params(self.id(), "max_repeat must be >= 0")
            })?,
            None => DEFAULT_MAX_REPEAT,
        };
        let regex = RandRegex::compile(pattern, max_repeat).map_err(|err| {
            GenerationError::invalid_params(self.id(), format!("invalid regex pattern: {err}"))
        })?;
        let value: String = rng.sample(regex);
        Ok(GeneratedValue::Text(value))
    }
}

/// Uniform pick from `values`; JSON scalars keep their type.
struct ChoiceGenerator;

impl Generator for ChoiceGenerator {
    fn id(&self) -> &'static str {
        "text.choice"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, CHOICE_PARAMS, self.id())?;
        let values = params.get_array("values").unwrap_or_default();
        let value = values
            .choose(&mut *rng)
            .ok_or_else(|| GenerationError::invalid_params(self.id(), "values must not be empty"))?;
        json_to_value(self.id(), value)
    }
}

struct ConstantGenerator;

impl Generator for ConstantGenerator {
    fn id(&self) -> &'static str {
        "constant"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        _rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, CONSTANT_PARAMS, self.id())?;
        match params.get("value") {
            Some(value) => json_to_value(self.id(), value),
            None => Ok(GeneratedValue::Null),
        }
    }
}

struct UuidGenerator;

impl Generator for UuidGenerator {
    fn id(&self) -> &'static str {
        "uuid"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        validate_params(params, &[], self.id())?;
        Ok(GeneratedValue::Uuid(random_uuid(rng)))
    }
}

struct DateRangeGenerator;

impl Generator for DateRangeGenerator {
    fn id(&self) -> &'static str {
        "date.range"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, DATE_RANGE_PARAMS, self.id())?;
        let min = params.get_date("min").unwrap_or_else(default_min_date);
        let max = params.get_date("max").unwrap_or_else(default_max_date);
        if min > max {
            return Err(GenerationError::invalid_params(self.id(), "min must be <= max"));
        }
        let span = (max - min).num_days();
        let offset = rng.random_range(0..=span);
        Ok(GeneratedValue::Date(min + chrono::Duration::days(offset)))
    }
}

struct TimeRangeGenerator;

impl Generator for TimeRangeGenerator {
    fn id(&self) -> &'static str {
        "time.range"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, TIME_RANGE_PARAMS, self.id())?;
        let min = params.get_time("min").unwrap_or_else(midnight);
        let max = params.get_time("max").unwrap_or_else(end_of_day);
        if min > max {
            return Err(GenerationError::invalid_params(self.id(), "min must be <= max"));
        }
        let seconds =
            rng.random_range(min.num_seconds_from_midnight()..=max.num_seconds_from_midnight());
        let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or(min);
        Ok(GeneratedValue::Time(time))
    }
}

struct TimestampRangeGenerator;

impl Generator for TimestampRangeGenerator {
    fn id(&self) -> &'static str {
        "timestamp.range"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let params = validate_params(params, TIMESTAMP_RANGE_PARAMS, self.id())?;
        let min = params
            .get_timestamp("min")
            .unwrap_or_else(|| default_min_date().and_time(midnight()));
        let max = params
            .get_timestamp("max")
            .unwrap_or_else(|| default_max_date().and_time(end_of_day()));
        if min > max {
            return Err(GenerationError::invalid_params(self.id(), "min must be <= max"));
        }
        let span = (max - min).num_seconds();
        let offset = rng.random_range(0..=span);
        let value: NaiveDateTime = min + chrono::Duration::seconds(offset);
        Ok(GeneratedValue::Timestamp(value))
    }
}

fn midnight() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default()
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
}

fn default_min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

fn default_max_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default()
}

fn non_negative(
    params: &crate::params::ParamMap<'_>,
    key: &str,
    generator: &str,
) -> Result<Option<usize>, GenerationError> {
    match params.get_i64(key) {
        Some(value) => usize::try_from(value)
            .map(Some)
            .map_err(|_| GenerationError::invalid_params(generator, format!("{key} must be >= 0"))),
        None => Ok(None),
    }
}

fn json_to_value(generator: &str, value: &Value) -> Result<GeneratedValue, GenerationError> {
    match value {
        Value::Null => Ok(GeneratedValue::Null),
        Value::Bool(value) => Ok(GeneratedValue::Bool(*value)),
        Value::Number(number) => Ok(number
            .as_i64()
            .map(GeneratedValue::Int)
            .or_else(|| number.as_f64().map(GeneratedValue::Float))
            .unwrap_or(GeneratedValue::Null)),
        Value::String(value) => Ok(GeneratedValue::Text(value.clone())),
        Value::Array(_) | Value::Object(_) => Err(GenerationError::invalid_params(
            generator,
            "only scalar JSON values are supported",
        )),
    }
}

fn random_uuid(rng: &mut dyn RngCore) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}
