use chrono::{DateTime, NaiveDateTime};
use rand::Rng;
use rand_regex::Regex as RandRegex;

use datasmith_core::{Column, Distribution, LengthRange, Value, parse_instant};

use crate::rng::SequenceRng;

const DEFAULT_NUMERIC_RANGE: (f64, f64) = (0.0, 1000.0);
const DEFAULT_DATE_RANGE: (&str, &str) = ("2023-01-01", "2025-01-01");
const DEFAULT_DATETIME_RANGE: (&str, &str) = ("2023-01-01T00:00:00", "2025-01-01T00:00:00");
const DEFAULT_TEXT_LENGTH: LengthRange = LengthRange(5, 20);
const REGEX_FALLBACK_LENGTH: LengthRange = LengthRange(6, 10);
const TEXT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";
/// Pattern served without a regex sampler.
const CODE_PATTERN: &str = "[A-Z]{3}-[0-9]{4}";

/// 32 random hex nibbles grouped 8-4-4-4-12.
pub fn uuid(rng: &mut SequenceRng) -> String {
    let nibbles: String = (0..32)
        .map(|_| {
            let nibble = (rng.next_unit() * 16.0).floor() as u32;
            char::from_digit(nibble.min(15), 16).unwrap_or('0')
        })
        .collect();
    format!(
        "{}-{}-{}-{}-{}",
        &nibbles[0..8],
        &nibbles[8..12],
        &nibbles[12..16],
        &nibbles[16..20],
        &nibbles[20..32]
    )
}

fn numeric_range(column: &Column) -> (f64, f64) {
    column
        .range
        .as_ref()
        .and_then(|range| range.numeric())
        .unwrap_or(DEFAULT_NUMERIC_RANGE)
}

/// Draw from the column's distribution, clamped into `[min, max]`.
fn shaped_draw(distribution: Distribution, min: f64, max: f64, rng: &mut SequenceRng) -> f64 {
    let value = match distribution {
        Distribution::Normal => {
            let mean = (min + max) / 2.0;
            let sigma = if max == min { 1.0 } else { (max - min) / 6.0 };
            mean + rng.gaussian() * sigma
        }
        Distribution::Lognormal => {
            let v = rng.gaussian().exp();
            min + (max - min) * (v / (1.0 + v))
        }
        Distribution::Uniform => rng.float_range(min, max),
    };
    value.clamp(min.min(max), max.max(min))
}

pub fn int_in_range(column: &Column, rng: &mut SequenceRng) -> Value {
    let (min, max) = numeric_range(column);
    match column.distribution.unwrap_or(Distribution::Uniform) {
        Distribution::Uniform => {
            let (low, high) = (min.ceil(), max.floor());
            if low > high {
                return Value::Int(min.round() as i64);
            }
            Value::Int(rng.int_range(low as i64, high as i64))
        }
        shaped => {
            let value = shaped_draw(shaped, min, max, rng).round();
            Value::Int(value as i64)
        }
    }
}

/// Uniform decimals keep two fractional digits; shaped ones stay real.
pub fn decimal_in_range(column: &Column, rng: &mut SequenceRng) -> Value {
    let (min, max) = numeric_range(column);
    match column.distribution.unwrap_or(Distribution::Uniform) {
        Distribution::Uniform => Value::Decimal(format!("{:.2}", rng.float_range(min, max))),
        shaped => Value::Float(shaped_draw(shaped, min, max, rng)),
    }
}

fn instant_range(column: &Column, defaults: (&str, &str)) -> (NaiveDateTime, NaiveDateTime) {
    let parse_default = |text: &str| parse_instant(text).unwrap_or_default();
    let (start, end) = match column.range.as_ref() {
        Some(range) => (
            parse_instant(&range.lower().as_text()),
            parse_instant(&range.upper().as_text()),
        ),
        None => (None, None),
    };
    (
        start.unwrap_or_else(|| parse_default(defaults.0)),
        end.unwrap_or_else(|| parse_default(defaults.1)),
    )
}

fn instant_between(start: NaiveDateTime, end: NaiveDateTime, rng: &mut SequenceRng) -> NaiveDateTime {
    let start_ms = start.and_utc().timestamp_millis() as f64;
    let end_ms = end.and_utc().timestamp_millis() as f64;
    let millis = rng.float_range(start_ms, end_ms).floor() as i64;
    DateTime::from_timestamp_millis(millis)
        .map(|instant| instant.naive_utc())
        .unwrap_or(start)
}

pub fn date_in_range(column: &Column, rng: &mut SequenceRng) -> Value {
    let (start, end) = instant_range(column, DEFAULT_DATE_RANGE);
    Value::Date(instant_between(start, end, rng).date())
}

pub fn timestamp_in_range(column: &Column, rng: &mut SequenceRng) -> Value {
    let (start, end) = instant_range(column, DEFAULT_DATETIME_RANGE);
    Value::Timestamp(instant_between(start, end, rng))
}

/// Weighted pick when weights are declared, uniform otherwise.
pub fn enum_value(column: &Column, rng: &mut SequenceRng) -> Value {
    let Some(values) = column.values.as_deref().filter(|values| !values.is_empty()) else {
        return Value::Text(String::new());
    };
    let picked = match column.weights.as_deref() {
        Some(weights) => rng.weighted_choice(values, weights),
        None => rng.choice(values),
    };
    picked.cloned().unwrap_or_else(|| Value::Text(String::new()))
}

/// Random characters from `[a-zA-Z0-9 ]`, trimmed; `"text"` when nothing is left.
pub fn random_text(length: Option<LengthRange>, rng: &mut SequenceRng) -> String {
    let LengthRange(min, max) = length.unwrap_or(DEFAULT_TEXT_LENGTH);
    let len = rng.int_range(min as i64, max as i64).max(0) as usize;
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        let index = rng.int_range(0, TEXT_ALPHABET.len() as i64 - 1) as usize;
        out.push(char::from(TEXT_ALPHABET[index]));
    }
    let trimmed = out.trim();
    if trimmed.is_empty() {
        "text".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Text for a column with a regex: the built-in code shape, a sampled match,
/// or random text when the pattern cannot be sampled.
pub fn text_from_regex(pattern: &str, sampler: Option<&RandRegex>, rng: &mut SequenceRng) -> Value {
    if pattern == CODE_PATTERN {
        let letters: String = (0..3).map(|_| uppercase_letter(rng)).collect();
        let digits: String = (0..4).map(|_| rng.int_range(0, 9).to_string()).collect();
        return Value::Text(format!("{letters}-{digits}"));
    }
    match sampler {
        Some(regex) => Value::Text(rng.sample(regex)),
        None => Value::Text(random_text(Some(REGEX_FALLBACK_LENGTH), rng)),
    }
}

pub(crate) fn uppercase_letter(rng: &mut SequenceRng) -> char {
    char::from_u32(rng.int_range(65, 90) as u32).unwrap_or('A')
}

#[cfg(test)]
mod tests {
    use super::*;
    use datasmith_core::{Bound, ColumnRange, ColumnType};
    use regex::Regex;

    fn ranged(column_type: ColumnType, low: f64, high: f64) -> Column {
        let mut column = Column::new("value", column_type);
        column.range = Some(ColumnRange(Bound::Number(low), Bound::Number(high)));
        column
    }

    #[test]
    fn uuid_has_canonical_shape() {
        let mut rng = SequenceRng::new(5);
        let re = Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            .unwrap();
        for _ in 0..20 {
            assert!(re.is_match(&uuid(&mut rng)));
        }
    }

    #[test]
    fn ints_respect_range_for_every_distribution() {
        let mut rng = SequenceRng::new(11);
        for distribution in [
            Distribution::Uniform,
            Distribution::Normal,
            Distribution::Lognormal,
        ] {
            let mut column = ranged(ColumnType::Int, 10.0, 20.0);
            column.distribution = Some(distribution);
            for _ in 0..200 {
                let Value::Int(value) = int_in_range(&column, &mut rng) else {
                    panic!("expected int");
                };
                assert!((10..=20).contains(&value));
            }
        }
    }

    #[test]
    fn uniform_decimal_has_two_digits() {
        let mut rng = SequenceRng::new(2);
        let column = ranged(ColumnType::Decimal, 1.0, 2.0);
        let Value::Decimal(text) = decimal_in_range(&column, &mut rng) else {
            panic!("expected decimal");
        };
        let (_, fraction) = text.split_once('.').unwrap();
        assert_eq!(fraction.len(), 2);
    }

    #[test]
    fn dates_stay_inside_declared_range() {
        let mut rng = SequenceRng::new(4);
        let mut column = Column::new("day", ColumnType::Date);
        column.range = Some(ColumnRange(
            Bound::Text("2024-01-01".to_string()),
            Bound::Text("2024-01-31".to_string()),
        ));
        for _ in 0..50 {
            let Value::Date(day) = date_in_range(&column, &mut rng) else {
                panic!("expected date");
            };
            assert_eq!(day.format("%Y-%m").to_string(), "2024-01");
        }
    }

    #[test]
    fn code_pattern_fast_path_matches() {
        let mut rng = SequenceRng::new(8);
        let re = Regex::new(r"^[A-Z]{3}-[0-9]{4}$").unwrap();
        let value = text_from_regex(CODE_PATTERN, None, &mut rng);
        assert!(re.is_match(&value.render()));
    }

    #[test]
    fn sampled_regex_text_matches() {
        let mut rng = SequenceRng::new(8);
        let sampler = RandRegex::compile("[a-z]{2}[0-9]{3}", 10).unwrap();
        let re = Regex::new(r"^[a-z]{2}[0-9]{3}$").unwrap();
        for _ in 0..20 {
            let value = text_from_regex("[a-z]{2}[0-9]{3}", Some(&sampler), &mut rng);
            assert!(re.is_match(&value.render()));
        }
    }

    #[test]
    fn random_text_honours_length() {
        let mut rng = SequenceRng::new(6);
        for _ in 0..50 {
            let text = random_text(Some(LengthRange(3, 3)), &mut rng);
            assert!(text.len() <= 3 || text == "text");
        }
    }
}
