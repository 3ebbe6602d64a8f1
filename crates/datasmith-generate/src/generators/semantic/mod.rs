use crate::generators::primitives::uppercase_letter;
use crate::rng::SequenceRng;

pub const FIRST_NAMES: &[&str] = &[
    "Alex", "Sam", "Jordan", "Taylor", "Morgan", "Riley", "Jamie", "Casey", "Avery", "Quinn",
];
pub const SURNAMES: &[&str] = &[
    "Smith", "Patel", "Kim", "Garcia", "Brown", "Jones", "Miller", "Davis", "Wilson", "Clark",
];
pub const EMAIL_DOMAINS: &[&str] = &["example.com", "test.local", "sample.org", "demo.dev"];
pub const COUNTRIES: &[&str] = &[
    "United Kingdom",
    "United States",
    "Canada",
    "Germany",
    "France",
    "Australia",
    "Japan",
    "Brazil",
];
pub const UK_POSTCODE_AREAS: &[&str] = &[
    "SW", "SE", "NW", "NE", "EC", "WC", "W", "E", "N", "S", "B", "M", "L", "G", "EH",
];

fn pick(items: &'static [&'static str], rng: &mut SequenceRng) -> &'static str {
    rng.choice(items).copied().unwrap_or_default()
}

/// `first.surname@domain`, lower-cased.
pub fn email(rng: &mut SequenceRng) -> String {
    let first = pick(FIRST_NAMES, rng).to_lowercase();
    let last = pick(SURNAMES, rng).to_lowercase();
    let domain = pick(EMAIL_DOMAINS, rng);
    format!("{first}.{last}@{domain}")
}

/// International-style number: `+`, a country digit and nine digits.
pub fn phone(rng: &mut SequenceRng) -> String {
    let country = rng.int_range(1, 9);
    let subscriber = rng.int_range(100_000_000, 999_999_999);
    format!("+{country}{subscriber}")
}

pub fn country(rng: &mut SequenceRng) -> String {
    pick(COUNTRIES, rng).to_string()
}

/// Area, district digit, space, sector digit, two unit letters.
pub fn postcode_uk(rng: &mut SequenceRng) -> String {
    let area = pick(UK_POSTCODE_AREAS, rng);
    let district = rng.int_range(1, 9);
    let sector = rng.int_range(0, 9);
    let first = uppercase_letter(rng);
    let second = uppercase_letter(rng);
    format!("{area}{district} {sector}{first}{second}")
}

pub fn full_name(rng: &mut SequenceRng) -> String {
    let first = pick(FIRST_NAMES, rng);
    let last = pick(SURNAMES, rng);
    format!("{first} {last}")
}
