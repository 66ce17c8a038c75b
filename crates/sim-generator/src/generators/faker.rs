//! Realistic fake values (names, emails, addresses, ...).
//!
//! The `faker` generator delegates to a [`FakeProvider`] registered on the
//! [`GeneratorRegistry`](crate::GeneratorRegistry). [`BasicFakeProvider`]
//! ships with the crate and draws from small built-in word lists.

use crate::error::GeneratorError;
use rand::{Rng, RngCore};
use serde_yaml::Mapping;
use sim_core::Value;

/// Source of fake values for the `faker` generator.
pub trait FakeProvider: Send + Sync {
    /// Produce one value for `method`.
    ///
    /// `params` holds the field's remaining keys (everything except `type`
    /// and `method`).
    fn fake(
        &self,
        method: &str,
        params: &Mapping,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GeneratorError>;

    /// Whether `method` is known to this provider.
    fn supports(&self, method: &str) -> bool;

    /// Known method names, for diagnostics.
    fn methods(&self) -> Vec<&'static str>;
}

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bob", "Carmen", "Dmitri", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonas",
    "Keiko", "Liam", "Maya", "Noah", "Olga", "Priya", "Quinn", "Rosa", "Sven", "Tara",
];

const LAST_NAMES: &[&str] = &[
    "Anderson", "Brown", "Chen", "Dubois", "Evans", "Fischer", "Garcia", "Hansen", "Ivanova",
    "Jensen", "Kim", "Lopez", "Murphy", "Nakamura", "Okafor", "Patel", "Rossi", "Silva",
    "Tanaka", "Weber",
];

const COMPANY_WORDS: &[&str] = &[
    "Acme", "Globex", "Initech", "Umbrella", "Stark", "Wayne", "Hooli", "Vandelay", "Soylent",
    "Cyberdyne", "Tyrell", "Wonka",
];

const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Group", "Ltd", "Systems", "Labs"];

const CITIES: &[&str] = &[
    "Amsterdam", "Berlin", "Chicago", "Dublin", "Edinburgh", "Florence", "Geneva", "Helsinki",
    "Istanbul", "Jakarta", "Kyoto", "Lisbon", "Madrid", "Nairobi", "Oslo", "Prague",
];

const COUNTRIES: &[&str] = &[
    "Argentina", "Brazil", "Canada", "Denmark", "Egypt", "France", "Germany", "India", "Japan",
    "Kenya", "Mexico", "Norway", "Portugal", "Spain", "Sweden", "Vietnam",
];

const STREET_NAMES: &[&str] = &[
    "Oak", "Maple", "Cedar", "Pine", "Elm", "Main", "Park", "Lake", "Hill", "River",
];

const STREET_SUFFIXES: &[&str] = &["Street", "Avenue", "Road", "Lane", "Drive", "Way"];

const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "mail.test"];

const JOBS: &[&str] = &[
    "Engineer", "Accountant", "Designer", "Nurse", "Teacher", "Chemist", "Pilot", "Architect",
    "Analyst", "Librarian", "Electrician", "Chef",
];

const COLORS: &[&str] = &[
    "Red", "Green", "Blue", "Yellow", "Purple", "Orange", "Teal", "Maroon", "Navy", "Olive",
];

const WORDS: &[&str] = &[
    "alpha", "bright", "cloud", "delta", "ember", "forest", "glide", "harbor", "island", "jolly",
    "kernel", "lunar", "meadow", "nimble", "orbit", "pixel", "quartz", "ripple", "signal",
    "timber", "umbra", "vector", "willow", "zephyr",
];

const METHODS: &[&str] = &[
    "name",
    "first_name",
    "last_name",
    "email",
    "user_name",
    "company",
    "job",
    "city",
    "country",
    "street_address",
    "phone_number",
    "ipv4",
    "color_name",
    "word",
    "sentence",
];

/// Default number of words in a `sentence`.
const DEFAULT_SENTENCE_WORDS: u64 = 6;

/// Word-list backed provider covering common Faker methods.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicFakeProvider;

impl BasicFakeProvider {
    pub fn new() -> Self {
        Self
    }
}

fn pick(rng: &mut dyn RngCore, list: &[&'static str]) -> &'static str {
    list[rng.random_range(0..list.len())]
}

impl FakeProvider for BasicFakeProvider {
    fn fake(
        &self,
        method: &str,
        params: &Mapping,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GeneratorError> {
        let text = match method {
            "name" => format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES)),
            "first_name" => pick(rng, FIRST_NAMES).to_string(),
            "last_name" => pick(rng, LAST_NAMES).to_string(),
            "email" => format!(
                "{}.{}{}@{}",
                pick(rng, FIRST_NAMES).to_lowercase(),
                pick(rng, LAST_NAMES).to_lowercase(),
                rng.random_range(1..100u32),
                pick(rng, EMAIL_DOMAINS)
            ),
            "user_name" => format!(
                "{}{}",
                pick(rng, FIRST_NAMES).to_lowercase(),
                rng.random_range(10..10_000u32)
            ),
            "company" => format!("{} {}", pick(rng, COMPANY_WORDS), pick(rng, COMPANY_SUFFIXES)),
            "job" => pick(rng, JOBS).to_string(),
            "city" => pick(rng, CITIES).to_string(),
            "country" => pick(rng, COUNTRIES).to_string(),
            "street_address" => format!(
                "{} {} {}",
                rng.random_range(1..10_000u32),
                pick(rng, STREET_NAMES),
                pick(rng, STREET_SUFFIXES)
            ),
            "phone_number" => format!(
                "+1-{:03}-{:03}-{:04}",
                rng.random_range(200..1000u32),
                rng.random_range(200..1000u32),
                rng.random_range(0..10_000u32)
            ),
            "ipv4" => format!(
                "{}.{}.{}.{}",
                rng.random_range(1..255u8),
                rng.random_range(0..=255u8),
                rng.random_range(0..=255u8),
                rng.random_range(1..255u8)
            ),
            "color_name" => pick(rng, COLORS).to_string(),
            "word" => pick(rng, WORDS).to_string(),
            "sentence" => {
                let count = match params.get("nb_words") {
                    None => DEFAULT_SENTENCE_WORDS,
                    Some(v) => v.as_u64().filter(|n| *n > 0).ok_or_else(|| {
                        GeneratorError::InvalidParams {
                            kind: "faker".to_string(),
                            reason: "'nb_words' must be a positive integer".to_string(),
                        }
                    })?,
                };
                let words: Vec<&str> = (0..count).map(|_| pick(rng, WORDS)).collect();
                let mut sentence = words.join(" ");
                if let Some(first) = sentence.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                sentence.push('.');
                sentence
            }
            other => {
                return Err(GeneratorError::InvalidParams {
                    kind: "faker".to_string(),
                    reason: format!("unknown method '{other}'"),
                })
            }
        };
        Ok(Value::String(text))
    }

    fn supports(&self, method: &str) -> bool {
        METHODS.contains(&method)
    }

    fn methods(&self) -> Vec<&'static str> {
        METHODS.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_every_method_produces_a_string() {
        let provider = BasicFakeProvider::new();
        let mut rng = StdRng::seed_from_u64(42);
        for method in provider.methods() {
            let value = provider.fake(method, &Mapping::new(), &mut rng).unwrap();
            assert!(
                !value.as_str().unwrap().is_empty(),
                "method {method} produced an empty string"
            );
        }
    }

    #[test]
    fn test_email_shape() {
        let provider = BasicFakeProvider::new();
        let mut rng = StdRng::seed_from_u64(1);
        let value = provider.fake("email", &Mapping::new(), &mut rng).unwrap();
        let email = value.as_str().unwrap();
        assert!(email.contains('@'));
        assert!([".com", ".org", ".net", ".test"]
            .iter()
            .any(|tld| email.ends_with(tld)));
    }

    #[test]
    fn test_sentence_word_count() {
        let provider = BasicFakeProvider::new();
        let mut rng = StdRng::seed_from_u64(1);
        let params: Mapping = serde_yaml::from_str("nb_words: 3").unwrap();
        let value = provider.fake("sentence", &params, &mut rng).unwrap();
        let sentence = value.as_str().unwrap();
        assert_eq!(sentence.split(' ').count(), 3);
        assert!(sentence.ends_with('.'));
    }

    #[test]
    fn test_unknown_method() {
        let provider = BasicFakeProvider::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!provider.supports("credit_card_number"));
        assert!(provider
            .fake("credit_card_number", &Mapping::new(), &mut rng)
            .is_err());
    }

    #[test]
    fn test_seeded_provider_is_reproducible() {
        let provider = BasicFakeProvider::new();
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        assert_eq!(
            provider.fake("name", &Mapping::new(), &mut a).unwrap(),
            provider.fake("name", &Mapping::new(), &mut b).unwrap()
        );
    }
}
