//! Pattern-based string generator.
//!
//! Supports placeholders:
//! - `{tick}` - current tick count
//! - `{uuid}` - random UUID
//! - `{rand:N}` - random N-digit number
//!
//! Anything else, including malformed placeholders, is copied through.

use super::uuid::random_uuid;
use rand::Rng;
use sim_core::Value;

/// Longest `{rand:N}` honored; larger requests are truncated.
const MAX_RAND_DIGITS: usize = 64;

/// Generate a string based on a pattern with placeholders.
pub fn generate_pattern<R: Rng>(pattern: &str, rng: &mut R, tick: u64) -> Value {
    let mut result = String::with_capacity(pattern.len() + 16);
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let tail = &rest[open..];

        let Some(close) = tail.find('}') else {
            result.push_str(tail);
            return Value::String(result);
        };
        let placeholder = &tail[1..close];

        match placeholder {
            "tick" => result.push_str(&tick.to_string()),
            "uuid" => result.push_str(&random_uuid(rng).to_string()),
            other => match other
                .strip_prefix("rand:")
                .and_then(|n| n.parse::<usize>().ok())
            {
                Some(digits) => push_random_digits(&mut result, rng, digits.min(MAX_RAND_DIGITS)),
                None => result.push_str(&tail[..=close]),
            },
        }
        rest = &tail[close + 1..];
    }
    result.push_str(rest);

    Value::String(result)
}

/// Append a random number with exactly N digits.
fn push_random_digits<R: Rng>(out: &mut String, rng: &mut R, digits: usize) {
    if digits == 0 {
        return;
    }

    // First digit should be 1-9 to avoid leading zeros
    out.push(char::from(b'0' + rng.random_range(1..10u8)));

    for _ in 1..digits {
        out.push(char::from(b'0' + rng.random_range(0..10u8)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_pattern_tick() {
        let mut rng = StdRng::seed_from_u64(42);
        let value = generate_pattern("user_{tick}@example.com", &mut rng, 123);

        assert_eq!(value, Value::from("user_123@example.com"));
    }

    #[test]
    fn test_generate_pattern_uuid() {
        let mut rng = StdRng::seed_from_u64(42);
        let Value::String(s) = generate_pattern("id-{uuid}", &mut rng, 1) else {
            panic!("Expected String");
        };
        assert!(s.starts_with("id-"));
        assert_eq!(s.len(), 3 + 36);
    }

    #[test]
    fn test_generate_pattern_rand() {
        let mut rng = StdRng::seed_from_u64(42);
        let Value::String(s) = generate_pattern("ORD-{rand:6}", &mut rng, 1) else {
            panic!("Expected String");
        };
        let digits = s.strip_prefix("ORD-").unwrap();
        assert_eq!(digits.len(), 6);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        assert!(!digits.starts_with('0'));
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(
            generate_pattern("{name}-{rand:x}-{tick", &mut rng, 7),
            Value::from("{name}-{rand:x}-{tick")
        );
    }

    #[test]
    fn test_unclosed_brace_copied_once() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(
            generate_pattern("id-{tick}-x{oops", &mut rng, 7),
            Value::from("id-7-x{oops")
        );
        assert_eq!(generate_pattern("a{", &mut rng, 1), Value::from("a{"));
    }

    #[test]
    fn test_multiple_placeholders() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(
            generate_pattern("{tick}/{tick}", &mut rng, 9),
            Value::from("9/9")
        );
    }
}
