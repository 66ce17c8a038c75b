//! Random selection from a list of values.

use rand::Rng;
use sim_core::Value;

/// Check choice parameters once, when the schema is compiled.
pub fn validate_choice(
    values: &[serde_yaml::Value],
    weights: Option<&[f64]>,
) -> Result<(), String> {
    if values.is_empty() {
        return Err("'values' must not be empty".to_string());
    }
    if let Some(weights) = weights {
        if weights.len() != values.len() {
            return Err(format!(
                "'weights' has {} entries but 'values' has {}",
                weights.len(),
                values.len()
            ));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("'weights' must be non-negative numbers".to_string());
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err("'weights' must not all be zero".to_string());
        }
    }
    Ok(())
}

/// Pick one value, uniformly or by relative weight.
///
/// Callers guarantee the parameters passed [`validate_choice`].
pub fn generate_choice<R: Rng>(
    rng: &mut R,
    values: &[serde_yaml::Value],
    weights: Option<&[f64]>,
) -> Value {
    let idx = match weights {
        None => rng.random_range(0..values.len()),
        Some(weights) => weighted_index(rng, weights),
    };
    values.get(idx).map(Value::from_yaml).unwrap_or(Value::Null)
}

fn weighted_index<R: Rng>(rng: &mut R, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    let mut target = rng.random_range(0.0..total);
    for (idx, weight) in weights.iter().enumerate() {
        if target < *weight {
            return idx;
        }
        target -= weight;
    }
    // Rounding can leave `target` just past the last bucket
    weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool() -> Vec<serde_yaml::Value> {
        serde_yaml::from_str("[red, green, blue]").unwrap()
    }

    #[test]
    fn test_uniform_choice_stays_in_pool() {
        let mut rng = StdRng::seed_from_u64(42);
        let values = pool();
        for _ in 0..50 {
            let v = generate_choice(&mut rng, &values, None);
            assert!(["red", "green", "blue"].contains(&v.as_str().unwrap()));
        }
    }

    #[test]
    fn test_zero_weight_is_never_picked() {
        let mut rng = StdRng::seed_from_u64(42);
        let values = pool();
        let weights = [1.0, 0.0, 3.0];
        for _ in 0..500 {
            let v = generate_choice(&mut rng, &values, Some(&weights));
            assert_ne!(v, Value::from("green"));
        }
    }

    #[test]
    fn test_single_weight_always_wins() {
        let mut rng = StdRng::seed_from_u64(42);
        let values = pool();
        let weights = [0.0, 0.0, 2.0];
        for _ in 0..50 {
            assert_eq!(
                generate_choice(&mut rng, &values, Some(&weights)),
                Value::from("blue")
            );
        }
    }

    #[test]
    fn test_validate_choice() {
        let values = pool();
        assert!(validate_choice(&values, None).is_ok());
        assert!(validate_choice(&[], None).is_err());
        assert!(validate_choice(&values, Some(&[1.0, 2.0])).is_err());
        assert!(validate_choice(&values, Some(&[0.0, 0.0, 0.0])).is_err());
        assert!(validate_choice(&values, Some(&[1.0, -1.0, 1.0])).is_err());
    }
}
