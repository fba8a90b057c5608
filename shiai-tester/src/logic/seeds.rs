use anyhow::{Context, Result, bail};
use std::collections::HashSet;

/// Seed used when the command line names none.
pub const DEFAULT_SEED: u64 = 1337;

/// Resolve CLI seed tokens into a de-duplicated, ordered seed list.
///
/// Accepts decimal integers (negative values use their magnitude) and
/// `0x`-prefixed hex.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    let mut seen = HashSet::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let seed = parse_seed(token)?;
        if seen.insert(seed) {
            seeds.push(seed);
        }
    }

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

fn parse_seed(token: &str) -> Result<u64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        return u64::from_str_radix(&hex.replace('_', ""), 16)
            .with_context(|| format!("invalid hex seed: {token}"));
    }
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }
    bail!("Unrecognized seed token: {token}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn resolves_decimal_negative_and_hex() {
        let seeds = resolve_seed_inputs(&tokens(&["42", "-7", "0xFF", "18446744073709551615"]))
            .unwrap();
        assert_eq!(seeds, vec![42, 7, 255, u64::MAX]);
    }

    #[test]
    fn deduplicates_in_first_seen_order() {
        let seeds = resolve_seed_inputs(&tokens(&["5", "0x5", "-5", "3"])).unwrap();
        assert_eq!(seeds, vec![5, 3]);
    }

    #[test]
    fn falls_back_to_default_seed() {
        assert_eq!(resolve_seed_inputs(&[]).unwrap(), vec![DEFAULT_SEED]);
        assert_eq!(
            resolve_seed_inputs(&tokens(&[""])).unwrap(),
            vec![DEFAULT_SEED]
        );
    }

    #[test]
    fn rejects_unknown_tokens() {
        let err = resolve_seed_inputs(&tokens(&["banana"])).unwrap_err();
        assert!(err.to_string().contains("banana"));
        assert!(resolve_seed_inputs(&tokens(&["0xZZ"])).is_err());
    }
}
