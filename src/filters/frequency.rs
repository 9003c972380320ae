use crate::types::*;

/// Population frequency below which a variant counts as rare.
pub const RARE_ALLELE_FREQUENCY: f64 = 0.01;

/// Population frequency below which a variant counts as very rare.
pub const VERY_RARE_ALLELE_FREQUENCY: f64 = 0.005;

/// Score given when a population frequency reaches the rare threshold.
pub const COMMON_VARIANT_PENALTY: i32 = -10;

/// Parse a VEP frequency field. Values may be joined with `,` or `&`.
pub fn parse_frequencies(raw: &str) -> Vec<f64> {
    raw.split([',', '&'])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .filter_map(|v| match v.parse::<f64>() {
            Ok(freq) if freq.is_finite() => Some(freq),
            _ => {
                log::warn!("Ignoring unparsable allele frequency '{}'", v);
                None
            }
        })
        .collect()
}

/// Largest frequency of a multi-valued field; `None` when no value is present.
pub fn largest_frequency(frequencies: &[f64]) -> Option<f64> {
    frequencies.iter().copied().reduce(f64::max)
}

/// Largest `AF` and gnomAD frequencies of a merged row.
pub fn population_frequencies(effect: &EffectFields) -> (Option<f64>, Option<f64>) {
    (
        largest_frequency(&effect.allele_frequencies),
        largest_frequency(&effect.gnomad_frequencies),
    )
}

/// Rare-enough check used by the oncogenic tier rule. Missing data counts as rare.
pub fn is_rare_for_tiering(af: Option<f64>, gnomad: Option<f64>) -> bool {
    match (af, gnomad) {
        (None, None) => true,
        (Some(freq), None) | (None, Some(freq)) => freq < RARE_ALLELE_FREQUENCY,
        (Some(af), Some(gnomad)) => af < RARE_ALLELE_FREQUENCY && gnomad < RARE_ALLELE_FREQUENCY,
    }
}

pub fn allele_frequency_score(af: Option<f64>, gnomad: Option<f64>) -> i32 {
    let largest = match (af, gnomad) {
        (None, None) => return 2,
        (Some(freq), None) | (None, Some(freq)) => freq,
        (Some(af), Some(gnomad)) => af.max(gnomad),
    };

    if largest < VERY_RARE_ALLELE_FREQUENCY {
        2
    } else if largest < RARE_ALLELE_FREQUENCY {
        1
    } else {
        COMMON_VARIANT_PENALTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frequencies() {
        assert_eq!(parse_frequencies("0.001,0.02&0.5"), vec![0.001, 0.02, 0.5]);
        assert_eq!(parse_frequencies(" 0.1 , "), vec![0.1]);
        assert_eq!(parse_frequencies("n/a,0.2"), vec![0.2]);
        assert!(parse_frequencies("").is_empty());
    }

    #[test]
    fn test_largest_frequency() {
        assert_eq!(largest_frequency(&[0.001, 0.3, 0.02]), Some(0.3));
        assert_eq!(largest_frequency(&[]), None);
    }

    #[test]
    fn test_rare_for_tiering() {
        assert!(is_rare_for_tiering(None, None));
        assert!(is_rare_for_tiering(Some(0.009), None));
        assert!(!is_rare_for_tiering(None, Some(0.01)));
        assert!(is_rare_for_tiering(Some(0.001), Some(0.009)));
        assert!(!is_rare_for_tiering(Some(0.001), Some(0.2)));
    }

    #[test]
    fn test_allele_frequency_score_single_source() {
        assert_eq!(allele_frequency_score(None, None), 2);
        assert_eq!(allele_frequency_score(Some(0.004), None), 2);
        assert_eq!(allele_frequency_score(None, Some(0.007)), 1);
        assert_eq!(allele_frequency_score(Some(0.01), None), -10);
    }

    #[test]
    fn test_allele_frequency_score_both_sources() {
        assert_eq!(allele_frequency_score(Some(0.001), Some(0.004)), 2);
        assert_eq!(allele_frequency_score(Some(0.001), Some(0.006)), 1);
        assert_eq!(allele_frequency_score(Some(0.009), Some(0.009)), 1);
        assert_eq!(allele_frequency_score(Some(0.001), Some(0.05)), -10);
    }
}
