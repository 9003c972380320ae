//! Severity scoring of VEP consequence terms and CIViC variant types.

use crate::types::*;

const HIGH_IMPACT: &[&str] = &[
    "transcript_ablation",
    "splice_acceptor_variant",
    "splice_donor_variant",
    "stop_gained",
    "frameshift_variant",
    "stop_lost",
    "start_lost",
    "transcript_amplification",
];

const MODERATE_IMPACT: &[&str] = &[
    "inframe_insertion",
    "inframe_deletion",
    "missense_variant",
    "protein_altering_variant",
];

const LOW_IMPACT: &[&str] = &[
    "splice_region_variant",
    "splice_donor_5th_base_variant",
    "splice_donor_region_variant",
    "splice_polypyrimidine_tract_variant",
    "incomplete_terminal_codon_variant",
    "start_retained_variant",
    "stop_retained_variant",
    "synonymous_variant",
];

const MODIFIER_IMPACT: &[&str] = &[
    "coding_sequence_variant",
    "mature_mirna_variant",
    "5_prime_utr_variant",
    "3_prime_utr_variant",
    "non_coding_transcript_exon_variant",
    "intron_variant",
    "nmd_transcript_variant",
    "non_coding_transcript_variant",
    "upstream_gene_variant",
    "downstream_gene_variant",
    "tfbs_ablation",
    "tfbs_amplification",
    "tf_binding_site_variant",
    "regulatory_region_ablation",
    "regulatory_region_amplification",
    "feature_elongation",
    "regulatory_region_variant",
    "feature_truncation",
    "intergenic_variant",
];

/// CIViC variant types without a VEP counterpart.
const CIVIC_VARIANT_TYPES: &[(&str, i32)] = &[
    ("frameshift truncation", 2),
    ("gene variant", 0),
    ("transcript variant", 0),
    ("loss of function variant", 2),
    ("gain of function variant", 2),
    ("exon variant", 0),
    ("transcript fusion", 2),
    ("gene fusion", 2),
    ("transcript translocation", 2),
    ("feature translocation", 2),
    ("wild type", -2),
    ("loss of heterozygosity", 2),
    ("copy number change", 2),
    ("exon loss variant", 2),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsequenceAssessment {
    /// Higher of the CGI and CIViC source scores
    pub score: i32,
    pub unrecognized: Vec<String>,
}

/// Severity of one VEP consequence term. Matching ignores case.
pub fn vep_term_score(term: &str) -> Option<i32> {
    let term = term.trim().to_ascii_lowercase();
    let term = term.as_str();
    if HIGH_IMPACT.contains(&term) {
        Some(2)
    } else if MODERATE_IMPACT.contains(&term) {
        Some(1)
    } else if LOW_IMPACT.contains(&term) {
        Some(-2)
    } else if MODIFIER_IMPACT.contains(&term) {
        Some(0)
    } else {
        None
    }
}

/// Severity of one CIViC variant type, e.g. `Missense Variant` or `Gene Fusion`.
pub fn civic_type_score(variant_type: &str) -> Option<i32> {
    let key = variant_type.trim().to_ascii_lowercase();
    if let Some((_, score)) = CIVIC_VARIANT_TYPES.iter().find(|(name, _)| *name == key) {
        return Some(*score);
    }
    vep_term_score(&key.replace(' ', "_"))
}

/// Highest severity among one source's comma-joined terms. A source without
/// terms scores 0, unknown terms score 0 and are collected.
fn source_score<'a, I, F>(terms: I, score: F, unrecognized: &mut Vec<String>) -> i32
where
    I: IntoIterator<Item = &'a String>,
    F: Fn(&str) -> Option<i32>,
{
    let mut best: Option<i32> = None;
    for term in terms.into_iter().flat_map(|t| t.split(',')) {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        let term_score = score(term).unwrap_or_else(|| {
            log::warn!("Unknown consequence term '{}', scored as 0", term);
            unrecognized.push(term.to_string());
            0
        });
        best = Some(best.map_or(term_score, |b| b.max(term_score)));
    }
    best.unwrap_or(0)
}

/// Score CGI consequence terms and CIViC variant types. Each source is scored
/// on its own and the higher score wins, so a low-impact term only goes
/// negative when both sources agree on it.
pub fn assess_consequences<'a, C, V>(cgi_terms: C, civic_types: V) -> ConsequenceAssessment
where
    C: IntoIterator<Item = &'a String>,
    V: IntoIterator<Item = &'a String>,
{
    let mut unrecognized = Vec::new();
    let cgi = source_score(cgi_terms, vep_term_score, &mut unrecognized);
    let civic = source_score(civic_types, civic_type_score, &mut unrecognized);

    ConsequenceAssessment {
        score: cgi.max(civic),
        unrecognized,
    }
}

pub fn consequence_assessment(row: &MergedVariantRow) -> ConsequenceAssessment {
    let cgi = row.cgi.as_ref().map(|c| &c.consequences);
    let civic = row.civic.as_ref().map(|c| &c.variant_types);
    assess_consequences(cgi.into_iter().flatten(), civic.into_iter().flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::tier::tests::create_test_row;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_vep_terms() {
        assert_eq!(vep_term_score("stop_gained"), Some(2));
        assert_eq!(vep_term_score("missense_variant"), Some(1));
        assert_eq!(vep_term_score("synonymous_variant"), Some(-2));
        assert_eq!(vep_term_score("5_prime_UTR_variant"), Some(0));
        assert_eq!(vep_term_score("made_up_variant"), None);
    }

    #[test]
    fn test_civic_types() {
        assert_eq!(civic_type_score("Missense Variant"), Some(1));
        assert_eq!(civic_type_score("Gene Fusion"), Some(2));
        assert_eq!(civic_type_score("Wild Type"), Some(-2));
        assert_eq!(civic_type_score("5 Prime UTR Variant"), Some(0));
        assert_eq!(civic_type_score("Mystery Type"), None);
    }

    #[test]
    fn test_maximum_over_both_sources() {
        let cgi = strings(&["synonymous_variant"]);
        let civic = strings(&["Missense Variant", "Wild Type"]);
        let assessment = assess_consequences(&cgi, &civic);
        assert_eq!(assessment.score, 1);
        assert!(assessment.unrecognized.is_empty());
    }

    #[test]
    fn test_single_low_impact_source_scores_zero() {
        let cgi = strings(&["synonymous_variant,stop_retained_variant"]);
        let assessment = assess_consequences(&cgi, &Vec::<String>::new());
        assert_eq!(assessment.score, 0);

        let civic = strings(&["Wild Type"]);
        let assessment = assess_consequences(&Vec::<String>::new(), &civic);
        assert_eq!(assessment.score, 0);
    }

    #[test]
    fn test_low_impact_in_both_sources_is_negative() {
        let cgi = strings(&["synonymous_variant"]);
        let civic = strings(&["Synonymous Variant", "Wild Type"]);
        let assessment = assess_consequences(&cgi, &civic);
        assert_eq!(assessment.score, -2);
    }

    #[test]
    fn test_cgi_only_synonymous_row() {
        let mut row = create_test_row();
        row.cgi = Some(CgiFields {
            consequences: ["synonymous_variant".to_string()].into_iter().collect(),
            ..Default::default()
        });
        assert_eq!(consequence_assessment(&row).score, 0);

        row.civic = Some(CivicFields {
            hit_count: 1,
            variant_types: ["Synonymous Variant".to_string()].into_iter().collect(),
            ..Default::default()
        });
        assert_eq!(consequence_assessment(&row).score, -2);
    }

    #[test]
    fn test_unknown_terms_are_neutral() {
        let cgi = strings(&["synonymous_variant"]);
        let civic = strings(&["Mystery Type"]);
        let assessment = assess_consequences(&cgi, &civic);
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.unrecognized, vec!["Mystery Type".to_string()]);
    }

    #[test]
    fn test_no_terms_scores_zero() {
        let assessment = assess_consequences(&Vec::<String>::new(), &Vec::<String>::new());
        assert_eq!(assessment.score, 0);
    }
}
