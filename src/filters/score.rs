use super::consequence::consequence_assessment;
use super::frequency::{allele_frequency_score, population_frequencies};
use super::predictive::pathogenicity_prediction_score;
use super::tier::is_oncogenic;
use crate::types::*;

/// Bonus for an oncogenic CGI variant that CIViC also reports.
pub const CROSS_SOURCE_BONUS: i32 = 3;

/// Bonus for any associated therapy.
pub const THERAPY_BONUS: i32 = 2;

/// Individual terms of the ranking score.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub cross_source: i32,
    pub external_annotations: i32,
    pub therapy: i32,
    pub civic_evidence: i32,
    pub cgi_evidence: i32,
    pub consequence: i32,
    pub allele_frequency: i32,
    pub pathogenicity: i32,
    pub unrecognized_terms: Vec<String>,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.cross_source
            + self.external_annotations
            + self.therapy
            + self.civic_evidence
            + self.cgi_evidence
            + self.consequence
            + self.allele_frequency
            + self.pathogenicity
    }
}

pub fn evidence_strength(level: Option<EvidenceLevel>) -> i32 {
    match level {
        Some(EvidenceLevel::A) => 5,
        Some(EvidenceLevel::B) => 3,
        Some(EvidenceLevel::C) | Some(EvidenceLevel::D) => 2,
        Some(EvidenceLevel::E) => 1,
        None => 0,
    }
}

fn external_annotation_count(row: &MergedVariantRow) -> i32 {
    row.cgi
        .as_ref()
        .map(|cgi| {
            cgi.external_annotations
                .iter()
                .flat_map(|a| a.split(','))
                .filter(|a| !a.trim().is_empty())
                .count() as i32
        })
        .unwrap_or(0)
}

fn has_therapy(row: &MergedVariantRow) -> bool {
    let civic = row.civic.as_ref().map(|c| c.has_therapy()).unwrap_or(false);
    let cgi = row
        .cgi
        .as_ref()
        .map(|c| c.evidence_level.is_some() || !c.drugs.is_empty())
        .unwrap_or(false);
    civic || cgi
}

pub fn score_breakdown(row: &MergedVariantRow) -> ScoreBreakdown {
    let consequence = consequence_assessment(row);
    let (af, gnomad) = population_frequencies(&row.effect);

    ScoreBreakdown {
        cross_source: if is_oncogenic(row) && row.civic.is_some() {
            CROSS_SOURCE_BONUS
        } else {
            0
        },
        external_annotations: external_annotation_count(row),
        therapy: if has_therapy(row) { THERAPY_BONUS } else { 0 },
        civic_evidence: evidence_strength(row.civic_level()),
        cgi_evidence: evidence_strength(row.cgi_level()),
        consequence: consequence.score,
        allele_frequency: allele_frequency_score(af, gnomad),
        pathogenicity: pathogenicity_prediction_score(&row.effect),
        unrecognized_terms: consequence.unrecognized,
    }
}

pub fn ranking_score(row: &MergedVariantRow) -> i32 {
    score_breakdown(row).total()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::tier::tests::{civic_evidence, create_test_row};

    #[test]
    fn test_bare_row_scores_rarity_only() {
        let row = create_test_row();
        let breakdown = score_breakdown(&row);
        assert_eq!(breakdown.allele_frequency, 2);
        assert_eq!(breakdown.total(), 2);
    }

    #[test]
    fn test_full_breakdown() {
        let mut row = create_test_row();
        row.cgi = Some(CgiFields {
            oncogenic_summaries: ["oncogenic (annotated)".to_string()].into_iter().collect(),
            external_annotations: ["cgi,oncokb".to_string(), "intogen".to_string()]
                .into_iter()
                .collect(),
            consequences: ["missense_variant".to_string()].into_iter().collect(),
            evidence_level: Some(EvidenceLevel::B),
            ..Default::default()
        });
        let mut evidence = civic_evidence(EvidenceLevel::A);
        evidence.therapies.insert("Vemurafenib".to_string());
        row.civic = Some(CivicFields {
            hit_count: 1,
            variant_types: ["Gain Of Function Variant".to_string()].into_iter().collect(),
            evidence: vec![evidence],
            ..Default::default()
        });
        row.effect.sift.insert("deleterious(0)".to_string());
        row.effect.polyphen.insert("probably_damaging(0.97)".to_string());
        row.effect.gnomad_frequencies = vec![0.007];

        let breakdown = score_breakdown(&row);
        assert_eq!(breakdown.cross_source, 3);
        assert_eq!(breakdown.external_annotations, 3);
        assert_eq!(breakdown.therapy, 2);
        assert_eq!(breakdown.civic_evidence, 5);
        assert_eq!(breakdown.cgi_evidence, 3);
        assert_eq!(breakdown.consequence, 2);
        assert_eq!(breakdown.allele_frequency, 1);
        assert_eq!(breakdown.pathogenicity, 1);
        assert_eq!(ranking_score(&row), 20);
    }

    #[test]
    fn test_score_is_stable_and_ignores_descriptions() {
        let mut row = create_test_row();
        row.civic = Some(CivicFields {
            hit_count: 1,
            evidence: vec![civic_evidence(EvidenceLevel::C)],
            ..Default::default()
        });
        let first = ranking_score(&row);
        assert_eq!(first, ranking_score(&row));

        if let Some(civic) = row.civic.as_mut() {
            civic.gene_descriptions.insert("A kinase.".to_string());
        }
        assert_eq!(first, ranking_score(&row));
    }

    #[test]
    fn test_common_variant_is_penalised() {
        let mut row = create_test_row();
        row.effect.allele_frequencies = vec![0.3];
        row.effect.gnomad_frequencies = vec![0.001];
        assert_eq!(ranking_score(&row), -10);
    }

    #[test]
    fn test_evidence_strength() {
        assert_eq!(evidence_strength(Some(EvidenceLevel::A)), 5);
        assert_eq!(evidence_strength(Some(EvidenceLevel::D)), 2);
        assert_eq!(evidence_strength(Some(EvidenceLevel::E)), 1);
        assert_eq!(evidence_strength(None), 0);
    }
}
