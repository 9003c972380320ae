use crate::types::*;
use std::collections::BTreeSet;

/// Delimiter for most aggregated fields.
pub const FIELD_DELIMITER: &str = ",";

/// Delimiter for free-text fields that may contain commas.
pub const TEXT_DELIMITER: &str = "|";

pub fn ranked_to_record(ranked: &RankedVariant) -> RankedRecord {
    let row = &ranked.row;
    let effect = &row.effect;
    let cgi = row.cgi.as_ref();
    let civic = row.civic.as_ref();
    let evidence = civic.map(|c| c.evidence.as_slice()).unwrap_or_default();

    RankedRecord {
        variant_id: row.variant_id.0,
        report_name: row.report_name.clone(),
        chromosome: row.chromosome.to_string(),
        position: row.position,
        reference: row.reference.clone(),
        alternate: row.alternate.clone(),
        query_start: row.coordinate.start,
        query_stop: row.coordinate.stop,
        query_ref: row.coordinate.reference.clone(),
        query_alt: row.coordinate.alternate.clone(),
        build: row.coordinate.build.to_string(),
        sources: row.sources_label().to_string(),
        evidence_levels: row.combined_evidence_label(),

        vep_symbol: join_set(&effect.symbols),
        vep_gene: join_set(&effect.genes),
        vep_feature: join_set(&effect.features),
        vep_consequence: join_set(&effect.consequences),
        vep_impact: join_set(&effect.impacts),
        vep_sift: join_set(&effect.sift),
        vep_polyphen: join_set(&effect.polyphen),
        vep_af: join_numbers(&effect.allele_frequencies),
        vep_gnomad_af: join_numbers(&effect.gnomad_frequencies),
        vep_hgvsc: join_set(&effect.hgvsc),
        vep_hgvsp: join_set(&effect.hgvsp),
        vep_existing_variation: join_set(&effect.existing_variation),

        cgi_gene: cgi.and_then(|c| join_set(&c.genes)),
        cgi_protein_change: cgi.and_then(|c| join_set(&c.protein_changes)),
        cgi_oncogenic_summary: cgi.and_then(|c| join_set(&c.oncogenic_summaries)),
        cgi_oncogenic_prediction: cgi.and_then(|c| join_set(&c.oncogenic_predictions)),
        cgi_external_oncogenic_annotation: cgi.and_then(|c| join_set(&c.external_annotations)),
        cgi_mutation: cgi.and_then(|c| join_set(&c.mutations)),
        cgi_consequence: cgi.and_then(|c| join_set(&c.consequences)),
        cgi_transcript: cgi.and_then(|c| join_set(&c.transcripts)),
        cgi_type: cgi.and_then(|c| join_set(&c.alteration_types)),
        cgi_evidence: cgi.and_then(|c| c.evidence_level).map(|l| l.to_string()),
        cgi_drugs: cgi.and_then(|c| join_set(&c.drugs)),
        cgi_response: cgi.and_then(|c| join_set(&c.responses)),
        cgi_diseases: cgi.and_then(|c| join_set(&c.diseases)),

        civic_hit_count: civic.map(|c| c.hit_count),
        civic_variant_name: civic.and_then(|c| join_set(&c.variant_names)),
        civic_variant_aliases: civic.and_then(|c| join_set(&c.variant_aliases)),
        civic_variant_type: civic.and_then(|c| join_set(&c.variant_types)),
        civic_gene_name: civic.and_then(|c| join_set(&c.gene_names)),
        civic_gene_description: civic.and_then(|c| join_text(c.gene_descriptions.iter())),
        civic_gene_entrez_id: civic.and_then(|c| join_iter(c.gene_entrez_ids.iter(), FIELD_DELIMITER)),
        civic_mol_profile_name: civic.and_then(|c| join_set(&c.profile_names)),
        civic_mol_profile_definition: civic.and_then(|c| join_text(c.profile_descriptions.iter())),
        civic_mol_profile_score: civic.and_then(|c| join_numbers(&c.profile_scores)),
        civic_assertion_name: civic.and_then(|c| join_set(&c.assertion_names)),
        civic_assertion_amp_level: civic.and_then(|c| join_set(&c.assertion_amp_levels)),
        civic_assertion_direction: civic.and_then(|c| join_set(&c.assertion_directions)),
        civic_assertion_type: civic.and_then(|c| join_set(&c.assertion_types)),
        civic_assertion_significance: civic.and_then(|c| join_set(&c.assertion_significances)),
        civic_assertion_disease: civic.and_then(|c| join_set(&c.assertion_diseases)),
        civic_assertion_therapies: civic.and_then(|c| join_set(&c.assertion_therapies)),

        civic_evidence_name: evidence_set(evidence, |e| e.name.clone()),
        civic_evidence_description: join_text(
            evidence
                .iter()
                .filter_map(|e| e.description.as_deref())
                .collect::<BTreeSet<_>>(),
        ),
        civic_evidence_disease: evidence_set(evidence, |e| {
            e.disease.as_ref().and_then(|d| d.label()).map(str::to_string)
        }),
        civic_evidence_level: evidence_set(evidence, |e| Some(e.level.to_string())),
        civic_evidence_direction: evidence_set(evidence, |e| e.direction.clone()),
        civic_evidence_type: evidence_set(evidence, |e| e.evidence_type.clone()),
        civic_evidence_phenotypes: join_iter(
            evidence
                .iter()
                .flat_map(|e| e.phenotypes.iter())
                .collect::<BTreeSet<_>>(),
            FIELD_DELIMITER,
        ),
        civic_evidence_rating: evidence_set(evidence, |e| e.rating.map(|r| r.to_string())),
        civic_evidence_significance: evidence_set(evidence, |e| e.significance.clone()),
        civic_evidence_source: join_text(
            evidence
                .iter()
                .filter_map(|e| e.source.as_deref())
                .collect::<BTreeSet<_>>(),
        ),
        civic_evidence_status: evidence_set(evidence, |e| e.status.clone()),
        civic_evidence_therapies: civic.and_then(|c| {
            join_iter(c.evidence_therapies(), FIELD_DELIMITER)
        }),
        civic_evidence_therapy_interaction_type: evidence_set(evidence, |e| {
            e.therapy_interaction_type.clone()
        }),

        tier: ranked.tier.to_string(),
        ranking_score: ranked.ranking_score,
    }
}

fn join_iter<I, T>(values: I, delimiter: &str) -> Option<String>
where
    I: IntoIterator<Item = T>,
    T: ToString,
{
    let joined: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined.join(delimiter))
    }
}

fn join_set(values: &BTreeSet<String>) -> Option<String> {
    join_iter(values, FIELD_DELIMITER)
}

fn join_text<I, T>(values: I) -> Option<String>
where
    I: IntoIterator<Item = T>,
    T: ToString,
{
    join_iter(values, TEXT_DELIMITER)
}

fn join_numbers(values: &[f64]) -> Option<String> {
    let mut distinct = values.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    join_iter(distinct, FIELD_DELIMITER)
}

fn evidence_set<F>(evidence: &[EvidenceItem], field: F) -> Option<String>
where
    F: Fn(&EvidenceItem) -> Option<String>,
{
    let values: BTreeSet<String> = evidence
        .iter()
        .filter_map(field)
        .filter(|v| !v.is_empty())
        .collect();
    join_set(&values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::tier::tests::{civic_evidence, create_test_row};

    #[test]
    fn test_row_without_hits_keeps_empty_source_fields() {
        let ranked = RankedVariant {
            row: create_test_row(),
            tier: Tier::Tier4,
            ranking_score: 2,
        };
        let record = ranked_to_record(&ranked);

        assert_eq!(record.chromosome, "7");
        assert_eq!(record.query_start, 140453136);
        assert_eq!(record.sources, "");
        assert_eq!(record.evidence_levels, "-(cgi), -(civic)");
        assert_eq!(record.cgi_gene, None);
        assert_eq!(record.civic_hit_count, None);
        assert_eq!(record.civic_evidence_level, None);
        assert_eq!(record.tier, "tier_4");
    }

    #[test]
    fn test_evidence_fields_use_their_delimiters() {
        let mut row = create_test_row();
        let mut first = civic_evidence(EvidenceLevel::B);
        first.description = Some("Responds to A, B".to_string());
        first.source = Some("PubMed: 1".to_string());
        first.therapies.insert("Dabrafenib".to_string());
        let mut second = civic_evidence(EvidenceLevel::A);
        second.name = Some("EID2".to_string());
        second.description = Some("Resistant".to_string());
        second.source = Some("PubMed: 2".to_string());
        second.therapies.insert("Trametinib".to_string());

        row.civic = Some(CivicFields {
            hit_count: 2,
            evidence: vec![first, second],
            ..Default::default()
        });
        row.effect.gnomad_frequencies = vec![0.001, 0.02];

        let record = ranked_to_record(&RankedVariant {
            row,
            tier: Tier::Tier1,
            ranking_score: 10,
        });

        assert_eq!(record.civic_evidence_name.as_deref(), Some("EID1,EID2"));
        assert_eq!(record.civic_evidence_level.as_deref(), Some("A,B"));
        assert_eq!(
            record.civic_evidence_description.as_deref(),
            Some("Resistant|Responds to A, B")
        );
        assert_eq!(record.civic_evidence_source.as_deref(), Some("PubMed: 1|PubMed: 2"));
        assert_eq!(
            record.civic_evidence_therapies.as_deref(),
            Some("Dabrafenib,Trametinib")
        );
        assert_eq!(record.civic_hit_count, Some(2));
        assert_eq!(record.vep_gnomad_af.as_deref(), Some("0.001,0.02"));
        assert_eq!(record.evidence_levels, "-(cgi), A(civic)");
        assert_eq!(record.sources, "civic");
    }

    #[test]
    fn test_numeric_fields_are_sorted_and_distinct() {
        let effects: Vec<EffectAnnotation> = [("0.001", "0.02"), ("0.001", "0.001"), ("0.001", "0.02")]
            .iter()
            .map(|(af, gnomad)| EffectAnnotation {
                symbol: Some("BRAF".to_string()),
                af: Some(af.to_string()),
                gnomad_af: Some(gnomad.to_string()),
                ..Default::default()
            })
            .collect();

        let mut row = create_test_row();
        row.effect = crate::merger::collect_effect_fields(&effects);
        row.civic = Some(CivicFields {
            hit_count: 1,
            profile_scores: vec![12.5, 3.0, 12.5],
            ..Default::default()
        });

        let record = ranked_to_record(&RankedVariant {
            row,
            tier: Tier::Tier4,
            ranking_score: 0,
        });

        assert_eq!(record.vep_af.as_deref(), Some("0.001"));
        assert_eq!(record.vep_gnomad_af.as_deref(), Some("0.001,0.02"));
        assert_eq!(record.vep_symbol.as_deref(), Some("BRAF"));
        assert_eq!(record.civic_mol_profile_score.as_deref(), Some("3,12.5"));
    }
}
