use crate::error::ConfigError;
use crate::filters::score::score_breakdown;
use crate::filters::tier::decide_tier;
use crate::merger::{DiseaseContext, MergeInputs, Merger};
use crate::ontology::DiseaseOntology;
use crate::types::*;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::cmp::{Ordering, Reverse};
use std::path::Path;

/// Load the disease ontology.
///
/// A malformed file is a fatal error in strict mode. Otherwise it is logged
/// and disease reclassification is skipped for the run.
pub fn load_ontology<P: AsRef<Path>>(path: P, strict: bool) -> Result<Option<DiseaseOntology>> {
    let path = path.as_ref();
    match DiseaseOntology::from_path(path) {
        Ok(ontology) => {
            log::info!("Loaded {} disease terms from {}", ontology.len(), path.display());
            Ok(Some(ontology))
        }
        Err(err) if strict => {
            Err(err).with_context(|| format!("Failed to load disease ontology {}", path.display()))
        }
        Err(err) => {
            log::warn!(
                "Ignoring disease ontology {}: {}. Evidence will not be reclassified",
                path.display(),
                err
            );
            Ok(None)
        }
    }
}

/// Resolve the declared cancer type, honouring strict ontology mode.
pub fn build_disease_context<'o>(
    ontology: Option<&'o DiseaseOntology>,
    config: &RunConfig,
) -> Result<Option<DiseaseContext<'o>>> {
    let Some(cancer_type) = config.cancer_type.as_deref() else {
        return Ok(None);
    };

    let Some(ontology) = ontology else {
        if config.strict_ontology {
            anyhow::bail!("A cancer type was declared but no usable disease ontology is available");
        }
        log::warn!(
            "No disease ontology available, evidence for '{}' will not be reclassified",
            cancer_type
        );
        return Ok(None);
    };

    match DiseaseContext::resolve(ontology, cancer_type) {
        Ok(context) => Ok(Some(context)),
        Err(err @ ConfigError::UnresolvedCancerType(_)) if !config.strict_ontology => {
            log::warn!("{}. Evidence will not be reclassified", err);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Assign tiers and ranking scores in parallel.
pub fn rank_variants(
    rows: Vec<MergedVariantRow>,
    progress: Option<&ProgressBar>,
) -> (Vec<RankedVariant>, RunStats) {
    let results: Vec<(RankedVariant, RunStats)> = rows
        .into_par_iter()
        .map(|row| {
            let mut thread_stats = RunStats::default();

            let decision = decide_tier(&row);
            let breakdown = score_breakdown(&row);

            log::debug!(
                "{}: {} ({}), score {}",
                row.report_name,
                decision.tier,
                decision.reason.describe(),
                breakdown.total()
            );

            thread_stats.record_tier(decision.tier);
            thread_stats.unrecognized_terms += breakdown.unrecognized_terms.len();

            if let Some(pb) = progress {
                pb.inc(1);
            }

            let ranked = RankedVariant {
                ranking_score: breakdown.total(),
                tier: decision.tier,
                row,
            };
            (ranked, thread_stats)
        })
        .collect();

    let mut total_stats = RunStats::default();
    let mut ranked = Vec::with_capacity(results.len());
    for (variant, stats) in results {
        total_stats.merge(&stats);
        ranked.push(variant);
    }

    (ranked, total_stats)
}

fn position_order(a: &RankedVariant, b: &RankedVariant) -> Ordering {
    let key = |v: &RankedVariant| {
        (
            v.row.chromosome.clone(),
            v.row.position,
            v.row.reference.clone(),
            v.row.alternate.clone(),
        )
    };
    key(a).cmp(&key(b))
}

pub fn sort_ranked(ranked: &mut [RankedVariant], order: SortOrder) {
    match order {
        SortOrder::Rank => ranked.sort_by(|a, b| {
            (a.tier, Reverse(a.ranking_score))
                .cmp(&(b.tier, Reverse(b.ranking_score)))
                .then_with(|| position_order(a, b))
        }),
        SortOrder::Position => ranked.sort_by(|a, b| {
            position_order(a, b)
                .then_with(|| a.tier.cmp(&b.tier))
                .then_with(|| b.ranking_score.cmp(&a.ranking_score))
        }),
    }
}

/// Merge, tier, score and sort.
pub fn run(
    config: &RunConfig,
    inputs: &MergeInputs<'_>,
    ontology: Option<&DiseaseOntology>,
    progress: Option<&ProgressBar>,
) -> Result<(Vec<RankedVariant>, RunStats)> {
    config.validate()?;

    let context = build_disease_context(ontology, config)?;
    let mut merger = Merger::new(config.build, &config.evidence_filter);
    if let Some(context) = context.as_ref() {
        merger = merger.with_disease_context(context);
    }

    if inputs.alterations.is_empty() && inputs.hits.is_empty() {
        log::warn!("Neither CGI nor CIViC returned any result for this run");
    }

    let (rows, mut stats) = merger.merge(inputs);
    log::info!("Merged {} variants", rows.len());

    if let Some(pb) = progress {
        pb.set_length(rows.len() as u64);
    }

    let (mut ranked, rank_stats) = rank_variants(rows, progress);
    stats.merge(&rank_stats);

    sort_ranked(&mut ranked, config.sort_order);

    Ok((ranked, stats))
}
