use super::frequency::{is_rare_for_tiering, population_frequencies};
use crate::types::*;

/// CGI oncogenic summaries that do not count as oncogenic.
pub const NON_ONCOGENIC_SUMMARIES: [&str; 2] = ["non-oncogenic", "non-protein affecting"];

/// The rule that assigned a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierReason {
    AssertedAmpTier,
    StrongEvidence,
    ModerateEvidence,
    CuratedWithoutLevel,
    RareOncogenic,
    NoActionableEvidence,
}

impl TierReason {
    pub fn describe(&self) -> &'static str {
        match self {
            TierReason::AssertedAmpTier => "CIViC assertion AMP tier",
            TierReason::StrongEvidence => "level A/B evidence",
            TierReason::ModerateEvidence => "level C/D evidence",
            TierReason::CuratedWithoutLevel => "CIViC level E evidence",
            TierReason::RareOncogenic => "rare oncogenic variant",
            TierReason::NoActionableEvidence => "no actionable evidence",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierDecision {
    pub tier: Tier,
    pub reason: TierReason,
}

/// Oncogenic per CGI: any summary present outside the non-oncogenic set.
pub fn is_oncogenic(row: &MergedVariantRow) -> bool {
    row.cgi
        .as_ref()
        .map(|cgi| {
            cgi.oncogenic_summaries.iter().any(|summary| {
                let summary = summary.trim();
                !summary.is_empty()
                    && !NON_ONCOGENIC_SUMMARIES
                        .iter()
                        .any(|excluded| summary.eq_ignore_ascii_case(excluded))
            })
        })
        .unwrap_or(false)
}

/// Strongest AMP tier named by a CIViC assertion, if any.
pub fn asserted_amp_tier(row: &MergedVariantRow) -> Option<Tier> {
    let civic = row.civic.as_ref()?;
    civic
        .assertion_amp_levels
        .iter()
        .filter_map(|level| amp_tier(level))
        .min()
}

/// Map an AMP level label such as `TIER_II_LEVEL_C` to a tier.
pub fn amp_tier(label: &str) -> Option<Tier> {
    const LABELS: [(&str, Tier); 4] = [
        ("TIER_III_", Tier::Tier3),
        ("TIER_II_", Tier::Tier2),
        ("TIER_IV_", Tier::Tier4),
        ("TIER_I_", Tier::Tier1),
    ];
    let label = label.to_ascii_uppercase();
    LABELS
        .iter()
        .find(|(marker, _)| label.contains(marker))
        .map(|(_, tier)| *tier)
}

pub fn decide_tier(row: &MergedVariantRow) -> TierDecision {
    let decision = |tier, reason| TierDecision { tier, reason };

    if let Some(tier) = asserted_amp_tier(row) {
        return decision(tier, TierReason::AssertedAmpTier);
    }

    let cgi_level = row.cgi_level();
    let civic_level = row.civic_level();
    let levels = [cgi_level, civic_level];

    if levels
        .iter()
        .flatten()
        .any(|l| matches!(l, EvidenceLevel::A | EvidenceLevel::B))
    {
        return decision(Tier::Tier1, TierReason::StrongEvidence);
    }

    if levels
        .iter()
        .flatten()
        .any(|l| matches!(l, EvidenceLevel::C | EvidenceLevel::D))
    {
        return decision(Tier::Tier2, TierReason::ModerateEvidence);
    }

    if civic_level == Some(EvidenceLevel::E) {
        return decision(Tier::Tier3, TierReason::CuratedWithoutLevel);
    }

    if is_oncogenic(row) {
        let (af, gnomad) = population_frequencies(&row.effect);
        if is_rare_for_tiering(af, gnomad) {
            return decision(Tier::Tier3, TierReason::RareOncogenic);
        }
    }

    decision(Tier::Tier4, TierReason::NoActionableEvidence)
}

pub fn classify_tier(row: &MergedVariantRow) -> Tier {
    decide_tier(row).tier
}
