use crate::coordinate::{Chromosome, GenomeBuild, GenomicCoordinate};
use crate::filters::evidence::EvidenceFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Run Configuration
// ============================================================================

/// Order of the final table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortOrder {
    /// Tier ascending, ranking score descending, then genomic position
    #[default]
    Rank,
    /// Genomic position, then tier, then ranking score descending
    Position,
}

#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    // Patient cancer type (ontology id, numeric id or name)
    pub cancer_type: Option<String>,

    // Evidence item constraints applied before aggregation
    pub evidence_filter: EvidenceFilter,

    pub build: GenomeBuild,

    // Fail instead of skipping disease reclassification when the
    // ontology or the declared cancer type is unusable
    pub strict_ontology: bool,

    pub sort_order: SortOrder,
}

impl RunConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(cancer_type) = &self.cancer_type {
            if cancer_type.trim().is_empty() {
                anyhow::bail!("cancer_type must not be empty when given");
            }
        }

        if self.strict_ontology && self.cancer_type.is_none() {
            anyhow::bail!("strict ontology mode requires a declared cancer type");
        }

        Ok(())
    }
}

// ============================================================================
// Identifiers and Evidence Levels
// ============================================================================

/// Tag used to re-associate CIViC results with the record they were queried for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub u64);

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Evidence strength grade. `A` is the strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EvidenceLevel {
    A,
    B,
    C,
    D,
    E,
}

impl EvidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceLevel::A => "A",
            EvidenceLevel::B => "B",
            EvidenceLevel::C => "C",
            EvidenceLevel::D => "D",
            EvidenceLevel::E => "E",
        }
    }
}

impl fmt::Display for EvidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceLevel {
    type Err = crate::error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(EvidenceLevel::A),
            "B" => Ok(EvidenceLevel::B),
            "C" => Ok(EvidenceLevel::C),
            "D" => Ok(EvidenceLevel::D),
            "E" => Ok(EvidenceLevel::E),
            _ => Err(crate::error::ConfigError::InvalidLevel(s.to_string())),
        }
    }
}

impl TryFrom<String> for EvidenceLevel {
    type Error = crate::error::ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EvidenceLevel> for String {
    fn from(level: EvidenceLevel) -> Self {
        level.as_str().to_string()
    }
}

// ============================================================================
// Input: VEP-annotated Variant Records
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EffectAnnotation {
    pub symbol: Option<String>,
    pub gene: Option<String>,
    pub feature: Option<String>,
    #[serde(default)]
    pub consequence: Vec<String>,
    pub impact: Option<String>,
    pub sift: Option<String>,
    pub polyphen: Option<String>,
    pub af: Option<String>,
    pub gnomad_af: Option<String>,
    pub hgvsc: Option<String>,
    pub hgvsp: Option<String>,
    pub existing_variation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantRecord {
    pub chromosome: String,
    pub position: u64,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "alt")]
    pub alternates: Vec<String>,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default)]
    pub effects: Vec<EffectAnnotation>,
}

// ============================================================================
// Input: CGI Tables
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlterationRecord {
    #[serde(rename = "Sample ID", alias = "CGI-INFO", default)]
    pub sample_id: Option<String>,
    #[serde(rename = "Gene", alias = "CGI-Gene", default)]
    pub gene: Option<String>,
    #[serde(rename = "Protein Change", alias = "CGI-Protein Change", default)]
    pub protein_change: Option<String>,
    #[serde(rename = "Oncogenic Summary", alias = "CGI-Oncogenic Summary", default)]
    pub oncogenic_summary: Option<String>,
    #[serde(rename = "Oncogenic Prediction", alias = "CGI-Oncogenic Prediction", default)]
    pub oncogenic_prediction: Option<String>,
    #[serde(
        rename = "External oncogenic annotation",
        alias = "CGI-External oncogenic annotation",
        default
    )]
    pub external_oncogenic_annotation: Option<String>,
    #[serde(rename = "Mutation", alias = "CGI-Mutation", default)]
    pub mutation: Option<String>,
    #[serde(rename = "Consequence", alias = "CGI-Consequence", default)]
    pub consequence: Option<String>,
    #[serde(rename = "Transcript", alias = "CGI-Transcript", default)]
    pub transcript: Option<String>,
    #[serde(rename = "Strand", alias = "CGI-STRAND", default)]
    pub strand: Option<String>,
    #[serde(rename = "Type", alias = "CGI-Type", default)]
    pub alteration_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BiomarkerRecord {
    #[serde(rename = "Alterations", default)]
    pub alterations: Option<String>,
    #[serde(rename = "Diseases", default)]
    pub diseases: Option<String>,
    #[serde(rename = "Tumor type", default)]
    pub tumor_type: Option<String>,
    #[serde(rename = "Drugs", default)]
    pub drugs: Option<String>,
    #[serde(rename = "Response", default)]
    pub response: Option<String>,
    #[serde(rename = "Evidence", default)]
    pub evidence: Option<String>,
    #[serde(rename = "BioM", default)]
    pub biom: Option<String>,
    #[serde(rename = "Source", default)]
    pub source: Option<String>,
}

// ============================================================================
// Input: CIViC Query Results
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiseaseRef {
    pub name: Option<String>,
    pub doid: Option<String>,
}

impl DiseaseRef {
    pub fn label(&self) -> Option<&str> {
        self.name.as_deref().or(self.doid.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvidenceItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub disease: Option<DiseaseRef>,
    pub level: EvidenceLevel,
    pub direction: Option<String>,
    #[serde(rename = "type")]
    pub evidence_type: Option<String>,
    #[serde(default)]
    pub phenotypes: BTreeSet<String>,
    pub rating: Option<u8>,
    pub significance: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub therapies: BTreeSet<String>,
    pub therapy_interaction_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CivicVariant {
    pub name: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CivicGene {
    pub name: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub entrez_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MolecularProfile {
    pub name: Option<String>,
    pub description: Option<String>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Assertion {
    pub name: Option<String>,
    pub amp_level: Option<String>,
    pub direction: Option<String>,
    pub assertion_type: Option<String>,
    pub significance: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub diseases: Vec<DiseaseRef>,
    #[serde(default)]
    pub therapies: Vec<String>,
    pub summary: Option<String>,
}

/// One CIViC variant object returned for a queried record.
#[derive(Debug, Clone, Deserialize)]
pub struct ClinicalHit {
    pub variant_id: VariantId,
    #[serde(default)]
    pub coordinate: Option<GenomicCoordinate>,
    #[serde(default)]
    pub variant: CivicVariant,
    #[serde(default)]
    pub gene: CivicGene,
    #[serde(default)]
    pub molecular_profiles: Vec<MolecularProfile>,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
}

// ============================================================================
// Merged Rows
// ============================================================================

/// VEP fields collapsed over all transcripts of one variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectFields {
    pub symbols: BTreeSet<String>,
    pub genes: BTreeSet<String>,
    pub features: BTreeSet<String>,
    pub consequences: BTreeSet<String>,
    pub impacts: BTreeSet<String>,
    pub sift: BTreeSet<String>,
    pub polyphen: BTreeSet<String>,
    pub hgvsc: BTreeSet<String>,
    pub hgvsp: BTreeSet<String>,
    pub existing_variation: BTreeSet<String>,
    pub allele_frequencies: Vec<f64>,
    pub gnomad_frequencies: Vec<f64>,
}

/// CGI fields for a variant with at least one CGI alteration hit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CgiFields {
    pub genes: BTreeSet<String>,
    pub protein_changes: BTreeSet<String>,
    pub oncogenic_summaries: BTreeSet<String>,
    pub oncogenic_predictions: BTreeSet<String>,
    pub external_annotations: BTreeSet<String>,
    pub mutations: BTreeSet<String>,
    pub consequences: BTreeSet<String>,
    pub transcripts: BTreeSet<String>,
    pub alteration_types: BTreeSet<String>,
    // Strongest level among linked biomarkers
    pub evidence_level: Option<EvidenceLevel>,
    pub drugs: BTreeSet<String>,
    pub responses: BTreeSet<String>,
    pub diseases: BTreeSet<String>,
}

/// CIViC fields for a variant with at least one CIViC hit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CivicFields {
    pub hit_count: usize,
    pub variant_names: BTreeSet<String>,
    pub variant_aliases: BTreeSet<String>,
    pub variant_types: BTreeSet<String>,
    pub gene_names: BTreeSet<String>,
    pub gene_descriptions: BTreeSet<String>,
    pub gene_entrez_ids: BTreeSet<u64>,
    pub profile_names: BTreeSet<String>,
    pub profile_descriptions: BTreeSet<String>,
    pub profile_scores: Vec<f64>,
    pub assertion_names: BTreeSet<String>,
    pub assertion_amp_levels: BTreeSet<String>,
    pub assertion_directions: BTreeSet<String>,
    pub assertion_types: BTreeSet<String>,
    pub assertion_significances: BTreeSet<String>,
    pub assertion_diseases: BTreeSet<String>,
    pub assertion_therapies: BTreeSet<String>,
    // Evidence after filtering and disease reclassification
    pub evidence: Vec<EvidenceItem>,
}

impl CivicFields {
    /// Strongest evidence level among retained evidence items.
    pub fn evidence_level(&self) -> Option<EvidenceLevel> {
        self.evidence.iter().map(|e| e.level).min()
    }

    pub fn evidence_therapies(&self) -> BTreeSet<&str> {
        self.evidence
            .iter()
            .flat_map(|e| e.therapies.iter().map(String::as_str))
            .collect()
    }

    pub fn has_therapy(&self) -> bool {
        !self.assertion_therapies.is_empty()
            || self.evidence.iter().any(|e| !e.therapies.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedVariantRow {
    pub variant_id: VariantId,
    pub coordinate: GenomicCoordinate,

    // Record position as given by the caller
    pub chromosome: Chromosome,
    pub position: u64,
    pub reference: String,
    pub alternate: String,
    pub report_name: String,

    pub effect: EffectFields,
    pub cgi: Option<CgiFields>,
    pub civic: Option<CivicFields>,
}

impl MergedVariantRow {
    pub fn cgi_level(&self) -> Option<EvidenceLevel> {
        self.cgi.as_ref().and_then(|c| c.evidence_level)
    }

    pub fn civic_level(&self) -> Option<EvidenceLevel> {
        self.civic.as_ref().and_then(|c| c.evidence_level())
    }

    pub fn sources_label(&self) -> &'static str {
        match (self.cgi.is_some(), self.civic.is_some()) {
            (true, true) => "cgi,civic",
            (true, false) => "cgi",
            (false, true) => "civic",
            (false, false) => "",
        }
    }

    pub fn combined_evidence_label(&self) -> String {
        let cgi = self.cgi_level().map(|l| l.as_str()).unwrap_or("-");
        let civic = self.civic_level().map(|l| l.as_str()).unwrap_or("-");
        format!("{}(cgi), {}(civic)", cgi, civic)
    }
}

// ============================================================================
// Tiers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
    Tier4,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Tier1, Tier::Tier2, Tier::Tier3, Tier::Tier4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier1 => "tier_1",
            Tier::Tier2 => "tier_2",
            Tier::Tier3 => "tier_3",
            Tier::Tier4 => "tier_4",
        }
    }

    fn index(&self) -> usize {
        match self {
            Tier::Tier1 => 0,
            Tier::Tier2 => 1,
            Tier::Tier3 => 2,
            Tier::Tier4 => 3,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedVariant {
    pub row: MergedVariantRow,
    pub tier: Tier,
    pub ranking_score: i32,
}

// ============================================================================
// Output Table
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RankedRecord {
    #[serde(rename = "variant_id")]
    pub variant_id: u64,
    #[serde(rename = "report_name")]
    pub report_name: String,
    #[serde(rename = "chr")]
    pub chromosome: String,
    #[serde(rename = "pos")]
    pub position: u64,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "alt")]
    pub alternate: String,
    #[serde(rename = "query_start")]
    pub query_start: u64,
    #[serde(rename = "query_stop")]
    pub query_stop: u64,
    #[serde(rename = "query_ref")]
    pub query_ref: String,
    #[serde(rename = "query_alt")]
    pub query_alt: String,
    #[serde(rename = "build")]
    pub build: String,
    #[serde(rename = "sources")]
    pub sources: String,
    #[serde(rename = "evidence_levels")]
    pub evidence_levels: String,

    // VEP
    #[serde(rename = "vep_symbol")]
    pub vep_symbol: Option<String>,
    #[serde(rename = "vep_gene")]
    pub vep_gene: Option<String>,
    #[serde(rename = "vep_feature")]
    pub vep_feature: Option<String>,
    #[serde(rename = "vep_consequence")]
    pub vep_consequence: Option<String>,
    #[serde(rename = "vep_impact")]
    pub vep_impact: Option<String>,
    #[serde(rename = "vep_sift")]
    pub vep_sift: Option<String>,
    #[serde(rename = "vep_polyphen")]
    pub vep_polyphen: Option<String>,
    #[serde(rename = "vep_af")]
    pub vep_af: Option<String>,
    #[serde(rename = "vep_gnomad_af")]
    pub vep_gnomad_af: Option<String>,
    #[serde(rename = "vep_hgvsc")]
    pub vep_hgvsc: Option<String>,
    #[serde(rename = "vep_hgvsp")]
    pub vep_hgvsp: Option<String>,
    #[serde(rename = "vep_existing_variation")]
    pub vep_existing_variation: Option<String>,

    // CGI
    #[serde(rename = "cgi_gene")]
    pub cgi_gene: Option<String>,
    #[serde(rename = "cgi_protein_change")]
    pub cgi_protein_change: Option<String>,
    #[serde(rename = "cgi_oncogenic_summary")]
    pub cgi_oncogenic_summary: Option<String>,
    #[serde(rename = "cgi_oncogenic_prediction")]
    pub cgi_oncogenic_prediction: Option<String>,
    #[serde(rename = "cgi_external_oncogenic_annotation")]
    pub cgi_external_oncogenic_annotation: Option<String>,
    #[serde(rename = "cgi_mutation")]
    pub cgi_mutation: Option<String>,
    #[serde(rename = "cgi_consequence")]
    pub cgi_consequence: Option<String>,
    #[serde(rename = "cgi_transcript")]
    pub cgi_transcript: Option<String>,
    #[serde(rename = "cgi_type")]
    pub cgi_type: Option<String>,
    #[serde(rename = "cgi_evidence")]
    pub cgi_evidence: Option<String>,
    #[serde(rename = "cgi_drugs")]
    pub cgi_drugs: Option<String>,
    #[serde(rename = "cgi_response")]
    pub cgi_response: Option<String>,
    #[serde(rename = "cgi_diseases")]
    pub cgi_diseases: Option<String>,

    // CIViC
    #[serde(rename = "civic_hit_count")]
    pub civic_hit_count: Option<usize>,
    #[serde(rename = "civic_variant_name")]
    pub civic_variant_name: Option<String>,
    #[serde(rename = "civic_variant_aliases")]
    pub civic_variant_aliases: Option<String>,
    #[serde(rename = "civic_variant_type")]
    pub civic_variant_type: Option<String>,
    #[serde(rename = "civic_gene_name")]
    pub civic_gene_name: Option<String>,
    #[serde(rename = "civic_gene_description")]
    pub civic_gene_description: Option<String>,
    #[serde(rename = "civic_gene_entrez_id")]
    pub civic_gene_entrez_id: Option<String>,
    #[serde(rename = "civic_mol_profile_name")]
    pub civic_mol_profile_name: Option<String>,
    #[serde(rename = "civic_mol_profile_definition")]
    pub civic_mol_profile_definition: Option<String>,
    #[serde(rename = "civic_mol_profile_score")]
    pub civic_mol_profile_score: Option<String>,
    #[serde(rename = "civic_assertion_name")]
    pub civic_assertion_name: Option<String>,
    #[serde(rename = "civic_assertion_amp_level")]
    pub civic_assertion_amp_level: Option<String>,
    #[serde(rename = "civic_assertion_direction")]
    pub civic_assertion_direction: Option<String>,
    #[serde(rename = "civic_assertion_type")]
    pub civic_assertion_type: Option<String>,
    #[serde(rename = "civic_assertion_significance")]
    pub civic_assertion_significance: Option<String>,
    #[serde(rename = "civic_assertion_disease")]
    pub civic_assertion_disease: Option<String>,
    #[serde(rename = "civic_assertion_therapies")]
    pub civic_assertion_therapies: Option<String>,
    #[serde(rename = "civic_evidence_name")]
    pub civic_evidence_name: Option<String>,
    #[serde(rename = "civic_evidence_description")]
    pub civic_evidence_description: Option<String>,
    #[serde(rename = "civic_evidence_disease")]
    pub civic_evidence_disease: Option<String>,
    #[serde(rename = "civic_evidence_level")]
    pub civic_evidence_level: Option<String>,
    #[serde(rename = "civic_evidence_direction")]
    pub civic_evidence_direction: Option<String>,
    #[serde(rename = "civic_evidence_type")]
    pub civic_evidence_type: Option<String>,
    #[serde(rename = "civic_evidence_phenotypes")]
    pub civic_evidence_phenotypes: Option<String>,
    #[serde(rename = "civic_evidence_rating")]
    pub civic_evidence_rating: Option<String>,
    #[serde(rename = "civic_evidence_significance")]
    pub civic_evidence_significance: Option<String>,
    #[serde(rename = "civic_evidence_source")]
    pub civic_evidence_source: Option<String>,
    #[serde(rename = "civic_evidence_status")]
    pub civic_evidence_status: Option<String>,
    #[serde(rename = "civic_evidence_therapies")]
    pub civic_evidence_therapies: Option<String>,
    #[serde(rename = "civic_evidence_therapy_interaction_type")]
    pub civic_evidence_therapy_interaction_type: Option<String>,

    #[serde(rename = "tier")]
    pub tier: String,
    #[serde(rename = "ranking_score")]
    pub ranking_score: i32,
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub variants: usize,
    pub duplicate_coordinates: usize,
    pub cgi_hits: usize,
    pub civic_hits: usize,
    pub both_hits: usize,
    pub no_hits: usize,
    pub evidence_filtered: usize,
    pub evidence_downgraded: usize,
    pub evidence_dropped: usize,
    pub unrecognized_terms: usize,
    pub tier_counts: [usize; 4],
}

impl RunStats {
    pub fn merge(&mut self, other: &RunStats) {
        self.variants += other.variants;
        self.duplicate_coordinates += other.duplicate_coordinates;
        self.cgi_hits += other.cgi_hits;
        self.civic_hits += other.civic_hits;
        self.both_hits += other.both_hits;
        self.no_hits += other.no_hits;
        self.evidence_filtered += other.evidence_filtered;
        self.evidence_downgraded += other.evidence_downgraded;
        self.evidence_dropped += other.evidence_dropped;
        self.unrecognized_terms += other.unrecognized_terms;
        for (total, count) in self.tier_counts.iter_mut().zip(other.tier_counts.iter()) {
            *total += count;
        }
    }

    pub fn record_tier(&mut self, tier: Tier) {
        self.tier_counts[tier.index()] += 1;
    }

    pub fn tier_count(&self, tier: Tier) -> usize {
        self.tier_counts[tier.index()]
    }
}
