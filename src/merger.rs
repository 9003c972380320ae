//! Joins VEP records with CGI and CIViC results into one row per variant.
//!
//! CGI alterations join on the canonical coordinate, CIViC hits on the
//! variant id assigned to each input record. CIViC evidence passes the
//! evidence filter first and is then checked against the declared cancer
//! type.

use crate::coordinate::{normalize, parse_mutation, GenomeBuild, LocusKey};
use crate::error::ConfigError;
use crate::filters::evidence::EvidenceFilter;
use crate::ontology::{DiseaseOntology, DiseaseTerm, TermQuery};
use crate::types::*;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Borrowed inputs of one merge run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeInputs<'a> {
    pub records: &'a [VariantRecord],
    pub alterations: &'a [AlterationRecord],
    pub biomarkers: &'a [BiomarkerRecord],
    pub hits: &'a [ClinicalHit],
}

// ============================================================================
// Disease Relevance
// ============================================================================

/// Outcome of checking one evidence item against the declared cancer type.
#[derive(Debug, Clone, PartialEq)]
pub enum Reclassified {
    Relevant,
    /// Level A evidence from another tumour type, kept as level C
    Downgraded(EvidenceItem),
    Dropped,
}

/// The declared cancer type resolved against the disease ontology.
#[derive(Debug, Clone)]
pub struct DiseaseContext<'o> {
    ontology: &'o DiseaseOntology,
    declared: &'o DiseaseTerm,
    declared_lineage: HashSet<String>,
}

impl<'o> DiseaseContext<'o> {
    pub fn resolve(ontology: &'o DiseaseOntology, cancer_type: &str) -> Result<Self, ConfigError> {
        let declared = ontology
            .get(cancer_type)
            .ok_or_else(|| ConfigError::UnresolvedCancerType(cancer_type.to_string()))?;
        let declared_lineage = ontology.ancestor_ids(declared.id.as_str(), true);

        log::info!(
            "Declared cancer type resolved to {} ({}), {} ancestor terms",
            declared.id,
            declared.name,
            declared_lineage.len() - 1
        );

        Ok(Self {
            ontology,
            declared,
            declared_lineage,
        })
    }

    pub fn declared(&self) -> &DiseaseTerm {
        self.declared
    }

    fn resolve_disease(&self, disease: &DiseaseRef) -> Option<&'o DiseaseTerm> {
        let by_doid = disease.doid.as_deref().and_then(|doid| {
            let doid = doid.trim();
            if doid.contains(':') {
                self.ontology.get(doid)
            } else {
                doid.parse::<u64>().ok().and_then(|n| self.ontology.get(n))
            }
        });
        by_doid.or_else(|| {
            disease
                .name
                .as_deref()
                .and_then(|name| self.ontology.get(TermQuery::Name(name.trim())))
        })
    }

    /// Same term as the declared type, an ancestor of it or a descendant of it.
    pub fn is_relevant(&self, disease: &DiseaseRef) -> bool {
        let Some(term) = self.resolve_disease(disease) else {
            log::debug!(
                "Evidence disease {:?} not found in the ontology",
                disease.label()
            );
            return false;
        };

        if self.declared_lineage.contains(&term.id.to_ascii_lowercase()) {
            return true;
        }

        self.ontology
            .get_all_ancestors(term.id.as_str(), false)
            .contains(self.declared)
    }

    pub fn reclassify(&self, item: &EvidenceItem) -> Reclassified {
        let relevant = item
            .disease
            .as_ref()
            .map(|disease| self.is_relevant(disease))
            .unwrap_or(false);

        if relevant {
            return Reclassified::Relevant;
        }

        if item.level == EvidenceLevel::A {
            let mut downgraded = item.clone();
            downgraded.level = EvidenceLevel::C;
            downgraded.disease = Some(DiseaseRef {
                name: Some(self.declared.name.clone()),
                doid: Some(self.declared.id.clone()),
            });
            Reclassified::Downgraded(downgraded)
        } else {
            Reclassified::Dropped
        }
    }
}

// ============================================================================
// Variant Ids
// ============================================================================

/// Hands out ids above every id supplied with the input.
#[derive(Debug, Clone)]
pub struct VariantIdGenerator {
    next: u64,
}

impl VariantIdGenerator {
    pub fn starting_after<'a, I>(supplied: I) -> Self
    where
        I: IntoIterator<Item = &'a VariantId>,
    {
        let largest = supplied.into_iter().map(|id| id.0).max().unwrap_or(0);
        Self {
            next: largest.saturating_add(1),
        }
    }

    pub fn next_id(&mut self) -> VariantId {
        let id = VariantId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// One id per record, keeping supplied ids and generating the missing ones.
pub fn assign_variant_ids(records: &[VariantRecord]) -> Vec<VariantId> {
    let mut generator =
        VariantIdGenerator::starting_after(records.iter().filter_map(|r| r.variant_id.as_ref()));

    let mut seen = HashSet::new();
    let mut duplicates = BTreeSet::new();

    let ids: Vec<VariantId> = records
        .iter()
        .map(|record| match record.variant_id {
            Some(id) => {
                if !seen.insert(id) {
                    duplicates.insert(id);
                }
                id
            }
            None => generator.next_id(),
        })
        .collect();

    if !duplicates.is_empty() {
        let listed: Vec<String> = duplicates.iter().map(|id| id.to_string()).collect();
        log::warn!(
            "Duplicate variant ids in input: {}. CIViC hits for these ids are matched by coordinate where possible",
            listed.join(", ")
        );
    }

    ids
}

// ============================================================================
// CGI Biomarkers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiomarkerLink {
    /// Protein changes such as `P546S` from `EGFR (P546S), EGFR (G598V)`
    ProteinChanges(BTreeSet<String>),
    /// Gene reported as wildtype, `PDGFRA wildtype`
    Wildtype(String),
}

/// Interpret the `Alterations` column of a biomarker row.
pub fn parse_biomarker_alterations(alterations: &str) -> Option<BiomarkerLink> {
    let alterations = alterations.trim();
    if alterations.contains('(') {
        let changes: BTreeSet<String> = alterations
            .split(", ")
            .filter_map(|part| {
                let (_, rest) = part.split_once('(')?;
                let change = rest.split(')').next()?.trim();
                (!change.is_empty()).then(|| change.to_string())
            })
            .collect();
        if changes.is_empty() {
            None
        } else {
            Some(BiomarkerLink::ProteinChanges(changes))
        }
    } else if alterations.contains("wildtype") {
        let gene = alterations.split_whitespace().next()?;
        Some(BiomarkerLink::Wildtype(gene.to_string()))
    } else {
        None
    }
}

#[derive(Debug, Clone)]
struct LinkedBiomarker<'a> {
    protein_changes: BTreeSet<String>,
    level: Option<EvidenceLevel>,
    record: &'a BiomarkerRecord,
}

#[derive(Debug, Default)]
struct BiomarkerIndex<'a> {
    linked: Vec<LinkedBiomarker<'a>>,
    wildtype_genes: BTreeSet<String>,
}

impl<'a> BiomarkerIndex<'a> {
    fn build(biomarkers: &'a [BiomarkerRecord]) -> Self {
        let mut index = BiomarkerIndex::default();

        for (row, record) in biomarkers.iter().enumerate() {
            let complete = record
                .biom
                .as_deref()
                .map(|b| b.trim().eq_ignore_ascii_case("complete"))
                .unwrap_or(false);
            if !complete {
                continue;
            }

            let Some(alterations) = record.alterations.as_deref() else {
                continue;
            };

            match parse_biomarker_alterations(alterations) {
                Some(BiomarkerLink::ProteinChanges(protein_changes)) => {
                    let level = record.evidence.as_deref().and_then(|e| e.parse().ok());
                    if level.is_none() {
                        log::debug!(
                            "Biomarker row {} has no usable evidence level: {:?}",
                            row + 1,
                            record.evidence
                        );
                    }
                    index.linked.push(LinkedBiomarker {
                        protein_changes,
                        level,
                        record,
                    });
                }
                Some(BiomarkerLink::Wildtype(gene)) => {
                    index.wildtype_genes.insert(gene);
                }
                None => {
                    log::warn!(
                        "Unrecognized alteration format in biomarker row {}: {}",
                        row + 1,
                        alterations
                    );
                }
            }
        }

        index
    }

    fn linked_to<'s>(&'s self, protein_change: &'s str) -> impl Iterator<Item = &'s LinkedBiomarker<'a>> + 's {
        self.linked
            .iter()
            .filter(move |b| b.protein_changes.contains(protein_change))
    }
}

// ============================================================================
// Field Aggregation
// ============================================================================

/// Add a trimmed value to an aggregated field. Blank values are skipped, so
/// inside a present hit an empty cell means no source row gave a value for
/// that field. Whether the source had a hit at all is carried by the
/// `Option` around `CgiFields` and `CivicFields`.
fn insert_value(set: &mut BTreeSet<String>, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        set.insert(value.to_string());
    }
}

pub fn collect_effect_fields(effects: &[EffectAnnotation]) -> EffectFields {
    let mut fields = EffectFields::default();

    for effect in effects {
        insert_value(&mut fields.symbols, effect.symbol.as_deref());
        insert_value(&mut fields.genes, effect.gene.as_deref());
        insert_value(&mut fields.features, effect.feature.as_deref());
        for consequence in &effect.consequence {
            insert_value(&mut fields.consequences, Some(consequence.as_str()));
        }
        insert_value(&mut fields.impacts, effect.impact.as_deref());
        insert_value(&mut fields.sift, effect.sift.as_deref());
        insert_value(&mut fields.polyphen, effect.polyphen.as_deref());
        insert_value(&mut fields.hgvsc, effect.hgvsc.as_deref());
        insert_value(&mut fields.hgvsp, effect.hgvsp.as_deref());
        insert_value(&mut fields.existing_variation, effect.existing_variation.as_deref());

        if let Some(af) = effect.af.as_deref() {
            fields
                .allele_frequencies
                .extend(crate::filters::frequency::parse_frequencies(af));
        }
        if let Some(gnomad) = effect.gnomad_af.as_deref() {
            fields
                .gnomad_frequencies
                .extend(crate::filters::frequency::parse_frequencies(gnomad));
        }
    }

    sort_distinct(&mut fields.allele_frequencies);
    sort_distinct(&mut fields.gnomad_frequencies);
    fields
}

/// Numeric counterpart of the ordered string sets.
fn sort_distinct(values: &mut Vec<f64>) {
    values.sort_by(f64::total_cmp);
    values.dedup();
}

fn collect_cgi_fields(alterations: &[&AlterationRecord], biomarkers: &BiomarkerIndex<'_>) -> CgiFields {
    let mut fields = CgiFields::default();

    for alteration in alterations {
        insert_value(&mut fields.genes, alteration.gene.as_deref());
        insert_value(&mut fields.protein_changes, alteration.protein_change.as_deref());
        insert_value(&mut fields.oncogenic_summaries, alteration.oncogenic_summary.as_deref());
        insert_value(&mut fields.oncogenic_predictions, alteration.oncogenic_prediction.as_deref());
        insert_value(
            &mut fields.external_annotations,
            alteration.external_oncogenic_annotation.as_deref(),
        );
        insert_value(&mut fields.mutations, alteration.mutation.as_deref());
        insert_value(&mut fields.consequences, alteration.consequence.as_deref());
        insert_value(&mut fields.transcripts, alteration.transcript.as_deref());
        insert_value(&mut fields.alteration_types, alteration.alteration_type.as_deref());

        let Some(protein_change) = alteration.protein_change.as_deref().map(str::trim) else {
            continue;
        };

        for biomarker in biomarkers.linked_to(protein_change) {
            if let Some(level) = biomarker.level {
                fields.evidence_level = Some(fields.evidence_level.map_or(level, |l| l.min(level)));
            }
            insert_value(&mut fields.drugs, biomarker.record.drugs.as_deref());
            insert_value(&mut fields.responses, biomarker.record.response.as_deref());
            insert_value(&mut fields.diseases, biomarker.record.diseases.as_deref());
        }
    }

    fields
}

// ============================================================================
// Merger
// ============================================================================

pub struct Merger<'a> {
    build: GenomeBuild,
    filter: &'a EvidenceFilter,
    disease: Option<&'a DiseaseContext<'a>>,
}

impl<'a> Merger<'a> {
    pub fn new(build: GenomeBuild, filter: &'a EvidenceFilter) -> Self {
        Self {
            build,
            filter,
            disease: None,
        }
    }

    pub fn with_disease_context(mut self, disease: &'a DiseaseContext<'a>) -> Self {
        self.disease = Some(disease);
        self
    }

    /// Merge all inputs into one row per distinct variant coordinate.
    pub fn merge(&self, inputs: &MergeInputs<'_>) -> (Vec<MergedVariantRow>, RunStats) {
        let mut stats = RunStats::default();

        let ids = assign_variant_ids(inputs.records);
        let cgi_index = self.index_alterations(inputs.alterations);
        let biomarkers = BiomarkerIndex::build(inputs.biomarkers);

        let mut hits_by_id: HashMap<VariantId, Vec<(usize, &ClinicalHit)>> = HashMap::new();
        for (idx, hit) in inputs.hits.iter().enumerate() {
            hits_by_id.entry(hit.variant_id).or_default().push((idx, hit));
        }

        let mut seen_loci: HashSet<LocusKey> = HashSet::new();
        let mut report_names: HashMap<String, usize> = HashMap::new();
        let mut attached_hits: HashSet<usize> = HashSet::new();
        let mut rows = Vec::new();

        for (record, id) in inputs.records.iter().zip(ids) {
            let effect = collect_effect_fields(&record.effects);

            for alternate in &record.alternates {
                let coordinate = normalize(
                    &record.chromosome,
                    record.position,
                    &record.reference,
                    alternate,
                    self.build,
                );

                if !seen_loci.insert(coordinate.locus_key()) {
                    log::warn!(
                        "Skipping repeated variant {} (record id {})",
                        coordinate,
                        id
                    );
                    stats.duplicate_coordinates += 1;
                    continue;
                }

                let cgi = cgi_index
                    .get(&coordinate.locus_key())
                    .map(|alterations| collect_cgi_fields(alterations, &biomarkers));

                let mut hits: Vec<&ClinicalHit> = Vec::new();
                for (idx, hit) in hits_by_id.get(&id).into_iter().flatten() {
                    let matches = hit
                        .coordinate
                        .as_ref()
                        .map(|c| c.same_locus(&coordinate))
                        .unwrap_or(true);
                    if matches {
                        attached_hits.insert(*idx);
                        hits.push(*hit);
                    }
                }

                let civic = if hits.is_empty() {
                    None
                } else {
                    Some(self.collect_civic_fields(&hits, &mut stats))
                };

                let chromosome = coordinate.chromosome.clone();
                let base_name = format!(
                    "chr{}-{}-{}-{}",
                    chromosome, record.position, record.reference, alternate
                );
                let report_name = unique_name(&mut report_names, base_name);

                match (cgi.is_some(), civic.is_some()) {
                    (true, true) => {
                        stats.cgi_hits += 1;
                        stats.civic_hits += 1;
                        stats.both_hits += 1;
                    }
                    (true, false) => stats.cgi_hits += 1,
                    (false, true) => stats.civic_hits += 1,
                    (false, false) => stats.no_hits += 1,
                }

                rows.push(MergedVariantRow {
                    variant_id: id,
                    coordinate,
                    chromosome,
                    position: record.position,
                    reference: record.reference.clone(),
                    alternate: alternate.clone(),
                    report_name,
                    effect: effect.clone(),
                    cgi,
                    civic,
                });
            }
        }

        let orphaned = inputs.hits.len() - attached_hits.len();
        if orphaned > 0 {
            log::warn!("{} CIViC hits did not match any input variant", orphaned);
        }

        self.check_wildtypes(&rows, &biomarkers);

        stats.variants = rows.len();
        (rows, stats)
    }

    fn index_alterations<'r>(&self, alterations: &'r [AlterationRecord]) -> HashMap<LocusKey, Vec<&'r AlterationRecord>> {
        let mut index: HashMap<LocusKey, Vec<&AlterationRecord>> = HashMap::new();

        for alteration in alterations {
            let Some(mutation) = alteration.mutation.as_deref() else {
                log::warn!(
                    "CGI alteration without a Mutation column: {:?}",
                    alteration.protein_change
                );
                continue;
            };

            match parse_mutation(mutation, self.build) {
                Some(coordinate) => index.entry(coordinate.locus_key()).or_default().push(alteration),
                None => log::warn!("Could not parse CGI mutation '{}'", mutation),
            }
        }

        index
    }

    fn collect_civic_fields(&self, hits: &[&ClinicalHit], stats: &mut RunStats) -> CivicFields {
        let mut fields = CivicFields {
            hit_count: hits.len(),
            ..Default::default()
        };

        for hit in hits {
            insert_value(&mut fields.variant_names, hit.variant.name.as_deref());
            for alias in &hit.variant.aliases {
                insert_value(&mut fields.variant_aliases, Some(alias.as_str()));
            }
            for variant_type in &hit.variant.types {
                insert_value(&mut fields.variant_types, Some(variant_type.as_str()));
            }

            insert_value(&mut fields.gene_names, hit.gene.name.as_deref());
            insert_value(&mut fields.gene_descriptions, hit.gene.description.as_deref());
            if let Some(entrez_id) = hit.gene.entrez_id {
                fields.gene_entrez_ids.insert(entrez_id);
            }

            for profile in &hit.molecular_profiles {
                insert_value(&mut fields.profile_names, profile.name.as_deref());
                insert_value(&mut fields.profile_descriptions, profile.description.as_deref());
                if let Some(score) = profile.score {
                    fields.profile_scores.push(score);
                }
            }

            for assertion in &hit.assertions {
                insert_value(&mut fields.assertion_names, assertion.name.as_deref());
                insert_value(&mut fields.assertion_amp_levels, assertion.amp_level.as_deref());
                insert_value(&mut fields.assertion_directions, assertion.direction.as_deref());
                insert_value(&mut fields.assertion_types, assertion.assertion_type.as_deref());
                insert_value(&mut fields.assertion_significances, assertion.significance.as_deref());
                for disease in &assertion.diseases {
                    insert_value(&mut fields.assertion_diseases, disease.label());
                }
                for therapy in &assertion.therapies {
                    insert_value(&mut fields.assertion_therapies, Some(therapy.as_str()));
                }
            }

            for item in &hit.evidence {
                if !self.filter.accepts(item) {
                    stats.evidence_filtered += 1;
                    continue;
                }

                let Some(disease) = self.disease else {
                    fields.evidence.push(item.clone());
                    continue;
                };

                match disease.reclassify(item) {
                    Reclassified::Relevant => fields.evidence.push(item.clone()),
                    Reclassified::Downgraded(downgraded) => {
                        log::debug!(
                            "Evidence {} for {:?} downgraded from A to C",
                            item.name.as_deref().unwrap_or("<unnamed>"),
                            item.disease.as_ref().and_then(|d| d.label())
                        );
                        stats.evidence_downgraded += 1;
                        fields.evidence.push(downgraded);
                    }
                    Reclassified::Dropped => {
                        stats.evidence_dropped += 1;
                    }
                }
            }
        }

        sort_distinct(&mut fields.profile_scores);
        fields
    }

    fn check_wildtypes(&self, rows: &[MergedVariantRow], biomarkers: &BiomarkerIndex<'_>) {
        if biomarkers.wildtype_genes.is_empty() {
            return;
        }

        let affected: BTreeSet<&str> = rows
            .iter()
            .flat_map(|row| row.effect.symbols.iter())
            .filter(|symbol| biomarkers.wildtype_genes.contains(*symbol))
            .map(String::as_str)
            .collect();

        if affected.is_empty() {
            log::info!(
                "CGI reports wildtype genes without sample variants: {}",
                biomarkers
                    .wildtype_genes
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        } else {
            log::warn!(
                "There are variants in genes marked as wildtype by CGI: {}",
                affected.into_iter().collect::<Vec<_>>().join(", ")
            );
        }
    }
}

fn unique_name(names: &mut HashMap<String, usize>, base: String) -> String {
    let count = names.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{}_{}", base, *count - 1)
    }
}
