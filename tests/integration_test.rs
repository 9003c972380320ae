/// Integration tests for kbrank
/// Tests end-to-end parsing, merging, tiering and ranked TSV output

use kbrank::*;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use flate2::write::GzEncoder;
use flate2::Compression;

const VARIANTS: &str = r#"[
    {"chromosome": "chr7", "position": 140453136, "ref": "A", "alt": ["T"], "variant_id": 1,
     "effects": [{"symbol": "BRAF", "consequence": ["missense_variant"], "impact": "MODERATE",
                  "sift": "deleterious(0.01)", "polyphen": "probably_damaging(0.97)",
                  "gnomad_af": "0.00001"}]},
    {"chromosome": "chr12", "position": 25398284, "ref": "C", "alt": ["T"], "variant_id": 2,
     "effects": [{"symbol": "KRAS", "consequence": ["missense_variant"], "gnomad_af": "0.0001"}]},
    {"chromosome": "chr1", "position": 1000, "ref": "G", "alt": ["A"], "variant_id": 3,
     "effects": [{"symbol": "GENE1", "consequence": ["missense_variant"],
                  "af": "0.02", "gnomad_af": "0.2"}]},
    {"chromosome": "chr1", "position": 2000, "ref": "G", "alt": ["C"], "variant_id": 4,
     "effects": [{"symbol": "GENE2", "consequence": ["missense_variant"],
                  "af": "0.001", "gnomad_af": "0.003"}]}
]"#;

const CIVIC: &str = r#"[
    {"variant_id": 1,
     "variant": {"name": "V600E", "types": ["Missense Variant"]},
     "gene": {"name": "BRAF", "entrez_id": 673},
     "evidence": [
        {"name": "EID95", "level": "A", "disease": {"name": "Melanoma", "doid": "1909"},
         "type": "Predictive", "direction": "Supports", "therapies": ["Vemurafenib"]},
        {"name": "EID96", "level": "B", "disease": {"name": "Melanoma", "doid": "1909"},
         "type": "Predictive", "direction": "Supports"}
     ]},
    {"variant_id": 2,
     "variant": {"name": "G12D", "types": ["Missense Variant"]},
     "assertions": [{"name": "AID7", "amp_level": "TIER_II_LEVEL_C"}]},
    {"variant_id": 3,
     "variant": {"name": "R100Q", "types": ["Missense Variant"]},
     "evidence": [{"name": "EID300", "level": "B", "type": "Predictive",
                   "disease": {"name": "Lung Adenocarcinoma", "doid": "3910"}}]},
    {"variant_id": 4,
     "variant": {"name": "R200Q", "types": ["Missense Variant"]},
     "evidence": [{"name": "EID400", "level": "B", "type": "Predictive",
                   "disease": {"name": "Lung Adenocarcinoma", "doid": "3910"}}]}
]"#;

const ALTERATIONS: &str = "\
CGI-INFO\tCGI-Gene\tCGI-Protein Change\tCGI-Oncogenic Summary\tCGI-External oncogenic annotation\tCGI-Mutation\n\
S1\tBRAF\tV600E\toncogenic (annotated)\tcgi,oncokb\tchr7:140453136 A>T\n";

const ONTOLOGY: &str = "\
[Term]
id: DOID:162
name: cancer

[Term]
id: DOID:3908
name: lung non-small cell carcinoma
is_a: DOID:162 ! cancer

[Term]
id: DOID:3910
name: lung adenocarcinoma
is_a: DOID:3908 ! lung non-small cell carcinoma

[Term]
id: DOID:1909
name: melanoma
is_a: DOID:162 ! cancer
";

struct Fixture {
    _temp_dir: TempDir,
    variants: PathBuf,
    civic: PathBuf,
    alterations: PathBuf,
    ontology: PathBuf,
    output: PathBuf,
}

fn write_gzipped(path: &Path, content: &str) -> anyhow::Result<()> {
    let mut encoder = GzEncoder::new(File::create(path)?, Compression::default());
    encoder.write_all(content.as_bytes())?;
    encoder.finish()?;
    Ok(())
}

fn fixture() -> anyhow::Result<Fixture> {
    let temp_dir = TempDir::new()?;
    let variants = temp_dir.path().join("variants.json.gz");
    let civic = temp_dir.path().join("civic.json.gz");
    let alterations = temp_dir.path().join("alterations.tsv");
    let ontology = temp_dir.path().join("doid.obo");
    let output = temp_dir.path().join("ranked.tsv");

    write_gzipped(&variants, VARIANTS)?;
    write_gzipped(&civic, CIVIC)?;
    std::fs::write(&alterations, ALTERATIONS)?;
    std::fs::write(&ontology, ONTOLOGY)?;

    Ok(Fixture {
        _temp_dir: temp_dir,
        variants,
        civic,
        alterations,
        ontology,
        output,
    })
}

fn lung_adenocarcinoma_config() -> RunConfig {
    RunConfig {
        cancer_type: Some("DOID:3910".to_string()),
        ..Default::default()
    }
}

fn rank(fixture: &Fixture, config: &RunConfig) -> anyhow::Result<(Vec<RankedVariant>, RunStats)> {
    let records = parse_variant_records(&fixture.variants)?;
    let hits = parse_clinical_hits(&fixture.civic)?;
    let alterations = read_alterations(&fixture.alterations)?;
    let ontology = load_ontology(&fixture.ontology, true)?;

    let inputs = MergeInputs {
        records: &records,
        alterations: &alterations,
        biomarkers: &[],
        hits: &hits,
    };
    run(config, &inputs, ontology.as_ref(), None)
}

fn by_position(ranked: &[RankedVariant], position: u64) -> &RankedVariant {
    ranked
        .iter()
        .find(|r| r.row.position == position)
        .expect("variant missing from output")
}

#[test]
fn test_end_to_end_tiers_and_order() -> anyhow::Result<()> {
    let fixture = fixture()?;
    let (ranked, stats) = rank(&fixture, &lung_adenocarcinoma_config())?;

    assert_eq!(ranked.len(), 4);
    assert_eq!(stats.variants, 4);

    assert_eq!(by_position(&ranked, 140453136).tier, Tier::Tier2);
    assert_eq!(by_position(&ranked, 25398284).tier, Tier::Tier2);
    assert_eq!(by_position(&ranked, 1000).tier, Tier::Tier1);
    assert_eq!(by_position(&ranked, 2000).tier, Tier::Tier1);

    // Tiers ascend, scores descend within a tier
    for pair in ranked.windows(2) {
        assert!(pair[0].tier <= pair[1].tier);
        if pair[0].tier == pair[1].tier {
            assert!(pair[0].ranking_score >= pair[1].ranking_score);
        }
    }

    // Same evidence, rare in both population columns vs common in both
    let positions: Vec<u64> = ranked.iter().map(|r| r.row.position).collect();
    assert_eq!(&positions[..2], &[2000, 1000]);
    let rare = by_position(&ranked, 2000);
    let common = by_position(&ranked, 1000);
    assert_eq!(rare.tier, common.tier);
    assert_eq!(rare.ranking_score - common.ranking_score, 12);

    Ok(())
}

#[test]
fn test_evidence_from_other_tumour_type_is_reclassified() -> anyhow::Result<()> {
    let fixture = fixture()?;
    let (ranked, stats) = rank(&fixture, &lung_adenocarcinoma_config())?;

    let braf = by_position(&ranked, 140453136);
    let civic = braf.row.civic.as_ref().expect("BRAF should carry CIViC fields");

    // Level A for melanoma is kept as C for the declared disease, level B is dropped
    assert_eq!(civic.evidence.len(), 1);
    let item = &civic.evidence[0];
    assert_eq!(item.level, EvidenceLevel::C);
    let disease = item.disease.as_ref().expect("disease should be rewritten");
    assert_eq!(disease.doid.as_deref(), Some("DOID:3910"));
    assert_eq!(disease.name.as_deref(), Some("lung adenocarcinoma"));

    assert_eq!(stats.evidence_downgraded, 1);
    assert_eq!(stats.evidence_dropped, 1);

    let cgi = braf.row.cgi.as_ref().expect("BRAF should carry CGI fields");
    assert!(cgi.oncogenic_summaries.contains("oncogenic (annotated)"));

    Ok(())
}

#[test]
fn test_without_cancer_type_evidence_is_kept() -> anyhow::Result<()> {
    let fixture = fixture()?;
    let (ranked, stats) = rank(&fixture, &RunConfig::default())?;

    let braf = by_position(&ranked, 140453136);
    assert_eq!(braf.tier, Tier::Tier1);
    assert_eq!(braf.row.civic.as_ref().map(|c| c.evidence.len()), Some(2));
    assert_eq!(stats.evidence_downgraded, 0);
    assert_eq!(ranked[0].row.position, 140453136);

    Ok(())
}

#[test]
fn test_evidence_filter_runs_before_reclassification() -> anyhow::Result<()> {
    let fixture = fixture()?;
    let mut config = lung_adenocarcinoma_config();
    config.evidence_filter = EvidenceFilter::from_constraints(&["level=B"])?;

    let (ranked, stats) = rank(&fixture, &config)?;

    // Level A passes the B floor and is then downgraded
    let braf = by_position(&ranked, 140453136);
    let levels: Vec<EvidenceLevel> = braf
        .row
        .civic
        .as_ref()
        .map(|c| c.evidence.iter().map(|e| e.level).collect())
        .unwrap_or_default();
    assert_eq!(levels, vec![EvidenceLevel::C]);
    assert_eq!(stats.evidence_filtered, 0);

    config.evidence_filter = EvidenceFilter::from_constraints(&["type=diagnostic"])?;
    let (ranked, stats) = rank(&fixture, &config)?;
    let braf = by_position(&ranked, 140453136);
    assert_eq!(braf.row.civic.as_ref().map(|c| c.evidence.len()), Some(0));
    assert_eq!(stats.evidence_filtered, 4);
    assert_eq!(stats.evidence_downgraded, 0);

    Ok(())
}

#[test]
fn test_scores_are_stable_across_runs() -> anyhow::Result<()> {
    let fixture = fixture()?;
    let config = lung_adenocarcinoma_config();

    let (first, _) = rank(&fixture, &config)?;
    let (second, _) = rank(&fixture, &config)?;

    let summary = |ranked: &[RankedVariant]| -> Vec<(u64, Tier, i32)> {
        ranked
            .iter()
            .map(|r| (r.row.position, r.tier, r.ranking_score))
            .collect()
    };
    assert_eq!(summary(&first), summary(&second));

    for variant in &first {
        assert_eq!(ranking_score(&variant.row), variant.ranking_score);
        assert_eq!(classify_tier(&variant.row), variant.tier);
    }

    Ok(())
}

#[test]
fn test_write_ranked_output() -> anyhow::Result<()> {
    let fixture = fixture()?;
    let (ranked, _) = rank(&fixture, &lung_adenocarcinoma_config())?;

    let written = write_ranked_table(&fixture.output, &ranked)?;
    assert_eq!(written, 4);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(&fixture.output)?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .unwrap_or_else(|| panic!("missing column {}", name))
    };

    let position = column("pos");
    let tier = column("tier");
    let score = column("ranking_score");
    let level = column("civic_evidence_level");
    let disease = column("civic_evidence_disease");
    let external = column("cgi_external_oncogenic_annotation");

    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 4);

    let braf = rows
        .iter()
        .find(|r| &r[position] == "140453136")
        .expect("BRAF row missing");
    assert_eq!(&braf[tier], "tier_2");
    assert_eq!(&braf[level], "C");
    assert_eq!(&braf[disease], "lung adenocarcinoma");
    assert_eq!(&braf[external], "cgi,oncokb");
    assert!(braf[score].parse::<i32>().is_ok());

    let kras = rows
        .iter()
        .find(|r| &r[position] == "25398284")
        .expect("KRAS row missing");
    assert_eq!(&kras[tier], "tier_2");
    assert_eq!(&kras[level], "");

    Ok(())
}

#[test]
fn test_unresolved_cancer_type_in_strict_mode() -> anyhow::Result<()> {
    let fixture = fixture()?;
    let config = RunConfig {
        cancer_type: Some("not a disease".to_string()),
        strict_ontology: true,
        ..Default::default()
    };
    assert!(rank(&fixture, &config).is_err());

    let lenient = RunConfig {
        cancer_type: Some("not a disease".to_string()),
        ..Default::default()
    };
    let (ranked, stats) = rank(&fixture, &lenient)?;
    assert_eq!(ranked.len(), 4);
    assert_eq!(stats.evidence_downgraded, 0);

    Ok(())
}
