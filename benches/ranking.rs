use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use kbrank::*;

const CONSEQUENCES: [&str; 4] = [
    "missense_variant",
    "stop_gained",
    "synonymous_variant",
    "intron_variant",
];

fn records(count: u64) -> Vec<VariantRecord> {
    (0..count)
        .map(|i| VariantRecord {
            chromosome: format!("chr{}", i % 22 + 1),
            position: 10_000 + i * 7,
            reference: "G".to_string(),
            alternates: vec!["A".to_string()],
            variant_id: Some(VariantId(i + 1)),
            effects: vec![EffectAnnotation {
                symbol: Some(format!("GENE{}", i % 500)),
                consequence: vec![CONSEQUENCES[(i % 4) as usize].to_string()],
                sift: Some(format!("deleterious({:.2})", (i % 10) as f64 / 100.0)),
                polyphen: Some(format!("probably_damaging({:.2})", 0.5 + (i % 5) as f64 / 10.0)),
                gnomad_af: Some(format!("{}", (i % 50) as f64 / 1000.0)),
                ..Default::default()
            }],
        })
        .collect()
}

fn hits(count: u64) -> Vec<ClinicalHit> {
    let levels = [EvidenceLevel::A, EvidenceLevel::B, EvidenceLevel::C, EvidenceLevel::E];
    (0..count)
        .step_by(10)
        .map(|i| ClinicalHit {
            variant_id: VariantId(i + 1),
            coordinate: None,
            variant: CivicVariant {
                name: Some(format!("V{}", i)),
                aliases: vec![],
                types: vec!["Missense Variant".to_string()],
            },
            gene: CivicGene::default(),
            molecular_profiles: vec![],
            assertions: vec![],
            evidence: vec![EvidenceItem {
                name: Some(format!("EID{}", i)),
                description: None,
                disease: None,
                level: levels[(i / 10 % 4) as usize],
                direction: Some("Supports".to_string()),
                evidence_type: Some("Predictive".to_string()),
                phenotypes: Default::default(),
                rating: Some(3),
                significance: None,
                source: None,
                status: Some("accepted".to_string()),
                therapies: Default::default(),
                therapy_interaction_type: None,
            }],
        })
        .collect()
}

fn merged_rows(count: u64) -> Vec<MergedVariantRow> {
    let records = records(count);
    let hits = hits(count);
    let filter = EvidenceFilter::new();
    let inputs = MergeInputs {
        records: &records,
        hits: &hits,
        ..Default::default()
    };
    Merger::new(GenomeBuild::GRCh37, &filter).merge(&inputs).0
}

fn bench_row_scoring(c: &mut Criterion) {
    let rows = merged_rows(1_000);

    c.bench_function("decide_tier_1k", |b| {
        b.iter(|| {
            for row in &rows {
                black_box(decide_tier(black_box(row)));
            }
        })
    });

    c.bench_function("score_breakdown_1k", |b| {
        b.iter(|| {
            for row in &rows {
                black_box(score_breakdown(black_box(row)));
            }
        })
    });
}

fn bench_rank_variants(c: &mut Criterion) {
    let rows = merged_rows(20_000);

    c.bench_function("rank_variants_20k", |b| {
        b.iter_batched(
            || rows.clone(),
            |rows| {
                let (mut ranked, _) = rank_variants(rows, None);
                sort_ranked(&mut ranked, SortOrder::Rank);
                ranked
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_row_scoring, bench_rank_variants);
criterion_main!(benches);
