use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use kbrank::*;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "kbrank")]
#[command(author = "kbrank Contributors")]
#[command(version = "0.3.0")]
#[command(about = "Tier and rank somatic variants using CGI, CIViC and VEP annotations", long_about = None)]
struct Args {
    /// VEP-annotated variant records (JSON, optionally gzipped)
    #[arg(long)]
    variants: PathBuf,

    /// CGI alterations.tsv
    #[arg(long)]
    cgi_alterations: Option<PathBuf>,

    /// CGI biomarkers.tsv
    #[arg(long)]
    cgi_biomarkers: Option<PathBuf>,

    /// CIViC query results (JSON, optionally gzipped)
    #[arg(long)]
    civic: Option<PathBuf>,

    /// Disease ontology in OBO format, used with --cancer-type
    #[arg(long)]
    ontology: Option<PathBuf>,

    /// Patient cancer type: ontology id, numeric id or name
    #[arg(long)]
    cancer_type: Option<String>,

    /// Evidence filter constraint attribute=value[,value...], may be repeated
    #[arg(long = "evidence-filter", value_name = "CONSTRAINT")]
    evidence_filters: Vec<String>,

    /// Reference genome of the input coordinates
    #[arg(long, value_enum, default_value_t = GenomeBuild::GRCh37)]
    build: GenomeBuild,

    /// Fail when the ontology or the cancer type cannot be used
    #[arg(long)]
    strict_ontology: bool,

    /// Order of the output table
    #[arg(long, value_enum, default_value_t = SortOrder::Rank)]
    sort: SortOrder,

    /// Output TSV path
    #[arg(short, long)]
    output: PathBuf,

    /// Statistics report output path
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Number of threads (defaults to number of CPU cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Verbose output mode
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (no progress display)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else if args.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let num_threads = rayon::current_num_threads();

    // Filter constraints are checked before any input is read
    let evidence_filter = EvidenceFilter::from_constraints(&args.evidence_filters)
        .context("Invalid evidence filter")?;

    let config = RunConfig {
        cancer_type: args.cancer_type.clone(),
        evidence_filter,
        build: args.build,
        strict_ontology: args.strict_ontology,
        sort_order: args.sort,
    };
    config.validate()?;

    if !args.variants.exists() {
        anyhow::bail!("Input file does not exist: {}", args.variants.display());
    }

    if args.verbose {
        display_config(&args, &config, num_threads);
    }

    let records = parse_variant_records(&args.variants)?;
    let alterations = optional_input(args.cgi_alterations.as_deref(), |p| read_alterations(p))?;
    let biomarkers = optional_input(args.cgi_biomarkers.as_deref(), |p| read_biomarkers(p))?;
    let hits = optional_input(args.civic.as_deref(), |p| parse_clinical_hits(p))?;

    let ontology = match (&args.ontology, &config.cancer_type) {
        (Some(path), Some(_)) => load_ontology(path, config.strict_ontology)?,
        (Some(_), None) => {
            log::warn!("--ontology given without --cancer-type, evidence will not be reclassified");
            None
        }
        (None, _) => None,
    };

    let progress = if !args.quiet {
        let pb = ProgressBar::new(records.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let inputs = MergeInputs {
        records: &records,
        alterations: &alterations,
        biomarkers: &biomarkers,
        hits: &hits,
    };

    let (ranked, stats) = run(&config, &inputs, ontology.as_ref(), progress.as_ref())?;

    if let Some(pb) = progress {
        pb.finish_with_message("Ranking complete");
    }

    let written = write_ranked_table(&args.output, &ranked)?;
    log::info!("Wrote {} ranked variants to {}", written, args.output.display());

    if args.verbose || args.stats.is_some() {
        print_statistics(&stats, num_threads, args.stats.as_deref())?;
    }

    Ok(())
}

fn optional_input<T, F>(path: Option<&Path>, read: F) -> Result<Vec<T>>
where
    F: Fn(&Path) -> Result<Vec<T>>,
{
    match path {
        Some(path) => read(path),
        None => Ok(Vec::new()),
    }
}

fn display_config(args: &Args, config: &RunConfig, num_threads: usize) {
    println!("============================================================");
    println!("kbrank Configuration");
    println!("============================================================");
    println!();
    println!("Inputs:");
    println!("  Variant records:        {}", args.variants.display());
    println!("  CGI alterations:        {}", display_path(args.cgi_alterations.as_deref()));
    println!("  CGI biomarkers:         {}", display_path(args.cgi_biomarkers.as_deref()));
    println!("  CIViC results:          {}", display_path(args.civic.as_deref()));
    println!("  Disease ontology:       {}", display_path(args.ontology.as_deref()));
    println!();
    println!("Evidence:");
    println!("  Cancer type:            {}", config.cancer_type.as_deref().unwrap_or("-"));
    println!("  Filter constraints:     {}", args.evidence_filters.len());
    println!("  Strict ontology:        {}", config.strict_ontology);
    println!();
    println!("Output:");
    println!("  Genome build:           {}", config.build);
    println!("  Sort order:             {:?}", config.sort_order);
    println!("  Output file:            {}", args.output.display());
    println!("  Threads:                {}", num_threads);
    println!();
    println!("============================================================");
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_statistics(stats: &RunStats, num_threads: usize, output_path: Option<&Path>) -> Result<()> {
    let report = format!(
        r#"
═══════════════════════════════════════════════════════════
                  Variant Ranking Statistics
═══════════════════════════════════════════════════════════

Number of threads:      {}

Variants:
  - Ranked:                     {}
  - Repeated coordinates skipped: {}

Knowledgebase hits:
  - CGI:                {}
  - CIViC:              {}
  - Both:               {}
  - Neither:            {}

CIViC evidence:
  - Removed by filter:          {}
  - Downgraded A to C:          {}
  - Dropped (other tumour type): {}

Unrecognized consequence terms: {}

Tiers:
  - Tier 1:             {}
  - Tier 2:             {}
  - Tier 3:             {}
  - Tier 4:             {}

═══════════════════════════════════════════════════════════
"#,
        num_threads,
        stats.variants,
        stats.duplicate_coordinates,
        stats.cgi_hits,
        stats.civic_hits,
        stats.both_hits,
        stats.no_hits,
        stats.evidence_filtered,
        stats.evidence_downgraded,
        stats.evidence_dropped,
        stats.unrecognized_terms,
        stats.tier_count(Tier::Tier1),
        stats.tier_count(Tier::Tier2),
        stats.tier_count(Tier::Tier3),
        stats.tier_count(Tier::Tier4),
    );

    println!("{}", report);

    if let Some(path) = output_path {
        fs::write(path, report).context("Failed to write statistics report")?;
        println!("Statistics report written to: {}", path.display());
    }

    Ok(())
}
