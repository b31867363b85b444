use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use skillmatch::extractors::SkillExtractor;
use skillmatch::{
    candidates_frame, collection_skill_counts, extract_concurrently, ontology, read_json_lines, write_csv,
    CompetencyOntology, DocumentBatch, DocumentType, ExactMatchSkillExtractor, ExtractionConfig, FuzzyMatchSkillExtractor,
    NounPhraseEndingExtractor, OccupationScopedExactMatchSkillExtractor, SectionExtractSkillExtractor,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skillmatch")]
#[command(about = "Extract candidate skills from job postings using a competency ontology")]
struct Cli {
    /// JSON extraction config (SKILLMATCH_* environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load an ontology and print node and edge counts
    Summary {
        /// JSON file or directory of CSV tables
        #[arg(long)]
        ontology: PathBuf,

        /// Keep only edges whose occupation name contains this text
        #[arg(long)]
        occupation: Option<String>,
    },
    /// Count candidate skills across a document collection
    Count {
        #[command(flatten)]
        input: InputArgs,

        /// How many of the most common skills to print
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Extract candidates concurrently and export them as CSV
    Extract {
        #[command(flatten)]
        input: InputArgs,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Required by the exact, scoped and fuzzy extractors
    #[arg(long)]
    ontology: Option<PathBuf>,

    /// JSON-lines file of documents
    #[arg(long)]
    documents: PathBuf,

    #[arg(long, value_enum, default_value_t = ExtractorKind::SkillPattern)]
    extractor: ExtractorKind,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExtractorKind {
    SkillPattern,
    AbilityPattern,
    Section,
    Exact,
    Scoped,
    Fuzzy,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Summary { ontology, occupation } => summary(&ontology, occupation.as_deref()),
        Command::Count { input, top } => count(&input, &config, top),
        Command::Extract { input, output } => extract(&input, &config, &output).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<ExtractionConfig> {
    let config = match path {
        Some(path) => ExtractionConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .with_env_overrides()?,
        None => ExtractionConfig::from_env()?,
    };
    Ok(config)
}

fn load_ontology(path: &Path) -> Result<CompetencyOntology> {
    ontology::load(path).with_context(|| format!("Failed to load ontology from {}", path.display()))
}

fn summary(path: &Path, occupation: Option<&str>) -> Result<()> {
    let mut ontology = load_ontology(path)?;

    if let Some(needle) = occupation {
        let needle = needle.to_lowercase();
        ontology = ontology.filter_by(|edge| edge.occupation.name.to_lowercase().contains(&needle));
        info!("Filtered to occupations matching {:?}", needle);
    }

    let summary = ontology.print_summary_stats();
    println!("{}", summary);
    for category in ontology.categories() {
        println!("  {:<24} {}", category, ontology.competencies_in_category(category).count());
    }
    Ok(())
}

fn load_documents(path: &Path, config: &ExtractionConfig) -> Result<DocumentBatch> {
    let batch = read_json_lines(path, &config.id_field, DocumentType::JobPosting)
        .with_context(|| format!("Failed to read documents from {}", path.display()))?;
    if !batch.failures.is_empty() {
        warn!("Skipped {} unreadable lines in {}", batch.failures.len(), path.display());
    }
    Ok(batch)
}

fn build_extractor(input: &InputArgs, config: &ExtractionConfig) -> Result<Arc<dyn SkillExtractor>> {
    let require_ontology = || -> Result<CompetencyOntology> {
        match &input.ontology {
            Some(path) => load_ontology(path),
            None => bail!("--ontology is required for the {:?} extractor", input.extractor),
        }
    };

    let extractor: Arc<dyn SkillExtractor> = match input.extractor {
        ExtractorKind::SkillPattern => Arc::new(NounPhraseEndingExtractor::skills(config)?),
        ExtractorKind::AbilityPattern => Arc::new(NounPhraseEndingExtractor::abilities(config)?),
        ExtractorKind::Section => Arc::new(SectionExtractSkillExtractor::new(config)?),
        ExtractorKind::Exact => Arc::new(ExactMatchSkillExtractor::from_ontology(&require_ontology()?, config)?),
        ExtractorKind::Scoped => Arc::new(OccupationScopedExactMatchSkillExtractor::new(
            Arc::new(require_ontology()?),
            config,
        )?),
        ExtractorKind::Fuzzy => Arc::new(FuzzyMatchSkillExtractor::from_ontology(&require_ontology()?, config)?),
    };
    info!("Using extractor {}", extractor.name());
    Ok(extractor)
}

fn count(input: &InputArgs, config: &ExtractionConfig, top: usize) -> Result<()> {
    let extractor = build_extractor(input, config)?;
    let batch = load_documents(&input.documents, config)?;

    let result = collection_skill_counts(extractor.as_ref(), &batch.documents);
    println!(
        "{} documents processed, {} skipped ({} unreadable lines), {} distinct skills",
        result.processed,
        result.failures.len() + batch.failures.len(),
        batch.failures.len(),
        result.counts.len()
    );
    for (name, count) in result.counts.most_common(top) {
        println!("{:>6}  {}", count, name);
    }
    Ok(())
}

async fn extract(input: &InputArgs, config: &ExtractionConfig, output: &Path) -> Result<()> {
    let extractor = build_extractor(input, config)?;
    let batch = load_documents(&input.documents, config)?;
    let total = batch.documents.len();

    let results = extract_concurrently(extractor, batch.documents, config.concurrency).await?;

    let mut candidates = Vec::new();
    let mut failed = 0;
    for result in results {
        match result.outcome {
            Ok(found) => candidates.extend(found),
            Err(_) => failed += 1,
        }
    }

    let mut frame = candidates_frame(&candidates, &config.title_field)?;
    write_csv(&mut frame, output).with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "{} candidates from {} documents ({} failed, {} unreadable lines) written to {}",
        candidates.len(),
        total - failed,
        failed,
        batch.failures.len(),
        output.display()
    );
    Ok(())
}
