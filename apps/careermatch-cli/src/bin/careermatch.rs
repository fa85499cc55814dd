use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use careermatch_core::config::{Config, Settings};
use careermatch_core::corpus::{load_corpus, source_from_settings};
use careermatch_core::logging::init_tracing;
use careermatch_core::Corpus;
use careermatch_matcher::{MatchOutcome, MatchStatus, Matcher, MatcherSettings};
use careermatch_providers::{get_default_embedder, get_narrator};
use careermatch_vector::IndexSnapshot;

#[derive(Parser, Debug)]
#[command(name = "careermatch")]
#[command(author, version, about = "Match a resume against job postings", long_about = None)]
struct Cli {
    /// Directory holding config.toml and config.<env>.toml
    #[arg(long, global = true, env = "CAREERMATCH_CONFIG_DIR", default_value = ".")]
    config_dir: PathBuf,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every job in the corpus
    Jobs,
    /// Rank jobs against a resume
    Match(MatchArgs),
    /// Build the index and report what was indexed
    Status,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct QuerySource {
    /// Resume text
    #[arg(long)]
    text: Option<String>,
    /// Read the resume from a plain text file
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MatchArgs {
    #[command(flatten)]
    source: QuerySource,
    /// Number of matches (defaults to matcher.default_k)
    #[arg(short = 'k', long = "top-k")]
    k: Option<usize>,
    /// Skip match explanations
    #[arg(long)]
    no_explain: bool,
}

fn load_jobs(config: &Config, settings: &Settings) -> Result<Corpus> {
    let source = source_from_settings(&settings.corpus, config.base_dir())?;
    load_corpus(source.as_ref()).with_context(|| format!("loading corpus from {}", source.describe()))
}

fn query_text(source: &QuerySource) -> Result<String> {
    match (&source.text, &source.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display())),
        (None, None) => anyhow::bail!("either --text or --file is required"),
    }
}

fn print_status(snapshot: &IndexSnapshot) {
    println!("📊 Index state: {} (generation {})", snapshot.state, snapshot.generation);
    if let Some(built_at) = snapshot.built_at {
        println!("   built at {}", built_at.to_rfc3339());
    }
    if let Some(report) = &snapshot.report {
        println!("   provider: {}", report.embedder_id);
        println!("   indexed {}/{} jobs in {} ms", report.indexed, report.attempted, report.elapsed_ms);
        if let Some(dim) = report.dimension {
            println!("   dimension: {}", dim);
        }
        if report.cache_hits > 0 {
            println!("   cache hits: {}", report.cache_hits);
        }
        for excluded in &report.excluded {
            println!("   ⚠️  excluded job {}: {}", excluded.id, excluded.reason);
        }
    }
}

fn print_outcome(outcome: &MatchOutcome, explain: bool) {
    match &outcome.status {
        MatchStatus::Matched => {}
        MatchStatus::EmptyQuery => {
            println!("❌ The resume text is empty");
            return;
        }
        MatchStatus::IndexNotReady { state } => {
            println!("⚠️  No matches: index is {}", state);
            return;
        }
        MatchStatus::ProviderFailure { reason, retryable } => {
            let hint = if *retryable { " (try again later)" } else { "" };
            println!("❌ Matching failed: {}{}", reason, hint);
            return;
        }
    }
    println!("\n🎯 Found {} matches among {} jobs", outcome.matches.len(), outcome.total_jobs);
    for m in &outcome.matches {
        println!("\n  {}. {} at {}  score={:.4}", m.rank, m.document.title, m.document.organization, m.similarity_score);
        if let Some(location) = &m.document.location {
            println!("     📍 {}", location);
        }
        if !m.document.skills.is_empty() {
            println!("     🛠  {}", m.document.skills.join(", "));
        }
        if explain {
            if let Some(explanation) = &m.explanation {
                println!("     💬 {}", explanation);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_from(&cli.config_dir).map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;
    init_tracing(&settings.logging);

    let corpus = load_jobs(&config, &settings)?;

    match cli.command {
        Command::Jobs => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "success": true, "jobs": corpus.documents() }))?);
            } else {
                println!("📋 {} jobs", corpus.len());
                for doc in corpus.iter() {
                    println!("  [{}] {} at {}", doc.id, doc.title, doc.organization);
                }
            }
        }
        Command::Status => {
            let provider = get_default_embedder(&settings.embedding)?;
            let matcher = Matcher::new(corpus, provider, None, MatcherSettings::from(&settings));
            let snapshot = matcher.rebuild_index().await?;
            if cli.json {
                let body = serde_json::json!({
                    "state": snapshot.state,
                    "generation": snapshot.generation,
                    "built_at": snapshot.built_at,
                    "report": snapshot.report,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print_status(&snapshot);
            }
        }
        Command::Match(args) => {
            let text = query_text(&args.source)?;
            let provider = get_default_embedder(&settings.embedding)?;
            let narrator = if args.no_explain { None } else { get_narrator(&settings.narrative)? };
            let matcher = Matcher::new(corpus, provider, narrator, MatcherSettings::from(&settings));
            let snapshot = matcher.rebuild_index().await?;
            if !cli.json {
                println!("🔄 Indexed {} of {} jobs", snapshot.index.len(), matcher.list_documents().len());
            }
            let k = args.k.unwrap_or(matcher.settings().default_k);
            let outcome = matcher.find_matches(&text, k).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome, !args.no_explain);
            }
            if !outcome.success {
                std::process::exit(2);
            }
        }
    }
    Ok(())
}
