use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use recon_analyzer::{Analyzer, AnalyzerConfig, CancelToken};
use recon_protocol::{record_json_schema, serialize_record, AnalysisDepth, AnalysisResult};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "recon")]
#[command(about = "Reverse-engineer a source tree into a structured record and a readable spec", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a source tree and write analysis.json + RECONSTRUCTED_SPEC.md
    Analyze(AnalyzeArgs),

    /// Print the JSON Schema of the structured record
    Schema(SchemaArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Source tree to analyze (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// How far the pipeline goes (overrides the config file)
    #[arg(long, value_enum)]
    depth: Option<DepthArg>,

    /// Directory that receives the artifacts
    #[arg(long, default_value = "recon-out")]
    out: PathBuf,

    /// Scan worker count (overrides RECON_SCAN_CONCURRENCY and the config file)
    #[arg(long)]
    jobs: Option<usize>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the structured record to stdout
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SchemaArgs {
    /// Write the schema to a file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DepthArg {
    Quick,
    Full,
    Deep,
}

impl DepthArg {
    fn as_domain(self) -> AnalysisDepth {
        match self {
            DepthArg::Quick => AnalysisDepth::Quick,
            DepthArg::Full => AnalysisDepth::Full,
            DepthArg::Deep => AnalysisDepth::Deep,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for the record when --json is used
    if let Commands::Analyze(args) = &cli.command {
        if args.json {
            cli.quiet = true;
        }
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Analyze(args) => run_analyze(args).await?,
        Commands::Schema(args) => run_schema(args)?,
    }

    Ok(())
}

/// Defaults, then the TOML file, then the environment, then flags.
fn resolve_config(args: &AnalyzeArgs) -> Result<AnalyzerConfig> {
    let config = match &args.config {
        Some(path) => AnalyzerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(depth) = args.depth {
        config.depth = depth.as_domain();
    }
    if let Some(jobs) = args.jobs {
        config.jobs = Some(jobs);
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let analyzer = Analyzer::new(config).context("Invalid configuration")?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling analysis");
            on_interrupt.cancel();
        }
    });

    let mut phases = analyzer.subscribe();
    tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            let phase = *phases.borrow();
            log::debug!("Analysis phase: {phase}");
            if phase.is_terminal() {
                break;
            }
        }
    });

    let (result, paths) = analyzer
        .run_to_dir(&args.path, &args.out, &cancel)
        .await
        .with_context(|| format!("Analysis of {} failed", args.path.display()))?;

    if args.json {
        print!("{}", serialize_record(&result)?);
    } else {
        print_summary(&result);
        println!("Record:   {}", paths.record.display());
        println!("Document: {}", paths.document.display());
    }
    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    println!(
        "{} ({} depth, {} files)",
        result.meta.source_name,
        result.meta.depth,
        result.file_records.len()
    );
    for (layer, detection) in [
        ("frontend", &result.stack_profile.frontend),
        ("backend", &result.stack_profile.backend),
        ("database", &result.stack_profile.database),
        ("build", &result.stack_profile.build_tool),
    ] {
        println!(
            "  {layer:<9} {} ({:.2})",
            detection.identity, detection.confidence
        );
    }
    if let Some(pattern) = &result.architecture_pattern {
        println!("  architecture {}", pattern.name);
    }
    if result.meta.depth == AnalysisDepth::Deep {
        println!(
            "  {} endpoints, {} entities",
            result.endpoints.len(),
            result.schema_entities.len()
        );
    }
    if !result.warnings.is_empty() {
        println!("  {} warnings", result.warnings.len());
    }
}

fn run_schema(args: SchemaArgs) -> Result<()> {
    let schema = record_json_schema()?;
    let rendered = format!("{}\n", serde_json::to_string_pretty(&schema)?);
    match args.out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
