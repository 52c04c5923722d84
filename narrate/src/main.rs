// narrate - Synthesize SSML narration catalogs into audio tracks

mod assembler;
mod catalog;
mod config;
mod driver;
mod pacer;
mod synthesizer;
mod tts;

use anyhow::{Context, Result};
use assembler::Assembler;
use catalog::{Catalog, Track, TrackKind};
use clap::{Parser, Subcommand};
use config::NarrateConfig;
use indicatif::{ProgressBar, ProgressStyle};
use pacer::RequestPacer;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use synthesizer::Synthesizer;

#[derive(Parser, Debug)]
#[command(name = "narrate")]
#[command(about = "Synthesize SSML narration catalogs into audio tracks", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize and assemble tracks from a catalog
    Run(RunArgs),

    /// List the tracks in a catalog
    List {
        /// Catalog file (default: from config)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Only list tracks of this kind
        #[arg(short, long, value_enum)]
        kind: Option<TrackKind>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Catalog file (default: from config)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Output directory for final audio files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Voice for tracks that do not set their own
    #[arg(short, long)]
    voice: Option<String>,

    /// Only run the track with this slug (repeatable)
    #[arg(long = "only", value_name = "SLUG")]
    only: Vec<String>,

    /// Only run tracks of this kind
    #[arg(short, long, value_enum)]
    kind: Option<TrackKind>,

    /// Minimum milliseconds between provider requests
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Segment requests in flight per track
    #[arg(long)]
    concurrency: Option<usize>,

    /// Retries for transient provider failures
    #[arg(long)]
    max_retries: Option<u32>,

    /// Print the plan without calling the provider
    #[arg(long)]
    dry_run: bool,

    /// Show a progress bar instead of per-segment log lines
    #[arg(long)]
    progress: bool,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a config file with default values
    Init,
    /// Set default voice
    SetVoice {
        /// Voice identifier (e.g., Ruth)
        voice: String,
    },
    /// Set output directory
    SetOutputDir {
        /// Directory for final audio files
        dir: PathBuf,
    },
    /// Set default catalog file
    SetCatalog {
        /// Path to a catalog TOML file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Commands::Run(run) => run_catalog(run).await,
        Commands::List { catalog, kind } => {
            let config = NarrateConfig::load().context("Failed to load configuration")?;
            list_tracks(catalog.as_deref(), kind, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action } => {
            handle_config_command(&action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(run: &RunArgs) {
    let log_level = if run.debug {
        "debug"
    } else if run.progress {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_target(false)
        .format_timestamp(None)
        .init();
}

fn load_catalog(path: Option<&Path>, config: &NarrateConfig) -> Result<Catalog> {
    let path = path
        .or(config.catalog.as_deref())
        .ok_or_else(|| anyhow::anyhow!("No catalog given. Use --catalog or `narrate config set-catalog`"))?;
    Catalog::load(path)
}

async fn run_catalog(run: RunArgs) -> Result<ExitCode> {
    init_logging(&run);

    let mut config = NarrateConfig::load().context("Failed to load configuration")?;
    if let Some(dir) = run.output_dir.clone() {
        config.output_dir = dir;
    }
    if let Some(voice) = run.voice.clone() {
        config.voice = voice;
    }
    if let Some(delay_ms) = run.delay_ms {
        config.inter_request_delay_ms = delay_ms;
    }
    if let Some(concurrency) = run.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(max_retries) = run.max_retries {
        config.max_retries = max_retries;
    }

    let catalog = load_catalog(run.catalog.as_deref(), &config)?;
    let tracks = catalog.select(&run.only, run.kind)?;
    if tracks.is_empty() {
        anyhow::bail!("No tracks match the selection");
    }

    log::debug!("Config: {:?}", config);

    if run.dry_run {
        print_plan(&tracks, &config);
        return Ok(ExitCode::SUCCESS);
    }

    driver::prepare_output_dir(&config.output_dir)?;

    let provider = tts::create_provider(&config.provider, &config.region).await?;
    let pacer = Arc::new(RequestPacer::new(config.inter_request_delay()));
    let synthesizer = Synthesizer::new(provider, pacer, config.synthesis_options());

    log::info!(
        "Provider: {} | Voice: {} | Output: {}/",
        synthesizer.provider_name(),
        config.voice,
        config.output_dir.display()
    );

    let progress = if run.progress {
        let pb = ProgressBar::new(Catalog::segment_count(&tracks) as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} segments ({elapsed})")?
                .progress_chars("=> "),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let assembler = Assembler::new(synthesizer, config.output_dir.clone(), config.voice.clone())
        .with_concurrency(config.concurrency)
        .with_empty_output(config.empty_output)
        .with_progress(progress.clone());

    let summary = driver::run_tracks(&assembler, &tracks).await;
    progress.finish_and_clear();

    eprintln!(
        "\nDone! {} of {} tracks written to {}/",
        summary.completed.len(),
        tracks.len(),
        config.output_dir.display()
    );
    if summary.missing_segments() > 0 {
        eprintln!("{} segment(s) missing from output", summary.missing_segments());
    }
    for report in summary.completed.iter().filter(|r| !r.is_complete()) {
        eprintln!(
            "Partial: {} (missing segments {:?})",
            report.output.display(),
            report.failed
        );
    }
    for (slug, error) in &summary.failed {
        eprintln!("Failed: {} ({})", slug, error);
    }

    Ok(summary.exit_code())
}

fn print_plan(tracks: &[&Track], config: &NarrateConfig) {
    println!(
        "Dry run: {} tracks, {} segments",
        tracks.len(),
        Catalog::segment_count(tracks)
    );
    for track in tracks {
        println!(
            "  {} -> {} ({} segments, {}, {})",
            track.name,
            config.output_dir.join(track.output_file_name()).display(),
            track.segments.len(),
            track.voice(&config.voice),
            track.engine
        );
    }
}

fn list_tracks(path: Option<&Path>, kind: Option<TrackKind>, config: &NarrateConfig) -> Result<()> {
    let catalog = load_catalog(path, config)?;
    let tracks = catalog.select(&[], kind)?;

    if tracks.is_empty() {
        println!("No tracks found");
        return Ok(());
    }

    for track in tracks {
        let kind = track
            .kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<28} {:<11} {:>3} segments  {}",
            track.slug,
            kind,
            track.segments.len(),
            track.name
        );
    }

    Ok(())
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = NarrateConfig::load()?;
            println!("Configuration file: {:?}", NarrateConfig::config_path()?);
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Init => {
            let path = NarrateConfig::config_path()?;
            if path.exists() {
                anyhow::bail!("Configuration already exists: {}", path.display());
            }
            NarrateConfig::default().save()?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigAction::SetVoice { voice } => {
            let mut config = NarrateConfig::load()?;
            config.voice = voice.clone();
            config.save()?;
            println!("Default voice set to: {}", voice);
        }
        ConfigAction::SetOutputDir { dir } => {
            let mut config = NarrateConfig::load()?;
            config.output_dir = dir.clone();
            config.save()?;
            println!("Output directory set to: {}", dir.display());
        }
        ConfigAction::SetCatalog { path } => {
            // Validate before saving
            Catalog::load(path)?;
            let mut config = NarrateConfig::load()?;
            config.catalog = Some(path.clone());
            config.save()?;
            println!("Default catalog set to: {}", path.display());
        }
    }
    Ok(())
}
