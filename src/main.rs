use clap::{Parser, Subcommand};
use score2midi::{validate_input, Config, PageInputs, ScoreToMidi};
use std::path::PathBuf;

/// Score-to-MIDI Recognition System
#[derive(Parser)]
#[command(name = "score2midi")]
#[command(about = "Recognize noteheads on a scanned score page and export MIDI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a notehead raster and generate MIDI output
    Analyze {
        /// Staff-stripped notehead raster, or a full page with --strip-staff (PNG)
        input: PathBuf,

        /// Page with staff lines intact, for staff/bar/clef detection
        #[arg(long)]
        staff_image: Option<PathBuf>,

        /// Explicit staff rows (e.g., "40,45,50,55,60")
        #[arg(long)]
        staff_rows: Option<String>,

        /// Stem detection mask (PNG, white = stem)
        #[arg(long)]
        stems: Option<PathBuf>,

        /// Beam detection mask (PNG, white = beam)
        #[arg(long)]
        beams: Option<PathBuf>,

        /// Clef classification artifact
        #[arg(long)]
        clefs: Option<PathBuf>,

        /// Input is a full page: remove its staff lines before recognition
        #[arg(long)]
        strip_staff: bool,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Resolve clefs and export MIDI from a processed-notes artifact
    Resolve {
        /// Processed-notes artifact
        input: PathBuf,

        /// Clef classification artifact
        #[arg(long)]
        clefs: Option<PathBuf>,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Error
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn parse_staff_rows(text: &str) -> anyhow::Result<Vec<i32>> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .map_err(|_| anyhow::anyhow!("Invalid staff row '{}'", s))
        })
        .collect()
}

fn load_or_default(config: Option<PathBuf>) -> anyhow::Result<Config> {
    match config {
        Some(path) => score2midi::config::load_config(path),
        None => Ok(Config::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            staff_image,
            staff_rows,
            stems,
            beams,
            clefs,
            strip_staff,
            output,
            config,
            verbose,
            quiet,
        } => {
            if verbose && quiet {
                anyhow::bail!("Cannot specify both --verbose and --quiet");
            }
            init_logging(verbose, quiet);

            let config = load_or_default(config)?;

            validate_input(&input, &config)?;

            let inputs = PageInputs {
                noteheads: input.clone(),
                staff_image,
                staff_rows: staff_rows.as_deref().map(parse_staff_rows).transpose()?,
                stems,
                beams,
                clefs,
                strip_staff,
            };

            let processor = ScoreToMidi::new(config);

            log::info!("Processing {}...", input.display());
            let state = processor.process(&inputs, &output)?;

            if !state.diagnostics.is_empty() {
                log::warn!("{} diagnostics reported", state.diagnostics.len());
            }
            log::info!(
                "{} notes in {} bars; results saved to {}",
                state.resolved_notes.len(),
                state.bars.len(),
                output.display()
            );
        }
        Commands::Resolve {
            input,
            clefs,
            output,
            config,
        } => {
            init_logging(false, false);

            let config = load_or_default(config)?;
            let processor = ScoreToMidi::new(config);
            let (notes, diagnostics) =
                processor.resolve_artifacts(&input, clefs.as_deref(), &output)?;

            log::info!(
                "Resolved {} notes ({} diagnostics); MIDI saved to {}",
                notes.len(),
                diagnostics.len(),
                output.display()
            );
        }
        Commands::ValidateConfig { config } => {
            let config = score2midi::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}
