use anyhow::{Context, Result};
use burnseed::core::pairing::PairingMachine;
use burnseed::{
    BurnError, BurnSeedPipeline, FileHistoryStore, GdalRasterIo, HistoryStore, PipelineConfig,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "burnseed")]
#[command(author, version, about = "Burn-scar seed detection from paired Sentinel-2 ARD scenes", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Location {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory searched for scenes
    #[arg(short, long)]
    working_dir: Option<PathBuf>,

    /// Directory for outputs and the processing history
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair new scenes, compute indices and write burn seeds
    Run {
        #[command(flatten)]
        location: Location,

        /// Write the log to a timestamped file in the output directory
        #[arg(long)]
        log_file: bool,
    },
    /// List the scenes the next run would consider
    Scan {
        #[command(flatten)]
        location: Location,
    },
    /// Show scenes recorded as processed
    History {
        #[command(flatten)]
        location: Location,
    },
}

impl Location {
    fn load(&self) -> Result<PipelineConfig, BurnError> {
        PipelineConfig::load(
            self.config.as_ref(),
            self.working_dir.clone(),
            self.output_dir.clone(),
        )
    }
}

fn init_logging(verbose: bool, log_dir: Option<&PathBuf>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));

    if let Some(dir) = log_dir {
        let name = format!(
            "{}-processing.log",
            chrono::Local::now().format("%Y-%m-%d-%H-%M-%S")
        );
        let path = dir.join(name);
        let file = std::fs::File::create(&path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn log_config(config: &PipelineConfig) {
    match &config.source {
        Some(path) => log::info!("Configuration read from {}", path.display()),
        None => log::info!("Using default configuration"),
    }
    log::debug!(
        "Working directory {}, output directory {}",
        config.working_dir.display(),
        config.output_dir.display()
    );
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run { location, log_file } => {
            let config = location.load()?;
            config.validate_directories()?;
            init_logging(cli.verbose, log_file.then_some(&config.output_dir))?;
            log_config(&config);

            let pipeline = BurnSeedPipeline::new(
                &config,
                GdalRasterIo,
                FileHistoryStore::new(&config.output_dir),
            );
            let summary = pipeline.run()?;

            println!("Pairs processed:  {}", summary.pairs_processed);
            println!("Rasters written:  {}", summary.outputs.len());
            println!("Scenes dropped:   {}", summary.dropped.len());
            println!("History entries:  +{}", summary.history_added);
            println!("Time to process:  {:.1?}", summary.elapsed);
        }
        Commands::Scan { location } => {
            let config = location.load()?;
            init_logging(cli.verbose, None)?;
            log_config(&config);
            config.validate_directories()?;

            let pipeline = BurnSeedPipeline::new(
                &config,
                GdalRasterIo,
                FileHistoryStore::new(&config.output_dir),
            );
            let plan = pipeline.plan()?;
            println!(
                "{} scene(s) found, {} queued",
                plan.scenes_found,
                plan.queue.len()
            );
            for record in plan.queue.records() {
                println!("  {}", record);
            }

            match PairingMachine::new(plan.queue.into_records(), config.min_scene_size_gib) {
                Ok(machine) => {
                    for pair in machine {
                        println!("pair: {} -> {}", pair.pre.file_name, pair.post.file_name);
                    }
                }
                Err(e) => println!("{}", e),
            }
        }
        Commands::History { location } => {
            let config = location.load()?;
            init_logging(cli.verbose, None)?;
            log_config(&config);
            let history = FileHistoryStore::new(&config.output_dir).load()?;
            println!("{} scene(s) processed", history.len());
            for entry in history.entries() {
                println!("  {}", entry.file_name);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("--EXITING--");
            eprintln!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
