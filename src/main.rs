use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facebench::config::{self, Config};
use facebench::corpus::Corpus;
use facebench::database::EnrollmentDatabase;
use facebench::report::{Report, Timings};
use facebench::scan::{self, Enrollment};
use facebench_vision::{CascadeDetector, SFaceEncoder, YuNetDetector};
use log::info;

#[derive(Parser)]
#[command(name = "facebench")]
#[command(
    version,
    about = "Measure face recognition accuracy across two different detectors"
)]
struct Cli {
    /// Config file (defaults to the per-user config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll training images, then evaluate test images and print a report
    Run {
        /// Directory with one subdirectory of images per person
        images: PathBuf,
        /// Where to write the enrollment database
        #[arg(short, long, default_value = "encodings.bin")]
        output: PathBuf,
    },
    /// Enroll training images and write the database only
    Enroll {
        /// Directory with one subdirectory of images per person
        images: PathBuf,
        /// Where to write the enrollment database
        #[arg(short, long, default_value = "encodings.bin")]
        output: PathBuf,
    },
    /// Show what a saved database contains
    Inspect {
        /// Database written by `run` or `enroll`
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { images, output } => run(&cfg, &images, &output),
        Commands::Enroll { images, output } => {
            let corpus = Corpus::load(&images, &cfg.convention)?;
            enroll(&cfg, &corpus, &output).map(|_| ())
        }
        Commands::Inspect { file } => inspect(&file),
    }
}

fn enroll(cfg: &Config, corpus: &Corpus, output: &Path) -> Result<Enrollment> {
    info!("Entering training phase with {} image(s).", corpus.train.len());

    let mut detector = YuNetDetector::from_file(&cfg.models.detector, cfg.enroll.clone())
        .context("Failed to initialize enrollment detector")?;
    let mut encoder = SFaceEncoder::from_file(&cfg.models.recognizer)
        .context("Failed to initialize face encoder")?;

    let enrollment = scan::enroll(
        &corpus.train,
        |p| cfg.convention.is_train(p),
        &mut detector,
        &mut encoder,
    )?;

    info!("Saving {} encoding(s) to {}", enrollment.database.len(), output.display());
    enrollment
        .database
        .save(output)
        .context("Failed to save enrollment database")?;

    Ok(enrollment)
}

fn run(cfg: &Config, images: &Path, output: &Path) -> Result<()> {
    let corpus = Corpus::load(images, &cfg.convention)?;

    let started = Instant::now();
    let enrollment = enroll(cfg, &corpus, output)?;
    let training = started.elapsed();
    info!("Training finished in {:.2} seconds.", training.as_secs_f64());

    info!("Starting recognition phase with {} image(s).", corpus.test.len());
    let started = Instant::now();

    let mut detector = CascadeDetector::from_file(&cfg.models.cascade, &cfg.evaluate)
        .context("Failed to initialize recognition detector")?;
    let mut encoder = SFaceEncoder::from_file(&cfg.models.recognizer)
        .context("Failed to initialize face encoder")?;

    let evaluated = scan::evaluate(
        &corpus.test,
        |p| cfg.convention.is_test(p),
        &enrollment,
        cfg.tolerance,
        &mut detector,
        &mut encoder,
    )?;
    let recognition = started.elapsed();
    info!("Recognition finished in {:.2} seconds.", recognition.as_secs_f64());

    let report = Report::new(
        &enrollment.tally,
        &evaluated,
        Timings {
            training,
            recognition,
        },
    )?;
    println!("{report}");
    Ok(())
}

fn inspect(file: &Path) -> Result<()> {
    let db = EnrollmentDatabase::load(file)?;
    println!("{} encoding(s) in {}", db.len(), file.display());
    for (label, count) in db.label_counts() {
        println!("{label} -> {count}");
    }
    Ok(())
}
