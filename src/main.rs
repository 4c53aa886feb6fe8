//! HazardDrill command line
//!
//! Offline tools over stored annotation data and score records.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hazard_drill::config::{self, AppConfig};
use hazard_drill::judge::run::anonymous_user_name;
use hazard_drill::judge::{Advance, ClickOutcome, ExamRun};
use hazard_drill::scoring::{allocate, check_allocation, AllocationPolicy, Case, ExamSlide};
use hazard_drill::storage::{self, JsonLinesRecorder, NullRecorder, ScoreRecorder};
use hazard_drill::RatioPoint;

/// HazardDrill - hazard-spotting trainer tools
#[derive(Parser, Debug)]
#[command(name = "hazard-drill")]
#[command(about = "Score allocation, click replay and leaderboard for hazard-spotting exams")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print advertised per-case scores for a list of image metadata files
    Allocate {
        /// Total exam score (defaults to the configured total)
        #[arg(short, long)]
        total: Option<u32>,

        /// Allocation policy: weighted or average
        #[arg(short, long)]
        policy: Option<AllocationPolicy>,

        /// Image metadata files, in exam order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Replay clicks against one image's regions
    Replay {
        /// Image metadata file
        meta: PathBuf,

        /// Click positions in ratio space as "x,y", in order
        #[arg(long, num_args = 1.., value_parser = parse_point)]
        clicks: Vec<RatioPoint>,

        /// Trainee name
        #[arg(long)]
        user: Option<String>,

        /// Exam id for the score record
        #[arg(long, default_value = "")]
        exam: String,

        /// Append the score record to the records file
        #[arg(long)]
        record: bool,
    },
    /// Show the best recorded scores
    Leaderboard {
        /// Only show records for this exam
        #[arg(long)]
        exam: Option<String>,

        #[arg(long, default_value_t = storage::LEADERBOARD_LIMIT)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = load_or_create_config(args.config.as_deref())?;

    match args.command {
        Command::Allocate { total, policy, files } => run_allocate(&config, total, policy, &files),
        Command::Replay {
            meta,
            clicks,
            user,
            exam,
            record,
        } => run_replay(&config, &meta, &clicks, user, exam, record),
        Command::Leaderboard { exam, limit } => run_leaderboard(&config, exam.as_deref(), limit),
    }
}

/// Load configuration from an explicit path, the default file, or defaults
fn load_or_create_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        let config = config::load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }
    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return Ok(config);
            }
        }
    }
    info!("Using default configuration");
    Ok(AppConfig::default())
}

fn parse_point(value: &str) -> Result<RatioPoint, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got {:?}", value))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in {:?}: {}", value, e))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in {:?}: {}", value, e))?;
    if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
        return Err(format!("click {:?} is outside the image (0.0-1.0)", value));
    }
    Ok(RatioPoint::new(x, y))
}

fn run_allocate(config: &AppConfig, total: Option<u32>, policy: Option<AllocationPolicy>, files: &[PathBuf]) -> Result<()> {
    let total = total.unwrap_or(config.scoring.total_score);
    let policy = policy.unwrap_or(config.scoring.policy);

    let mut cases = Vec::with_capacity(files.len());
    for path in files {
        let meta = storage::load_meta(path)?;
        cases.push(Case::from_regions(&meta.items));
    }

    if let Err(e) = check_allocation(&cases, policy) {
        tracing::warn!("{}; every case will score 0", e);
    }
    let scores = allocate(&cases, total, policy);

    println!("Allocating {} points ({})", total, policy);
    for ((path, case), score) in files.iter().zip(&cases).zip(&scores) {
        println!(
            "  {:>5}  {} ({} hazards, weight {})",
            score,
            path.display(),
            case.point_count,
            case.weight
        );
    }
    Ok(())
}

fn run_replay(
    config: &AppConfig,
    meta_path: &Path,
    clicks: &[RatioPoint],
    user: Option<String>,
    exam: String,
    record: bool,
) -> Result<()> {
    let meta = storage::load_meta(meta_path)?;
    let image_name = meta_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let recorder: Arc<dyn ScoreRecorder> = if record {
        let data_dir = storage::resolve_data_dir(&config.storage)?;
        Arc::new(JsonLinesRecorder::open(storage::records_path(&data_dir)))
    } else {
        Arc::new(NullRecorder)
    };

    let user = user.unwrap_or_else(anonymous_user_name);
    let slide = ExamSlide::new(image_name, meta.items);
    let mut run = ExamRun::start(exam, user, vec![slide], config.judge.clone(), recorder)
        .context("Failed to start replay")?;

    println!(
        "Replaying {} clicks against {} hazards",
        clicks.len(),
        run.session().regions().len()
    );
    for (n, &point) in clicks.iter().enumerate() {
        let now = Instant::now();
        let outcome = run.click_at(point, now);
        let description = match &outcome {
            ClickOutcome::Hit { region_id, awarded, .. } => {
                let number = run.session().regions().display_number(region_id).unwrap_or(0);
                format!("hit #{} {} (+{})", number, region_id, awarded)
            }
            ClickOutcome::AlreadyFound { region_id } => format!("already found {}", region_id),
            ClickOutcome::Miss { miss_count, surrendered } => {
                let tail = if *surrendered { ", surrendered" } else { "" };
                format!("miss {}/{}{}", miss_count, run.session().max_misses(), tail)
            }
            ClickOutcome::Ignored => "ignored".to_string(),
        };
        println!("  {:>3}. ({:.3}, {:.3}) {}", n + 1, point.x, point.y, description);

        // Let the completion delay elapse instead of sleeping through it
        if let ClickOutcome::Hit { completion: Some(completion), .. } = outcome {
            println!("       all found, completing in {} ms", completion.remaining(now).as_millis());
            run.poll(completion.due_at);
        }
    }

    let session = run.session();
    println!(
        "Found {}/{}, misses {}, slide score {}, phase {:?}",
        session.found().len(),
        session.regions().len(),
        session.miss_count(),
        session.score(),
        session.phase()
    );

    if !session.phase().is_terminal() {
        println!("Slide still in progress; no score recorded");
        return Ok(());
    }
    match run.advance()? {
        Advance::Finished(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Advance::NextSlide { .. } => bail!("replay has a single slide"),
    }
}

fn run_leaderboard(config: &AppConfig, exam: Option<&str>, limit: usize) -> Result<()> {
    let data_dir = storage::resolve_data_dir(&config.storage)?;
    let records = storage::load_records(&storage::records_path(&data_dir))?;
    let board = storage::leaderboard(&records, exam, limit);

    if board.is_empty() {
        println!("No scores recorded yet");
        return Ok(());
    }
    for (rank, record) in board.iter().enumerate() {
        println!("#{:<3} {:>6}  {}  ({})", rank + 1, record.score, record.user_name, record.exam_id);
    }
    Ok(())
}
