use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use handshake_autoapply::config::AppConfig;
use handshake_autoapply::error::AppError;
use handshake_autoapply::telemetry;
use handshake_autoapply::workflows::autoapply::{
    extract_from_dir, read_identifier_list, write_identifier_list, AutoApplyService,
    ClientSettings, CsvApplicationLog, DecisionEngine, FileStateStore, HandshakeClient, JobSource,
    RunOutcome, RunSummary,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "handshake-autoapply",
    about = "Apply to new Handshake postings with a saved browser session",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay deferred jobs and apply to new postings (default command)
    Run(RunArgs),
    /// Collect job ids from saved search pages into a CSV
    Extract(ExtractArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Apply to the ids in this `job_id` CSV instead of paging the search
    #[arg(long, conflicts_with = "html_dir")]
    ids_file: Option<PathBuf>,
    /// Apply to the ids found in saved `.html` pages in this folder
    #[arg(long)]
    html_dir: Option<PathBuf>,
    /// Profile file to use instead of APP_CONFIG_FILE
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Folder holding saved search result pages
    #[arg(long)]
    html_dir: PathBuf,
    /// Where to write the `job_id` CSV
    #[arg(long, default_value = "new_jobs.csv")]
    output: PathBuf,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => run_applications(args),
        Command::Extract(args) => run_extract(args),
    }
}

fn run_applications(args: RunArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(profile) = args.config {
        config.files.profile = profile;
    }
    telemetry::init(&config.telemetry)?;

    let store = FileStateStore::new(&config.files.profile, &config.files.deferred);
    let profile = store.read_profile()?.validate()?;

    let source = if let Some(path) = args.ids_file {
        JobSource::Identifiers(read_identifier_list(path)?)
    } else if let Some(dir) = args.html_dir {
        JobSource::Identifiers(extract_from_dir(dir)?.job_ids)
    } else {
        JobSource::Listings {
            per_page: profile.per_page,
        }
    };

    let settings = ClientSettings {
        base_url: config.platform.base_url.clone(),
        user_agent: config.platform.user_agent.clone(),
        timeout: config.platform.request_timeout,
        listing_source: profile.listing_source,
        search_url: profile.search_url.clone(),
    };
    let mut client = HandshakeClient::new(&settings, &profile.state.cookies)?;

    info!(
        environment = ?config.environment,
        profile = %config.files.profile.display(),
        "starting run"
    );
    let engine = DecisionEngine::new(
        profile.evaluation,
        profile.documents,
        Utc::now().naive_utc(),
    );
    let service = AutoApplyService::new(
        store,
        CsvApplicationLog::new(&config.files.applications),
        engine,
    );

    let summary = service.run(&mut client, source)?;
    render_summary(&summary, &config.files.applications.display().to_string());
    summary.ensure_session_valid()?;
    Ok(())
}

fn run_extract(args: ExtractArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let extraction = extract_from_dir(&args.html_dir)?;
    for file in &extraction.files {
        println!("- {}: {} job id(s)", file.file_name, file.job_count);
    }
    write_identifier_list(&args.output, &extraction.job_ids)?;
    println!(
        "Wrote {} unique job id(s) from {} page(s) to {}",
        extraction.job_ids.len(),
        extraction.files.len(),
        args.output.display()
    );
    Ok(())
}

fn render_summary(summary: &RunSummary, log_path: &str) {
    println!();
    match summary.outcome {
        RunOutcome::Completed => println!("Run completed"),
        RunOutcome::SessionInvalid => {
            println!("Session cookies are no longer valid.");
            println!("Copy fresh cookies from the browser into the profile and set \"valid\" to true.");
        }
        RunOutcome::ListingInterrupted => {
            println!("Listing fetch was interrupted; the next run resumes from the same point.")
        }
    }
    if let Some(failure) = &summary.failure {
        println!("Stopped by: {failure}");
    }

    println!("Jobs checked: {}", summary.checked);
    println!("Filtered by keywords: {}", summary.filtered);
    println!("Applied: {}", summary.applied);
    println!("Deferred: {}", summary.deferred);
    println!(
        "Skipped: {} ({} may succeed on a later run)",
        summary.skipped, summary.retryable
    );
    for (reason, count) in &summary.skip_reasons {
        println!("  - {reason}: {count}");
    }
    if summary.applied > 0 {
        println!("Applications recorded in {log_path}");
    }
    if !summary.unlogged.is_empty() {
        println!("Submitted but missing from {log_path}:");
        for id in &summary.unlogged {
            println!("  - {id}");
        }
    }
}
