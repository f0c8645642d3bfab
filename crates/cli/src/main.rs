use aicc_core::backend::http::HttpBackend;
use aicc_core::backend::RecommendationBackend;
use aicc_core::config::Settings;
use aicc_core::domain::job::{JobState, JobStatus};
use aicc_core::domain::recommendation::JobId;
use aicc_core::domain::request::{AnnualFeeRange, CardType, RecommendationRequest, RewardType};
use aicc_core::domain::upload::{FileId, UploadedFile};
use aicc_core::job::{JobClient, JobSession, PollConfig};
use aicc_core::upload::UploadClient;
use aicc_core::ClientError;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;

const RETRY_HINT: &str = "Adjust your preferences and run `aicc recommend` again.";

#[derive(Debug, Parser)]
#[command(name = "aicc", about = "AI credit card recommendations from the command line")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate and upload a statement PDF, printing its file id.
    Upload { path: PathBuf },

    /// Submit preferences and wait for recommended cards.
    Recommend(RecommendArgs),

    /// Check a recommendation job by id.
    Status {
        job_id: String,

        /// Keep polling until the job completes, fails, or times out.
        #[arg(long)]
        wait: bool,
    },

    /// List past recommendations.
    History,

    /// Show one past recommendation.
    Show { id: String },
}

#[derive(Debug, clap::Args)]
struct RecommendArgs {
    /// Card network (repeatable): Any, VISA, Mastercard, "American Express", Discover.
    #[arg(long = "card-type", value_name = "TYPE")]
    card_types: Vec<CardType>,

    /// Reward category (repeatable): Any, Hotel, Flights, "Cash Back", Dining, Gas, Groceries.
    #[arg(long = "reward-type", value_name = "TYPE")]
    reward_types: Vec<RewardType>,

    /// Annual fee bucket: any, 0-100, 100-200, 200-300, 300+.
    #[arg(long, value_name = "RANGE")]
    fee_range: Option<AnnualFeeRange>,

    /// Free-text requirements passed to the recommender.
    #[arg(long)]
    notes: Option<String>,

    /// Statement PDF to analyze. Uploaded first unless --inline is given.
    #[arg(long, value_name = "PATH", conflicts_with = "file_id")]
    pdf: Option<PathBuf>,

    /// Send the PDF with the request instead of uploading it separately.
    #[arg(long, requires = "pdf")]
    inline: bool,

    /// A file id returned by an earlier `aicc upload`.
    #[arg(long, value_name = "ID")]
    file_id: Option<String>,
}

impl RecommendArgs {
    /// The request without its attachment; that needs I/O.
    fn filters(&self) -> RecommendationRequest {
        RecommendationRequest {
            card_types: self.card_types.iter().copied().collect(),
            reward_types: self.reward_types.iter().copied().collect(),
            annual_fee_range: self.fee_range.unwrap_or_default(),
            additional_requirements: self.notes.clone().unwrap_or_default(),
            attachment: None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(args, &settings).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
    }
    result
}

async fn run(args: Args, settings: &Settings) -> anyhow::Result<()> {
    let backend: Arc<dyn RecommendationBackend> = Arc::new(HttpBackend::from_settings(settings)?);
    let jobs = JobClient::new(backend.clone(), PollConfig::from_settings(settings));

    tracing::debug!(base_url = settings.api_base_url(), "using recommendation backend");

    match args.command {
        Command::Upload { path } => {
            let mut file = read_statement(&path).await?;
            let file_id = UploadClient::new(backend)
                .upload(&mut file)
                .await
                .context("statement upload failed")?;
            println!("{file_id}");
        }
        Command::Recommend(args) => recommend(args, backend, jobs).await?,
        Command::Status { job_id, wait } => status(&jobs, JobId::new(job_id), wait).await?,
        Command::History => {
            let entries = jobs
                .history()
                .await
                .context("fetch recommendation history")?;
            print!("{}", render::history(&entries));
        }
        Command::Show { id } => {
            let payload = jobs
                .recommendation(&id)
                .await
                .with_context(|| format!("fetch recommendation {id}"))?;
            print!("{}", render::recommendation(&payload));
        }
    }
    Ok(())
}

async fn read_statement(path: &Path) -> anyhow::Result<UploadedFile> {
    UploadedFile::from_path(path)
        .await
        .with_context(|| format!("read {}", path.display()))
}

async fn recommend(
    args: RecommendArgs,
    backend: Arc<dyn RecommendationBackend>,
    jobs: JobClient,
) -> anyhow::Result<()> {
    let mut request = args.filters();

    if let Some(path) = &args.pdf {
        let mut file = read_statement(path).await?;
        if args.inline {
            request = request.with_statement(file);
        } else {
            let file_id = UploadClient::new(backend)
                .upload(&mut file)
                .await
                .context("statement upload failed")?;
            eprintln!("uploaded {} as {file_id}", file.name);
            request = request.with_file_id(file_id);
        }
    } else if let Some(id) = &args.file_id {
        request = request.with_file_id(FileId::new(id.as_str()));
    }

    let deadline = jobs.poll_config().deadline;
    let mut session = JobSession::new(jobs);
    let progress = tokio::spawn(report_progress(session.subscribe(), std::io::stderr()));

    session
        .start(&request)
        .await
        .context("recommendation request was not accepted")?;

    let settled = tokio::select! {
        state = session.settled() => Some(state),
        res = tokio::signal::ctrl_c() => {
            res.context("listen for ctrl-c")?;
            None
        }
    };

    // Closing the channel ends the progress task once it has drained.
    drop(session);
    if let Err(err) = progress.await {
        tracing::warn!(error = %err, "progress reporter stopped unexpectedly");
    }

    let Some(state) = settled else {
        eprintln!("cancelled; no further status checks were made");
        return Ok(());
    };

    match state {
        JobState::Completed(payload) | JobState::ImmediateResult(payload) => {
            print!("{}", render::recommendation(&payload));
            Ok(())
        }
        JobState::Failed { message } => {
            eprintln!("{RETRY_HINT}");
            Err(ClientError::JobFailed(message).into())
        }
        JobState::TimedOut => {
            eprintln!("{RETRY_HINT}");
            Err(ClientError::Timeout { elapsed: deadline }.into())
        }
        other => anyhow::bail!("recommendation ended in unexpected state: {}", other.label()),
    }
}

/// Writes one line per observed transition until the session goes away.
async fn report_progress<W: Write>(mut rx: watch::Receiver<JobState>, mut out: W) -> W {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        let line = render::progress(&state);
        tracing::debug!(state = state.label(), "{line}");
        if let Err(err) = writeln!(out, "{line}") {
            tracing::debug!(error = %err, "could not write progress line");
        }
    }
    out
}

async fn status(jobs: &JobClient, job_id: JobId, wait: bool) -> anyhow::Result<()> {
    if !wait {
        let status = jobs
            .check_status(&job_id)
            .await
            .with_context(|| format!("check status of job {job_id}"))?;
        match status {
            JobStatus::Processing => println!("{job_id}: processing"),
            JobStatus::Completed(payload) => print!("{}", render::recommendation(&payload)),
            JobStatus::Failed(message) => println!("{job_id}: failed: {message}"),
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let report = jobs.poll_until_settled(&job_id, &cancel).await;
    interrupt.abort();

    let Some(report) = report else {
        eprintln!("cancelled; no further status checks were made");
        return Ok(());
    };

    tracing::info!(
        %job_id,
        attempts = report.attempts,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "job settled"
    );
    let payload = report.into_result()?;
    print!("{}", render::recommendation(&payload));
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
