use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use interview_report::pipeline::{CallerState, ReportPipeline};
use interview_report::report::{HttpReportClient, ReportSource};
use interview_report::{ReportConfig, ReportError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "interview-report")]
#[command(about = "Wait for an interview call to end and fetch its assessment report")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Bearer token (or set REPORT_AUTH_TOKEN env var)
    #[arg(long, global = true)]
    token: Option<String>,

    /// How long to wait for the call to end, in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Delay between status checks, in milliseconds
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the id of the ended call
    Resolve {
        #[command(flatten)]
        call: CallArgs,
    },
    /// Resolve the ended call and print its report
    Fetch {
        #[command(flatten)]
        call: CallArgs,

        /// Resume the report belongs to
        #[arg(long)]
        resume_id: String,

        /// Print raw JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the stored report for a resume
    ResumeReport {
        #[arg(long)]
        resume_id: String,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct CallArgs {
    /// Assistant that ran the interview
    #[arg(long)]
    assistant_id: String,

    /// Call started by this session, if known
    #[arg(long)]
    call_id: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ReportError>() {
            Some(report_error) => {
                error!("{}", report_error);
                eprintln!("{}", report_error.user_message());
            }
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ReportConfig::from_env()?;
    if let Some(token) = cli.token {
        config.auth_token = token;
    }
    let timeout = cli.timeout_ms.map(Duration::from_millis).unwrap_or(config.timeout);
    let poll_interval = cli.poll_interval_ms.map(Duration::from_millis).unwrap_or(config.poll_interval);
    let config = config.with_timings(timeout, poll_interval);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Command::Resolve { call } => {
            let pipeline = ReportPipeline::from_config(config);
            let caller = CallerState {
                assistant_id: Some(call.assistant_id),
                resume_id: None,
                call_id: call.call_id,
            };
            let request = pipeline.resolution_request(&caller)?;
            let resolution = pipeline.resolver().resolve(&request, &cancel).await?;
            println!("{}", resolution.call_id);
        }
        Command::Fetch { call, resume_id, json } => {
            let pipeline = ReportPipeline::from_config(config);
            let caller = CallerState {
                assistant_id: Some(call.assistant_id),
                resume_id: Some(resume_id),
                call_id: call.call_id,
            };
            let resolved = pipeline.run(&caller, &cancel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resolved).map_err(ReportError::from)?);
            } else {
                println!("\n=== Interview Report (call {}) ===", resolved.call_id);
                println!("{}", resolved.report);
            }
        }
        Command::ResumeReport { resume_id, json } => {
            let client = HttpReportClient::new(config.report_base_url.clone());
            let report = client.fetch_resume_report(&resume_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report).map_err(ReportError::from)?);
            } else {
                println!("\n=== Interview Report ===");
                println!("{}", report);
            }
        }
    }

    Ok(())
}
