//! # Awful Digest
//!
//! Fetches short facts and pictures from a handful of public web APIs and
//! emails them to a list of recipients twice a day.
//!
//! ## Usage
//!
//! ```sh
//! awful_digest --creds creds.yaml --targets targets.yaml
//! ```
//!
//! ## Architecture
//!
//! 1. **Startup**: load credentials and recipients; every configured service
//!    name is resolved against the [`ServiceRegistry`] up front
//! 2. **Tick**: every few minutes compare the local time against the morning
//!    and evening thresholds
//! 3. **Digest**: for each recipient run the edition's services in order and
//!    collect whatever came back
//! 4. **Delivery**: mail the digest, then remove any downloaded images

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod http;
mod mailer;
mod models;
mod scheduler;
mod services;
mod utils;

use cli::Cli;
use http::{HttpClient, ReqwestClient};
use mailer::{ConsoleMailer, Mailer, SmtpMailer};
use models::Recipient;
use scheduler::{DigestScheduler, Schedule};
use services::ServiceRegistry;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_timer(ChronoLocal::new("%H:%M:%S, %m/%d/%y".to_string()))
        .init();

    let args = Cli::parse();

    let registry = ServiceRegistry::builtin(&args.res_dir);
    if args.list_services {
        for name in registry.names() {
            let service = registry.get(name).map(|s| s.url()).unwrap_or_default();
            println!("{name}\t{service}");
        }
        return Ok(());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting autosender @ {}",
        Local::now().format("%H:%M:%S, %m/%d/%y")
    );

    if let Err(e) = ensure_writable_dir(&args.res_dir).await {
        error!(path = %args.res_dir.display(), error = %e, "Resource directory is not writable");
        return Err(e);
    }

    let creds = config::load_credentials(&args.creds).map_err(|e| {
        error!(error = %e, "Could not load credentials");
        e
    })?;
    info!("Successfully got creds");

    let recipients = config::load_recipients(&args.targets, &registry).map_err(|e| {
        error!(error = %e, "Could not load recipients");
        e
    })?;
    info!(
        count = recipients.len(),
        services = registry.len(),
        "Successfully got targets"
    );

    let http = ReqwestClient::new()?;
    let schedule = Schedule::new(args.morning, args.evening);

    if args.dry_run {
        info!("Dry run: digests will be logged, not mailed");
        drive(&args, recipients, http, ConsoleMailer, schedule).await
    } else {
        let mailer = SmtpMailer::new(&creds)?;
        drive(&args, recipients, http, mailer, schedule).await
    }
}

/// Either send a single edition now, or run the scheduler forever.
async fn drive<H: HttpClient, M: Mailer>(
    args: &Cli,
    recipients: Vec<Recipient<'_>>,
    http: H,
    mailer: M,
    schedule: Schedule,
) -> Result<(), Box<dyn Error>> {
    let mut scheduler =
        DigestScheduler::new(recipients, http, mailer, schedule, Local::now().naive_local());

    match args.send_now {
        Some(edition) => {
            let report = scheduler.send_edition(edition).await;
            info!(
                %edition,
                delivered = report.delivered,
                skipped = report.skipped,
                failed = report.failed,
                "One-shot send complete"
            );
            if report.failed > 0 {
                return Err(format!("{} {} digest(s) failed to send", report.failed, edition).into());
            }
            Ok(())
        }
        None => {
            info!(
                morning = %schedule.morning,
                evening = %schedule.evening,
                interval_secs = args.interval_secs,
                "Entering scheduler loop"
            );
            scheduler.run(Duration::from_secs(args.interval_secs)).await
        }
    }
}
