//! Command-line interface definitions for Awful Digest.
//!
//! Every option has a default, so running the binary with no arguments reads
//! `creds.yaml` and `targets.yaml` from the working directory and sends the
//! morning digest after 09:30 and the evening digest after 17:30.

use crate::models::Edition;
use crate::utils::parse_time_of_day;
use chrono::NaiveTime;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Awful Digest application.
///
/// # Examples
///
/// ```sh
/// # Long-running scheduler with the default files and times
/// awful_digest
///
/// # Log digests instead of mailing them
/// awful_digest --dry-run
///
/// # Send the evening digest right now and exit
/// awful_digest --send-now evening
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the credentials file (email + password)
    #[arg(long, default_value = "creds.yaml")]
    pub creds: PathBuf,

    /// Path to the recipients file
    #[arg(short, long, default_value = "targets.yaml")]
    pub targets: PathBuf,

    /// Directory image services download into
    #[arg(short, long, default_value = "res")]
    pub res_dir: PathBuf,

    /// Time of day after which the morning digest is sent (HH:MM)
    #[arg(long, default_value = "09:30", value_parser = parse_time_of_day)]
    pub morning: NaiveTime,

    /// Time of day after which the evening digest is sent (HH:MM)
    #[arg(long, default_value = "17:30", value_parser = parse_time_of_day)]
    pub evening: NaiveTime,

    /// Seconds to sleep between scheduler ticks
    #[arg(long, default_value_t = 300)]
    pub interval_secs: u64,

    /// Log digests instead of sending mail
    #[arg(long)]
    pub dry_run: bool,

    /// Send one edition (morning or evening) to everyone now, then exit
    #[arg(long)]
    pub send_now: Option<Edition>,

    /// Print the names of the available services and exit
    #[arg(long)]
    pub list_services: bool,
}
