//! Twice-daily digest scheduling.
//!
//! The scheduler wakes every `interval`, looks at the local wall clock and
//! sends whichever editions are due:
//!
//! ```text
//!             morning threshold            evening threshold
//!   00:00 ───────────┼──────────────────────────┼─────────── 24:00
//!        nothing due │ morning due (once)       │ evening due (once)
//! ```
//!
//! [`SchedulerState`] holds the two "sent today" flags. They are cleared the
//! first time a tick lands on a later calendar date than the previous tick,
//! before that tick's thresholds are checked. Timing is coarse on purpose: a
//! tick only has to notice that a threshold has been crossed.
//!
//! # Sending
//!
//! For each recipient the edition's services run one at a time in configured
//! order. Items that come back as "no content" are left out. A delivery
//! failure is logged and the scheduler moves on to the next recipient; an
//! edition is marked sent after one attempt at every recipient.

use crate::http::HttpClient;
use crate::mailer::{Mailer, SUBJECT};
use crate::models::{Content, Edition, Recipient};
use crate::services::{ContentService, ServiceKind};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Time-of-day thresholds for the two editions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub morning: NaiveTime,
    pub evening: NaiveTime,
}

impl Schedule {
    pub fn new(morning: NaiveTime, evening: NaiveTime) -> Self {
        Self { morning, evening }
    }

    /// The moment on `date` after which `edition` is due.
    pub fn threshold(&self, edition: Edition, date: NaiveDate) -> NaiveDateTime {
        match edition {
            Edition::Morning => date.and_time(self.morning),
            Edition::Evening => date.and_time(self.evening),
        }
    }
}

impl Default for Schedule {
    /// 09:30 and 17:30.
    fn default() -> Self {
        Self {
            morning: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            evening: NaiveTime::from_hms_opt(17, 30, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// What a single observation of the clock found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The calendar date advanced since the previous observation.
    pub rolled_over: bool,
    /// Editions whose threshold has passed and that were not yet sent today.
    pub due: Vec<Edition>,
}

/// Per-day sent flags plus the time of the last tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerState {
    morning_sent: bool,
    evening_sent: bool,
    last_observed: NaiveDateTime,
}

impl SchedulerState {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            morning_sent: false,
            evening_sent: false,
            last_observed: now,
        }
    }

    /// Record a tick at `now` and report which editions are due.
    ///
    /// Does not mark anything as sent; see [`SchedulerState::mark_sent`].
    pub fn observe(&mut self, now: NaiveDateTime, schedule: &Schedule) -> Observation {
        let rolled_over = now.date() > self.last_observed.date();
        if rolled_over {
            self.morning_sent = false;
            self.evening_sent = false;
        }
        self.last_observed = now;

        let due = [Edition::Morning, Edition::Evening]
            .into_iter()
            .filter(|&edition| {
                !self.is_sent(edition) && now > schedule.threshold(edition, now.date())
            })
            .collect();

        Observation { rolled_over, due }
    }

    /// Whether `edition` has already gone out today.
    pub fn is_sent(&self, edition: Edition) -> bool {
        match edition {
            Edition::Morning => self.morning_sent,
            Edition::Evening => self.evening_sent,
        }
    }

    /// Record that `edition` went out. Cleared again by the next rollover.
    pub fn mark_sent(&mut self, edition: Edition) {
        match edition {
            Edition::Morning => self.morning_sent = true,
            Edition::Evening => self.evening_sent = true,
        }
    }

    /// `true` once both editions have gone out today.
    pub fn all_sent(&self) -> bool {
        self.morning_sent && self.evening_sent
    }
}

/// Outcome of sending one edition to every recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Mail handed to the transport successfully.
    pub delivered: usize,
    /// Nothing to send (every service came back empty, or none configured).
    pub skipped: usize,
    /// The transport returned an error.
    pub failed: usize,
}

/// Run each service in order and keep the results that produced content.
///
/// A service listed more than once is only fetched the first time. Image
/// services share one file per service, so a repeated fetch would overwrite
/// (or, on failure, delete) the picture an earlier item already points at.
///
/// # Arguments
///
/// * `services` - The edition's services in configured order
/// * `http` - Client used for every request
///
/// # Returns
///
/// The digest items, in the order their services were listed.
#[instrument(level = "info", skip_all, fields(services = services.len()))]
pub async fn collect_digest(services: &[&ContentService], http: &impl HttpClient) -> Vec<Content> {
    let mut parts = Vec::with_capacity(services.len());
    let mut seen: Vec<&str> = Vec::with_capacity(services.len());
    for service in services {
        if seen.contains(&service.name()) {
            warn!(service = service.name(), "Service listed twice; skipping repeat");
            continue;
        }
        seen.push(service.name());

        match service.fetch(http).await {
            Some(content) => parts.push(content),
            None => debug!(service = service.name(), "Omitting service from digest"),
        }
    }
    parts
}

/// Drives the morning/evening digests for a fixed recipient list.
pub struct DigestScheduler<'r, H, M> {
    recipients: Vec<Recipient<'r>>,
    http: H,
    mailer: M,
    schedule: Schedule,
    state: SchedulerState,
}

impl<'r, H, M> DigestScheduler<'r, H, M>
where
    H: HttpClient,
    M: Mailer,
{
    pub fn new(
        recipients: Vec<Recipient<'r>>,
        http: H,
        mailer: M,
        schedule: Schedule,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            recipients,
            http,
            mailer,
            schedule,
            state: SchedulerState::new(now),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    #[cfg(test)]
    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    /// Evaluate the clock once and send whatever is due.
    ///
    /// Returns the editions sent during this tick.
    pub async fn tick(&mut self, now: NaiveDateTime) -> Vec<Edition> {
        let observation = self.state.observe(now, &self.schedule);
        if observation.rolled_over {
            info!(date = %now.date(), "New day; resetting sent flags");
        }

        for edition in [Edition::Morning, Edition::Evening] {
            if self.state.is_sent(edition) {
                continue;
            }
            let threshold = self.schedule.threshold(edition, now.date());
            info!(
                "Comparing to {} time - current: ({}); {}: ({}) - {}",
                edition.label(),
                now.format("%H:%M:%S"),
                edition.label().to_lowercase(),
                threshold.format("%H:%M:%S"),
                now > threshold
            );
        }

        for &edition in &observation.due {
            let report = self.send_edition(edition).await;
            self.state.mark_sent(edition);
            info!(
                %edition,
                delivered = report.delivered,
                skipped = report.skipped,
                failed = report.failed,
                "Finished {} digest",
                edition.label()
            );
        }

        if self.state.all_sent() {
            info!("Both AM and PM sent for the day. Doing nothing");
        }

        observation.due
    }

    /// Send `edition` to every recipient, one after another.
    #[instrument(level = "info", skip(self), fields(recipients = self.recipients.len()))]
    pub async fn send_edition(&self, edition: Edition) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for recipient in &self.recipients {
            let services = recipient.services(edition);
            let parts = collect_digest(services, &self.http).await;

            if parts.is_empty() {
                warn!(
                    recipient = %recipient.name,
                    configured = services.len(),
                    "No content for {} digest; not sending",
                    edition.label()
                );
                report.skipped += 1;
            } else {
                match self.mailer.send(&recipient.email, SUBJECT, &parts).await {
                    Ok(()) => {
                        info!(
                            "Sent {} Messages to {} ({})",
                            edition.label(),
                            recipient.name,
                            recipient.email
                        );
                        report.delivered += 1;
                    }
                    Err(e) => {
                        error!(
                            recipient = %recipient.name,
                            email = %recipient.email,
                            error = %e,
                            "Failed to send {} digest",
                            edition.label()
                        );
                        report.failed += 1;
                    }
                }
            }

            cleanup_images(services);
        }

        report
    }

    /// Tick forever against the local clock, sleeping `interval` between ticks.
    pub async fn run(&mut self, interval: Duration) -> ! {
        loop {
            self.tick(Local::now().naive_local()).await;
            info!(secs = interval.as_secs(), "Sleeping");
            sleep(interval).await;
            info!("Waking up from sleep");
        }
    }
}

fn cleanup_images(services: &[&ContentService]) {
    for service in services {
        if matches!(service.kind(), ServiceKind::Image { .. }) {
            if let Err(e) = service.cleanup() {
                warn!(service = service.name(), error = %e, "Image cleanup failed");
            }
        }
    }
}
