use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use futures_util::StreamExt;
use futures_util::stream;
use packet_db::Database;
use packet_types::models::User;
use tracing::{error, info, warn};

use crate::error::{GrantError, NotifyError};
use crate::grant::RewardGrantService;
use crate::notify::{Notifier, PacketNotice};

/// 09:00 UTC every day (sec min hour dom month dow).
pub const DEFAULT_SCHEDULE: &str = "0 0 9 * * *";

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound for each of a user's grant and notification steps.
    pub per_user_timeout: Duration,
    /// Users processed at once.
    pub concurrency: usize,
    /// When set, users granted more recently than this are skipped.
    /// `None` keeps `last_reward_at` purely informational.
    pub min_grant_interval: Option<chrono::Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            per_user_timeout: Duration::from_secs(30),
            concurrency: 8,
            min_grant_interval: None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Size of the user snapshot.
    pub users: usize,
    pub granted: usize,
    pub failed: usize,
    /// Grants that persisted but whose notice could not be delivered.
    pub notify_failed: usize,
    pub skipped_recent: usize,
    /// The trigger fired while another run was still in progress.
    pub skipped: bool,
}

enum UserResult {
    Granted { notified: bool },
    Failed,
    SkippedRecent,
}

/// Grants one reward to every user per run. Runs never overlap: a trigger that
/// arrives while a run is active is skipped.
pub struct DailyGrantScheduler {
    db: Arc<Database>,
    grants: RewardGrantService,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    running: AtomicBool,
}

/// Clears the running flag when a run ends, including on panic.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DailyGrantScheduler {
    pub fn new(
        db: Arc<Database>,
        grants: RewardGrantService,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            db,
            grants,
            notifier,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// One batch over a snapshot of all users. Only a failure to take the
    /// snapshot is an error; per-user failures are counted in the report.
    pub async fn run_once(&self) -> Result<RunReport, GrantError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Daily grant run already in progress, skipping trigger");
            return Ok(RunReport {
                skipped: true,
                ..RunReport::default()
            });
        }
        let _guard = RunGuard(&self.running);

        let db = self.db.clone();
        let users = tokio::task::spawn_blocking(move || db.list_users()).await??;
        info!("Sending daily packets to {} users", users.len());

        let mut report = RunReport {
            users: users.len(),
            ..RunReport::default()
        };

        let mut results = stream::iter(users)
            .map(|user| self.process_user(user))
            .buffer_unordered(self.config.concurrency.max(1));

        while let Some(result) = results.next().await {
            match result {
                UserResult::Granted { notified } => {
                    report.granted += 1;
                    if !notified {
                        report.notify_failed += 1;
                    }
                }
                UserResult::Failed => report.failed += 1,
                UserResult::SkippedRecent => report.skipped_recent += 1,
            }
        }

        info!(
            granted = report.granted,
            failed = report.failed,
            notify_failed = report.notify_failed,
            skipped_recent = report.skipped_recent,
            "Daily packets done"
        );
        Ok(report)
    }

    async fn process_user(&self, user: User) -> UserResult {
        if let (Some(interval), Some(last)) = (self.config.min_grant_interval, user.last_reward_at) {
            if Utc::now() - last < interval {
                return UserResult::SkippedRecent;
            }
        }

        // The grant is awaited to completion; its deadline is checked before
        // anything is written, so the report always matches the ledger.
        let timeout = self.config.per_user_timeout;
        let outcome = match self.grants.grant_within(user.id.clone(), timeout).await {
            Ok(outcome) => outcome,
            Err(GrantError::UnknownUser(id)) => {
                warn!(user_id = %id, "User vanished before grant, skipping");
                return UserResult::Failed;
            }
            Err(e) => {
                error!(user_id = %user.id, "Daily grant failed: {}", e);
                return UserResult::Failed;
            }
        };

        let notice = PacketNotice::from(&outcome);
        let sent = match tokio::time::timeout(timeout, self.notifier.notify(&notice)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout),
        };
        if let Err(e) = &sent {
            warn!(email = %notice.email, "Email error: {}", e);
        }

        UserResult::Granted {
            notified: sent.is_ok(),
        }
    }

    /// Fire [`Self::run_once`] at each upcoming time of `schedule`, forever.
    pub async fn run_forever(self: Arc<Self>, schedule: Schedule) {
        info!("Daily grant scheduler started");
        let mut after = Utc::now();
        loop {
            let Some(next) = schedule.after(&after).next() else {
                warn!("Schedule has no upcoming fire time, scheduler stopping");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            info!("Next daily packet run at {}", next);
            tokio::time::sleep(wait).await;

            // Spawned so an overlapping trigger finds the flag still set.
            let scheduler = self.clone();
            tokio::spawn(async move {
                if let Err(e) = scheduler.run_once().await {
                    error!("Failed to fetch users: {}", e);
                }
            });

            // A missed fire time (e.g. after suspend) is not replayed.
            after = next.max(Utc::now());
        }
    }
}

pub fn parse_schedule(expr: &str) -> Result<Schedule, cron::error::Error> {
    Schedule::from_str(expr)
}
