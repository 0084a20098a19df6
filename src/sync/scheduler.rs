use super::engine::StockSyncEngine;
use crate::core::config::ScheduleConfig;
use crate::core::{Clock, SystemClock};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Calendar trigger: a fixed local time of day, optionally weekdays only.
#[derive(Debug, Clone)]
pub struct Schedule {
    timezone: Tz,
    time: NaiveTime,
    weekdays_only: bool,
}

impl Schedule {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let timezone: Tz = config
            .timezone
            .parse()
            .map_err(|e| anyhow!("Invalid schedule timezone '{}': {}", config.timezone, e))?;
        let time = NaiveTime::from_hms_opt(config.hour, config.minute, 0).with_context(|| {
            format!(
                "Invalid schedule time {:02}:{:02}",
                config.hour, config.minute
            )
        })?;
        Ok(Self {
            timezone,
            time,
            weekdays_only: config.weekdays_only,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First fire time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.with_timezone(&self.timezone).date_naive();
        // A full week always contains a weekday.
        today
            .iter_days()
            .take(8)
            .filter(|date| !self.weekdays_only || is_weekday(date.weekday()))
            .filter_map(|date| {
                self.timezone
                    .from_local_datetime(&date.and_time(self.time))
                    .earliest()
            })
            .map(|local| local.with_timezone(&Utc))
            .find(|fire_at| *fire_at > now)
    }
}

fn is_weekday(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Runs sync cycles on a [`Schedule`], one at a time.
///
/// The next fire time is computed only after a cycle finishes, so a trigger
/// that falls inside a running cycle is skipped rather than overlapped.
pub struct Scheduler {
    engine: Arc<StockSyncEngine>,
    schedule: Schedule,
    run_on_start: bool,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(engine: Arc<StockSyncEngine>, schedule: Schedule, run_on_start: bool) -> Self {
        Self {
            engine,
            schedule,
            run_on_start,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Loops until `shutdown` resolves. A cycle already running is allowed to finish.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if self.run_on_start {
            info!("Running initial stock sync");
            self.run_cycle().await;
        }

        loop {
            let now = self.clock.now();
            let next = self
                .schedule
                .next_after(now)
                .context("Schedule produced no upcoming fire time")?;
            let wait = (next - now).to_std().unwrap_or_default();
            info!(
                next_run = %next.with_timezone(&self.schedule.timezone()),
                "Next stock sync scheduled"
            );

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {
                    self.run_cycle().await;
                }
            }
        }
    }

    async fn run_cycle(&self) {
        match self.engine.refresh_all().await {
            Ok(report) if report.is_clean() => {}
            Ok(report) => {
                let failed: Vec<&str> = report.failures.iter().map(|f| f.symbol.as_str()).collect();
                warn!(?failed, "Stock sync cycle finished with failures");
            }
            Err(e) => {
                error!(error = %e, "Stock sync cycle aborted");
            }
        }
    }
}
