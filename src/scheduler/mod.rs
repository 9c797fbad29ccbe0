//! Daily job scheduler.
//!
//! One job fires once per day at a wall-clock time in the configured
//! timezone. A background task polls the trigger, and a due job is run with
//! bounded retries while the receive loop keeps serving users.

mod time;


pub use time::{format_run_time, next_run_time};

use crate::i18n::{Category, Locales};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use habit_core::{
    config::{parse_fire_time, ScheduleConfig},
    error::HabitError,
    language::Language,
    message::OutgoingMessage,
    traits::Channel,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Join timeout when stopping the background task.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after a failure in the polling machinery itself.
const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Work run by the scheduler when the trigger fires.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> Result<(), HabitError>;
}

/// Result of one fire, after retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded { attempts: u32 },
    Failed { attempts: u32, last_error: String },
}

/// Sends operator-facing scheduler notices to the owner chat.
#[derive(Clone)]
pub struct Notifier {
    channel: Arc<dyn Channel>,
    chat_id: i64,
    locales: Arc<Locales>,
}

impl Notifier {
    pub fn new(channel: Arc<dyn Channel>, chat_id: i64, locales: Arc<Locales>) -> Self {
        Self {
            channel,
            chat_id,
            locales,
        }
    }

    async fn notify(&self, key: &str, params: &[(&str, &str)]) {
        let text = self
            .locales
            .text(Language::English, Category::Scheduler, key, params);
        if let Err(e) = self
            .channel
            .send(OutgoingMessage::text(self.chat_id, text))
            .await
        {
            error!("scheduler: failed to send {key} notification: {e}");
        }
    }
}

/// Run `job` up to `attempts` times, sleeping `delay` between tries.
///
/// Stops on the first success. After the last failure, exactly one failure
/// notice is sent.
pub async fn run_with_retry(
    job: &dyn Job,
    notifier: &Notifier,
    attempts: u32,
    delay: Duration,
) -> JobOutcome {
    let attempts = attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        info!("scheduler: running {} (attempt {attempt}/{attempts})", job.name());
        match job.run().await {
            Ok(()) => {
                info!("scheduler: {} succeeded", job.name());
                return JobOutcome::Succeeded { attempts: attempt };
            }
            Err(e) => {
                warn!("scheduler: {} attempt {attempt} failed: {e}", job.name());
                last_error = e.to_string();
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    error!("scheduler: {} failed after {attempts} attempts", job.name());
    notifier
        .notify(
            "failure",
            &[("attempts", &attempts.to_string()), ("error", &last_error)],
        )
        .await;

    JobOutcome::Failed {
        attempts,
        last_error,
    }
}

/// Timing knobs for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub fire_time: NaiveTime,
    pub tz: Tz,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub poll_interval: Duration,
}

impl SchedulerSettings {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, HabitError> {
        Ok(Self {
            fire_time: config.fire_time()?,
            tz: config.tz()?,
            retry_attempts: config.retry_attempts,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        })
    }
}

/// Snapshot returned by [`Scheduler::status`].
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub running: bool,
    pub fire_time: NaiveTime,
    pub timezone: Tz,
    pub next_run: DateTime<Tz>,
}

/// The armed trigger.
#[derive(Debug)]
struct Trigger {
    fire_time: NaiveTime,
    /// `None` while stopped.
    next_fire: Option<DateTime<Utc>>,
}

impl Trigger {
    fn arm(&mut self, tz: Tz, now: DateTime<Utc>) {
        self.next_fire = Some(next_run_time(self.fire_time, tz, now).with_timezone(&Utc));
    }

    /// True if the trigger is due. A due trigger is re-armed for the next
    /// occurrence before returning, so each occurrence fires once.
    fn take_due(&mut self, tz: Tz, now: DateTime<Utc>) -> bool {
        match self.next_fire {
            Some(at) if now >= at => {
                self.arm(tz, now);
                true
            }
            Some(_) => false,
            None => {
                self.arm(tz, now);
                false
            }
        }
    }
}

struct Running {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Daily scheduler. Stopped until [`Scheduler::start`].
pub struct Scheduler {
    settings: SchedulerSettings,
    trigger: Arc<Mutex<Trigger>>,
    job: Arc<dyn Job>,
    notifier: Notifier,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl Scheduler {
    pub fn new(settings: SchedulerSettings, job: Arc<dyn Job>, notifier: Notifier) -> Self {
        let trigger = Trigger {
            fire_time: settings.fire_time,
            next_fire: None,
        };
        Self {
            settings,
            trigger: Arc::new(Mutex::new(trigger)),
            job,
            notifier,
            running: tokio::sync::Mutex::new(None),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.settings.tz
    }

    /// Arm the trigger, spawn the polling task and announce the next run.
    ///
    /// A second call while running only logs a warning.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            warn!("scheduler: already running");
            return;
        }

        let fire_time = {
            let mut trigger = self.lock_trigger();
            if trigger.next_fire.is_none() {
                trigger.arm(self.settings.tz, Utc::now());
            }
            trigger.fire_time
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(poll_loop(
            self.trigger.clone(),
            self.job.clone(),
            self.notifier.clone(),
            self.settings.clone(),
            stop_rx,
        ));
        *running = Some(Running {
            stop: stop_tx,
            handle,
        });
        drop(running);

        info!(
            "scheduler: daily message scheduled for {fire_time} ({})",
            self.settings.tz
        );
        let next = format_run_time(&self.next_run());
        self.notifier.notify("startup", &[("time", &next)]).await;
    }

    /// Signal the polling task and wait for it, aborting after 5 s.
    /// Safe to call when already stopped.
    pub async fn stop(&self) {
        let Some(Running { stop, mut handle }) = self.running.lock().await.take() else {
            return;
        };

        stop.send_replace(true);
        match tokio::time::timeout(STOP_TIMEOUT, &mut handle).await {
            Ok(_) => info!("scheduler: stopped"),
            Err(_) => {
                warn!("scheduler: task did not stop in time, aborting");
                handle.abort();
            }
        }
        self.lock_trigger().next_fire = None;
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Change the daily fire time. Re-arms the trigger if running.
    pub async fn reschedule(&self, time: &str) -> Result<NaiveTime, HabitError> {
        let fire_time = parse_fire_time(time)?;
        let running = self.is_running().await;

        let mut trigger = self.lock_trigger();
        trigger.fire_time = fire_time;
        if running {
            trigger.arm(self.settings.tz, Utc::now());
        }
        info!("scheduler: rescheduled daily message to {fire_time}");
        Ok(fire_time)
    }

    /// Current fire time.
    pub fn fire_time(&self) -> NaiveTime {
        self.lock_trigger().fire_time
    }

    /// When the job fires next: the armed trigger, or the computed next
    /// occurrence while stopped.
    pub fn next_run(&self) -> DateTime<Tz> {
        let tz = self.settings.tz;
        let trigger = self.lock_trigger();
        match trigger.next_fire {
            Some(at) => at.with_timezone(&tz),
            None => next_run_time(trigger.fire_time, tz, Utc::now()),
        }
    }

    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.is_running().await,
            fire_time: self.fire_time(),
            timezone: self.settings.tz,
            next_run: self.next_run(),
        }
    }

    fn lock_trigger(&self) -> std::sync::MutexGuard<'_, Trigger> {
        // The trigger is plain data; a poisoned lock still holds a valid value.
        self.trigger.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Aborts the job task if the polling task is dropped mid-fire.
struct AbortOnDrop(JoinHandle<JobOutcome>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Background task: poll the trigger and run the job when due.
async fn poll_loop(
    trigger: Arc<Mutex<Trigger>>,
    job: Arc<dyn Job>,
    notifier: Notifier,
    settings: SchedulerSettings,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let due = trigger
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take_due(settings.tz, Utc::now());

        let mut pause = settings.poll_interval;

        if due {
            let job = job.clone();
            let notifier = notifier.clone();
            let (attempts, delay) = (settings.retry_attempts, settings.retry_delay);
            let mut run = AbortOnDrop(tokio::spawn(async move {
                run_with_retry(job.as_ref(), &notifier, attempts, delay).await
            }));

            tokio::select! {
                result = &mut run.0 => match result {
                    Ok(outcome) => debug!("scheduler: fire finished: {outcome:?}"),
                    Err(e) => {
                        error!("scheduler: job task crashed: {e}");
                        pause = ERROR_BACKOFF;
                    }
                },
                _ = stop.changed() => {
                    // Let the in-flight fire finish; `stop()` bounds the wait.
                    info!("scheduler: stopping after the current fire");
                    let _ = (&mut run.0).await;
                    break;
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = stop.changed() => break,
        }
    }
    debug!("scheduler: poll loop exited");
}
