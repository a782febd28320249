//! Scheduler — recurring time-of-day jobs.
//!
//! Every job runs on its own task and fires first at the next occurrence of
//! its time of day, then every 24 hours. Each firing runs as a separate task,
//! so a slow or panicking job body neither delays other jobs nor cancels its
//! own future firings.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use smarthub_domain::device::DeviceCommand;
use smarthub_domain::id::{DeviceId, JobId};
use smarthub_domain::time::TimeOfDay;

use crate::error::CallbackError;
use crate::registry::{CommandOutcome, DeviceRegistry, WeakRegistry};
use crate::retry::RetryPolicy;

/// Period between two firings of the same job.
pub const JOB_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Description of a scheduled job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledJob {
    pub id: JobId,
    pub device_id: DeviceId,
    pub at: TimeOfDay,
    pub label: String,
}

struct JobEntry {
    job: ScheduledJob,
    handle: JoinHandle<()>,
}

/// Owner of the recurring jobs. Dropping it cancels them all.
pub struct Scheduler {
    registry: WeakRegistry,
    jobs: Mutex<Vec<JobEntry>>,
}

impl Scheduler {
    /// A scheduler driving `registry`, without keeping it alive.
    #[must_use]
    pub fn new(registry: &DeviceRegistry) -> Self {
        Self {
            registry: registry.downgrade(),
            jobs: Mutex::new(Vec::new()),
        }
    }

    /// Run `command` every day at `at`, starting today if that time is still
    /// ahead, tomorrow otherwise.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule_command<F, Fut>(&self, device_id: DeviceId, at: TimeOfDay, command: F) -> JobId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CallbackError>> + Send + 'static,
    {
        self.schedule_with_delay(device_id, at, at.delay_from_now(), "custom".to_string(), command)
    }

    /// Run `command` on `device_id` through the registry every day at `at`.
    ///
    /// Firings after the registry has been dropped are skipped and logged.
    pub fn schedule_device_command(
        &self,
        device_id: DeviceId,
        at: TimeOfDay,
        command: DeviceCommand,
        retry: RetryPolicy,
    ) -> JobId {
        let registry = self.registry.clone();
        self.schedule_with_delay(
            device_id,
            at,
            at.delay_from_now(),
            command.to_string(),
            move || run_device_command(registry.clone(), device_id, command, retry),
        )
    }

    fn schedule_with_delay<F, Fut>(
        &self,
        device_id: DeviceId,
        at: TimeOfDay,
        delay: Duration,
        label: String,
        command: F,
    ) -> JobId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CallbackError>> + Send + 'static,
    {
        let job = ScheduledJob {
            id: JobId::new(),
            device_id,
            at,
            label,
        };
        let job_id = job.id;
        let handle = tokio::spawn(job_loop(job_id, delay, command));
        tracing::info!(
            %job_id,
            %device_id,
            %at,
            label = %job.label,
            first_in_secs = delay.as_secs(),
            "job scheduled"
        );
        self.jobs().push(JobEntry { job, handle });
        job_id
    }

    /// Cancel one job. Returns whether it existed.
    ///
    /// A firing already in progress is left to finish.
    pub fn cancel(&self, id: JobId) -> bool {
        let mut jobs = self.jobs();
        let Some(position) = jobs.iter().position(|entry| entry.job.id == id) else {
            return false;
        };
        let entry = jobs.remove(position);
        entry.handle.abort();
        tracing::info!(job_id = %id, "job cancelled");
        true
    }

    /// Scheduled jobs, in scheduling order.
    #[must_use]
    pub fn list_schedules(&self) -> Vec<ScheduledJob> {
        self.jobs().iter().map(|entry| entry.job.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }

    /// Cancel every job. No further firings happen afterwards.
    pub fn shutdown(&self) {
        let mut jobs = self.jobs();
        for entry in jobs.drain(..) {
            entry.handle.abort();
        }
        tracing::debug!("scheduler stopped");
    }

    fn jobs(&self) -> MutexGuard<'_, Vec<JobEntry>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let jobs = self.jobs.get_mut().unwrap_or_else(PoisonError::into_inner);
        for entry in jobs.drain(..) {
            entry.handle.abort();
        }
    }
}

async fn job_loop<F, Fut>(job_id: JobId, delay: Duration, command: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CallbackError>> + Send + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + delay, JOB_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        tracing::debug!(%job_id, "job firing");
        match tokio::spawn(command()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(%job_id, %err, "scheduled job failed"),
            Err(err) => tracing::warn!(%job_id, %err, "scheduled job aborted"),
        }
    }
}

async fn run_device_command(
    registry: WeakRegistry,
    device_id: DeviceId,
    command: DeviceCommand,
    retry: RetryPolicy,
) -> Result<(), CallbackError> {
    let Some(registry) = registry.upgrade() else {
        return Err(CallbackError::new("registry is gone"));
    };
    match registry.execute_command(device_id, command, &retry).await {
        CommandOutcome::Applied => Ok(()),
        CommandOutcome::DeviceNotFound => Err(CallbackError::new(format!(
            "device {device_id} is not registered"
        ))),
        CommandOutcome::Failed(err) => Err(CallbackError::from(err.into_inner())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ports::Device;
    use crate::testing::FakeDevice;

    fn six_am() -> TimeOfDay {
        TimeOfDay::from_hm(6, 0).unwrap()
    }

    fn counting_job(
        counter: &Arc<AtomicUsize>,
    ) -> impl Fn() -> std::future::Ready<Result<(), CallbackError>> + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_fire_after_delay_then_daily() {
        let registry = DeviceRegistry::new();
        let scheduler = Scheduler::new(&registry);
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.schedule_with_delay(
            DeviceId::new(1),
            six_am(),
            Duration::from_secs(60),
            "test".to_string(),
            counting_job(&fired),
        );

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::sleep(JOB_PERIOD).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_firing_after_a_failed_run() {
        let registry = DeviceRegistry::new();
        let scheduler = Scheduler::new(&registry);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        scheduler.schedule_with_delay(
            DeviceId::new(1),
            six_am(),
            Duration::from_secs(1),
            "flaky".to_string(),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err(CallbackError::new("boom")))
            },
        );

        tokio::time::sleep(Duration::from_secs(2) + JOB_PERIOD * 2).await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_let_a_slow_job_delay_another() {
        let registry = DeviceRegistry::new();
        let scheduler = Scheduler::new(&registry);
        scheduler.schedule_with_delay(
            DeviceId::new(1),
            six_am(),
            Duration::from_secs(1),
            "slow".to_string(),
            || async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            },
        );
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.schedule_with_delay(
            DeviceId::new(2),
            six_am(),
            Duration::from_secs(2),
            "fast".to_string(),
            counting_job(&fired),
        );

        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_cancelled_job_only() {
        let registry = DeviceRegistry::new();
        let scheduler = Scheduler::new(&registry);
        let cancelled = Arc::new(AtomicUsize::new(0));
        let kept = Arc::new(AtomicUsize::new(0));
        let cancelled_id = scheduler.schedule_with_delay(
            DeviceId::new(1),
            six_am(),
            Duration::from_secs(10),
            "a".to_string(),
            counting_job(&cancelled),
        );
        scheduler.schedule_with_delay(
            DeviceId::new(2),
            six_am(),
            Duration::from_secs(10),
            "b".to_string(),
            counting_job(&kept),
        );

        assert!(scheduler.cancel(cancelled_id));
        assert!(!scheduler.cancel(cancelled_id));
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(cancelled.load(Ordering::SeqCst), 0);
        assert_eq!(kept.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_fire_after_shutdown() {
        let registry = DeviceRegistry::new();
        let scheduler = Scheduler::new(&registry);
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.schedule_with_delay(
            DeviceId::new(1),
            six_am(),
            Duration::from_secs(5),
            "job".to_string(),
            counting_job(&fired),
        );

        scheduler.shutdown();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_list_jobs_with_labels() {
        let registry = DeviceRegistry::new();
        let scheduler = Scheduler::new(&registry);
        let id = scheduler.schedule_device_command(
            DeviceId::new(2),
            six_am(),
            DeviceCommand::TurnOn,
            RetryPolicy::default(),
        );

        let jobs = scheduler.list_schedules();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, id);
        assert_eq!(jobs[0].device_id, DeviceId::new(2));
        assert_eq!(jobs[0].at.to_string(), "06:00");
        assert_eq!(jobs[0].label, "TURN_ON");
    }

    #[tokio::test]
    async fn should_run_device_command_through_registry() {
        let light = Arc::new(FakeDevice::light(1));
        let registry = DeviceRegistry::new();
        registry.register_device(Arc::clone(&light) as Arc<dyn Device>);

        let result = run_device_command(
            registry.downgrade(),
            DeviceId::new(1),
            DeviceCommand::TurnOn,
            RetryPolicy::no_retry(),
        )
        .await;

        assert!(result.is_ok());
        assert!(light.status().on);
    }

    #[tokio::test]
    async fn should_report_missing_device_and_dropped_registry() {
        let registry = DeviceRegistry::new();
        let weak = registry.downgrade();

        let missing = run_device_command(
            weak.clone(),
            DeviceId::new(9),
            DeviceCommand::TurnOn,
            RetryPolicy::no_retry(),
        )
        .await;
        assert!(missing.is_err());

        drop(registry);
        let gone = run_device_command(weak, DeviceId::new(9), DeviceCommand::TurnOn, RetryPolicy::no_retry()).await;
        assert!(gone.is_err());
    }
}
