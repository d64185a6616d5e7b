use std::sync::Arc;

use playlog_core::config::PlaylogConfig;
use playlog_pipeline::Pipeline;
use playlog_scheduler::{
    run_with_retries, FiredJob, RetryPolicy, RunStatus, SchedulerEngine, SchedulerHandle,
};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use crate::app::{self, JOB_NAME};
use crate::report;

/// Run the scheduler until Ctrl-C: register the job, fire it on schedule and
/// run each fired slot under the retry policy.
pub async fn serve(config: PlaylogConfig) -> anyhow::Result<()> {
    let pipeline = Arc::new(app::build_pipeline(&config)?);
    let db_path = &config.database.path;

    // engine and run log each get their own connection
    let handle = SchedulerHandle::new(rusqlite::Connection::open(db_path)?)?;
    let (fired_tx, mut fired_rx) = mpsc::channel::<FiredJob>(16);
    let engine = SchedulerEngine::new(rusqlite::Connection::open(db_path)?, Some(fired_tx))?;

    let job = engine.ensure_job(JOB_NAME, app::schedule_from(&config.schedule))?;
    info!(job_id = %job.id, next_run = ?job.next_run, "job registered");

    let policy = app::retry_policy(&config.schedule);
    let owner = config.schedule.owner.clone();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine_task = tokio::spawn(engine.run(shutdown_rx));

    // Fired slots are handled one at a time so runs never overlap.
    let runner = tokio::spawn(async move {
        while let Some(fired) = fired_rx.recv().await {
            handle_fired(&pipeline, &handle, &policy, &owner, fired).await;
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);
    // the engine owns the only sender; once it stops the runner drains and exits
    let _ = engine_task.await;
    let _ = runner.await;
    Ok(())
}

async fn handle_fired(
    pipeline: &Pipeline,
    handle: &SchedulerHandle,
    policy: &RetryPolicy,
    owner: &str,
    fired: FiredJob,
) {
    let logical_date = fired.logical_date;
    let (result, attempts) = run_with_retries(policy, move |attempt| {
        info!(attempt, %logical_date, "running job");
        pipeline.run(logical_date)
    })
    .await;

    let (status, detail) = match &result {
        Ok(outcome) => {
            info!(%logical_date, attempts, "{}", report::outcome_message(outcome));
            (RunStatus::Success, outcome.summary())
        }
        Err(e) => {
            error!(
                owner,
                job = %fired.name,
                %logical_date,
                attempts,
                code = e.code(),
                "ALERT: job failed after all retries: {e}"
            );
            (RunStatus::Failed, report::failure_message(e))
        }
    };

    if let Err(e) = handle.record_run(&fired.job_id, logical_date, attempts, status, &detail) {
        error!(job_id = %fired.job_id, "failed to record run: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use playlog_core::RawItem;
    use playlog_fetch::{FetchError, RecentlyPlayedSource};
    use playlog_store::PlayedTracksStore;
    use rusqlite::Connection;

    use playlog_pipeline::RunOutcome;

    use super::*;

    /// Returns `items`, or a 503 when `items` is `None`; counts calls.
    struct CountingSource {
        items: Option<Vec<RawItem>>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl RecentlyPlayedSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch(&self, _reference: DateTime<Utc>) -> Result<Vec<RawItem>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.items {
                Some(items) => Ok(items.clone()),
                None => Err(FetchError::Upstream {
                    status: 503,
                    body: "service unavailable".into(),
                }),
            }
        }
    }

    fn pipeline(items: Option<Vec<RawItem>>) -> (Pipeline, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let source = CountingSource {
            items,
            calls: Arc::clone(&calls),
        };
        let store = PlayedTracksStore::open_in_memory().unwrap();
        (Pipeline::new(Box::new(source), store), calls)
    }

    fn fired() -> FiredJob {
        FiredJob {
            job_id: "job-1".into(),
            name: JOB_NAME.into(),
            logical_date: Utc.with_ymd_and_hms(2024, 3, 15, 0, 5, 0).unwrap(),
        }
    }

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            retry_delay: Duration::ZERO,
        }
    }

    fn handle() -> SchedulerHandle {
        SchedulerHandle::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn persistent_failure_is_logged_as_failed_after_every_attempt() {
        let (pipeline, calls) = pipeline(None);
        let handle = handle();

        handle_fired(&pipeline, &handle, &policy(2), "ops", fired()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let runs = handle.list_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert_eq!(runs[0].attempts, 3);
        assert_eq!(runs[0].job_id, "job-1");
        assert_eq!(runs[0].logical_date, "2024-03-15T00:05:00Z");
        assert!(runs[0].detail.contains("UPSTREAM_ERROR"));
    }

    #[tokio::test]
    async fn no_data_is_logged_as_success_on_first_attempt() {
        let (pipeline, calls) = pipeline(Some(vec![]));
        let handle = handle();

        handle_fired(&pipeline, &handle, &policy(1), "ops", fired()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let runs = handle.list_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Success);
        assert_eq!(runs[0].attempts, 1);
        assert_eq!(runs[0].detail, RunOutcome::EmptyBatch.summary());
    }

    #[tokio::test]
    async fn slot_loads_the_day_before_its_logical_date() {
        let (pipeline, _) = pipeline(Some(vec![RawItem::new(
            "Avril 14th",
            "Aphex Twin",
            "2024-03-14T22:10:00.000Z",
        )]));
        let handle = handle();

        handle_fired(&pipeline, &handle, &policy(0), "ops", fired()).await;

        let runs = handle.list_runs(10).unwrap();
        assert_eq!(runs[0].status, RunStatus::Success);
        assert_eq!(pipeline.store().records_for_day("2024-03-14").unwrap().len(), 1);
    }
}
