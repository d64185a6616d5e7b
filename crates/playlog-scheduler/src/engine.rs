use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    db::init_db,
    error::{Result, SchedulerError},
    schedule::{compute_next_run, format_ts, parse_ts, validate},
    types::{FiredJob, Job, JobRun, RunStatus, Schedule},
};

const JOB_COLUMNS: &str =
    "id, name, schedule, last_run, next_run, run_count, created_at, updated_at";

/// Shared handle for the run log while the engine loop runs.
///
/// Uses its own `Connection` so the run handler can write results without
/// conflicting with the engine's polling queries.
#[derive(Clone)]
pub struct SchedulerHandle {
    conn: Arc<Mutex<Connection>>,
}

impl SchedulerHandle {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SchedulerError::Poisoned)
    }

    /// Append the final result of a fired slot to the run log.
    pub fn record_run(
        &self,
        job_id: &str,
        logical_date: DateTime<Utc>,
        attempts: u32,
        status: RunStatus,
        detail: &str,
    ) -> Result<()> {
        let conn = self.conn()?;
        insert_run(&conn, job_id, logical_date, attempts, &status, detail)?;
        info!(job_id, logical_date = %format_ts(logical_date), attempts, %status, "run recorded");
        Ok(())
    }

    /// Most recent runs first.
    pub fn list_runs(&self, limit: usize) -> Result<Vec<JobRun>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, job_id, logical_date, attempts, status, detail, finished_at
             FROM job_runs ORDER BY finished_at DESC, id DESC LIMIT ?1",
        )?;
        let runs = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,    // id
                    row.get::<_, String>(1)?, // job_id
                    row.get::<_, String>(2)?, // logical_date
                    row.get::<_, u32>(3)?,    // attempts
                    row.get::<_, String>(4)?, // status
                    row.get::<_, String>(5)?, // detail
                    row.get::<_, String>(6)?, // finished_at
                ))
            })?
            .filter_map(|r| {
                let (id, job_id, logical_date, attempts, status_str, detail, finished_at) =
                    r.ok()?;
                let status: RunStatus = status_str.parse().ok()?;
                Some(JobRun {
                    id,
                    job_id,
                    logical_date,
                    attempts,
                    status,
                    detail,
                    finished_at,
                })
            })
            .collect();
        Ok(runs)
    }
}

/// Core scheduler: persists jobs to SQLite and fires them at ±1 s precision.
pub struct SchedulerEngine {
    conn: Connection,
    /// If set, fired jobs are sent here for execution.
    fired_tx: Option<mpsc::Sender<FiredJob>>,
}

impl SchedulerEngine {
    /// Create a new engine, initialising the DB schema if needed.
    ///
    /// Pass `Some(tx)` to receive every [`FiredJob`] via mpsc.
    /// The sender is non-blocking (`try_send`) so the tick loop is never stalled.
    pub fn new(conn: Connection, fired_tx: Option<mpsc::Sender<FiredJob>>) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn, fired_tx })
    }

    /// Register `name` with `schedule`, or update the schedule of an existing
    /// job with that name. Calling it again with the same schedule is a no-op.
    pub fn ensure_job(&self, name: &str, schedule: Schedule) -> Result<Job> {
        self.ensure_job_at(name, schedule, Utc::now())
    }

    fn ensure_job_at(&self, name: &str, schedule: Schedule, now: DateTime<Utc>) -> Result<Job> {
        validate(&schedule)?;
        let schedule_json = serde_json::to_string(&schedule)
            .map_err(|e| SchedulerError::InvalidSchedule(e.to_string()))?;
        let now_str = format_ts(now);
        let next = compute_next_run(&schedule, now).map(format_ts);

        let existing: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT id, schedule FROM jobs WHERE name = ?1",
                [name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            Some((id, stored)) if stored == schedule_json => {
                info!(job_id = %id, %name, "job already registered");
            }
            Some((id, _)) => {
                self.conn.execute(
                    "UPDATE jobs SET schedule = ?1, next_run = ?2, updated_at = ?3 WHERE id = ?4",
                    rusqlite::params![schedule_json, next, now_str, id],
                )?;
                info!(job_id = %id, %name, "job schedule updated");
            }
            None => {
                let id = Uuid::new_v4().to_string();
                self.conn.execute(
                    "INSERT INTO jobs
                     (id, name, schedule, last_run, next_run, run_count, created_at, updated_at)
                     VALUES (?1, ?2, ?3, NULL, ?4, 0, ?5, ?5)",
                    rusqlite::params![id, name, schedule_json, next, now_str],
                )?;
                info!(job_id = %id, %name, next_run = ?next, "job added");
            }
        }

        query_jobs(&self.conn)?
            .into_iter()
            .find(|j| j.name == name)
            .ok_or_else(|| SchedulerError::JobNotFound {
                name: name.to_string(),
            })
    }

    /// Return all known jobs ordered by creation time.
    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        query_jobs(&self.conn)
    }

    /// Main event loop. Polls every second until `shutdown` broadcasts `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler engine started");
        match self.reschedule_missed(Utc::now()) {
            Ok(n) if n > 0 => warn!(
                count = n,
                "slots missed while offline; backfill with `playlog run --date`"
            ),
            Err(e) => error!("missed-on-startup check failed: {e}"),
            _ => {}
        }

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(Utc::now()) {
                        error!("scheduler tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    // --- private helpers ---------------------------------------------------

    /// Log every slot whose `next_run` is already in the past as missed and
    /// move the job to its next future slot.
    fn reschedule_missed(&mut self, now: DateTime<Utc>) -> Result<usize> {
        let now_str = format_ts(now);
        let overdue: Vec<(String, String, String)> = {
            let mut stmt = self.conn.prepare(
                "SELECT id, schedule, next_run FROM jobs
                 WHERE next_run IS NOT NULL AND next_run < ?1",
            )?;
            let rows: Vec<_> = stmt
                .query_map([&now_str], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .filter_map(|r| r.ok())
                .collect();
            rows
        };

        for (id, sched_json, slot) in &overdue {
            let schedule: Schedule = match serde_json::from_str(sched_json) {
                Ok(s) => s,
                Err(e) => {
                    error!(job_id = %id, "bad schedule JSON: {e}");
                    continue;
                }
            };
            if let Some(logical) = parse_ts(slot) {
                insert_run(
                    &self.conn,
                    id,
                    logical,
                    0,
                    &RunStatus::Missed,
                    "scheduler was not running",
                )?;
            }
            let next = compute_next_run(&schedule, now).map(format_ts);
            self.conn.execute(
                "UPDATE jobs SET next_run = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![next, now_str, id],
            )?;
        }
        Ok(overdue.len())
    }

    /// Fire all jobs whose `next_run` has arrived. Returns how many fired.
    fn tick(&mut self, now: DateTime<Utc>) -> Result<usize> {
        let now_str = format_ts(now);

        // Collect eagerly inside the block so `stmt` is dropped before we
        // borrow `self.conn` again for the UPDATE below.
        let due: Vec<(String, String, String, String, u32)> = {
            let mut stmt = self.conn.prepare_cached(
                "SELECT id, name, schedule, next_run, run_count FROM jobs
                 WHERE next_run IS NOT NULL AND next_run <= ?1
                 ORDER BY next_run",
            )?;
            let rows: Vec<_> = stmt
                .query_map([&now_str], |row| {
                    Ok((
                        row.get::<_, String>(0)?, // id
                        row.get::<_, String>(1)?, // name
                        row.get::<_, String>(2)?, // schedule JSON
                        row.get::<_, String>(3)?, // next_run
                        row.get::<_, u32>(4)?,    // run_count
                    ))
                })?
                .filter_map(|r| r.ok())
                .collect();
            rows
        };

        let mut fired = 0;
        for (id, name, sched_json, slot, run_count) in due {
            let schedule: Schedule = match serde_json::from_str(&sched_json) {
                Ok(s) => s,
                Err(e) => {
                    error!(job_id = %id, "bad schedule JSON: {e}");
                    continue;
                }
            };
            let logical_date = parse_ts(&slot).unwrap_or(now);
            let next = compute_next_run(&schedule, now).map(format_ts);
            let new_count = run_count + 1;

            info!(job_id = %id, %name, run = new_count, logical_date = %slot, "firing job");

            self.conn.execute(
                "UPDATE jobs SET last_run = ?1, next_run = ?2, run_count = ?3, updated_at = ?1
                 WHERE id = ?4",
                rusqlite::params![now_str, next, new_count, id],
            )?;
            fired += 1;

            if let Some(ref tx) = self.fired_tx {
                let job = FiredJob {
                    job_id: id.clone(),
                    name,
                    logical_date,
                };
                // try_send never blocks the tick loop; log a warning if the channel is full.
                if tx.try_send(job).is_err() {
                    warn!(job_id = %id, "run channel full or closed, job dropped");
                }
            }
        }
        Ok(fired)
    }
}

fn insert_run(
    conn: &Connection,
    job_id: &str,
    logical_date: DateTime<Utc>,
    attempts: u32,
    status: &RunStatus,
    detail: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO job_runs (job_id, logical_date, attempts, status, detail, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            job_id,
            format_ts(logical_date),
            attempts,
            status.to_string(),
            detail,
            format_ts(Utc::now()),
        ],
    )?;
    Ok(())
}

fn query_jobs(conn: &Connection) -> Result<Vec<Job>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at"
    ))?;
    let jobs = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,         // id
                row.get::<_, String>(1)?,         // name
                row.get::<_, String>(2)?,         // schedule JSON
                row.get::<_, Option<String>>(3)?, // last_run
                row.get::<_, Option<String>>(4)?, // next_run
                row.get::<_, u32>(5)?,            // run_count
                row.get::<_, String>(6)?,         // created_at
                row.get::<_, String>(7)?,         // updated_at
            ))
        })?
        .filter_map(|r| {
            let (id, name, sched_json, last_run, next_run, run_count, created_at, updated_at) =
                r.ok()?;
            let schedule: Schedule = serde_json::from_str(&sched_json).ok()?;
            Some(Job {
                id,
                name,
                schedule,
                last_run,
                next_run,
                run_count,
                created_at,
                updated_at,
            })
        })
        .collect();
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const DAILY: Schedule = Schedule::Daily { hour: 0, minute: 5 };

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, m, 0).unwrap()
    }

    fn engine(tx: Option<mpsc::Sender<FiredJob>>) -> SchedulerEngine {
        SchedulerEngine::new(Connection::open_in_memory().unwrap(), tx).unwrap()
    }

    #[test]
    fn ensure_job_is_idempotent_by_name() {
        let engine = engine(None);
        let first = engine.ensure_job_at("etl", DAILY, at(15, 1, 0)).unwrap();
        let again = engine.ensure_job_at("etl", DAILY, at(15, 2, 0)).unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.next_run.as_deref(), Some("2024-03-16T00:05:00Z"));
        assert_eq!(engine.list_jobs().unwrap().len(), 1);
    }

    #[test]
    fn ensure_job_updates_changed_schedule() {
        let engine = engine(None);
        let first = engine.ensure_job_at("etl", DAILY, at(15, 1, 0)).unwrap();
        let changed = engine
            .ensure_job_at("etl", Schedule::Daily { hour: 3, minute: 0 }, at(15, 1, 0))
            .unwrap();
        assert_eq!(first.id, changed.id);
        assert_eq!(changed.schedule, Schedule::Daily { hour: 3, minute: 0 });
        assert_eq!(changed.next_run.as_deref(), Some("2024-03-15T03:00:00Z"));
    }

    #[test]
    fn ensure_job_rejects_invalid_schedule() {
        let engine = engine(None);
        let err = engine
            .ensure_job_at("etl", Schedule::Interval { every_secs: 0 }, at(15, 1, 0))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidSchedule(_)));
    }

    #[test]
    fn due_job_fires_once_with_slot_as_logical_date() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut engine = engine(Some(tx));
        engine.ensure_job_at("etl", DAILY, at(15, 0, 0)).unwrap();

        assert_eq!(engine.tick(at(15, 0, 4)).unwrap(), 0);
        assert!(rx.try_recv().is_err());

        // one second-granularity tick a little after the slot
        let late = at(15, 0, 5) + chrono::Duration::seconds(1);
        assert_eq!(engine.tick(late).unwrap(), 1);
        let fired = rx.try_recv().unwrap();
        assert_eq!(fired.name, "etl");
        assert_eq!(fired.logical_date, at(15, 0, 5));

        // the next tick must not fire the same slot again
        assert_eq!(engine.tick(late).unwrap(), 0);
        let job = &engine.list_jobs().unwrap()[0];
        assert_eq!(job.run_count, 1);
        assert_eq!(job.next_run.as_deref(), Some("2024-03-16T00:05:00Z"));
    }

    #[test]
    fn missed_slots_are_logged_and_rescheduled() {
        let conn = Connection::open_in_memory().unwrap();
        let mut engine = SchedulerEngine::new(conn, None).unwrap();
        engine.ensure_job_at("etl", DAILY, at(14, 12, 0)).unwrap();

        // engine comes back a day later
        let missed = engine.reschedule_missed(at(15, 12, 0)).unwrap();
        assert_eq!(missed, 1);
        let job = &engine.list_jobs().unwrap()[0];
        assert_eq!(job.next_run.as_deref(), Some("2024-03-16T00:05:00Z"));

        let status: String = engine
            .conn
            .query_row("SELECT status FROM job_runs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(status, "missed");
        assert_eq!(engine.tick(at(15, 12, 0)).unwrap(), 0);
    }

    #[test]
    fn handle_records_and_lists_runs() {
        let handle = SchedulerHandle::new(Connection::open_in_memory().unwrap()).unwrap();
        handle
            .record_run("job-1", at(14, 0, 5), 1, RunStatus::Success, "loaded 3 tracks")
            .unwrap();
        handle
            .record_run("job-1", at(15, 0, 5), 2, RunStatus::Failed, "upstream error")
            .unwrap();

        let runs = handle.list_runs(10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert_eq!(runs[0].attempts, 2);
        assert_eq!(runs[1].logical_date, "2024-03-14T00:05:00Z");
        assert_eq!(handle.list_runs(1).unwrap().len(), 1);
    }
}
