//! End-of-day reconciliation sweep. Replaces the cron-style scheduler of
//! a full job framework with an explicit timer loop feeding an idempotent
//! batch function guarded by a persisted watermark.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use sqlx::MySqlPool;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::notify::{self, NotificationKind};

static IN_FLIGHT: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub marked_absent: u64,
    pub marked_on_leave: u64,
    pub force_closed: u64,
    pub skipped: bool,
}

/// Whether a sweep for a day should proceed, given the in-flight flag
/// and the persisted watermark for that day.
#[derive(Debug, PartialEq, Eq)]
pub enum RunDecision {
    Run,
    AlreadyDone,
    InFlight,
}

pub fn run_decision(in_flight: bool, watermark: Option<NaiveDateTime>) -> RunDecision {
    if in_flight {
        RunDecision::InFlight
    } else if watermark.is_some() {
        RunDecision::AlreadyDone
    } else {
        RunDecision::Run
    }
}

/// Next occurrence of the reconciliation hour at the configured offset.
pub fn next_boundary(now: DateTime<FixedOffset>, hour: u32) -> DateTime<FixedOffset> {
    let today_at = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .expect("RECONCILE_HOUR out of range")
        .and_local_timezone(now.timezone())
        .unwrap();
    if today_at > now {
        today_at
    } else {
        today_at + Duration::days(1)
    }
}

/// Force-closed sessions get their duration capped at the maximum.
pub fn cap_checkout(check_in: NaiveDateTime, max_session: Duration) -> NaiveDateTime {
    check_in + max_session
}

/// Timer loop; spawned once at startup and runs for the process lifetime.
pub async fn run_loop(pool: MySqlPool, config: Config) {
    let tz = config.tz();
    loop {
        let now = Utc::now().with_timezone(&tz);
        let next = next_boundary(now, config.reconcile_hour);
        let wait = (next - now)
            .to_std()
            .unwrap_or(StdDuration::from_secs(60));
        info!(next = %next, "Reconciliation sleeping until next day boundary");
        actix_web::rt::time::sleep(wait).await;

        let day = Utc::now().with_timezone(&tz).date_naive();
        match reconcile_day(&pool, &config, day).await {
            Ok(summary) if summary.skipped => {
                info!(%day, "Reconciliation skipped (already done or in flight)");
            }
            Ok(summary) => {
                info!(
                    %day,
                    absent = summary.marked_absent,
                    on_leave = summary.marked_on_leave,
                    anomalous = summary.force_closed,
                    "Reconciliation complete"
                );
            }
            Err(e) => {
                error!(%day, error = %e, "Reconciliation failed");
                // Operator channel; employee_id 0 is the operator inbox.
                notify::notify(
                    &pool,
                    0,
                    NotificationKind::ReconcileFailure,
                    format!("Reconciliation for {day} failed: {e}"),
                );
            }
        }
    }
}

/// One sweep for `day`. Safe to re-run: the watermark makes completed
/// days a no-op, and every write inside is guarded by NOT EXISTS or a
/// status filter, so a crash mid-sweep resumes where it stopped.
pub async fn reconcile_day(
    pool: &MySqlPool,
    config: &Config,
    day: NaiveDate,
) -> anyhow::Result<ReconcileSummary> {
    if run_decision(IN_FLIGHT.swap(true, Ordering::SeqCst), None) == RunDecision::InFlight {
        warn!(%day, "Reconciliation already running, skipping");
        return Ok(ReconcileSummary {
            skipped: true,
            ..Default::default()
        });
    }
    let result = sweep(pool, config, day).await;
    IN_FLIGHT.store(false, Ordering::SeqCst);
    result
}

async fn sweep(
    pool: &MySqlPool,
    config: &Config,
    day: NaiveDate,
) -> anyhow::Result<ReconcileSummary> {
    let done: Option<NaiveDateTime> = sqlx::query_scalar(
        "SELECT completed_at FROM reconciliation_runs WHERE day = ?",
    )
    .bind(day)
    .fetch_optional(pool)
    .await
    .context("reading reconciliation watermark")?;

    if run_decision(false, done) == RunDecision::AlreadyDone {
        return Ok(ReconcileSummary {
            skipped: true,
            ..Default::default()
        });
    }

    // Approved leave that day -> explicit on_leave record.
    let on_leave = sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, date, status)
        SELECT e.id, ?, 'on_leave'
        FROM employees e
        WHERE e.status = 'active'
          AND NOT EXISTS (
              SELECT 1 FROM attendance a
              WHERE a.employee_id = e.id AND a.date = ?
          )
          AND EXISTS (
              SELECT 1 FROM leave_requests l
              WHERE l.employee_id = e.id
                AND l.status = 'approved'
                AND ? BETWEEN l.start_date AND l.end_date
          )
        "#,
    )
    .bind(day)
    .bind(day)
    .bind(day)
    .execute(pool)
    .await
    .context("marking on-leave employees")?
    .rows_affected();

    // Everyone else without a record is absent.
    let absentees: Vec<u64> = sqlx::query_scalar(
        r#"
        SELECT e.id
        FROM employees e
        WHERE e.status = 'active'
          AND NOT EXISTS (
              SELECT 1 FROM attendance a
              WHERE a.employee_id = e.id AND a.date = ?
          )
        "#,
    )
    .bind(day)
    .fetch_all(pool)
    .await
    .context("listing absent employees")?;

    let absent = sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, date, status)
        SELECT e.id, ?, 'absent'
        FROM employees e
        WHERE e.status = 'active'
          AND NOT EXISTS (
              SELECT 1 FROM attendance a
              WHERE a.employee_id = e.id AND a.date = ?
          )
        "#,
    )
    .bind(day)
    .bind(day)
    .execute(pool)
    .await
    .context("marking absent employees")?
    .rows_affected();

    for employee_id in &absentees {
        notify::notify(
            pool,
            *employee_id,
            NotificationKind::MarkedAbsent,
            format!("Marked absent for {day}"),
        );
    }

    // Dangling open sessions past the maximum length get force-closed
    // with a capped duration.
    let max_session = Duration::hours(config.max_session_hours);
    let cutoff = Utc::now().with_timezone(&config.tz()).naive_local() - max_session;

    let stale: Vec<(u64, u64, NaiveDateTime)> = sqlx::query_as(
        r#"
        SELECT id, employee_id, check_in
        FROM attendance
        WHERE check_in IS NOT NULL
          AND check_out IS NULL
          AND check_in < ?
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await
    .context("listing stale open sessions")?;

    let mut force_closed = 0u64;
    for (id, employee_id, check_in) in stale {
        let capped = cap_checkout(check_in, max_session);
        let updated = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, status = 'anomalous'
            WHERE id = ? AND check_out IS NULL
            "#,
        )
        .bind(capped)
        .bind(id)
        .execute(pool)
        .await
        .context("force-closing stale session")?
        .rows_affected();

        if updated > 0 {
            force_closed += 1;
            notify::notify(
                pool,
                employee_id,
                NotificationKind::AnomalousSession,
                format!("Session opened {check_in} force-closed at {capped}"),
            );
        }
    }

    sqlx::query(
        r#"
        INSERT INTO reconciliation_runs (day, marked_absent, marked_on_leave, force_closed, completed_at)
        VALUES (?, ?, ?, ?, NOW())
        ON DUPLICATE KEY UPDATE completed_at = NOW()
        "#,
    )
    .bind(day)
    .bind(absent)
    .bind(on_leave)
    .bind(force_closed)
    .execute(pool)
    .await
    .context("recording reconciliation watermark")?;

    Ok(ReconcileSummary {
        marked_absent: absent,
        marked_on_leave: on_leave,
        force_closed,
        skipped: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(6 * 3600).unwrap()
    }

    #[test]
    fn boundary_later_today() {
        let now = tz().with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        let next = next_boundary(now, 18);
        assert_eq!(next, tz().with_ymd_and_hms(2026, 1, 5, 18, 0, 0).unwrap());
    }

    #[test]
    fn boundary_rolls_to_tomorrow() {
        let now = tz().with_ymd_and_hms(2026, 1, 5, 18, 0, 0).unwrap();
        let next = next_boundary(now, 18);
        assert_eq!(next, tz().with_ymd_and_hms(2026, 1, 6, 18, 0, 0).unwrap());
    }

    #[test]
    fn boundary_respects_offset() {
        // 17:30 UTC is 23:30 at +06:00, past an 18:00 boundary.
        let now = Utc
            .with_ymd_and_hms(2026, 1, 5, 17, 30, 0)
            .unwrap()
            .with_timezone(&tz());
        let next = next_boundary(now, 18);
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2026, 1, 6).unwrap());
    }

    #[test]
    fn fresh_day_runs() {
        assert_eq!(run_decision(false, None), RunDecision::Run);
    }

    #[test]
    fn completed_day_is_a_no_op_on_rerun() {
        let completed_at = NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(18, 0, 3)
            .unwrap();
        assert_eq!(
            run_decision(false, Some(completed_at)),
            RunDecision::AlreadyDone
        );
    }

    #[test]
    fn concurrent_sweep_is_skipped() {
        // In-flight wins even before the watermark is consulted.
        assert_eq!(run_decision(true, None), RunDecision::InFlight);
        let completed_at = NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(18, 0, 3)
            .unwrap();
        assert_eq!(run_decision(true, Some(completed_at)), RunDecision::InFlight);
    }

    #[test]
    fn capped_checkout_is_check_in_plus_max() {
        let check_in = NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let capped = cap_checkout(check_in, Duration::hours(16));
        assert_eq!(
            capped,
            NaiveDate::from_ymd_opt(2026, 1, 6)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert!(capped > check_in);
    }
}
