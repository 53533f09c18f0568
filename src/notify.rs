use sqlx::MySqlPool;
use strum::Display;

/// Event kinds the delivery service (external) picks up from the
/// notifications table.
#[derive(Debug, Clone, Copy, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    LateArrival,
    EarlyDeparture,
    MarkedAbsent,
    AnomalousSession,
    ReconcileFailure,
}

/// Fire-and-forget: failures are logged, never propagated, so a broken
/// notification path cannot roll back an attendance write.
pub fn notify(pool: &MySqlPool, employee_id: u64, kind: NotificationKind, message: String) {
    let pool = pool.clone();
    actix_web::rt::spawn(async move {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (employee_id, kind, message)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(kind.to_string())
        .bind(&message)
        .execute(&pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, employee_id, kind = %kind, "Failed to queue notification");
        }
    });
}
