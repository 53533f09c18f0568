use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, Transaction};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::core::ledger;
use crate::error::{AppError, BalanceError};
use crate::model::leave::{LeaveBalance, LeaveRequest, LeaveType};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType, // enum ensures Swagger dropdown
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee ID
    #[schema(example = 123)]
    pub employee_id: Option<u64>,
    /// Filter by leave status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 3)]
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/// Balance row under lock; employees without a provisioned row get an
/// empty entitlement, which reserve() then rejects.
async fn lock_balance(
    tx: &mut Transaction<'_, MySql>,
    employee_id: u64,
    leave_type: &str,
) -> Result<LeaveBalance, AppError> {
    let row = sqlx::query_as::<_, LeaveBalance>(
        r#"
        SELECT employee_id, leave_type, entitled, consumed, reserved
        FROM leave_balances
        WHERE employee_id = ? AND leave_type = ?
        FOR UPDATE
        "#,
    )
    .bind(employee_id)
    .bind(leave_type)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.unwrap_or(LeaveBalance {
        employee_id,
        leave_type: leave_type.to_string(),
        entitled: 0,
        consumed: 0,
        reserved: 0,
    }))
}

async fn store_balance(
    tx: &mut Transaction<'_, MySql>,
    balance: &LeaveBalance,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE leave_balances
        SET consumed = ?, reserved = ?
        WHERE employee_id = ? AND leave_type = ?
        "#,
    )
    .bind(balance.consumed)
    .bind(balance.reserved)
    .bind(balance.employee_id)
    .bind(&balance.leave_type)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/* =========================
Create leave request (reserves balance)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave request submitted, units reserved", body = Object,
         example = json!({"message": "Leave request submitted", "status": "pending"})),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;

    if payload.start_date > payload.end_date {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "start_date cannot be after end_date"
        })));
    }
    let today = Utc::now().with_timezone(&config.tz()).date_naive();
    if payload.start_date < today {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Cannot request leave for past dates"
        })));
    }

    let units = (payload.end_date - payload.start_date).num_days() + 1;
    let leave_type = payload.leave_type.to_string();

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    // Open requests hold balance; a second request over the same days
    // would reserve (and on approval consume) those days twice.
    let open_requests = sqlx::query_as::<_, LeaveRequest>(
        r#"
        SELECT id, employee_id, start_date, end_date, leave_type, status, created_at
        FROM leave_requests
        WHERE employee_id = ? AND status IN ('pending', 'approved')
        FOR UPDATE
        "#,
    )
    .bind(employee_id)
    .fetch_all(&mut *tx)
    .await
    .map_err(AppError::from)?;

    if open_requests
        .iter()
        .any(|r| r.overlaps(payload.start_date, payload.end_date))
    {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Leave request conflicts with existing approved/pending leave"
        })));
    }

    let balance = lock_balance(&mut tx, employee_id, &leave_type).await?;
    let updated = ledger::reserve(&balance, units).map_err(AppError::from)?;
    store_balance(&mut tx, &updated).await?;

    sqlx::query(
        r#"
        INSERT INTO leave_requests (employee_id, start_date, end_date, leave_type, status)
        VALUES (?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(employee_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&leave_type)
    .execute(&mut *tx)
    .await
    .map_err(AppError::from)?;

    tx.commit().await.map_err(AppError::from)?;

    tracing::info!(employee_id, units, leave_type = %leave_type, "Leave request submitted");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request submitted",
        "status": "pending"
    })))
}

/* =========================
Approve leave (HR/Admin) — commits the reservation
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved, reservation committed", body = Object,
         example = json!({"message": "Leave approved"})),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already processed (double commit)"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let leave_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let request = sqlx::query_as::<_, LeaveRequest>(
        r#"
        SELECT id, employee_id, start_date, end_date, leave_type, status, created_at
        FROM leave_requests
        WHERE id = ?
        FOR UPDATE
        "#,
    )
    .bind(leave_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(AppError::from)?
    .ok_or_else(|| AppError::NotFound("Leave request not found".to_string()))?;

    // The request id is the idempotency key: the status-gated update
    // succeeds exactly once.
    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = 'approved'
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(leave_id)
    .execute(&mut *tx)
    .await
    .map_err(AppError::from)?;

    if result.rows_affected() == 0 {
        return Err(AppError::from(BalanceError::DoubleCommit).into());
    }

    let balance = lock_balance(&mut tx, request.employee_id, &request.leave_type).await?;
    let updated = ledger::commit(&balance, request.units()).map_err(AppError::from)?;
    store_balance(&mut tx, &updated).await?;

    tx.commit().await.map_err(AppError::from)?;

    tracing::info!(leave_id, employee_id = request.employee_id, "Leave approved");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave approved"
    })))
}

/* =========================
Reject leave (HR/Admin) — releases the reservation
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected, reservation released", body = Object,
         example = json!({"message": "Leave rejected"})),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let leave_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let request = sqlx::query_as::<_, LeaveRequest>(
        r#"
        SELECT id, employee_id, start_date, end_date, leave_type, status, created_at
        FROM leave_requests
        WHERE id = ?
        FOR UPDATE
        "#,
    )
    .bind(leave_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(AppError::from)?
    .ok_or_else(|| AppError::NotFound("Leave request not found".to_string()))?;

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = 'rejected'
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(leave_id)
    .execute(&mut *tx)
    .await
    .map_err(AppError::from)?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Leave request not found or already processed"
        })));
    }

    let balance = lock_balance(&mut tx, request.employee_id, &request.leave_type).await?;
    let updated = ledger::release(&balance, request.units());
    store_balance(&mut tx, &updated).await?;

    tx.commit().await.map_err(AppError::from)?;

    tracing::info!(leave_id, employee_id = request.employee_id, "Leave rejected");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave rejected"
    })))
}

/* =========================
Cancel own leave (employee) — releases the reservation
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    responses(
        (status = 200, description = "Leave cancelled, reservation released", body = Object,
         example = json!({"message": "Leave request cancelled"})),
        (status = 400, description = "Only pending requests can be cancelled"),
        (status = 404, description = "Leave request not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;

    let leave_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let request = sqlx::query_as::<_, LeaveRequest>(
        r#"
        SELECT id, employee_id, start_date, end_date, leave_type, status, created_at
        FROM leave_requests
        WHERE id = ?
        FOR UPDATE
        "#,
    )
    .bind(leave_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(AppError::from)?
    .ok_or_else(|| AppError::NotFound("Leave request not found".to_string()))?;

    if request.employee_id != employee_id {
        return Err(actix_web::error::ErrorForbidden(
            "Cannot cancel another employee's request",
        ));
    }

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = 'cancelled'
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(leave_id)
    .execute(&mut *tx)
    .await
    .map_err(AppError::from)?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Can only cancel pending requests"
        })));
    }

    let balance = lock_balance(&mut tx, request.employee_id, &request.leave_type).await?;
    let updated = ledger::release(&balance, request.units());
    store_balance(&mut tx, &updated).await?;

    tx.commit().await.map_err(AppError::from)?;

    tracing::info!(leave_id, employee_id, "Leave request cancelled");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request cancelled"
    })))
}

/// Leave balances for the calling employee
#[utoipa::path(
    get,
    path = "/api/v1/leave/balance",
    responses(
        (status = 200, description = "Per-type balances", body = [LeaveBalance]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;

    let balances = sqlx::query_as::<_, LeaveBalance>(
        r#"
        SELECT employee_id, leave_type, entitled, consumed, reserved
        FROM leave_balances
        WHERE employee_id = ?
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(balances))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let leave_id = path.into_inner();

    let leave = sqlx::query_as::<_, LeaveRequest>(
        r#"
        SELECT id, employee_id, start_date, end_date, leave_type, status, created_at
        FROM leave_requests
        WHERE id = ?
        "#,
    )
    .bind(leave_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    match leave {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave request not found"
        }))),
    }
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    // -------------------------
    // Pagination
    // -------------------------
    let (page, per_page, offset) = super::paginate(query.page, query.per_page);

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(emp_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q
        .fetch_one(pool.get_ref())
        .await
        .map_err(AppError::from)?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT id, employee_id, start_date, end_date, leave_type, status, created_at
        FROM leave_requests
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(AppError::from)?;

    // -------------------------
    // Response
    // -------------------------
    let response = LeaveListResponse {
        data: leaves,
        page,
        per_page,
        total,
    };

    Ok(HttpResponse::Ok().json(response))
}
