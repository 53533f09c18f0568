use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, Transaction};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::core::geo::{self, Coordinate};
use crate::core::qr;
use crate::core::state::{self, DayState, WorkSchedule};
use crate::db::is_duplicate_key;
use crate::error::{AppError, StateError, ValidationError};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, ValidationMethod};
use crate::model::office::OfficeLocation;
use crate::model::qr_token::QrToken;
use crate::notify::{self, NotificationKind};

#[derive(Deserialize, ToSchema)]
pub struct CheckPayload {
    /// Target office when validating by coordinate.
    #[schema(example = 1)]
    pub office_id: Option<u64>,
    #[schema(example = 37.7749)]
    pub latitude: Option<f64>,
    #[schema(example = -122.4194)]
    pub longitude: Option<f64>,
    /// Scanned QR code; replaces (or complements, depending on policy)
    /// the coordinate.
    #[schema(example = "QR_HQ_3f2a9c1e")]
    pub qr_code: Option<String>,
    /// Client-reported local time; server local time when absent.
    #[schema(value_type = Option<String>, format = "date-time")]
    pub timestamp: Option<NaiveDateTime>,
}

impl CheckPayload {
    fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CheckResponse {
    pub message: String,
    #[schema(example = "present")]
    pub status: String,
    #[schema(value_type = Option<i64>, example = 540)]
    pub worked_minutes: Option<i64>,
    pub early_departure: Option<bool>,
}

/// Resolves the payload to a validation method, running the geolocation
/// and/or QR validators. Nothing is written before this succeeds.
async fn validate_payload(
    pool: &MySqlPool,
    config: &Config,
    payload: &CheckPayload,
    now: NaiveDateTime,
) -> Result<ValidationMethod, AppError> {
    if let Some(code) = payload.qr_code.as_deref() {
        let token = sqlx::query_as::<_, QrToken>(
            "SELECT code, office_id, is_active, expires_at FROM qr_tokens WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(pool)
        .await?
        .ok_or(ValidationError::InvalidToken)?;

        let scan = qr::validate_token(&token, now)?;

        if config.qr_requires_location {
            let coordinate = payload.coordinate().ok_or_else(|| {
                AppError::BadRequest("Coordinate required alongside QR code".to_string())
            })?;
            let office = fetch_office(pool, scan.office_id).await?;
            geo::validate_location(coordinate, &office)?;
        }

        return Ok(ValidationMethod::Qr);
    }

    let coordinate = payload
        .coordinate()
        .ok_or_else(|| AppError::BadRequest("Provide a coordinate or a QR code".to_string()))?;
    let office_id = payload
        .office_id
        .ok_or_else(|| AppError::BadRequest("office_id required with coordinate".to_string()))?;
    let office = fetch_office(pool, office_id).await?;
    geo::validate_location(coordinate, &office)?;

    Ok(ValidationMethod::Location)
}

async fn fetch_office(pool: &MySqlPool, office_id: u64) -> Result<OfficeLocation, AppError> {
    sqlx::query_as::<_, OfficeLocation>(
        "SELECT id, name, latitude, longitude, radius_m FROM offices WHERE id = ?",
    )
    .bind(office_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Office not found".to_string()))
}

/// Row lock on the employee-day record; serializes concurrent check-in/out
/// for the same employee.
async fn lock_today(
    tx: &mut Transaction<'_, MySql>,
    employee_id: u64,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, AppError> {
    let record = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, employee_id, date, check_in, check_out, method, status
        FROM attendance
        WHERE employee_id = ? AND date = ?
        FOR UPDATE
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(record)
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = CheckPayload,
    responses(
        (status = 200, description = "Checked in successfully", body = CheckResponse),
        (status = 400, description = "Validation or state failure (out of range, bad QR, already checked in)"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CheckPayload>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;

    let now = payload
        .timestamp
        .unwrap_or_else(|| Utc::now().with_timezone(&config.tz()).naive_local());
    let today = now.date();

    let method = validate_payload(pool.get_ref(), config.get_ref(), &payload, now).await?;

    let schedule = WorkSchedule::from_config(config.get_ref());

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let existing = lock_today(&mut tx, employee_id, today).await?;
    let outcome = state::check_in(DayState::from_record(existing.as_ref()), now, &schedule)
        .map_err(AppError::from)?;

    let insert = sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, date, check_in, method, status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(today)
    .bind(outcome.time)
    .bind(method.to_string())
    .bind(outcome.status.to_string())
    .execute(&mut *tx)
    .await;

    match insert {
        Ok(_) => tx.commit().await.map_err(AppError::from)?,
        // Race loser on the unique (employee_id, date) key.
        Err(e) if is_duplicate_key(&e) => {
            return Err(AppError::from(StateError::AlreadyCheckedIn).into());
        }
        Err(e) => return Err(AppError::from(e).into()),
    }

    if outcome.status == AttendanceStatus::Late {
        notify::notify(
            pool.get_ref(),
            employee_id,
            NotificationKind::LateArrival,
            format!("Late check-in at {}", outcome.time),
        );
    }

    tracing::info!(employee_id, status = %outcome.status, "Checked in");

    Ok(HttpResponse::Ok().json(CheckResponse {
        message: "Checked in successfully".to_string(),
        status: outcome.status.to_string(),
        worked_minutes: None,
        early_departure: None,
    }))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    request_body = CheckPayload,
    responses(
        (status = 200, description = "Checked out successfully", body = CheckResponse),
        (status = 400, description = "Validation or state failure (not checked in, already completed)"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CheckPayload>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;

    let now = payload
        .timestamp
        .unwrap_or_else(|| Utc::now().with_timezone(&config.tz()).naive_local());
    let today = now.date();

    validate_payload(pool.get_ref(), config.get_ref(), &payload, now).await?;

    let schedule = WorkSchedule::from_config(config.get_ref());

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let existing = lock_today(&mut tx, employee_id, today).await?;
    let day_state = DayState::from_record(existing.as_ref());

    // The record invariant requires check-out strictly after check-in.
    if let DayState::CheckedIn { check_in } = day_state {
        if now <= check_in {
            return Err(AppError::BadRequest(
                "Check-out time must be after check-in time".to_string(),
            )
            .into());
        }
    }

    let check_in_status = existing
        .as_ref()
        .and_then(|r| AttendanceStatus::from_str(&r.status).ok())
        .unwrap_or(AttendanceStatus::Present);

    let outcome = state::check_out(day_state, now, &schedule, check_in_status)
        .map_err(AppError::from)?;

    sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?, status = ?
        WHERE employee_id = ? AND date = ? AND check_out IS NULL
        "#,
    )
    .bind(outcome.time)
    .bind(outcome.status.to_string())
    .bind(employee_id)
    .bind(today)
    .execute(&mut *tx)
    .await
    .map_err(AppError::from)?;
    tx.commit().await.map_err(AppError::from)?;

    if outcome.early_departure {
        notify::notify(
            pool.get_ref(),
            employee_id,
            NotificationKind::EarlyDeparture,
            format!("Early departure at {}", outcome.time),
        );
    }

    tracing::info!(
        employee_id,
        worked_minutes = outcome.worked.num_minutes(),
        "Checked out"
    );

    Ok(HttpResponse::Ok().json(CheckResponse {
        message: "Checked out successfully".to_string(),
        status: outcome.status.to_string(),
        worked_minutes: Some(outcome.worked.num_minutes()),
        early_departure: Some(outcome.early_departure),
    }))
}

/// Today's attendance record for the caller
#[utoipa::path(
    get,
    path = "/api/v1/attendance/today",
    responses(
        (status = 200, description = "Today's record", body = AttendanceRecord),
        (status = 404, description = "No record yet today"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let today = Utc::now().with_timezone(&config.tz()).date_naive();

    let record = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, employee_id, date, check_in, check_out, method, status
        FROM attendance
        WHERE employee_id = ? AND date = ?
        "#,
    )
    .bind(employee_id)
    .bind(today)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    match record {
        Some(r) => Ok(HttpResponse::Ok().json(r)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "No attendance record for today"
        }))),
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct HistoryFilter {
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-31", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

/// Paginated attendance history for the caller
#[utoipa::path(
    get,
    path = "/api/v1/attendance/history",
    params(HistoryFilter),
    responses(
        (status = 200, description = "Paginated attendance history", body = HistoryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HistoryFilter>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;

    let (page, per_page, offset) = super::paginate(query.page, query.per_page);

    let mut where_sql = String::from(" WHERE employee_id = ?");
    if query.start_date.is_some() {
        where_sql.push_str(" AND date >= ?");
    }
    if query.end_date.is_some() {
        where_sql.push_str(" AND date <= ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM attendance{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql).bind(employee_id);
    if let Some(d) = query.start_date {
        count_q = count_q.bind(d);
    }
    if let Some(d) = query.end_date {
        count_q = count_q.bind(d);
    }
    let total = count_q
        .fetch_one(pool.get_ref())
        .await
        .map_err(AppError::from)?;

    let data_sql = format!(
        r#"
        SELECT id, employee_id, date, check_in, check_out, method, status
        FROM attendance
        {}
        ORDER BY date DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, AttendanceRecord>(&data_sql).bind(employee_id);
    if let Some(d) = query.start_date {
        data_q = data_q.bind(d);
    }
    if let Some(d) = query.end_date {
        data_q = data_q.bind(d);
    }
    let data = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(HistoryResponse {
        data,
        page,
        per_page,
        total,
    }))
}
