use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, Utc};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::AppError;
use crate::model::qr_token::QrToken;

#[derive(Deserialize, ToSchema)]
pub struct MintQr {
    #[schema(example = 1)]
    pub office_id: u64,
}

/// Mint a QR token for an office (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/qr",
    request_body = MintQr,
    responses(
        (status = 200, description = "Token minted", body = QrToken),
        (status = 404, description = "Office not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "QR"
)]
pub async fn mint(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<MintQr>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let office_name = sqlx::query_scalar::<_, String>("SELECT name FROM offices WHERE id = ?")
        .bind(payload.office_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound("Office not found".to_string()))?;

    let suffix = Uuid::new_v4().to_string();
    let code = format!(
        "QR_{}_{}",
        office_name.to_uppercase().replace(' ', "_"),
        &suffix[..8]
    );
    let expires_at = (Utc::now() + Duration::hours(config.qr_expiry_hours))
        .with_timezone(&config.tz())
        .naive_local();

    sqlx::query(
        r#"
        INSERT INTO qr_tokens (code, office_id, is_active, expires_at)
        VALUES (?, ?, 1, ?)
        "#,
    )
    .bind(&code)
    .bind(payload.office_id)
    .bind(expires_at)
    .execute(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    tracing::info!(office_id = payload.office_id, code = %code, "QR token minted");

    Ok(HttpResponse::Ok().json(QrToken {
        code,
        office_id: payload.office_id,
        is_active: true,
        expires_at,
    }))
}

/// Deactivate a QR token (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/qr/{code}/deactivate",
    params(
        ("code" = String, Path, description = "Token code to deactivate")
    ),
    responses(
        (status = 200, description = "Token deactivated"),
        (status = 404, description = "Token not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "QR"
)]
pub async fn deactivate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let code = path.into_inner();

    let result = sqlx::query("UPDATE qr_tokens SET is_active = 0 WHERE code = ?")
        .bind(&code)
        .execute(pool.get_ref())
        .await
        .map_err(AppError::from)?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "QR token not found"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "QR token deactivated"
    })))
}

/// Active QR tokens (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/v1/qr",
    responses(
        (status = 200, description = "Active tokens", body = [QrToken]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "QR"
)]
pub async fn list_active(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let tokens = sqlx::query_as::<_, QrToken>(
        "SELECT code, office_id, is_active, expires_at FROM qr_tokens WHERE is_active = 1",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(tokens))
}
