use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::office::OfficeLocation;

#[derive(Deserialize, ToSchema)]
pub struct CreateOffice {
    #[schema(example = "HQ")]
    pub name: String,
    #[schema(example = 37.7749)]
    pub latitude: f64,
    #[schema(example = -122.4194)]
    pub longitude: f64,
    #[schema(example = 100.0)]
    pub radius_m: f64,
}

/// Register an office boundary (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/office",
    request_body = CreateOffice,
    responses(
        (status = 200, description = "Office created", body = Object,
         example = json!({"message": "Office created", "id": 1})),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Office"
)]
pub async fn create_office(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateOffice>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if !(-90.0..=90.0).contains(&payload.latitude)
        || !(-180.0..=180.0).contains(&payload.longitude)
        || payload.radius_m <= 0.0
    {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Invalid coordinate or radius"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO offices (name, latitude, longitude, radius_m)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&payload.name)
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.radius_m)
    .execute(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Office created",
        "id": result.last_insert_id()
    })))
}

/// List office boundaries
#[utoipa::path(
    get,
    path = "/api/v1/office",
    responses(
        (status = 200, description = "Offices", body = [OfficeLocation]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Office"
)]
pub async fn list_offices(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let offices = sqlx::query_as::<_, OfficeLocation>(
        "SELECT id, name, latitude, longitude, radius_m FROM offices",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(offices))
}
