use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "code": "QR_HQ_3f2a9c1e",
    "office_id": 1,
    "is_active": true,
    "expires_at": "2026-01-06T18:00:00"
}))]
pub struct QrToken {
    #[schema(example = "QR_HQ_3f2a9c1e")]
    pub code: String,
    pub office_id: u64,
    pub is_active: bool,
    #[schema(value_type = String, format = "date-time")]
    pub expires_at: NaiveDateTime,
}
