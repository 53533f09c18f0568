use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "name": "HQ",
    "latitude": 37.7749,
    "longitude": -122.4194,
    "radius_m": 100.0
}))]
pub struct OfficeLocation {
    pub id: u64,
    #[schema(example = "HQ")]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Allowed check-in radius around the office, in meters.
    pub radius_m: f64,
}
