use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ValidationError;
use crate::model::office::OfficeLocation;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct Coordinate {
    #[schema(example = 37.7749)]
    pub latitude: f64,
    #[schema(example = -122.4194)]
    pub longitude: f64,
}

/// Great-circle (haversine) distance in meters.
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lon1) = (a.latitude.to_radians(), a.longitude.to_radians());
    let (lat2, lon2) = (b.latitude.to_radians(), b.longitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Accepts the coordinate when it falls within the office radius.
pub fn validate_location(
    coordinate: Coordinate,
    office: &OfficeLocation,
) -> Result<(), ValidationError> {
    let distance_m = haversine_m(
        coordinate,
        Coordinate {
            latitude: office.latitude,
            longitude: office.longitude,
        },
    );
    if distance_m <= office.radius_m {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            distance_m,
            allowed_m: office.radius_m,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office_at_origin(radius_m: f64) -> OfficeLocation {
        OfficeLocation {
            id: 1,
            name: "HQ".into(),
            latitude: 0.0,
            longitude: 0.0,
            radius_m,
        }
    }

    // 1 degree of latitude is ~111.2km, so meters / 111_195 gives degrees.
    fn north_of_origin(meters: f64) -> Coordinate {
        Coordinate {
            latitude: meters / 111_195.0,
            longitude: 0.0,
        }
    }

    #[test]
    fn within_radius_passes() {
        let office = office_at_origin(100.0);
        assert!(validate_location(north_of_origin(50.0), &office).is_ok());
    }

    #[test]
    fn beyond_radius_fails_out_of_range() {
        let office = office_at_origin(100.0);
        let err = validate_location(north_of_origin(150.0), &office).unwrap_err();
        match err {
            ValidationError::OutOfRange {
                distance_m,
                allowed_m,
            } => {
                assert_eq!(allowed_m, 100.0);
                assert!((distance_m - 150.0).abs() < 1.0, "got {distance_m}");
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn zero_distance_at_office() {
        let office = office_at_origin(100.0);
        let at_office = Coordinate {
            latitude: 0.0,
            longitude: 0.0,
        };
        assert_eq!(
            haversine_m(
                at_office,
                Coordinate {
                    latitude: 0.0,
                    longitude: 0.0
                }
            ),
            0.0
        );
        assert!(validate_location(at_office, &office).is_ok());
    }

    #[test]
    fn known_city_pair_distance() {
        // SF to LA, roughly 559km.
        let sf = Coordinate {
            latitude: 37.7749,
            longitude: -122.4194,
        };
        let la = Coordinate {
            latitude: 34.0522,
            longitude: -118.2437,
        };
        let d = haversine_m(sf, la);
        assert!((d - 559_000.0).abs() < 5_000.0, "got {d}");
    }
}
