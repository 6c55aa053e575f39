//! Great-circle distance and work-unit geofence checks.
//!
//! All functions here are pure. Range validation happens when a
//! [`GeoPoint`] is built, so the distance math itself never fails.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{CoreError, CoreResult, Missing};

/// Mean earth radius used by the Haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema, Display)]
#[display(fmt = "({}, {})", latitude, longitude)]
pub struct GeoPoint {
    #[schema(example = json!(-6.2))]
    pub latitude: f64,
    #[schema(example = 106.816666)]
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> CoreResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::InvalidCoordinate {
                field: "latitude",
                value: latitude.to_string(),
            });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::InvalidCoordinate {
                field: "longitude",
                value: longitude.to_string(),
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parses device-reported coordinate strings.
    pub fn parse(latitude: &str, longitude: &str) -> CoreResult<Self> {
        let lat = parse_degrees("latitude", latitude)?;
        let lon = parse_degrees("longitude", longitude)?;
        Self::new(lat, lon)
    }
}

fn parse_degrees(field: &'static str, raw: &str) -> CoreResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| CoreError::InvalidCoordinate {
            field,
            value: raw.to_string(),
        })
}

/// The allowed check-in area around a work unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkUnitZone {
    pub center: GeoPoint,
    pub radius_meters: f64,
}

impl WorkUnitZone {
    /// Builds a zone from stored work-unit columns, any of which may be unset.
    pub fn from_config(
        latitude: Option<f64>,
        longitude: Option<f64>,
        radius_meters: Option<f64>,
    ) -> CoreResult<Self> {
        let (Some(lat), Some(lon), Some(radius)) = (latitude, longitude, radius_meters) else {
            return Err(CoreError::ConfigurationMissing(Missing::WorkUnitZone));
        };

        let center = GeoPoint::new(lat, lon)?;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(CoreError::InvalidRadius(radius));
        }

        Ok(Self {
            center,
            radius_meters: radius,
        })
    }
}

/// Outcome of a zone evaluation, reported back to the device for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ZoneCheck {
    #[schema(example = 42.7)]
    pub distance_meters: f64,
    #[schema(example = 100.0)]
    pub radius_meters: f64,
    pub inside: bool,
}

/// Haversine distance between two points in meters.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let half_chord = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push the term a hair past 1 for antipodal points
    let half_chord = half_chord.clamp(0.0, 1.0);
    let angle = 2.0 * half_chord.sqrt().atan2((1.0 - half_chord).sqrt());

    EARTH_RADIUS_METERS * angle
}

/// Boundary inclusive: a point exactly on the radius is inside.
pub fn is_within_zone(point: GeoPoint, zone: &WorkUnitZone) -> bool {
    distance_meters(point, zone.center) <= zone.radius_meters
}

pub fn evaluate_zone(point: GeoPoint, zone: &WorkUnitZone) -> ZoneCheck {
    let distance = distance_meters(point, zone.center);
    ZoneCheck {
        distance_meters: distance,
        radius_meters: zone.radius_meters,
        inside: distance <= zone.radius_meters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn jakarta_office() -> GeoPoint {
        point(-6.200000, 106.816666)
    }

    #[test]
    fn test_same_point_is_zero_meters() {
        assert_eq!(distance_meters(jakarta_office(), jakarta_office()), 0.0);
    }

    #[test]
    fn test_hundredth_degree_latitude_at_equator() {
        let d = distance_meters(point(0.0, 0.0), point(0.01, 0.0));
        assert!((d - 1113.0).abs() <= 11.13, "got {d}");
    }

    #[test]
    fn test_antipodal_points_are_half_circumference() {
        let d = distance_meters(point(0.0, 0.0), point(0.0, 180.0));
        let expected = std::f64::consts::PI * EARTH_RADIUS_METERS;
        assert!((d - expected).abs() < 1.0);
    }

    #[test]
    fn test_center_is_inside_zero_radius_zone() {
        let zone = WorkUnitZone {
            center: jakarta_office(),
            radius_meters: 0.0,
        };
        assert!(is_within_zone(jakarta_office(), &zone));
    }

    #[test]
    fn test_zone_boundary_is_inclusive() {
        let center = jakarta_office();
        let device = point(-6.201, 106.816666);
        let exact = distance_meters(device, center);

        let on_edge = WorkUnitZone {
            center,
            radius_meters: exact,
        };
        assert!(is_within_zone(device, &on_edge));

        let just_short = WorkUnitZone {
            center,
            radius_meters: exact - 1e-6,
        };
        assert!(!is_within_zone(device, &just_short));
    }

    #[test]
    fn test_device_at_office_is_accepted() {
        let zone = WorkUnitZone {
            center: jakarta_office(),
            radius_meters: 100.0,
        };
        let check = evaluate_zone(jakarta_office(), &zone);
        assert!(check.inside);
        assert_eq!(check.distance_meters, 0.0);
    }

    #[test]
    fn test_device_150m_away_is_rejected_with_distance() {
        let zone = WorkUnitZone {
            center: jakarta_office(),
            radius_meters: 100.0,
        };
        // ~150 m south of the office
        let device = point(-6.2013490, 106.816666);
        let check = evaluate_zone(device, &zone);
        assert!(!check.inside);
        assert!((check.distance_meters - 150.0).abs() < 1.0);
        assert_eq!(check.radius_meters, 100.0);
    }

    #[test]
    fn test_parse_rejects_non_numeric_text() {
        let err = GeoPoint::parse("abc", "106.8").unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidCoordinate {
                field: "latitude",
                value: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_parse_accepts_padded_numbers() {
        let p = GeoPoint::parse(" -6.2 ", "106.816666").unwrap();
        assert_eq!(p, point(-6.2, 106.816666));
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(GeoPoint::new(90.0001, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_zone_from_config_requires_all_parts() {
        assert_eq!(
            WorkUnitZone::from_config(Some(-6.2), None, Some(100.0)),
            Err(CoreError::ConfigurationMissing(Missing::WorkUnitZone))
        );
        assert_eq!(
            WorkUnitZone::from_config(Some(-6.2), Some(106.8), Some(0.0)),
            Err(CoreError::InvalidRadius(0.0))
        );
        assert!(WorkUnitZone::from_config(Some(-6.2), Some(106.8), Some(50.0)).is_ok());
    }

    #[test]
    fn test_display_formats_pair() {
        assert_eq!(point(1.5, -2.25).to_string(), "(1.5, -2.25)");
    }

    fn any_point() -> impl Strategy<Value = GeoPoint> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lon)| point(lat, lon))
    }

    proptest! {
        #[test]
        fn prop_distance_is_symmetric(a in any_point(), b in any_point()) {
            let ab = distance_meters(a, b);
            let ba = distance_meters(b, a);
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn prop_distance_is_finite_and_non_negative(a in any_point(), b in any_point()) {
            let d = distance_meters(a, b);
            prop_assert!(d.is_finite());
            prop_assert!(d >= 0.0);
        }

        #[test]
        fn prop_distance_to_self_is_zero(a in any_point()) {
            prop_assert_eq!(distance_meters(a, a), 0.0);
        }

        #[test]
        fn prop_center_always_inside(c in any_point(), r in 0.0f64..1_000_000.0) {
            let zone = WorkUnitZone { center: c, radius_meters: r };
            prop_assert!(is_within_zone(c, &zone));
        }
    }
}
