use serde::Deserialize;

use crate::predict::coords::{ecef_to_enu, geodetic_to_ecef, GeodeticPosition, ScenePoint};

/// Straight-line sanity bound, in multiples of the ground station's distance from
/// the Earth's centre (i.e. scene radii).
pub const DEFAULT_MAX_RANGE_RADII: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationModel {
    /// Angle at the station between Earth's centre and the satellite, minus 90.
    /// Assumes the station sits on the same sphere as the scene.
    #[default]
    Spherical,
    /// East/north/up elevation over the WGS-84 ellipsoid.
    Topocentric,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityPolicy {
    pub min_elevation_deg: f64,
    pub max_range_radii: f64,
}

/// Elevation of `sat` above the local horizon of `gs`, both in scene space.
/// Coincident or degenerate points report -90; never NaN.
pub fn elevation_deg(sat: &ScenePoint, gs: &ScenePoint) -> f64 {
    let to_center = gs.scale(-1.0);
    let to_sat = sat.sub(gs);
    let denom = to_center.norm() * to_sat.norm();
    if !(denom > 0.0) || !denom.is_finite() {
        return -90.0;
    }

    // floating-point drift can push colinear vectors past +-1
    let cos_angle = (to_center.dot(&to_sat) / denom).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees() - 90.0
}

/// Elevation at or above the policy floor, with the straight-line distance inside
/// the sanity bound.
pub fn is_visible(sat: &ScenePoint, gs: &ScenePoint, policy: &VisibilityPolicy) -> bool {
    let distance = sat.distance_to(gs);
    let max_distance = gs.norm() * policy.max_range_radii;
    if !(distance > 0.0) || !(distance < max_distance) {
        return false;
    }
    elevation_deg(sat, gs) >= policy.min_elevation_deg
}

/// Coarse range-only check with no horizon test.
pub fn is_within_range(sat: &ScenePoint, gs: &ScenePoint, max_distance: f64) -> bool {
    let distance = sat.distance_to(gs);
    distance.is_finite() && distance <= max_distance
}

/// Topocentric elevation of a satellite seen from a station at sea level.
pub fn topocentric_elevation_deg(sat: &GeodeticPosition, station_lat_deg: f64, station_lon_deg: f64) -> f64 {
    let sat_ecef = geodetic_to_ecef(sat.latitude_deg, sat.longitude_deg, sat.altitude_km);
    let sta_ecef = geodetic_to_ecef(station_lat_deg, station_lon_deg, 0.0);
    let dr = [
        sat_ecef[0] - sta_ecef[0],
        sat_ecef[1] - sta_ecef[1],
        sat_ecef[2] - sta_ecef[2],
    ];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();
    if !(range_km > 0.0) {
        return -90.0;
    }

    let (_, _, up) = ecef_to_enu(dr, station_lat_deg.to_radians(), station_lon_deg.to_radians());
    (up / range_km).clamp(-1.0, 1.0).asin().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::coords::{geodetic_to_scene, satellite_scene_point};

    fn above(min_elevation_deg: f64) -> VisibilityPolicy {
        VisibilityPolicy {
            min_elevation_deg,
            max_range_radii: DEFAULT_MAX_RANGE_RADII,
        }
    }

    #[test]
    fn directly_overhead_is_zenith() {
        let gs = geodetic_to_scene(48.1, 11.6, 1.0);
        for k in [1.01, 1.06, 2.0, 6.6] {
            let sat = gs.scale(k);
            let el = elevation_deg(&sat, &gs);
            assert!(!el.is_nan());
            assert!((el - 90.0).abs() < 1e-4, "k={} el={}", k, el);
            assert!(is_visible(&sat, &gs, &above(89.9)));
            assert!(is_visible(&sat, &gs, &above(10.0)));
            assert!(is_visible(&sat, &gs, &above(-90.0)));
        }
    }

    #[test]
    fn coincident_points_do_not_panic() {
        let gs = geodetic_to_scene(0.0, 0.0, 1.0);
        assert_eq!(elevation_deg(&gs, &gs), -90.0);
        assert!(!is_visible(&gs, &gs, &above(-90.0)));
    }

    #[test]
    fn antipodal_satellite_is_below_horizon() {
        let gs = geodetic_to_scene(10.0, 20.0, 1.0);
        let sat = geodetic_to_scene(-10.0, -160.0, 1.08);
        assert!(elevation_deg(&sat, &gs) < -80.0);
        assert!(!is_visible(&sat, &gs, &above(0.0)));
    }

    #[test]
    fn horizon_geometry() {
        // satellite displaced along the local horizon: elevation ~ 0
        let gs = ScenePoint::new(1.0, 0.0, 0.0);
        let sat = ScenePoint::new(1.0, 0.5, 0.0);
        assert!(elevation_deg(&sat, &gs).abs() < 1e-9);
        assert!(is_visible(&sat, &gs, &above(0.0)));
        assert!(!is_visible(&sat, &gs, &above(0.1)));
    }

    #[test]
    fn range_bound_rejects_far_points() {
        let gs = geodetic_to_scene(0.0, 0.0, 1.0);
        let far = gs.scale(20.0);
        assert!(!is_visible(&far, &gs, &above(0.0)));

        let policy = VisibilityPolicy {
            min_elevation_deg: 0.0,
            max_range_radii: 25.0,
        };
        assert!(is_visible(&far, &gs, &policy));
    }

    #[test]
    fn range_only_check_ignores_horizon() {
        let gs = geodetic_to_scene(0.0, 0.0, 1.0);
        // just below the horizon but close
        let sat = geodetic_to_scene(0.0, 5.0, 1.0);
        assert!(elevation_deg(&sat, &gs) < 0.0);
        assert!(is_within_range(&sat, &gs, 0.2));
        assert!(!is_within_range(&sat, &gs, 0.05));
    }

    #[test]
    fn topocentric_agrees_overhead_and_far_side() {
        let overhead = GeodeticPosition {
            latitude_deg: 0.0,
            longitude_deg: 30.0,
            altitude_km: 500.0,
        };
        assert!((topocentric_elevation_deg(&overhead, 0.0, 30.0) - 90.0).abs() < 1e-4);

        let far = GeodeticPosition {
            latitude_deg: 0.0,
            longitude_deg: -150.0,
            altitude_km: 500.0,
        };
        assert!(topocentric_elevation_deg(&far, 0.0, 30.0) < -45.0);

        let sat = satellite_scene_point(&overhead, 1.0);
        let gs = geodetic_to_scene(0.0, 30.0, 1.0);
        assert!((elevation_deg(&sat, &gs) - 90.0).abs() < 1e-4);
    }
}
