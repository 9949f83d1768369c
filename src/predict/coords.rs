use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Mean Earth radius used for the visualization scale.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// WGS-84
const WGS84_A_KM: f64 = 6378.137;
const WGS84_E2: f64 = 0.006_694_379_990_14;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct GeodeticPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

/// Point in the right-handed, y-up visualization frame shared by satellites and
/// ground stations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ScenePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ScenePoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &ScenePoint) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn sub(&self, other: &ScenePoint) -> ScenePoint {
        ScenePoint::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(&self, factor: f64) -> ScenePoint {
        ScenePoint::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn distance_to(&self, other: &ScenePoint) -> f64 {
        self.sub(other).norm()
    }
}

/// Wrap a longitude into (-180, 180].
pub fn normalize_longitude(lon_deg: f64) -> f64 {
    let wrapped = lon_deg.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Greenwich mean sidereal time in radians.
pub fn sidereal_time(instant: DateTime<Utc>) -> f64 {
    sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&instant.naive_utc()))
}

pub fn eci_to_ecef(position_km: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        position_km[0] * cos_gmst + position_km[1] * sin_gmst,
        -position_km[0] * sin_gmst + position_km[1] * cos_gmst,
        position_km[2],
    ]
}

/// Inertial position to latitude/longitude/altitude over the WGS-84 ellipsoid,
/// accounting for Earth's rotation at `instant`.
pub fn eci_to_geodetic(position_km: [f64; 3], instant: DateTime<Utc>) -> GeodeticPosition {
    let [x, y, z] = eci_to_ecef(position_km, sidereal_time(instant));
    ecef_to_geodetic([x, y, z])
}

pub fn ecef_to_geodetic(ecef_km: [f64; 3]) -> GeodeticPosition {
    let [x, y, z] = ecef_km;
    let r = (x * x + y * y).sqrt();
    let lon = y.atan2(x);

    let mut lat = z.atan2(r);
    let mut c = 1.0;
    for _ in 0..10 {
        let phi = lat;
        let sin_phi = phi.sin();
        c = 1.0 / (1.0 - WGS84_E2 * sin_phi * sin_phi).sqrt();
        lat = (z + WGS84_A_KM * c * WGS84_E2 * sin_phi).atan2(r);
        if (lat - phi).abs() < 1e-12 {
            break;
        }
    }

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    c = 1.0 / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    // cos(lat) vanishes at the poles
    let altitude_km = if cos_lat.abs() > 1e-3 {
        r / cos_lat - WGS84_A_KM * c
    } else {
        z / sin_lat - WGS84_A_KM * c * (1.0 - WGS84_E2)
    };

    GeodeticPosition {
        latitude_deg: lat.to_degrees(),
        longitude_deg: normalize_longitude(lon.to_degrees()),
        altitude_km,
    }
}

/// Geodetic coordinate onto a sphere of `radius` in the visualization frame.
/// phi = 90 - lat, theta = lon + 180; x = -r sin(phi) cos(theta), y = r cos(phi),
/// z = r sin(phi) sin(theta).
pub fn geodetic_to_scene(lat_deg: f64, lon_deg: f64, radius: f64) -> ScenePoint {
    let phi = (90.0 - lat_deg).to_radians();
    let theta = (lon_deg + 180.0).to_radians();
    ScenePoint {
        x: -radius * phi.sin() * theta.cos(),
        y: radius * phi.cos(),
        z: radius * phi.sin() * theta.sin(),
    }
}

/// Linear km to scene-unit scaling, `scene_radius / EARTH_RADIUS_KM`.
pub fn km_to_scene(vector_km: [f64; 3], scene_radius: f64) -> ScenePoint {
    let factor = scene_radius / EARTH_RADIUS_KM;
    ScenePoint::new(vector_km[0], vector_km[1], vector_km[2]).scale(factor)
}

/// Satellite position in the same frame and scale as the ground stations.
pub fn satellite_scene_point(position: &GeodeticPosition, scene_radius: f64) -> ScenePoint {
    let radius = scene_radius * (EARTH_RADIUS_KM + position.altitude_km) / EARTH_RADIUS_KM;
    geodetic_to_scene(position.latitude_deg, position.longitude_deg, radius)
}

pub fn geodetic_to_ecef(lat_deg: f64, lon_deg: f64, alt_km: f64) -> [f64; 3] {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    [
        (n + alt_km) * cos_lat * lon.cos(),
        (n + alt_km) * cos_lat * lon.sin(),
        (n * (1.0 - WGS84_E2) + alt_km) * sin_lat,
    ]
}

/// East/north/up components of an ECEF offset seen from (lat, lon).
pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
