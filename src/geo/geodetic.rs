use serde::{Deserialize, Serialize};

pub const MEAN_EARTH_RADIUS_KM: f64 = 6371.0;

// WGS-84
const WGS84_A_KM: f64 = 6378.137;
const WGS84_E2: f64 = 0.00669437999014;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeodeticPoint {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

impl GeodeticPoint {
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_m: 0.0,
        }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn is_valid(&self) -> bool {
        self.latitude_deg.is_finite()
            && self.longitude_deg.is_finite()
            && self.altitude_m.is_finite()
            && (-90.0..=90.0).contains(&self.latitude_deg)
            && (-180.0..=360.0).contains(&self.longitude_deg)
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * lon.cos(),
            (n + alt_km) * cos_lat * lon.sin(),
            (n * (1.0 - WGS84_E2) + alt_km) * sin_lat,
        ]
    }

    /// Inverse of [`GeodeticPoint::position_ecef_km`], iterating on latitude.
    pub fn from_ecef_km(ecef: [f64; 3]) -> Self {
        let [x, y, z] = ecef;
        let p = (x * x + y * y).sqrt();
        let lon = y.atan2(x);

        let mut lat = z.atan2(p * (1.0 - WGS84_E2));
        let mut alt_km = 0.0;
        for _ in 0..5 {
            let sin_lat = lat.sin();
            let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
            alt_km = if lat.cos().abs() > 1e-9 {
                p / lat.cos() - n
            } else {
                z.abs() - n * (1.0 - WGS84_E2)
            };
            lat = z.atan2(p * (1.0 - WGS84_E2 * n / (n + alt_km)));
        }

        Self {
            latitude_deg: lat.to_degrees(),
            longitude_deg: lon.to_degrees(),
            altitude_m: alt_km * 1000.0,
        }
    }

    /// Same point projected onto the surface.
    pub fn on_surface(&self) -> Self {
        Self {
            altitude_m: 0.0,
            ..*self
        }
    }
}

/// Great-circle distance on a sphere of mean Earth radius. Altitude is ignored.
///
/// A non-finite coordinate yields NaN rather than a distance.
pub fn haversine_km(a: &GeodeticPoint, b: &GeodeticPoint) -> f64 {
    let dlat = b.lat_rad() - a.lat_rad();
    let dlon = b.lon_rad() - a.lon_rad();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat_rad().cos() * b.lat_rad().cos() * (dlon / 2.0).sin().powi(2);
    // rounding can push h just past 1; NaN fails the comparison and stays NaN
    let h = if h > 1.0 { 1.0 } else { h };
    2.0 * MEAN_EARTH_RADIUS_KM * h.sqrt().asin()
}
