use super::GeodeticPoint;

/// Local east, north and up unit vectors at a geodetic latitude/longitude,
/// expressed in ECEF.
fn enu_basis(lat_rad: f64, lon_rad: f64) -> [[f64; 3]; 3] {
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let (sin_lon, cos_lon) = lon_rad.sin_cos();
    [
        [-sin_lon, cos_lon, 0.0],
        [-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat],
        [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat],
    ]
}

/// Rotates a local east/north/up offset into an ECEF offset.
pub fn enu_to_ecef(enu: (f64, f64, f64), lat_rad: f64, lon_rad: f64) -> [f64; 3] {
    let (east, north, up) = enu;
    let [e, n, u] = enu_basis(lat_rad, lon_rad);
    [0, 1, 2].map(|axis| east * e[axis] + north * n[axis] + up * u[axis])
}

/// Satellite position reconstructed from a look angle and slant range seen
/// from `observer`.
pub fn satellite_position_ecef_km(
    observer: &GeodeticPoint,
    azimuth_deg: f64,
    elevation_deg: f64,
    slant_range_km: f64,
) -> [f64; 3] {
    let az = azimuth_deg.to_radians();
    let el = elevation_deg.to_radians();
    let enu = (
        slant_range_km * el.cos() * az.sin(),
        slant_range_km * el.cos() * az.cos(),
        slant_range_km * el.sin(),
    );
    let dr = enu_to_ecef(enu, observer.lat_rad(), observer.lon_rad());
    let origin = observer.position_ecef_km();
    [origin[0] + dr[0], origin[1] + dr[1], origin[2] + dr[2]]
}

/// Sub-satellite point for the satellite seen at the given look angle.
pub fn ground_track_point(
    observer: &GeodeticPoint,
    azimuth_deg: f64,
    elevation_deg: f64,
    slant_range_km: f64,
) -> GeodeticPoint {
    let ecef = satellite_position_ecef_km(observer, azimuth_deg, elevation_deg, slant_range_km);
    GeodeticPoint::from_ecef_km(ecef).on_surface()
}
