mod geodetic;
mod ground_track;

pub use geodetic::{haversine_km, GeodeticPoint, MEAN_EARTH_RADIUS_KM};
pub use ground_track::{enu_to_ecef, ground_track_point, satellite_position_ecef_km};
