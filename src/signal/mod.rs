mod atmosphere;
mod error;
mod model;
mod types;

pub use atmosphere::AtmosphereModel;
pub use error::SignalError;
pub use model::{
    carrier_to_noise_db_hz, elevation_loss_db, free_space_path_loss_db, SignalModel,
    HORIZON_FLOOR_RSRP_DBM, MIN_RECEIVABLE_ELEVATION_DEG, SPEED_OF_LIGHT_M_S,
};
pub use types::{GeometricSample, LinkParameters, QualityGrade, SatelliteGroup, SignalSample};
