use std::f64::consts::PI;

use super::atmosphere::AtmosphereModel;
use super::error::SignalError;
use super::types::{GeometricSample, LinkParameters, QualityGrade, SignalSample};

pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;
pub const HORIZON_FLOOR_RSRP_DBM: f64 = -140.0;
pub const MIN_RECEIVABLE_ELEVATION_DEG: f64 = 5.0;

const ELEVATION_MARGIN_START_DEG: f64 = 20.0;
const ELEVATION_MARGIN_DB_PER_DEG: f64 = 0.2;
const BOLTZMANN_DBW_K_HZ: f64 = -228.6;

pub fn free_space_path_loss_db(slant_range_km: f64, frequency_ghz: f64) -> f64 {
    let wavelength_m = SPEED_OF_LIGHT_M_S / (frequency_ghz * 1e9);
    let distance_m = slant_range_km * 1000.0;
    20.0 * (4.0 * PI * distance_m / wavelength_m).log10()
}

pub fn elevation_loss_db(elevation_deg: f64) -> f64 {
    if elevation_deg < ELEVATION_MARGIN_START_DEG {
        (ELEVATION_MARGIN_START_DEG - elevation_deg) * ELEVATION_MARGIN_DB_PER_DEG
    } else {
        0.0
    }
}

pub fn carrier_to_noise_db_hz(rsrp_dbm: f64, system_noise_temp_k: f64) -> f64 {
    let received_dbw = rsrp_dbm - 30.0;
    received_dbw - (BOLTZMANN_DBW_K_HZ + 10.0 * system_noise_temp_k.log10())
}

/// Stateless RSRP estimator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalModel {
    pub atmosphere: AtmosphereModel,
}

impl SignalModel {
    pub fn new(atmosphere: AtmosphereModel) -> Self {
        Self { atmosphere }
    }

    pub fn compute(
        &self,
        sample: &GeometricSample,
        params: &LinkParameters,
    ) -> Result<SignalSample, SignalError> {
        sample.validate()?;

        let atmospheric_loss_db = self
            .atmosphere
            .attenuation(sample.elevation_deg, params.frequency_ghz);

        if sample.elevation_deg < MIN_RECEIVABLE_ELEVATION_DEG {
            return Ok(SignalSample {
                satellite_id: sample.satellite_id.clone(),
                timestamp: sample.timestamp,
                elevation_deg: sample.elevation_deg,
                rsrp_dbm: HORIZON_FLOOR_RSRP_DBM,
                atmospheric_loss_db,
                path_loss_db: None,
                elevation_loss_db: 0.0,
                carrier_to_noise_db_hz: carrier_to_noise_db_hz(
                    HORIZON_FLOOR_RSRP_DBM,
                    params.system_noise_temp_k,
                ),
                quality_grade: QualityGrade::VeryPoor,
            });
        }

        let path_loss_db = free_space_path_loss_db(sample.slant_range_km, params.frequency_ghz);
        let elevation_loss_db = elevation_loss_db(sample.elevation_deg);
        let rsrp_dbm = params.eirp_dbm + params.antenna_gain_dbi
            - path_loss_db
            - atmospheric_loss_db
            - elevation_loss_db;

        if !rsrp_dbm.is_finite() {
            return Err(SignalError::InvalidGeometry {
                satellite_id: sample.satellite_id.clone(),
                reason: format!("received power is not finite: {rsrp_dbm}"),
            });
        }

        Ok(SignalSample {
            satellite_id: sample.satellite_id.clone(),
            timestamp: sample.timestamp,
            elevation_deg: sample.elevation_deg,
            rsrp_dbm,
            atmospheric_loss_db,
            path_loss_db: Some(path_loss_db),
            elevation_loss_db,
            carrier_to_noise_db_hz: carrier_to_noise_db_hz(rsrp_dbm, params.system_noise_temp_k),
            quality_grade: QualityGrade::from_rsrp(rsrp_dbm),
        })
    }
}
