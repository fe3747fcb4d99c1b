use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::error::SignalError;

/// Look angle and range of one satellite from one receiver at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometricSample {
    pub satellite_id: String,
    pub constellation: String,
    #[serde(default)]
    pub orbital_plane: Option<u16>,
    pub timestamp: DateTime<Utc>,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub slant_range_km: f64,
}

impl GeometricSample {
    pub fn group(&self) -> SatelliteGroup {
        SatelliteGroup {
            constellation: self.constellation.clone(),
            orbital_plane: self.orbital_plane,
        }
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        let invalid = |reason: String| SignalError::InvalidGeometry {
            satellite_id: self.satellite_id.clone(),
            reason,
        };

        if !self.slant_range_km.is_finite() || self.slant_range_km <= 0.0 {
            return Err(invalid(format!(
                "slant range must be positive, got {} km",
                self.slant_range_km
            )));
        }
        if !self.elevation_deg.is_finite() || !(-90.0..=90.0).contains(&self.elevation_deg) {
            return Err(invalid(format!(
                "elevation must lie in [-90, 90], got {} deg",
                self.elevation_deg
            )));
        }
        if !self.azimuth_deg.is_finite() {
            return Err(invalid(format!("azimuth is not finite: {}", self.azimuth_deg)));
        }
        Ok(())
    }
}

/// Satellites sharing a constellation and orbital plane.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SatelliteGroup {
    pub constellation: String,
    pub orbital_plane: Option<u16>,
}

/// Radio configuration of one constellation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkParameters {
    pub frequency_ghz: f64,
    pub eirp_dbm: f64,
    pub antenna_gain_dbi: f64,
    pub system_noise_temp_k: f64,
}

impl LinkParameters {
    pub fn validate(&self) -> Result<(), SignalError> {
        if !self.frequency_ghz.is_finite() || self.frequency_ghz <= 0.0 {
            return Err(SignalError::InvalidLink(format!(
                "frequency must be positive, got {} GHz",
                self.frequency_ghz
            )));
        }
        if !self.system_noise_temp_k.is_finite() || self.system_noise_temp_k <= 0.0 {
            return Err(SignalError::InvalidLink(format!(
                "system noise temperature must be positive, got {} K",
                self.system_noise_temp_k
            )));
        }
        if !self.eirp_dbm.is_finite() || !self.antenna_gain_dbi.is_finite() {
            return Err(SignalError::InvalidLink(
                "EIRP and antenna gain must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityGrade {
    pub fn from_rsrp(rsrp_dbm: f64) -> Self {
        if rsrp_dbm >= -80.0 {
            QualityGrade::Excellent
        } else if rsrp_dbm >= -90.0 {
            QualityGrade::Good
        } else if rsrp_dbm >= -100.0 {
            QualityGrade::Fair
        } else if rsrp_dbm >= -110.0 {
            QualityGrade::Poor
        } else {
            QualityGrade::VeryPoor
        }
    }
}

/// Received-signal estimate derived from one [`GeometricSample`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSample {
    pub satellite_id: String,
    pub timestamp: DateTime<Utc>,
    pub elevation_deg: f64,
    pub rsrp_dbm: f64,
    pub atmospheric_loss_db: f64,
    /// `None` when the horizon floor was applied instead of a path loss.
    pub path_loss_db: Option<f64>,
    pub elevation_loss_db: f64,
    pub carrier_to_noise_db_hz: f64,
    pub quality_grade: QualityGrade,
}
