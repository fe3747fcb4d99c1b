use serde::{Deserialize, Serialize};

use super::error::SignalError;

/// Gas absorption and scattering along a secant slant path.
///
/// Every approximation constant is a field so deployments can audit or tune
/// them through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosphereModel {
    /// Height of the equivalent homogeneous atmosphere.
    pub effective_height_km: f64,
    /// Upper bound on the slant path near the horizon.
    pub max_path_km: f64,
    /// Loss reported for satellites at or below the horizon.
    pub below_horizon_loss_db: f64,
    /// Reference water-vapour density in g/m³.
    pub water_vapor_density_g_m3: f64,
    /// Scattering loss per km of path per GHz.
    pub scattering_db_per_km_ghz: f64,
}

impl Default for AtmosphereModel {
    fn default() -> Self {
        Self {
            effective_height_km: 8.0,
            max_path_km: 40.0,
            below_horizon_loss_db: 100.0,
            water_vapor_density_g_m3: 7.5,
            scattering_db_per_km_ghz: 1e-4,
        }
    }
}

impl AtmosphereModel {
    pub fn validate(&self) -> Result<(), SignalError> {
        let fields = [
            ("effective_height_km", self.effective_height_km),
            ("max_path_km", self.max_path_km),
            ("below_horizon_loss_db", self.below_horizon_loss_db),
            ("water_vapor_density_g_m3", self.water_vapor_density_g_m3),
            ("scattering_db_per_km_ghz", self.scattering_db_per_km_ghz),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(SignalError::InvalidAtmosphere {
                    field: name,
                    reason: format!("must be finite and >= 0, got {value}"),
                });
            }
        }
        if self.effective_height_km == 0.0 {
            return Err(SignalError::InvalidAtmosphere {
                field: "effective_height_km",
                reason: "must be positive".to_string(),
            });
        }
        if self.max_path_km < self.effective_height_km {
            return Err(SignalError::InvalidAtmosphere {
                field: "max_path_km",
                reason: format!("{} is shorter than effective_height_km {}", self.max_path_km, self.effective_height_km),
            });
        }
        Ok(())
    }

    pub fn oxygen_db_per_km(&self, frequency_ghz: f64) -> f64 {
        0.0067 * frequency_ghz.powf(0.8)
    }

    pub fn water_vapor_db_per_km(&self, frequency_ghz: f64) -> f64 {
        0.05 * self.water_vapor_density_g_m3 * (frequency_ghz / 10.0).powf(1.6)
    }

    pub fn slant_path_km(&self, elevation_deg: f64) -> f64 {
        let sin_el = elevation_deg.to_radians().sin();
        if sin_el <= 0.0 {
            return self.max_path_km;
        }
        (self.effective_height_km / sin_el).min(self.max_path_km)
    }

    pub fn attenuation(&self, elevation_deg: f64, frequency_ghz: f64) -> f64 {
        if elevation_deg <= 0.0 {
            return self.below_horizon_loss_db;
        }

        let path_km = self.slant_path_km(elevation_deg);
        let absorption = self.oxygen_db_per_km(frequency_ghz) + self.water_vapor_db_per_km(frequency_ghz);
        let scattering = self.scattering_db_per_km_ghz * frequency_ghz;
        (absorption + scattering) * path_km
    }
}
