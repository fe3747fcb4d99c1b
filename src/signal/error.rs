use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("invalid geometry for satellite {satellite_id}: {reason}")]
    InvalidGeometry {
        satellite_id: String,
        reason: String,
    },
    #[error("invalid link parameters: {0}")]
    InvalidLink(String),
    #[error("invalid atmosphere model: {field} {reason}")]
    InvalidAtmosphere {
        field: &'static str,
        reason: String,
    },
}
