//! Camera registry rules: operational status names and field validation.

use crate::error::CoreError;

/// Stream URL schemes accepted for a camera feed.
const VALID_STREAM_SCHEMES: &[&str] = &["rtsp://", "rtmp://", "http://", "https://", "udp://"];

// ---------------------------------------------------------------------------
// CameraStatus
// ---------------------------------------------------------------------------

/// Operational status of a registered camera.
///
/// Only `Working` cameras are picked up by a bulk start of processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraStatus {
    Working,
    Maintenance,
}

impl CameraStatus {
    /// Stored name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::Maintenance => "maintenance",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "working" => Ok(Self::Working),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(CoreError::Validation(format!(
                "Unknown camera status '{other}'. Must be one of: working, maintenance"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject blank required text fields.
pub fn validate_required(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Accept network stream URLs and absolute file paths.
pub fn validate_stream_url(url: &str) -> Result<(), CoreError> {
    validate_required("stream_url", url)?;
    if url.starts_with('/') || VALID_STREAM_SCHEMES.iter().any(|s| url.starts_with(s)) {
        return Ok(());
    }
    Err(CoreError::Validation(format!(
        "stream_url '{url}' must be an absolute path or use one of: {VALID_STREAM_SCHEMES:?}"
    )))
}

/// WGS84 bounds check.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), CoreError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(CoreError::Validation(format!(
            "latitude {latitude} is outside [-90, 90]"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(CoreError::Validation(format!(
            "longitude {longitude} is outside [-180, 180]"
        )));
    }
    Ok(())
}
