//! Incident review lifecycle.
//!
//! Incidents are created `pending` by the recorder and moved to either
//! `processed` or `false_alarm` when an operator reviews them.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;

/// Placeholder used when camera metadata cannot be resolved.
pub const UNKNOWN_CAMERA_FIELD: &str = "Unknown";

/// Review status of an incident record. Stored as TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Pending,
    Processed,
    FalseAlarm,
}

impl IncidentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::FalseAlarm => "false_alarm",
        }
    }

    /// Parse a stored or query-string status name.
    ///
    /// `"false alarm"` (with a space) is accepted as an alias.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "pending" => Ok(Self::Pending),
            "processed" => Ok(Self::Processed),
            "false_alarm" | "false alarm" => Ok(Self::FalseAlarm),
            other => Err(CoreError::Validation(format!(
                "Unknown incident status '{other}'. Must be one of: pending, processed, false_alarm"
            ))),
        }
    }

    /// Status an incident moves to after operator review.
    pub fn reviewed(is_false_alarm: bool) -> Self {
        if is_false_alarm {
            Self::FalseAlarm
        } else {
            Self::Processed
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row decoding; an unknown stored value fails the read.
impl TryFrom<String> for IncidentStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_name(&value)
    }
}
