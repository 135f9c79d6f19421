//! Camera registry models and DTOs.

use crashwatch_core::camera::{
    validate_coordinates, validate_required, validate_stream_url, CameraStatus,
};
use crashwatch_core::error::CoreError;
use crashwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `cameras` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Camera {
    pub id: DbId,
    pub name: String,
    pub city: String,
    pub district: String,
    pub ward: String,
    pub street: String,
    pub full_address: String,
    pub stream_url: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Camera {
    pub fn is_working(&self) -> bool {
        self.status == CameraStatus::Working.as_str()
    }
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for registering a camera.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCamera {
    pub name: String,
    pub city: String,
    pub district: String,
    pub ward: String,
    pub street: String,
    pub full_address: String,
    pub stream_url: String,
    #[serde(default)]
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Defaults to `working` when omitted.
    pub status: Option<String>,
}

impl CreateCamera {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_required("name", &self.name)?;
        validate_required("city", &self.city)?;
        validate_required("district", &self.district)?;
        validate_required("ward", &self.ward)?;
        validate_required("street", &self.street)?;
        validate_required("full_address", &self.full_address)?;
        validate_stream_url(&self.stream_url)?;
        validate_coordinates(self.latitude, self.longitude)?;
        if let Some(status) = &self.status {
            CameraStatus::from_name(status)?;
        }
        Ok(())
    }

    pub fn status_or_default(&self) -> &str {
        self.status
            .as_deref()
            .unwrap_or(CameraStatus::Working.as_str())
    }
}

/// DTO for a partial camera update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCamera {
    pub name: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,
    pub street: Option<String>,
    pub full_address: Option<String>,
    pub stream_url: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Option<String>,
}

impl UpdateCamera {
    pub fn validate(&self) -> Result<(), CoreError> {
        let required = [
            ("name", &self.name),
            ("city", &self.city),
            ("district", &self.district),
            ("ward", &self.ward),
            ("street", &self.street),
            ("full_address", &self.full_address),
        ];
        for (field, value) in required {
            if let Some(value) = value {
                validate_required(field, value)?;
            }
        }
        if let Some(url) = &self.stream_url {
            validate_stream_url(url)?;
        }
        if self.latitude.is_some() || self.longitude.is_some() {
            validate_coordinates(self.latitude.unwrap_or(0.0), self.longitude.unwrap_or(0.0))?;
        }
        if let Some(status) = &self.status {
            CameraStatus::from_name(status)?;
        }
        Ok(())
    }

    /// Apply the present fields to an existing row.
    pub fn apply_to(&self, camera: &mut Camera) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field { camera.$field = value.clone(); })*
            };
        }
        merge!(name, city, district, ward, street, full_address, stream_url, description, status);
        if let Some(latitude) = self.latitude {
            camera.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            camera.longitude = longitude;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_create() -> CreateCamera {
        CreateCamera {
            name: "Cau Giay 01".into(),
            city: "Ha Noi".into(),
            district: "Cau Giay".into(),
            ward: "Dich Vong".into(),
            street: "Xuan Thuy".into(),
            full_address: "144 Xuan Thuy, Cau Giay, Ha Noi".into(),
            stream_url: "rtsp://10.0.0.4/live".into(),
            description: String::new(),
            latitude: 21.036,
            longitude: 105.782,
            status: None,
        }
    }

    #[test]
    fn create_defaults_to_working() {
        let input = sample_create();
        assert!(input.validate().is_ok());
        assert_eq!(input.status_or_default(), "working");
    }

    #[test]
    fn create_rejects_blank_address() {
        let input = CreateCamera {
            full_address: " ".into(),
            ..sample_create()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn update_rejects_bad_status() {
        let input = UpdateCamera {
            status: Some("offline".into()),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }
}
