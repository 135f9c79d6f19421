pub mod camera_repo;
pub mod incident_repo;

pub use camera_repo::CameraRepo;
pub use incident_repo::IncidentRepo;
