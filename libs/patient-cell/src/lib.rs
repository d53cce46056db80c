pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use router::patient_routes;
pub use store::{MemoryPatientStore, PatientStore};
