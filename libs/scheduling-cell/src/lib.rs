pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::SchedulingError;
pub use models::*;
pub use router::appointment_routes;
pub use store::{AppointmentStore, MemoryAppointmentStore};
