pub mod booking;
pub mod queries;

pub use booking::BookingService;
pub use queries::AppointmentQueryService;
