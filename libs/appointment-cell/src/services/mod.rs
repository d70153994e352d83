pub mod booking;
pub mod busy;
pub mod conflict;
pub mod lifecycle;
pub mod notification;
pub mod store;

pub use booking::AppointmentBookingService;
pub use busy::AppointmentBusySource;
pub use store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
