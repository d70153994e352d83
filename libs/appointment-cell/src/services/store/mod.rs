// libs/appointment-cell/src/services/store/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use schedule_cell::models::TimeSlot;

use crate::models::{Appointment, AppointmentError, AppointmentFilter, AppointmentStats, AppointmentStatus};

mod memory;
mod supabase;

pub use memory::InMemoryAppointmentStore;
pub use supabase::SupabaseAppointmentStore;

/// Appointment persistence. Implementations reject an insert or reschedule
/// that would overlap another non-cancelled appointment on the same resource
/// with [`AppointmentError::SlotConflict`], independently of the callers'
/// own checks.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError>;

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError>;

    /// Non-cancelled appointments on `resource_id` overlapping `window`,
    /// ordered by start time.
    async fn active_in_range(
        &self,
        resource_id: Uuid,
        window: TimeSlot,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Moves the appointment to `new_status` only if it is still in
    /// `expected`; otherwise fails with `InvalidStatusTransition` carrying the
    /// status actually found.
    async fn update_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError>;

    /// Moves the appointment to `slot`, guarded on `expected` like
    /// [`AppointmentStore::update_status`].
    async fn reschedule(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        slot: TimeSlot,
    ) -> Result<Appointment, AppointmentError>;

    async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError>;

    /// Counts over every stored appointment, with `expired` judged at `now`.
    async fn stats(&self, now: DateTime<Utc>) -> Result<AppointmentStats, AppointmentError>;

    /// Cheap round trip to the backing store, for health checks.
    async fn ping(&self) -> Result<(), AppointmentError>;
}
