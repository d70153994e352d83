// libs/appointment-cell/src/services/busy.rs
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use schedule_cell::models::{ScheduleError, TimeSlot};
use schedule_cell::services::BusyIntervalSource;

use crate::services::store::AppointmentStore;

/// Feeds non-cancelled appointments to the availability walk.
pub struct AppointmentBusySource {
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentBusySource {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BusyIntervalSource for AppointmentBusySource {
    async fn busy_intervals(
        &self,
        resource_id: Uuid,
        window: TimeSlot,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        let appointments = self
            .store
            .active_in_range(resource_id, window)
            .await
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        Ok(appointments.iter().map(|appointment| appointment.slot()).collect())
    }
}
