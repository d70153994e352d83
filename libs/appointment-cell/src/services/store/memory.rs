use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use schedule_cell::models::TimeSlot;

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentOrder, AppointmentStats, AppointmentStatus,
};

use super::AppointmentStore;

/// Process-local appointment table. Overlap checks and writes happen under a
/// single write lock, which plays the part of the database constraint.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<Vec<Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn clashes(rows: &[Appointment], candidate: &Appointment) -> bool {
    rows.iter().any(|existing| {
        existing.id != candidate.id
            && existing.resource_id == candidate.resource_id
            && existing.occupies_slot()
            && existing.slot().overlaps(&candidate.slot())
    })
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut rows = self.appointments.write().await;
        if appointment.occupies_slot() && clashes(&rows, &appointment) {
            return Err(AppointmentError::SlotConflict);
        }
        rows.push(appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .read()
            .await
            .iter()
            .find(|appointment| appointment.id == appointment_id)
            .cloned()
            .ok_or(AppointmentError::NotFound)
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let mut matching: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .iter()
            .filter(|appointment| filter.matches(appointment))
            .cloned()
            .collect();

        match filter.order {
            AppointmentOrder::StartAsc => matching.sort_by_key(|a| (a.start_time, a.created_at)),
            AppointmentOrder::CreatedDesc => matching.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        Ok(matching
            .into_iter()
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn active_in_range(
        &self,
        resource_id: Uuid,
        window: TimeSlot,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut active: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .iter()
            .filter(|a| a.resource_id == resource_id && a.occupies_slot() && a.slot().overlaps(&window))
            .cloned()
            .collect();
        active.sort_by_key(|a| a.start_time);
        Ok(active)
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let mut rows = self.appointments.write().await;
        let appointment = rows
            .iter_mut()
            .find(|appointment| appointment.id == appointment_id)
            .ok_or(AppointmentError::NotFound)?;

        if appointment.status != expected {
            return Err(AppointmentError::InvalidStatusTransition(appointment.status));
        }

        appointment.status = new_status;
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn reschedule(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        slot: TimeSlot,
    ) -> Result<Appointment, AppointmentError> {
        let mut rows = self.appointments.write().await;
        let mut moved = rows
            .iter()
            .find(|appointment| appointment.id == appointment_id)
            .cloned()
            .ok_or(AppointmentError::NotFound)?;

        if moved.status != expected {
            return Err(AppointmentError::InvalidStatusTransition(moved.status));
        }

        moved.start_time = slot.start_time;
        moved.end_time = slot.end_time;
        if clashes(&rows, &moved) {
            return Err(AppointmentError::SlotConflict);
        }

        moved.updated_at = Utc::now();
        if let Some(row) = rows.iter_mut().find(|appointment| appointment.id == appointment_id) {
            *row = moved.clone();
        }
        Ok(moved)
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let mut rows = self.appointments.write().await;
        let before = rows.len();
        rows.retain(|appointment| appointment.id != appointment_id);
        if rows.len() == before {
            return Err(AppointmentError::NotFound);
        }
        Ok(())
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<AppointmentStats, AppointmentError> {
        Ok(AppointmentStats::tally(&self.appointments.read().await, now))
    }

    async fn ping(&self) -> Result<(), AppointmentError> {
        Ok(())
    }
}
