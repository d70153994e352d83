// libs/appointment-cell/src/services/conflict.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use schedule_cell::models::TimeSlot;

use crate::models::{Appointment, AppointmentError};
use crate::services::store::AppointmentStore;

/// One async mutex per resource. Booking and rescheduling hold the guard
/// across check-then-write so two requests for the same chair cannot both
/// pass the overlap check.
#[derive(Default)]
pub struct ResourceLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, resource_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries nobody holds or waits on can be recreated on demand.
            locks.retain(|id, lock| *id == resource_id || Arc::strong_count(lock) > 1);
            locks.entry(resource_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Resources currently tracked.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ConflictDetectionService {
    store: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Non-cancelled appointments on the resource overlapping `slot`.
    pub async fn check_conflicts(
        &self,
        resource_id: Uuid,
        slot: TimeSlot,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Checking conflicts for resource {} in {}", resource_id, slot);

        let conflicting: Vec<Appointment> = self
            .store
            .active_in_range(resource_id, slot)
            .await?
            .into_iter()
            .filter(|appointment| Some(appointment.id) != exclude_appointment_id)
            .filter(|appointment| appointment.slot().overlaps(&slot))
            .collect();

        if !conflicting.is_empty() {
            warn!(
                "Conflict detected for resource {} - {} conflicting appointments",
                resource_id,
                conflicting.len()
            );
        }

        Ok(conflicting)
    }

    pub async fn ensure_slot_free(
        &self,
        resource_id: Uuid,
        slot: TimeSlot,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        if self
            .check_conflicts(resource_id, slot, exclude_appointment_id)
            .await?
            .is_empty()
        {
            Ok(())
        } else {
            Err(AppointmentError::SlotConflict)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_resource_waits_for_the_holder() {
        let locks = Arc::new(ResourceLocks::new());
        let chair = Uuid::new_v4();

        let guard = locks.lock(chair).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(chair).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_resources_do_not_block() {
        let locks = ResourceLocks::new();

        let _first = locks.lock(Uuid::new_v4()).await;
        let _second = tokio::time::timeout(Duration::from_millis(50), locks.lock(Uuid::new_v4()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = ResourceLocks::new();

        for _ in 0..10 {
            drop(locks.lock(Uuid::new_v4()).await);
        }
        let held = locks.lock(Uuid::new_v4()).await;
        let _next = locks.lock(Uuid::new_v4()).await;

        // The held lock survives pruning; the ten released ones do not.
        assert_eq!(locks.len(), 2);
        drop(held);
    }
}
