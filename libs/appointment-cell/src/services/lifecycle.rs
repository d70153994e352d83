// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition(current_status));
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current_status {
            AppointmentStatus::Requested => &[
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Attended,
            ],
            AppointmentStatus::Confirmed => &[
                AppointmentStatus::Cancelled,
                AppointmentStatus::Attended,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Attended | AppointmentStatus::Cancelled => &[],
        }
    }

    /// Time and patient details may only change while the visit is pending.
    pub fn can_modify(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        if current_status.is_terminal() {
            warn!("Attempt to modify appointment in terminal status {}", current_status);
            return Err(AppointmentError::InvalidStatusTransition(current_status));
        }
        Ok(())
    }
}
