// libs/admin-cell/src/services/panel.rs
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentError, AppointmentStats, BookAppointmentRequest, CancellationActor,
    RescheduleAppointmentRequest,
};
use appointment_cell::services::AppointmentBookingService;
use schedule_cell::services::ScheduleRuleService;

use crate::models::{AdminAction, AdminActionResult, AppointmentQueryParams, DEFAULT_RECENT_LIMIT, MAX_PAGE_SIZE};

/// Thin layer the admin routes call into. Appointment work goes through the
/// booking workflow, calendar edits through the rule service.
pub struct AdminPanelService {
    booking: Arc<AppointmentBookingService>,
    rules: Arc<ScheduleRuleService>,
}

impl AdminPanelService {
    pub fn new(booking: Arc<AppointmentBookingService>, rules: Arc<ScheduleRuleService>) -> Self {
        Self { booking, rules }
    }

    pub fn rules(&self) -> &ScheduleRuleService {
        &self.rules
    }

    pub async fn apply_action(
        &self,
        appointment_id: Uuid,
        action: AdminAction,
    ) -> Result<AdminActionResult, AppointmentError> {
        info!("Admin action {} on appointment {}", action.name(), appointment_id);

        let (appointment, whatsapp_url) = match &action {
            AdminAction::Confirm => {
                let notice = self.booking.confirm_appointment(appointment_id).await?;
                (notice.appointment, notice.whatsapp_url)
            }
            AdminAction::Cancel { reason } => {
                let cancelled = self
                    .booking
                    .cancel_appointment(appointment_id, CancellationActor::Admin, reason.clone())
                    .await?;
                (cancelled, None)
            }
            AdminAction::MarkAttended => (self.booking.mark_attended(appointment_id).await?, None),
        };

        Ok(AdminActionResult {
            action: action.name().to_string(),
            appointment,
            whatsapp_url,
        })
    }

    pub async fn list_appointments(
        &self,
        params: AppointmentQueryParams,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.booking.list_appointments(&params.into_filter()).await
    }

    pub async fn recent_appointments(&self, limit: Option<usize>) -> Result<Vec<Appointment>, AppointmentError> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, MAX_PAGE_SIZE);
        self.booking.recent_appointments(limit).await
    }

    pub async fn stats(&self) -> Result<AppointmentStats, AppointmentError> {
        self.booking.get_appointment_stats().await
    }

    pub async fn create_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        self.booking.create_confirmed(request).await
    }

    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        self.booking.reschedule_appointment(appointment_id, request).await
    }

    pub async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.booking.delete_appointment(appointment_id).await
    }
}
