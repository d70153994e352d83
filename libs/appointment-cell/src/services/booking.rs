// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use schedule_cell::models::TimeSlot;
use schedule_cell::services::{clinic_offset, AvailabilityService};
use shared_config::{AppConfig, ClinicSettings, SchedulingSettings, MAX_APPOINTMENT_MINUTES};

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStats, AppointmentStatus,
    BookAppointmentRequest, CancellationActor, ConfirmationNotice, RescheduleAppointmentRequest,
};
use crate::services::conflict::{ConflictDetectionService, ResourceLocks};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::notification::{is_phone_like, normalize_phone, same_phone, WhatsAppNotifier};
use crate::services::store::AppointmentStore;

const MAX_NAME_CHARS: usize = 120;
const MAX_SERVICE_CHARS: usize = 100;
const MAX_PHONE_CHARS: usize = 30;
const MAX_MESSAGE_CHARS: usize = 1000;

/// Booking request after validation, ready to be placed on the calendar.
struct ValidatedBooking {
    resource_id: Uuid,
    patient_name: String,
    patient_phone: Option<String>,
    service: String,
    message: Option<String>,
    slot: TimeSlot,
}

pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    availability: Arc<AvailabilityService>,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    locks: ResourceLocks,
    notifier: WhatsAppNotifier,
    clinic: ClinicSettings,
    settings: SchedulingSettings,
}

impl AppointmentBookingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        availability: Arc<AvailabilityService>,
        config: &AppConfig,
    ) -> Self {
        Self {
            conflict_service: ConflictDetectionService::new(store.clone()),
            lifecycle_service: AppointmentLifecycleService::new(),
            locks: ResourceLocks::new(),
            notifier: WhatsAppNotifier::new(config.clinic.clone(), clinic_offset(&config.scheduling)),
            clinic: config.clinic.clone(),
            settings: config.scheduling.clone(),
            store,
            availability,
        }
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    /// Books a slot for a patient. The appointment starts `requested`, or is
    /// stored `confirmed` when the clinic auto-confirms bookings.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let booking = self.validate_booking(request, Utc::now())?;

        if !self.settings.auto_confirm_bookings {
            return self.place(booking, AppointmentStatus::Requested).await;
        }

        let appointment = self.place(booking, AppointmentStatus::Confirmed).await?;
        debug!("Appointment {} auto-confirmed", appointment.id);
        self.notifier.confirmation_link(&appointment);
        Ok(appointment)
    }

    /// Admin booking, created directly as `confirmed`.
    pub async fn create_confirmed(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let booking = self.validate_booking(request, Utc::now())?;
        self.place(booking, AppointmentStatus::Confirmed).await
    }

    async fn place(
        &self,
        booking: ValidatedBooking,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        // Unknown resources are turned away before they get a lock entry.
        self.ensure_bookable(booking.resource_id, booking.slot).await?;

        let _guard = self.locks.lock(booking.resource_id).await;

        self.conflict_service
            .ensure_slot_free(booking.resource_id, booking.slot, None)
            .await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            resource_id: booking.resource_id,
            patient_name: booking.patient_name,
            patient_phone: booking.patient_phone,
            service: booking.service,
            message: booking.message,
            start_time: booking.slot.start_time,
            end_time: booking.slot.end_time,
            status,
            created_at: now,
            updated_at: now,
        };

        let created = self.store.insert(appointment).await?;
        info!(
            "Appointment {} booked for {} on resource {} at {} ({})",
            created.id, created.patient_name, created.resource_id, created.slot(), created.status
        );
        Ok(created)
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store.get(appointment_id).await
    }

    pub async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list(filter).await
    }

    pub async fn recent_appointments(&self, limit: usize) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list(&AppointmentFilter::recent(limit)).await
    }

    pub async fn get_appointment_stats(&self) -> Result<AppointmentStats, AppointmentError> {
        self.store.stats(Utc::now()).await
    }

    pub async fn ping(&self) -> Result<(), AppointmentError> {
        self.store.ping().await
    }

    // ==========================================================================
    // LIFECYCLE
    // ==========================================================================

    /// `requested -> confirmed`. Opening hours, blackouts and overlaps are
    /// checked again against the current calendar, and a WhatsApp link is
    /// produced for the patient.
    pub async fn confirm_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<ConfirmationNotice, AppointmentError> {
        let current = self.store.get(appointment_id).await?;
        self.lifecycle_service
            .validate_status_transition(current.status, AppointmentStatus::Confirmed)?;

        self.ensure_bookable(current.resource_id, current.slot()).await?;

        let confirmed = {
            let _guard = self.locks.lock(current.resource_id).await;
            self.conflict_service
                .ensure_slot_free(current.resource_id, current.slot(), Some(current.id))
                .await?;
            self.store
                .update_status(appointment_id, current.status, AppointmentStatus::Confirmed)
                .await?
        };

        info!("Appointment {} confirmed", appointment_id);
        let whatsapp_url = self.notifier.confirmation_link(&confirmed);

        Ok(ConfirmationNotice {
            appointment: confirmed,
            whatsapp_url,
        })
    }

    pub async fn mark_attended(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let attended = self
            .transition(appointment_id, AppointmentStatus::Attended)
            .await?;
        info!("Appointment {} marked as attended", appointment_id);
        Ok(attended)
    }

    /// Cancels from any non-terminal state. Patients must present the phone
    /// number the booking was made with.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        actor: CancellationActor,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.store.get(appointment_id).await?;

        if let CancellationActor::Patient { phone } = &actor {
            let owns = current
                .patient_phone
                .as_deref()
                .is_some_and(|on_record| same_phone(on_record, phone, &self.clinic.phone_country_code));
            if !owns {
                warn!("Cancellation of appointment {} refused: phone mismatch", appointment_id);
                return Err(AppointmentError::Unauthorized);
            }
        }

        self.lifecycle_service
            .validate_status_transition(current.status, AppointmentStatus::Cancelled)?;

        let cancelled = self
            .store
            .update_status(appointment_id, current.status, AppointmentStatus::Cancelled)
            .await?;

        info!(
            "Appointment {} cancelled by {}: {}",
            appointment_id,
            actor.label(),
            reason.as_deref().unwrap_or("no reason given")
        );
        Ok(cancelled)
    }

    /// Moves a pending appointment, with the same hours and overlap rules as
    /// a new booking. The appointment's own slot does not count as busy.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.store.get(appointment_id).await?;
        self.lifecycle_service.can_modify(current.status)?;

        let minutes = request
            .duration_minutes
            .unwrap_or_else(|| current.duration_minutes());
        let slot = self.validate_slot(request.start_time, minutes, Utc::now())?;

        self.ensure_bookable(current.resource_id, slot).await?;

        let _guard = self.locks.lock(current.resource_id).await;

        self.conflict_service
            .ensure_slot_free(current.resource_id, slot, Some(current.id))
            .await?;

        let moved = self
            .store
            .reschedule(appointment_id, current.status, slot)
            .await?;

        info!("Appointment {} rescheduled to {}", appointment_id, slot);
        Ok(moved)
    }

    pub async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.store.delete(appointment_id).await?;
        info!("Appointment {} permanently deleted", appointment_id);
        Ok(())
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.store.get(appointment_id).await?;
        self.lifecycle_service
            .validate_status_transition(current.status, new_status)?;
        self.store
            .update_status(appointment_id, current.status, new_status)
            .await
    }

    /// Opening hours, blackouts and resource existence, against the
    /// calendar as it is now.
    async fn ensure_bookable(&self, resource_id: Uuid, slot: TimeSlot) -> Result<(), AppointmentError> {
        let schedule = self.availability.load_schedule().await?;
        schedule.check_bookable(resource_id, &slot).map_err(|violation| {
            warn!("Rejected slot {} on resource {}: {}", slot, resource_id, violation);
            violation.into()
        })
    }

    // ==========================================================================
    // VALIDATION
    // ==========================================================================

    fn validate_booking(
        &self,
        request: BookAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<ValidatedBooking, AppointmentError> {
        let patient_name = required_text(&request.patient_name, "Patient name", MAX_NAME_CHARS)?;
        let service = required_text(&request.service, "Service", MAX_SERVICE_CHARS)?;

        let patient_phone = match request.patient_phone.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(phone) => {
                if phone.chars().count() > MAX_PHONE_CHARS || !is_phone_like(phone) {
                    return Err(AppointmentError::ValidationError(
                        "Phone number is not valid".to_string(),
                    ));
                }
                Some(normalize_phone(phone, &self.clinic.phone_country_code))
            }
        };

        let message = request
            .message
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty());
        if message
            .as_ref()
            .is_some_and(|message| message.chars().count() > MAX_MESSAGE_CHARS)
        {
            return Err(AppointmentError::ValidationError(format!(
                "Message must be at most {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        let minutes = request
            .duration_minutes
            .unwrap_or(self.settings.default_appointment_minutes);
        let slot = self.validate_slot(request.start_time, minutes, now)?;

        Ok(ValidatedBooking {
            resource_id: request.resource_id,
            patient_name,
            patient_phone,
            service,
            message,
            slot,
        })
    }

    fn validate_slot(
        &self,
        start_time: DateTime<Utc>,
        minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<TimeSlot, AppointmentError> {
        if !(1..=MAX_APPOINTMENT_MINUTES).contains(&minutes) {
            return Err(AppointmentError::ValidationError(format!(
                "Duration must be between 1 and {} minutes",
                MAX_APPOINTMENT_MINUTES
            )));
        }

        if start_time <= now {
            return Err(AppointmentError::ValidationError(
                "Appointment must start in the future".to_string(),
            ));
        }

        TimeSlot::with_duration(start_time, minutes).ok_or_else(|| {
            AppointmentError::ValidationError("Appointment time is out of range".to_string())
        })
    }
}

fn required_text(value: &str, field: &str, max_chars: usize) -> Result<String, AppointmentError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max_chars {
        return Err(AppointmentError::ValidationError(format!(
            "{} must be between 1 and {} characters",
            field, max_chars
        )));
    }
    Ok(value.to_string())
}
