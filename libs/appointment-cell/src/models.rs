// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use schedule_cell::models::{ScheduleError, ScheduleViolation, TimeSlot};
use shared_database::supabase::SupabaseError;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub service: String,
    pub message: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start_time, self.end_time)
    }

    /// Whether the appointment still holds its slot. Attended visits keep it.
    pub fn occupies_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    /// A confirmed visit whose end has passed without being marked attended.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == AppointmentStatus::Confirmed && self.end_time <= now
    }

    pub fn duration_minutes(&self) -> i64 {
        self.slot().duration_minutes()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Requested,
    Confirmed,
    Attended,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Attended | AppointmentStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Requested => "requested",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Attended => "attended",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub resource_id: Uuid,
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub service: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: Option<i64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
    /// Required when the patient cancels; must match the phone on record.
    pub patient_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub start_time: DateTime<Utc>,
    pub duration_minutes: Option<i64>,
}

/// Who is cancelling. Patients prove ownership with their phone number.
#[derive(Debug, Clone, PartialEq)]
pub enum CancellationActor {
    Patient { phone: String },
    Admin,
}

impl CancellationActor {
    pub fn label(&self) -> &'static str {
        match self {
            CancellationActor::Patient { .. } => "patient",
            CancellationActor::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentOrder {
    #[default]
    StartAsc,
    CreatedDesc,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub resource_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    /// Inclusive lower bound on `start_time`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `start_time`.
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring match.
    pub patient_name: Option<String>,
    #[serde(default)]
    pub order: AppointmentOrder,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AppointmentFilter {
    pub fn recent(limit: usize) -> Self {
        Self {
            order: AppointmentOrder::CreatedDesc,
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.resource_id.map_or(true, |id| appointment.resource_id == id)
            && self.status.map_or(true, |status| appointment.status == status)
            && self.from.map_or(true, |from| appointment.start_time >= from)
            && self.to.map_or(true, |to| appointment.start_time < to)
            && self.patient_name.as_deref().map_or(true, |needle| {
                appointment
                    .patient_name
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
    }
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentStats {
    pub total: usize,
    pub requested: usize,
    pub confirmed: usize,
    pub attended: usize,
    pub cancelled: usize,
    /// Confirmed visits whose end time has passed.
    pub expired: usize,
}

impl AppointmentStats {
    pub fn tally(appointments: &[Appointment], now: DateTime<Utc>) -> Self {
        appointments.iter().fold(Self::default(), |mut stats, appointment| {
            stats.total += 1;
            match appointment.status {
                AppointmentStatus::Requested => stats.requested += 1,
                AppointmentStatus::Confirmed => stats.confirmed += 1,
                AppointmentStatus::Attended => stats.attended += 1,
                AppointmentStatus::Cancelled => stats.cancelled += 1,
            }
            if appointment.is_expired(now) {
                stats.expired += 1;
            }
            stats
        })
    }
}

/// Result of confirming a booking: the updated row and, when the patient
/// left a usable phone number, a WhatsApp link carrying the confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationNotice {
    pub appointment: Appointment,
    pub whatsapp_url: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Resource not found")]
    ResourceNotFound,

    #[error("Requested slot overlaps an existing booking")]
    SlotConflict,

    #[error("Requested slot is outside operating hours: {0}")]
    OutOfHours(String),

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<ScheduleViolation> for AppointmentError {
    fn from(violation: ScheduleViolation) -> Self {
        match violation {
            ScheduleViolation::UnknownResource => AppointmentError::ResourceNotFound,
            ScheduleViolation::InvalidSlot => AppointmentError::ValidationError(violation.to_string()),
            other => AppointmentError::OutOfHours(other.to_string()),
        }
    }
}

impl From<ScheduleError> for AppointmentError {
    fn from(error: ScheduleError) -> Self {
        match error {
            ScheduleError::ResourceNotFound => AppointmentError::ResourceNotFound,
            ScheduleError::InvalidRange(msg) | ScheduleError::ValidationError(msg) => {
                AppointmentError::ValidationError(msg)
            }
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<SupabaseError> for AppointmentError {
    fn from(error: SupabaseError) -> Self {
        match error {
            // Raised by the exclusion constraint on (resource_id, time range).
            SupabaseError::Conflict(_) => AppointmentError::SlotConflict,
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppointmentError {
    fn from(error: serde_json::Error) -> Self {
        AppointmentError::DatabaseError(format!("Malformed row: {}", error))
    }
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::NotFound | AppointmentError::ResourceNotFound => {
                AppError::NotFound(error.to_string())
            }
            AppointmentError::SlotConflict | AppointmentError::InvalidStatusTransition(_) => {
                AppError::Conflict(error.to_string())
            }
            AppointmentError::OutOfHours(_) => AppError::ValidationError(error.to_string()),
            AppointmentError::Unauthorized => AppError::Forbidden(error.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
