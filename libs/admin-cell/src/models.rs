// libs/admin-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentFilter, AppointmentOrder, AppointmentStatus};

pub const DEFAULT_RECENT_LIMIT: usize = 20;
pub const MAX_PAGE_SIZE: usize = 200;

/// Status change requested from the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminAction {
    Confirm,
    Cancel {
        #[serde(default)]
        reason: Option<String>,
    },
    MarkAttended,
}

impl AdminAction {
    pub fn name(&self) -> &'static str {
        match self {
            AdminAction::Confirm => "confirm",
            AdminAction::Cancel { .. } => "cancel",
            AdminAction::MarkAttended => "mark_attended",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminActionResult {
    pub action: String,
    pub appointment: Appointment,
    /// Set when a confirmation produced a WhatsApp link for the patient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_url: Option<String>,
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentQueryParams {
    pub resource_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub patient_name: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AppointmentQueryParams {
    /// Admin listings are ordered by visit time, capped at [`MAX_PAGE_SIZE`].
    pub fn into_filter(self) -> AppointmentFilter {
        AppointmentFilter {
            resource_id: self.resource_id,
            status: self.status,
            from: self.from_date,
            to: self.to_date,
            patient_name: self
                .patient_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            order: AppointmentOrder::StartAsc,
            limit: Some(self.limit.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE)),
            offset: self.offset,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}
