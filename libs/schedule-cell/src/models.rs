// libs/schedule-cell/src/models.rs
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// TIME SLOTS
// ==============================================================================

/// A closed-open interval `[start_time, end_time)`. Slots that only share a
/// boundary do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self { start_time, end_time }
    }

    /// `None` when the end falls outside the representable calendar.
    pub fn with_duration(start_time: DateTime<Utc>, minutes: i64) -> Option<Self> {
        let end_time = start_time.checked_add_signed(Duration::try_minutes(minutes)?)?;
        Some(Self::new(start_time, end_time))
    }

    pub fn is_valid(&self) -> bool {
        self.start_time < self.end_time
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn contains(&self, other: &TimeSlot) -> bool {
        self.start_time <= other.start_time && other.end_time <= self.end_time
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {})", self.start_time.to_rfc3339(), self.end_time.to_rfc3339())
    }
}

/// Inclusive range of clinic-local dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn day_count(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + Clone {
        let to = self.to;
        self.from.iter_days().take_while(move |day| *day <= to)
    }

    /// The UTC instants spanned by the range, from local midnight of `from`
    /// to local midnight after `to`.
    pub fn to_utc_window(&self, offset: &FixedOffset) -> Option<TimeSlot> {
        let start = offset
            .from_local_datetime(&self.from.and_hms_opt(0, 0, 0)?)
            .single()?;
        let end = offset
            .from_local_datetime(&self.to.succ_opt()?.and_hms_opt(0, 0, 0)?)
            .single()?;
        Some(TimeSlot::new(start.with_timezone(&Utc), end.with_timezone(&Utc)))
    }
}

// ==============================================================================
// RESOURCES
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Chair,
    Dentist,
}

/// A bookable clinic asset. Appointments never overlap on one resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub kind: ResourceKind,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResourceRequest {
    pub name: String,
    pub kind: ResourceKind,
}

// ==============================================================================
// SCHEDULE RULES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleRule {
    pub id: Uuid,
    /// `None` applies to every resource.
    pub resource_id: Option<Uuid>,
    pub day_of_week: i32, // 0 = Sunday, 1 = Monday, etc.
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleRule {
    pub fn applies_to(&self, resource_id: Uuid) -> bool {
        self.resource_id.map_or(true, |id| id == resource_id)
    }

    pub fn applies_on(&self, weekday: Weekday) -> bool {
        self.day_of_week == weekday.num_days_from_sunday() as i32
    }

    /// Whether two rules could both govern the same resource on the same day.
    pub fn shares_scope_with(&self, other: &ScheduleRule) -> bool {
        let same_resource = match (self.resource_id, other.resource_id) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        same_resource && self.day_of_week == other.day_of_week
    }

    pub fn window_overlaps(&self, other: &ScheduleRule) -> bool {
        self.open_time < other.close_time && other.open_time < self.close_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRuleRequest {
    pub resource_id: Option<Uuid>,
    pub day_of_week: i32,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateScheduleRuleRequest {
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub is_active: Option<bool>,
}

// ==============================================================================
// BLACKOUT DATES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlackoutDate {
    pub id: Uuid,
    pub date: NaiveDate,
    /// `None` closes the whole clinic.
    pub resource_id: Option<Uuid>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BlackoutDate {
    pub fn blocks(&self, resource_id: Uuid, date: NaiveDate) -> bool {
        self.date == date && self.resource_id.map_or(true, |id| id == resource_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlackoutRequest {
    pub date: NaiveDate,
    pub resource_id: Option<Uuid>,
    pub reason: Option<String>,
}

/// Everything the availability walk reads from storage, fetched together.
#[derive(Debug, Clone, Default)]
pub struct ScheduleSnapshot {
    pub resources: Vec<Resource>,
    pub rules: Vec<ScheduleRule>,
    pub blackouts: Vec<BlackoutDate>,
}

// ==============================================================================
// AVAILABILITY API MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub resource_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub duration_minutes: i64,
    pub slots: Vec<TimeSlot>,
    pub total: usize,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// Why a slot cannot be booked under the current schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleViolation {
    UnknownResource,
    InvalidSlot,
    Blackout(NaiveDate),
    OutsideOperatingHours,
}

impl fmt::Display for ScheduleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleViolation::UnknownResource => write!(f, "resource does not exist or is inactive"),
            ScheduleViolation::InvalidSlot => write!(f, "slot must end after it starts"),
            ScheduleViolation::Blackout(date) => write!(f, "the clinic is closed on {}", date),
            ScheduleViolation::OutsideOperatingHours => {
                write!(f, "slot is not inside an operating window")
            }
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScheduleError {
    #[error("Resource not found")]
    ResourceNotFound,

    #[error("Schedule rule not found")]
    RuleNotFound,

    #[error("Blackout date not found")]
    BlackoutNotFound,

    #[error("Schedule rule overlaps an existing rule")]
    OverlappingRule,

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<shared_database::supabase::SupabaseError> for ScheduleError {
    fn from(error: shared_database::supabase::SupabaseError) -> Self {
        ScheduleError::DatabaseError(error.to_string())
    }
}

impl From<serde_json::Error> for ScheduleError {
    fn from(error: serde_json::Error) -> Self {
        ScheduleError::DatabaseError(format!("Malformed row: {}", error))
    }
}

impl From<ScheduleError> for AppError {
    fn from(error: ScheduleError) -> Self {
        match error {
            ScheduleError::ResourceNotFound
            | ScheduleError::RuleNotFound
            | ScheduleError::BlackoutNotFound => AppError::NotFound(error.to_string()),
            ScheduleError::OverlappingRule => AppError::Conflict(error.to_string()),
            ScheduleError::InvalidRange(msg) | ScheduleError::ValidationError(msg) => {
                AppError::ValidationError(msg)
            }
            ScheduleError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2031, 3, 3, hour, minute, 0).unwrap()
    }

    #[test]
    fn touching_slots_do_not_overlap() {
        let first = TimeSlot::new(at(9, 0), at(9, 30));
        let second = TimeSlot::new(at(9, 30), at(10, 0));

        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn partial_and_nested_slots_overlap() {
        let booked = TimeSlot::new(at(9, 0), at(10, 0));

        assert!(booked.overlaps(&TimeSlot::new(at(9, 45), at(10, 15))));
        assert!(booked.overlaps(&TimeSlot::new(at(9, 15), at(9, 30))));
        assert!(booked.contains(&TimeSlot::new(at(9, 15), at(9, 30))));
        assert!(!booked.contains(&TimeSlot::new(at(9, 45), at(10, 15))));
    }

    #[test]
    fn date_range_days_are_inclusive() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2031, 3, 3).unwrap(),
            NaiveDate::from_ymd_opt(2031, 3, 5).unwrap(),
        );

        assert_eq!(range.days().count(), 3);
        assert_eq!(range.day_count(), 3);
    }

    #[test]
    fn utc_window_follows_offset() {
        let lima = FixedOffset::west_opt(5 * 3600).unwrap();
        let window = DateRange::single(NaiveDate::from_ymd_opt(2031, 3, 3).unwrap())
            .to_utc_window(&lima)
            .unwrap();

        assert_eq!(window.start_time, at(5, 0));
        assert_eq!(window.duration_minutes(), 24 * 60);
    }

    #[test]
    fn rule_scope_considers_clinic_wide_rules() {
        let now = Utc::now();
        let chair = Uuid::new_v4();
        let rule = |resource_id| ScheduleRule {
            id: Uuid::new_v4(),
            resource_id,
            day_of_week: 1,
            open_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            close_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        assert!(rule(None).shares_scope_with(&rule(Some(chair))));
        assert!(!rule(Some(chair)).shares_scope_with(&rule(Some(Uuid::new_v4()))));
        assert!(rule(None).applies_on(Weekday::Mon));
    }
}
