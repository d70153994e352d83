// libs/schedule-cell/src/services/availability.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tracing::debug;
use uuid::Uuid;

use shared_config::{SchedulingSettings, MAX_APPOINTMENT_MINUTES};

use crate::models::{DateRange, ScheduleError, TimeSlot};
use crate::services::schedule::{clinic_offset, Schedule};
use crate::services::store::ScheduleStore;

/// Intervals during which a resource is already taken. Implemented by the
/// appointment store, which this crate does not know about.
#[async_trait]
pub trait BusyIntervalSource: Send + Sync {
    async fn busy_intervals(
        &self,
        resource_id: Uuid,
        window: TimeSlot,
    ) -> Result<Vec<TimeSlot>, ScheduleError>;
}

/// Open slots of one resource over a date range.
///
/// Holds the schedule and the busy intervals it was computed from; each call
/// to [`OpenSlots::iter`] walks the calendar again from the first day, so the
/// sequence can be restarted freely. Slots come out ordered by start time.
#[derive(Debug, Clone)]
pub struct OpenSlots {
    resource_id: Uuid,
    range: DateRange,
    duration: Duration,
    schedule: Schedule,
    busy: Vec<TimeSlot>,
}

impl OpenSlots {
    pub fn new(
        schedule: Schedule,
        resource_id: Uuid,
        range: DateRange,
        duration: Duration,
        busy: Vec<TimeSlot>,
    ) -> Self {
        Self {
            resource_id,
            range,
            duration,
            schedule,
            busy: merge_intervals(busy),
        }
    }

    pub fn resource_id(&self) -> Uuid {
        self.resource_id
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration.num_minutes()
    }

    pub fn iter(&self) -> impl Iterator<Item = TimeSlot> + '_ {
        self.schedule
            .candidate_slots(self.resource_id, self.range, self.duration)
            .filter(move |slot| !self.is_busy(slot))
    }

    fn is_busy(&self, slot: &TimeSlot) -> bool {
        // `busy` is sorted and disjoint, so ends are ascending too.
        let first_ending_after = self
            .busy
            .partition_point(|interval| interval.end_time <= slot.start_time);

        self.busy
            .get(first_ending_after)
            .is_some_and(|interval| interval.overlaps(slot))
    }
}

/// Sorts intervals and merges the ones that overlap or touch.
fn merge_intervals(mut intervals: Vec<TimeSlot>) -> Vec<TimeSlot> {
    intervals.retain(TimeSlot::is_valid);
    intervals.sort_by_key(|interval| interval.start_time);

    let mut merged: Vec<TimeSlot> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start_time <= last.end_time => {
                last.end_time = last.end_time.max(interval.end_time);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

pub struct AvailabilityService {
    store: Arc<dyn ScheduleStore>,
    busy_source: Arc<dyn BusyIntervalSource>,
    settings: SchedulingSettings,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        busy_source: Arc<dyn BusyIntervalSource>,
        settings: SchedulingSettings,
    ) -> Self {
        Self {
            store,
            busy_source,
            settings,
        }
    }

    pub fn settings(&self) -> &SchedulingSettings {
        &self.settings
    }

    /// Loads the current schedule as an explicit value.
    pub async fn load_schedule(&self) -> Result<Schedule, ScheduleError> {
        let snapshot = self.store.snapshot().await?;
        Ok(Schedule::new(self.settings.clone(), snapshot))
    }

    pub fn validate_range(&self, range: &DateRange) -> Result<(), ScheduleError> {
        if range.to < range.from {
            return Err(ScheduleError::InvalidRange(
                "End date must not be before start date".to_string(),
            ));
        }

        if range.day_count() > self.settings.max_availability_days {
            return Err(ScheduleError::InvalidRange(format!(
                "Date range may span at most {} days",
                self.settings.max_availability_days
            )));
        }

        Ok(())
    }

    pub async fn list_open_slots(
        &self,
        resource_id: Uuid,
        range: DateRange,
        duration_minutes: Option<i64>,
    ) -> Result<OpenSlots, ScheduleError> {
        self.validate_range(&range)?;

        let minutes = duration_minutes.unwrap_or(self.settings.default_appointment_minutes);
        if !(1..=MAX_APPOINTMENT_MINUTES).contains(&minutes) {
            return Err(ScheduleError::ValidationError(format!(
                "Duration must be between 1 and {} minutes",
                MAX_APPOINTMENT_MINUTES
            )));
        }

        let window = range
            .to_utc_window(&clinic_offset(&self.settings))
            .ok_or_else(|| ScheduleError::InvalidRange("Date range is out of bounds".to_string()))?;

        debug!("Listing open slots for resource {} in {}", resource_id, window);

        let (schedule, busy) = futures::try_join!(
            self.load_schedule(),
            self.busy_source.busy_intervals(resource_id, window),
        )?;

        if schedule.resource(resource_id).is_none() {
            return Err(ScheduleError::ResourceNotFound);
        }

        Ok(OpenSlots::new(
            schedule,
            resource_id,
            range,
            Duration::minutes(minutes),
            busy,
        ))
    }
}
