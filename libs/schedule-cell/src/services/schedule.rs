// libs/schedule-cell/src/services/schedule.rs
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use uuid::Uuid;

use shared_config::SchedulingSettings;

use crate::models::{
    BlackoutDate, DateRange, Resource, ScheduleRule, ScheduleSnapshot, ScheduleViolation, TimeSlot,
};

pub fn clinic_offset(settings: &SchedulingSettings) -> FixedOffset {
    FixedOffset::east_opt(settings.utc_offset_minutes.saturating_mul(60))
        .unwrap_or_else(|| Utc.fix())
}

/// The clinic calendar as a plain value: configuration plus the rules,
/// blackout dates and resources in force when it was loaded.
#[derive(Debug, Clone)]
pub struct Schedule {
    settings: SchedulingSettings,
    offset: FixedOffset,
    resources: Vec<Resource>,
    rules: Vec<ScheduleRule>,
    blackouts: Vec<BlackoutDate>,
}

impl Schedule {
    pub fn new(settings: SchedulingSettings, snapshot: ScheduleSnapshot) -> Self {
        let offset = clinic_offset(&settings);
        let rules = snapshot.rules.into_iter().filter(|rule| rule.is_active).collect();

        Self {
            settings,
            offset,
            resources: snapshot.resources,
            rules,
            blackouts: snapshot.blackouts,
        }
    }

    pub fn settings(&self) -> &SchedulingSettings {
        &self.settings
    }

    pub fn offset(&self) -> &FixedOffset {
        &self.offset
    }

    pub fn resource(&self, resource_id: Uuid) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|resource| resource.id == resource_id && resource.is_active)
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn is_blackout(&self, resource_id: Uuid, date: NaiveDate) -> bool {
        self.blackouts.iter().any(|blackout| blackout.blocks(resource_id, date))
    }

    /// Operating windows of a resource on a local date, in UTC, sorted and with
    /// touching or overlapping windows merged.
    pub fn operating_windows(&self, resource_id: Uuid, date: NaiveDate) -> Vec<TimeSlot> {
        let weekday = date.weekday();

        let mut windows: Vec<TimeSlot> = self
            .rules
            .iter()
            .filter(|rule| rule.applies_to(resource_id) && rule.applies_on(weekday))
            .filter_map(|rule| {
                let open = self.to_utc(date, rule.open_time)?;
                let close = self.to_utc(date, rule.close_time)?;
                Some(TimeSlot::new(open, close))
            })
            .filter(TimeSlot::is_valid)
            .collect();

        windows.sort_by_key(|window| window.start_time);

        let mut merged: Vec<TimeSlot> = Vec::with_capacity(windows.len());
        for window in windows {
            match merged.last_mut() {
                Some(last) if window.start_time <= last.end_time => {
                    last.end_time = last.end_time.max(window.end_time);
                }
                _ => merged.push(window),
            }
        }

        merged
    }

    /// Checks that a slot may be booked on a resource as far as the calendar
    /// is concerned. Existing appointments are not consulted.
    pub fn check_bookable(&self, resource_id: Uuid, slot: &TimeSlot) -> Result<(), ScheduleViolation> {
        if self.resource(resource_id).is_none() {
            return Err(ScheduleViolation::UnknownResource);
        }

        if !slot.is_valid() {
            return Err(ScheduleViolation::InvalidSlot);
        }

        let date = self.local_date(slot.start_time);
        if self.is_blackout(resource_id, date) {
            return Err(ScheduleViolation::Blackout(date));
        }

        let inside_window = self
            .operating_windows(resource_id, date)
            .iter()
            .any(|window| window.contains(slot));

        if inside_window {
            Ok(())
        } else {
            Err(ScheduleViolation::OutsideOperatingHours)
        }
    }

    /// Every slot of `duration` the calendar offers on a resource over the
    /// range, stepping by the configured granularity from each window's
    /// opening time. Ordered by start time; produced lazily, one day at a time.
    pub fn candidate_slots(
        &self,
        resource_id: Uuid,
        range: DateRange,
        duration: Duration,
    ) -> impl Iterator<Item = TimeSlot> + '_ {
        let step = Duration::try_minutes(self.settings.slot_granularity_minutes).unwrap_or_else(Duration::zero);
        let usable = step > Duration::zero() && duration > Duration::zero();

        range
            .days()
            .filter(move |_| usable)
            .filter(move |date| !self.is_blackout(resource_id, *date))
            .flat_map(move |date| self.operating_windows(resource_id, date))
            .flat_map(move |window| {
                std::iter::successors(Some(window.start_time), move |start| start.checked_add_signed(step))
                    .map_while(move |start| {
                        start
                            .checked_add_signed(duration)
                            .map(|end| TimeSlot::new(start, end))
                    })
                    .take_while(move |slot| slot.end_time <= window.end_time)
            })
    }

    fn to_utc(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(|local| local.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceKind;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2031, 3, 3).unwrap()
    }

    fn rule(day_of_week: i32, open: NaiveTime, close: NaiveTime) -> ScheduleRule {
        let now = Utc::now();
        ScheduleRule {
            id: Uuid::new_v4(),
            resource_id: None,
            day_of_week,
            open_time: open,
            close_time: close,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn schedule_with(rules: Vec<ScheduleRule>, blackouts: Vec<BlackoutDate>) -> (Schedule, Uuid) {
        let chair = Resource {
            id: Uuid::new_v4(),
            name: "Chair 1".to_string(),
            kind: ResourceKind::Chair,
            is_active: true,
            created_at: Utc::now(),
        };
        let id = chair.id;
        let snapshot = ScheduleSnapshot {
            resources: vec![chair],
            rules,
            blackouts,
        };
        (Schedule::new(SchedulingSettings::default(), snapshot), id)
    }

    fn slot(hour: u32, minute: u32, minutes: i64) -> TimeSlot {
        TimeSlot::with_duration(monday().and_time(time(hour, minute)).and_utc(), minutes).unwrap()
    }

    #[test]
    fn slot_inside_window_is_bookable() {
        let (schedule, chair) = schedule_with(vec![rule(1, time(9, 0), time(12, 0))], vec![]);

        assert_eq!(schedule.check_bookable(chair, &slot(9, 0, 30)), Ok(()));
        assert_eq!(schedule.check_bookable(chair, &slot(11, 30, 30)), Ok(()));
    }

    #[test]
    fn slot_crossing_closing_time_is_out_of_hours() {
        let (schedule, chair) = schedule_with(vec![rule(1, time(9, 0), time(12, 0))], vec![]);

        assert_eq!(
            schedule.check_bookable(chair, &slot(11, 45, 30)),
            Err(ScheduleViolation::OutsideOperatingHours)
        );
    }

    #[test]
    fn adjacent_windows_are_merged() {
        let (schedule, chair) = schedule_with(
            vec![rule(1, time(9, 0), time(12, 0)), rule(1, time(12, 0), time(15, 0))],
            vec![],
        );

        assert_eq!(schedule.operating_windows(chair, monday()).len(), 1);
        assert_eq!(schedule.check_bookable(chair, &slot(11, 45, 30)), Ok(()));
    }

    #[test]
    fn blackout_closes_the_day() {
        let blackout = BlackoutDate {
            id: Uuid::new_v4(),
            date: monday(),
            resource_id: None,
            reason: Some("Holiday".to_string()),
            created_at: Utc::now(),
        };
        let (schedule, chair) = schedule_with(vec![rule(1, time(9, 0), time(12, 0))], vec![blackout]);

        assert_eq!(
            schedule.check_bookable(chair, &slot(9, 0, 30)),
            Err(ScheduleViolation::Blackout(monday()))
        );
        let range = DateRange::single(monday());
        assert_eq!(schedule.candidate_slots(chair, range, Duration::minutes(30)).count(), 0);
    }

    #[test]
    fn unknown_resource_is_rejected() {
        let (schedule, _) = schedule_with(vec![rule(1, time(9, 0), time(12, 0))], vec![]);

        assert_eq!(
            schedule.check_bookable(Uuid::new_v4(), &slot(9, 0, 30)),
            Err(ScheduleViolation::UnknownResource)
        );
    }

    #[test]
    fn candidates_step_by_granularity() {
        let (schedule, chair) = schedule_with(vec![rule(1, time(9, 0), time(12, 0))], vec![]);
        let range = DateRange::single(monday());

        let slots: Vec<TimeSlot> = schedule
            .candidate_slots(chair, range, Duration::minutes(30))
            .collect();

        assert_eq!(slots.len(), 6);
        assert_eq!(slots[0], slot(9, 0, 30));
        assert_eq!(slots[5], slot(11, 30, 30));
    }

    #[test]
    fn longer_duration_still_fits_window() {
        let (schedule, chair) = schedule_with(vec![rule(1, time(9, 0), time(12, 0))], vec![]);
        let range = DateRange::single(monday());

        let last = schedule
            .candidate_slots(chair, range, Duration::minutes(60))
            .last()
            .unwrap();

        assert_eq!(last, slot(11, 0, 60));
    }

    #[test]
    fn overflowing_duration_yields_no_slots() {
        let (schedule, chair) = schedule_with(vec![rule(1, time(9, 0), time(12, 0))], vec![]);
        let range = DateRange::single(monday());

        assert_eq!(schedule.candidate_slots(chair, range, Duration::MAX).count(), 0);
    }

    #[test]
    fn local_offset_shifts_windows() {
        let settings = SchedulingSettings {
            utc_offset_minutes: -300,
            ..SchedulingSettings::default()
        };
        let chair = Resource {
            id: Uuid::new_v4(),
            name: "Chair 1".to_string(),
            kind: ResourceKind::Chair,
            is_active: true,
            created_at: Utc::now(),
        };
        let chair_id = chair.id;
        let schedule = Schedule::new(
            settings,
            ScheduleSnapshot {
                resources: vec![chair],
                rules: vec![rule(1, time(9, 0), time(12, 0))],
                blackouts: vec![],
            },
        );

        let windows = schedule.operating_windows(chair_id, monday());
        assert_eq!(windows[0].start_time, monday().and_time(time(14, 0)).and_utc());
    }
}
