pub mod availability;
pub mod rules;
pub mod schedule;
pub mod store;

pub use availability::{AvailabilityService, BusyIntervalSource, OpenSlots};
pub use rules::ScheduleRuleService;
pub use schedule::{clinic_offset, Schedule};
pub use store::{InMemoryScheduleStore, ScheduleStore, SupabaseScheduleStore};
