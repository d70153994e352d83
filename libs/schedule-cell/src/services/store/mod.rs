// libs/schedule-cell/src/services/store/mod.rs
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{BlackoutDate, Resource, ScheduleError, ScheduleRule, ScheduleSnapshot};

mod memory;
mod supabase;

pub use memory::InMemoryScheduleStore;
pub use supabase::SupabaseScheduleStore;

/// Persistence for resources, schedule rules and blackout dates. Rows are
/// fully formed (ids, timestamps) by the caller.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn list_resources(&self) -> Result<Vec<Resource>, ScheduleError>;

    async fn insert_resource(&self, resource: Resource) -> Result<Resource, ScheduleError>;

    async fn list_rules(&self) -> Result<Vec<ScheduleRule>, ScheduleError>;

    async fn get_rule(&self, rule_id: Uuid) -> Result<ScheduleRule, ScheduleError>;

    async fn insert_rule(&self, rule: ScheduleRule) -> Result<ScheduleRule, ScheduleError>;

    async fn update_rule(&self, rule: ScheduleRule) -> Result<ScheduleRule, ScheduleError>;

    async fn delete_rule(&self, rule_id: Uuid) -> Result<(), ScheduleError>;

    async fn list_blackouts(&self) -> Result<Vec<BlackoutDate>, ScheduleError>;

    async fn insert_blackout(&self, blackout: BlackoutDate) -> Result<BlackoutDate, ScheduleError>;

    async fn delete_blackout(&self, blackout_id: Uuid) -> Result<(), ScheduleError>;

    async fn snapshot(&self) -> Result<ScheduleSnapshot, ScheduleError> {
        let (resources, rules, blackouts) = futures::try_join!(
            self.list_resources(),
            self.list_rules(),
            self.list_blackouts(),
        )?;

        Ok(ScheduleSnapshot {
            resources,
            rules,
            blackouts,
        })
    }
}
