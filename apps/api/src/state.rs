// apps/api/src/state.rs
use std::sync::Arc;

use tracing::info;

use appointment_cell::services::{
    AppointmentBookingService, AppointmentBusySource, AppointmentStore, InMemoryAppointmentStore,
    SupabaseAppointmentStore,
};
use schedule_cell::services::{
    AvailabilityService, InMemoryScheduleStore, ScheduleRuleService, ScheduleStore, SupabaseScheduleStore,
};
use shared_config::AppConfig;

/// The services every cell router is built from, sharing one pair of stores.
pub struct Services {
    pub config: Arc<AppConfig>,
    pub booking: Arc<AppointmentBookingService>,
    pub availability: Arc<AvailabilityService>,
    pub rules: Arc<ScheduleRuleService>,
}

impl Services {
    /// Supabase-backed when configured, in-memory otherwise.
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let (schedule_store, appointment_store): (Arc<dyn ScheduleStore>, Arc<dyn AppointmentStore>) =
            if config.is_configured() {
                info!("Using Supabase storage at {}", config.supabase_url);
                (
                    Arc::new(SupabaseScheduleStore::new(&config)),
                    Arc::new(SupabaseAppointmentStore::new(&config)),
                )
            } else {
                info!("Using in-memory storage");
                (
                    Arc::new(InMemoryScheduleStore::new()),
                    Arc::new(InMemoryAppointmentStore::new()),
                )
            };

        Self::with_stores(config, schedule_store, appointment_store)
    }

    pub fn with_stores(
        config: Arc<AppConfig>,
        schedule_store: Arc<dyn ScheduleStore>,
        appointment_store: Arc<dyn AppointmentStore>,
    ) -> Self {
        let rules = Arc::new(ScheduleRuleService::new(schedule_store.clone()));
        let availability = Arc::new(AvailabilityService::new(
            schedule_store,
            Arc::new(AppointmentBusySource::new(appointment_store.clone())),
            config.scheduling.clone(),
        ));
        let booking = Arc::new(AppointmentBookingService::new(
            appointment_store,
            availability.clone(),
            &config,
        ));

        Self {
            config,
            booking,
            availability,
            rules,
        }
    }
}
