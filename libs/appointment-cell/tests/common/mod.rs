#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::BookAppointmentRequest;
use appointment_cell::services::{
    AppointmentBookingService, AppointmentBusySource, AppointmentStore, InMemoryAppointmentStore,
};
use schedule_cell::models::{CreateResourceRequest, CreateScheduleRuleRequest, ResourceKind};
use schedule_cell::services::{AvailabilityService, InMemoryScheduleStore, ScheduleRuleService, ScheduleStore};
use shared_utils::test_utils::TestConfig;

pub struct Clinic {
    pub booking: Arc<AppointmentBookingService>,
    pub availability: Arc<AvailabilityService>,
    pub rules: Arc<ScheduleRuleService>,
    pub chair: Uuid,
}

/// 2031-03-03 is a Monday.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2031, 3, 3, hour, minute, 0).unwrap()
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2031, 3, 3).unwrap()
}

pub fn request(resource_id: Uuid, start: DateTime<Utc>, minutes: i64) -> BookAppointmentRequest {
    BookAppointmentRequest {
        resource_id,
        patient_name: "Ana Torres".to_string(),
        patient_phone: Some("947236123".to_string()),
        service: "Cleaning".to_string(),
        start_time: start,
        duration_minutes: Some(minutes),
        message: None,
    }
}

/// One chair, open Mondays 09:00-12:00 UTC.
pub async fn clinic() -> Clinic {
    clinic_with(TestConfig::default()).await
}

pub async fn clinic_with(test_config: TestConfig) -> Clinic {
    let config = test_config.to_app_config();

    let schedule_store: Arc<dyn ScheduleStore> = Arc::new(InMemoryScheduleStore::new());
    let appointment_store: Arc<dyn AppointmentStore> = Arc::new(InMemoryAppointmentStore::new());

    let rules = Arc::new(ScheduleRuleService::new(schedule_store.clone()));
    let chair = rules
        .create_resource(CreateResourceRequest {
            name: "Chair 1".to_string(),
            kind: ResourceKind::Chair,
        })
        .await
        .unwrap();
    rules
        .create_rule(CreateScheduleRuleRequest {
            resource_id: None,
            day_of_week: 1,
            open_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            close_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        })
        .await
        .unwrap();

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

    Clinic {
        booking,
        availability,
        rules,
        chair: chair.id,
    }
}
