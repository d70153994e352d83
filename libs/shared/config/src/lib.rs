use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub supabase_service_role_key: String,
    pub server_port: u16,
    pub clinic: ClinicSettings,
    pub scheduling: SchedulingSettings,
}

/// Public facts about the clinic, consumed by the map widget and the
/// confirmation messages.
#[derive(Debug, Clone)]
pub struct ClinicSettings {
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone_country_code: String,
}

impl Default for ClinicSettings {
    fn default() -> Self {
        Self {
            name: "Dental Clinic".to_string(),
            address: String::new(),
            latitude: None,
            longitude: None,
            phone_country_code: "51".to_string(),
        }
    }
}

/// Longest appointment the calendar accepts, for bookings and availability
/// queries alike.
pub const MAX_APPOINTMENT_MINUTES: i64 = 8 * 60;

/// Knobs of the booking calendar. Schedule rules are stored data; these are
/// the process-wide parameters the availability walk runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingSettings {
    pub slot_granularity_minutes: i64,
    pub default_appointment_minutes: i64,
    /// Offset of clinic-local wall time from UTC. Schedule rules and blackout
    /// dates are expressed in local time.
    pub utc_offset_minutes: i32,
    pub max_availability_days: i64,
    pub auto_confirm_bookings: bool,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            slot_granularity_minutes: 30,
            default_appointment_minutes: 30,
            utc_offset_minutes: 0,
            max_availability_days: 31,
            auto_confirm_bookings: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let scheduling_defaults = SchedulingSettings::default();
        let clinic_defaults = ClinicSettings::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, requests will use the anon key only");
                    String::new()
                }),
            server_port: parse_var("PORT", 3000),
            clinic: ClinicSettings {
                name: env::var("CLINIC_NAME").unwrap_or(clinic_defaults.name),
                address: env::var("CLINIC_ADDRESS")
                    .unwrap_or_else(|_| {
                        warn!("CLINIC_ADDRESS not set, using empty value");
                        clinic_defaults.address
                    }),
                latitude: parse_optional_var("CLINIC_LATITUDE"),
                longitude: parse_optional_var("CLINIC_LONGITUDE"),
                phone_country_code: env::var("PHONE_COUNTRY_CODE")
                    .unwrap_or(clinic_defaults.phone_country_code),
            },
            scheduling: SchedulingSettings {
                slot_granularity_minutes: parse_var(
                    "SLOT_GRANULARITY_MINUTES",
                    scheduling_defaults.slot_granularity_minutes,
                ),
                default_appointment_minutes: parse_var(
                    "DEFAULT_APPOINTMENT_MINUTES",
                    scheduling_defaults.default_appointment_minutes,
                ),
                utc_offset_minutes: parse_var(
                    "CLINIC_UTC_OFFSET_MINUTES",
                    scheduling_defaults.utc_offset_minutes,
                ),
                max_availability_days: parse_var(
                    "MAX_AVAILABILITY_DAYS",
                    scheduling_defaults.max_availability_days,
                ),
                auto_confirm_bookings: parse_var(
                    "AUTO_CONFIRM_BOOKINGS",
                    scheduling_defaults.auto_confirm_bookings,
                ),
            },
        };

        if !config.is_configured() {
            warn!("Supabase not configured - falling back to in-memory storage");
        }

        if config.scheduling.slot_granularity_minutes <= 0 {
            warn!("SLOT_GRANULARITY_MINUTES must be positive, availability will be empty");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Bearer token used for server-side table access.
    pub fn service_token(&self) -> Option<&str> {
        if self.supabase_service_role_key.is_empty() {
            None
        } else {
            Some(&self.supabase_service_role_key)
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value ({}), using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn parse_optional_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{} has an invalid value ({}), ignoring", name, raw);
            None
        }
    }
}
