// libs/appointment-cell/src/services/notification.rs
use std::sync::LazyLock;

use chrono::FixedOffset;
use regex::Regex;
use reqwest::Url;
use tracing::info;

use shared_config::ClinicSettings;

use crate::models::Appointment;

static PHONE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ().\-]{6,30}$").ok());

/// Loose shape check for user-entered phone numbers: digits with the usual
/// separators, at least six of them digits.
pub fn is_phone_like(raw: &str) -> bool {
    let raw = raw.trim();
    PHONE_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(raw))
        && digits(raw).len() >= 6
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Strips trunk and country prefixes, leaving the national number.
fn national_number(raw: &str, country_code: &str) -> String {
    let mut number = digits(raw);

    if number.len() == 10 && number.starts_with('0') {
        number.remove(0);
    }
    if number.len() == country_code.len() + 9 && number.starts_with(country_code) {
        number.drain(..country_code.len());
    }

    number
}

/// Formats a phone number for storage and display.
///
/// Nine-digit mobiles (leading `9`) become `+CC XXX XXX XXX`; anything else is
/// returned as its bare digits, or trimmed as-is when it has none.
pub fn normalize_phone(raw: &str, country_code: &str) -> String {
    let number = national_number(raw, country_code);

    if number.len() == 9 && number.starts_with('9') {
        return format!(
            "+{} {} {} {}",
            country_code,
            &number[..3],
            &number[3..6],
            &number[6..]
        );
    }

    if number.is_empty() {
        raw.trim().to_string()
    } else {
        number
    }
}

/// Two phone inputs refer to the same line.
pub fn same_phone(a: &str, b: &str, country_code: &str) -> bool {
    let a = national_number(a, country_code);
    !a.is_empty() && a == national_number(b, country_code)
}

/// Builds `wa.me` links with the confirmation text for a patient.
pub struct WhatsAppNotifier {
    clinic: ClinicSettings,
    offset: FixedOffset,
}

impl WhatsAppNotifier {
    pub fn new(clinic: ClinicSettings, offset: FixedOffset) -> Self {
        Self { clinic, offset }
    }

    pub fn confirmation_message(&self, appointment: &Appointment) -> String {
        let local_start = appointment.start_time.with_timezone(&self.offset);

        let mut message = format!(
            "Hello {}! Your appointment at *{}* has been confirmed.\n\n\
             Date: {}\nTime: {}\nService: {}\n\nWe look forward to seeing you!",
            appointment.patient_name,
            self.clinic.name,
            local_start.format("%d/%m/%Y"),
            local_start.format("%H:%M"),
            appointment.service,
        );

        if !self.clinic.address.is_empty() {
            message.push_str(&format!("\n{}", self.clinic.address));
        }

        message
    }

    /// `None` when the appointment carries no phone with digits in it.
    pub fn confirmation_link(&self, appointment: &Appointment) -> Option<String> {
        let phone = appointment.patient_phone.as_deref()?;

        let mut number = national_number(phone, &self.clinic.phone_country_code);
        if number.is_empty() {
            return None;
        }
        if number.len() == 9 && number.starts_with('9') {
            number.insert_str(0, &self.clinic.phone_country_code);
        }

        let url = Url::parse_with_params(
            &format!("https://wa.me/{}", number),
            &[("text", self.confirmation_message(appointment))],
        )
        .ok()?
        .to_string();
        info!("WhatsApp confirmation link for {}: {}", appointment.patient_name, url);
        Some(url)
    }
}
