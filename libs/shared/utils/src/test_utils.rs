use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, ClinicSettings, SchedulingSettings};
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub service_role_key: String,
    pub scheduling: SchedulingSettings,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            service_role_key: "test-service-role-key".to_string(),
            scheduling: SchedulingSettings::default(),
        }
    }
}

impl TestConfig {
    /// Config pointing the Supabase client at a mock server.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            supabase_service_role_key: self.service_role_key.clone(),
            server_port: 0,
            clinic: ClinicSettings {
                name: "Test Dental Clinic".to_string(),
                address: "Av. Test 123, Lima".to_string(),
                latitude: Some(-12.0464),
                longitude: Some(-77.0428),
                phone_country_code: "51".to_string(),
            },
            scheduling: self.scheduling.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "authenticated".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, "authenticated")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        Self::sign(
            json!({
                "sub": user.id,
                "email": user.email,
                "role": user.role,
                "iat": now.timestamp(),
                "exp": exp.timestamp()
            }),
            secret,
        )
    }

    /// Token shaped like Supabase's: Postgres role at the top level and the
    /// application role inside `app_metadata`.
    pub fn create_token_with_app_role(user: &TestUser, secret: &str, app_role: &str) -> String {
        let now = Utc::now();

        Self::sign(
            json!({
                "sub": user.id,
                "email": user.email,
                "role": user.role,
                "app_metadata": { "role": app_role },
                "iat": now.timestamp(),
                "exp": (now + Duration::hours(1)).timestamp()
            }),
            secret,
        )
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    fn sign(payload: Value, secret: &str) -> String {
        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature_encoded)
    }
}

/// Row payloads as PostgREST returns them.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn appointment_row(
        id: Uuid,
        resource_id: Uuid,
        start_time: &str,
        end_time: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "resource_id": resource_id,
            "patient_name": "Ana Torres",
            "patient_phone": "947236123",
            "service": "Cleaning",
            "message": null,
            "start_time": start_time,
            "end_time": end_time,
            "status": status,
            "created_at": "2031-01-01T00:00:00Z",
            "updated_at": "2031-01-01T00:00:00Z"
        })
    }

    pub fn resource_row(id: Uuid, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "kind": "chair",
            "is_active": true,
            "created_at": "2031-01-01T00:00:00Z"
        })
    }

    pub fn schedule_rule_row(id: Uuid, day_of_week: i32, open_time: &str, close_time: &str) -> Value {
        json!({
            "id": id,
            "resource_id": null,
            "day_of_week": day_of_week,
            "open_time": open_time,
            "close_time": close_time,
            "is_active": true,
            "created_at": "2031-01-01T00:00:00Z",
            "updated_at": "2031-01-01T00:00:00Z"
        })
    }

    pub fn blackout_row(id: Uuid, date: &str) -> Value {
        json!({
            "id": id,
            "date": date,
            "resource_id": null,
            "reason": "Holiday",
            "created_at": "2031-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
        assert_eq!(app_config.service_token(), Some("test-service-role-key"));
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::admin("admin@example.com");
        assert_eq!(user.role, "admin");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert!(user_model.is_admin());
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }
}
