use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub clinic_opens_at: String,
    pub clinic_closes_at: String,
    pub min_appointment_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            clinic_opens_at: env::var("CLINIC_OPENS_AT")
                .unwrap_or_else(|_| "08:00".to_string()),
            clinic_closes_at: env::var("CLINIC_CLOSES_AT")
                .unwrap_or_else(|_| "18:00".to_string()),
            min_appointment_minutes: env::var("MIN_APPOINTMENT_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("MIN_APPOINTMENT_MINUTES not set or invalid, using 30");
                    30
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }
}
