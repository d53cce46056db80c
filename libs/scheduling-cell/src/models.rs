use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use shared_config::AppConfig;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: uuid::Uuid,
    pub patient_id: uuid::Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Half-open interval test over `[start, end)`: an appointment ending
    /// exactly when another begins does not collide.
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time < end && start < self.end_time
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Terminal statuses take no further part in the workflow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// Whether the appointment still occupies its slot for overlap checks.
    /// A completed visit keeps its historical slot; only cancellations and
    /// no-shows free it.
    pub fn blocks_calendar(&self) -> bool {
        !matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: uuid::Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Partial-update payload: only supplied fields change. An entirely empty
/// patch is rejected rather than treated as a no-op write.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentPatch {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl AppointmentPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.status.is_none()
            && self.reason.is_none()
            && self.notes.is_none()
    }

    /// The interval invariants only need re-checking when the calendar
    /// position moves.
    pub fn moves_interval(&self) -> bool {
        self.date.is_some() || self.start_time.is_some() || self.end_time.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentSearchQuery {
    pub date: Option<NaiveDate>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub patient_id: Option<uuid::Uuid>,
    pub status: Option<AppointmentStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentPage {
    pub appointments: Vec<Appointment>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

// ==============================================================================
// SCHEDULING RULES
// ==============================================================================

/// Business-window configuration, injected at construction rather than read
/// from ambient globals.
#[derive(Debug, Clone)]
pub struct SchedulingRules {
    pub opens: NaiveTime,
    pub closes: NaiveTime,
    pub min_duration_minutes: i64,
}

impl SchedulingRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            opens: parse_clock(&config.clinic_opens_at, "CLINIC_OPENS_AT", "08:00"),
            closes: parse_clock(&config.clinic_closes_at, "CLINIC_CLOSES_AT", "18:00"),
            min_duration_minutes: config.min_appointment_minutes,
        }
    }
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            opens: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            closes: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            min_duration_minutes: 30,
        }
    }
}

fn parse_clock(value: &str, var: &str, fallback: &str) -> NaiveTime {
    NaiveTime::parse_from_str(value, "%H:%M").unwrap_or_else(|_| {
        warn!("{} value {:?} is not HH:MM, using {}", var, value, fallback);
        NaiveTime::parse_from_str(fallback, "%H:%M").unwrap()
    })
}
