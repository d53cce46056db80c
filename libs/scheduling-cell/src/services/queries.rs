//! Read-only query surface over the calendar. Plain filtered reads; the
//! invariant-sensitive paths all live in the booking service.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use patient_cell::store::PatientStore;
use shared_utils::Clock;

use crate::error::SchedulingError;
use crate::models::{Appointment, AppointmentPage, AppointmentSearchQuery, UpcomingQuery};
use crate::store::{AppointmentFilter, AppointmentStore};

const MAX_PAGE_SIZE: i64 = 100;
const MAX_UPCOMING_DAYS: i64 = 30;
const DEFAULT_UPCOMING_DAYS: i64 = 7;

pub struct AppointmentQueryService {
    store: Arc<dyn AppointmentStore>,
    subjects: Arc<dyn PatientStore>,
    clock: Arc<dyn Clock>,
}

impl AppointmentQueryService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        subjects: Arc<dyn PatientStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            subjects,
            clock,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.store
            .get(id)
            .await?
            .ok_or(SchedulingError::NotFound)
    }

    pub async fn search(
        &self,
        query: AppointmentSearchQuery,
    ) -> Result<AppointmentPage, SchedulingError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, MAX_PAGE_SIZE);

        let filter = AppointmentFilter {
            date: query.date,
            from_date: query.from_date,
            to_date: query.to_date,
            patient_id: query.patient_id,
            status: query.status,
        };

        let (appointments, total) = self.store.search(&filter, page, limit).await?;
        debug!("Appointment search matched {} rows", total);

        Ok(AppointmentPage {
            appointments,
            page,
            limit,
            total,
        })
    }

    pub async fn list_on(&self, date: NaiveDate) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self.store.list_on(date).await?)
    }

    /// Non-terminal appointments from today through today + N days.
    pub async fn upcoming(&self, query: UpcomingQuery) -> Result<Vec<Appointment>, SchedulingError> {
        let days = query.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
        if !(1..=MAX_UPCOMING_DAYS).contains(&days) {
            return Err(SchedulingError::Validation(format!(
                "days must be between 1 and {}",
                MAX_UPCOMING_DAYS
            )));
        }

        let from = self.clock.today();
        let to = from
            .checked_add_days(Days::new(days as u64))
            .unwrap_or(from);

        Ok(self.store.upcoming(from, to).await?)
    }

    /// A patient's appointment history. Unknown patients surface as a
    /// subject rejection even though this is a plain read.
    pub async fn for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        if self.subjects.get(patient_id).await?.is_none() {
            return Err(SchedulingError::SubjectNotFound);
        }

        Ok(self.store.list_for_patient(patient_id).await?)
    }
}
