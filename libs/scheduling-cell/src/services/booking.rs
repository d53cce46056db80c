//! The scheduling conflict resolver: every mutation runs its
//! read-validate-write sequence inside a single store transaction, and every
//! rejection rolls that transaction back before surfacing.

use std::sync::Arc;

use chrono::NaiveTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use patient_cell::store::PatientStore;
use shared_utils::Clock;

use crate::error::SchedulingError;
use crate::models::{
    Appointment, AppointmentPatch, AppointmentStatus, BookAppointmentRequest, SchedulingRules,
};
use crate::store::AppointmentStore;

const MAX_REASON_CHARS: usize = 255;

pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
    subjects: Arc<dyn PatientStore>,
    clock: Arc<dyn Clock>,
    rules: SchedulingRules,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        subjects: Arc<dyn PatientStore>,
        clock: Arc<dyn Clock>,
        rules: SchedulingRules,
    ) -> Self {
        Self {
            store,
            subjects,
            clock,
            rules,
        }
    }

    pub async fn book(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        self.validate_window(request.start_time, request.end_time)?;
        let reason = clean_reason(request.reason)?;
        let notes = clean_text(request.notes);

        if !self.subjects.is_active(request.patient_id).await? {
            return Err(SchedulingError::SubjectNotFound);
        }

        let mut tx = self.store.begin().await?;

        let existing = tx.on_date(request.date).await?;
        if let Some(conflict) =
            find_conflict(&existing, request.start_time, request.end_time, None)
        {
            warn!(
                "Booking conflict on {}: requested {} to {} collides with {}",
                request.date, request.start_time, request.end_time, conflict.id
            );
            let rejection = SchedulingError::SlotConflict {
                id: conflict.id,
                start_time: conflict.start_time,
                end_time: conflict.end_time,
            };
            tx.rollback().await?;
            return Err(rejection);
        }

        let now = self.clock.now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            status: AppointmentStatus::Scheduled,
            reason,
            notes,
            created_at: now,
            updated_at: now,
        };

        tx.insert(&appointment).await?;
        tx.commit().await?;

        info!(
            "Appointment {} booked on {} {} to {}",
            appointment.id, appointment.date, appointment.start_time, appointment.end_time
        );
        Ok(appointment)
    }

    /// Partial update. The interval invariants are only re-checked when the
    /// patch moves the appointment on the calendar; the overlap scan then
    /// excludes the appointment itself.
    pub async fn reschedule(
        &self,
        id: Uuid,
        mut patch: AppointmentPatch,
    ) -> Result<Appointment, SchedulingError> {
        if patch.is_empty() {
            return Err(SchedulingError::NoChanges);
        }
        let reason = match patch.reason.take() {
            Some(r) => Some(clean_reason(Some(r))?),
            None => None,
        };

        let mut tx = self.store.begin().await?;

        let mut appointment = match tx.get(id).await? {
            Some(row) => row,
            None => {
                tx.rollback().await?;
                return Err(SchedulingError::NotFound);
            }
        };

        let new_date = patch.date.unwrap_or(appointment.date);
        let new_start = patch.start_time.unwrap_or(appointment.start_time);
        let new_end = patch.end_time.unwrap_or(appointment.end_time);

        if patch.moves_interval() {
            if let Err(rejection) = self.validate_window(new_start, new_end) {
                tx.rollback().await?;
                return Err(rejection);
            }

            let existing = tx.on_date(new_date).await?;
            if let Some(conflict) = find_conflict(&existing, new_start, new_end, Some(id)) {
                debug!(
                    "Reschedule of {} rejected: collides with {}",
                    id, conflict.id
                );
                let rejection = SchedulingError::SlotConflict {
                    id: conflict.id,
                    start_time: conflict.start_time,
                    end_time: conflict.end_time,
                };
                tx.rollback().await?;
                return Err(rejection);
            }
        }

        appointment.date = new_date;
        appointment.start_time = new_start;
        appointment.end_time = new_end;
        if let Some(status) = patch.status {
            appointment.status = status;
        }
        if let Some(r) = reason {
            appointment.reason = r;
        }
        if let Some(notes) = patch.notes {
            appointment.notes = clean_text(Some(notes));
        }
        appointment.updated_at = self.clock.now();

        tx.update(&appointment).await?;
        tx.commit().await?;

        info!("Appointment {} rescheduled", id);
        Ok(appointment)
    }

    /// Unconditional status write. Cancelling or completing never needs to
    /// re-satisfy the overlap invariant, so no interval check runs here.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, SchedulingError> {
        let mut tx = self.store.begin().await?;

        let mut appointment = match tx.get(id).await? {
            Some(row) => row,
            None => {
                tx.rollback().await?;
                return Err(SchedulingError::NotFound);
            }
        };

        appointment.status = status;
        appointment.updated_at = self.clock.now();

        tx.update(&appointment).await?;
        tx.commit().await?;

        info!("Appointment {} moved to status {}", id, status);
        Ok(appointment)
    }

    /// Hard delete. The slot is free for rebooking as soon as the
    /// transaction commits.
    pub async fn delete(&self, id: Uuid) -> Result<(), SchedulingError> {
        let mut tx = self.store.begin().await?;

        if !tx.remove(id).await? {
            tx.rollback().await?;
            return Err(SchedulingError::NotFound);
        }

        tx.commit().await?;

        info!("Appointment {} deleted", id);
        Ok(())
    }

    fn validate_window(
        &self,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<(), SchedulingError> {
        if start < self.rules.opens || end > self.rules.closes {
            return Err(SchedulingError::InvalidWindow(format!(
                "appointments must fall between {} and {}",
                self.rules.opens.format("%H:%M"),
                self.rules.closes.format("%H:%M")
            )));
        }

        if start >= end {
            return Err(SchedulingError::InvalidWindow(
                "start time must be before end time".to_string(),
            ));
        }

        let duration = (end - start).num_minutes();
        if duration < self.rules.min_duration_minutes {
            return Err(SchedulingError::InvalidWindow(format!(
                "appointments must last at least {} minutes",
                self.rules.min_duration_minutes
            )));
        }

        Ok(())
    }
}

/// First appointment still blocking the calendar that overlaps the requested
/// interval, skipping `exclude` so a reschedule never collides with itself.
fn find_conflict(
    rows: &[Appointment],
    start: NaiveTime,
    end: NaiveTime,
    exclude: Option<Uuid>,
) -> Option<&Appointment> {
    rows.iter()
        .filter(|a| a.status.blocks_calendar())
        .filter(|a| exclude != Some(a.id))
        .find(|a| a.overlaps(start, end))
}

fn clean_reason(reason: Option<String>) -> Result<Option<String>, SchedulingError> {
    let cleaned = clean_text(reason);
    if let Some(reason) = &cleaned {
        if reason.chars().count() > MAX_REASON_CHARS {
            return Err(SchedulingError::Validation(format!(
                "reason too long (max {} characters)",
                MAX_REASON_CHARS
            )));
        }
    }
    Ok(cleaned)
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
