use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use shared_database::{SnapshotStore, SnapshotTx, StoreError};

use crate::models::{Appointment, AppointmentStatus};

#[derive(Debug, Clone, Default)]
pub struct AppointmentTables {
    pub appointments: HashMap<Uuid, Appointment>,
}

/// Row filter for the read-only query surface.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    fn matches(&self, row: &Appointment) -> bool {
        self.date.is_none_or(|d| row.date == d)
            && self.from_date.is_none_or(|d| row.date >= d)
            && self.to_date.is_none_or(|d| row.date <= d)
            && self.patient_id.is_none_or(|p| row.patient_id == p)
            && self.status.is_none_or(|s| row.status == s)
    }
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Open a transaction for a read-validate-write sequence. The store
    /// serializes writers; the overlap check and the insert it guards can
    /// never interleave with another booking.
    async fn begin(&self) -> Result<Box<dyn AppointmentTx>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Filtered page ordered by date then start time, plus total match count.
    async fn search(
        &self,
        filter: &AppointmentFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Appointment>, i64), StoreError>;

    /// Every appointment on a date, ordered by start time.
    async fn list_on(&self, date: NaiveDate) -> Result<Vec<Appointment>, StoreError>;

    /// A patient's history, most recent date first.
    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    /// Non-terminal appointments with `from <= date <= to`, soonest first.
    async fn upcoming(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError>;
}

#[async_trait]
pub trait AppointmentTx: Send {
    async fn get(&mut self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Calendar-date partition read backing the overlap scan.
    async fn on_date(&mut self, date: NaiveDate) -> Result<Vec<Appointment>, StoreError>;

    async fn insert(&mut self, row: &Appointment) -> Result<(), StoreError>;

    async fn update(&mut self, row: &Appointment) -> Result<(), StoreError>;

    /// Hard delete. Returns whether the row existed.
    async fn remove(&mut self, id: Uuid) -> Result<bool, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[derive(Clone, Default)]
pub struct MemoryAppointmentStore {
    db: SnapshotStore<AppointmentTables>,
}

impl MemoryAppointmentStore {
    pub fn new() -> Self {
        Self {
            db: SnapshotStore::new(AppointmentTables::default()),
        }
    }
}

fn by_schedule(a: &Appointment, b: &Appointment) -> std::cmp::Ordering {
    a.date.cmp(&b.date).then(a.start_time.cmp(&b.start_time))
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn begin(&self) -> Result<Box<dyn AppointmentTx>, StoreError> {
        Ok(Box::new(MemoryAppointmentTx {
            tx: self.db.begin().await,
        }))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.db.read(|t| t.appointments.get(&id).cloned()).await)
    }

    async fn search(
        &self,
        filter: &AppointmentFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Appointment>, i64), StoreError> {
        let mut rows = self
            .db
            .read(|t| {
                t.appointments
                    .values()
                    .filter(|a| filter.matches(a))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;

        rows.sort_by(by_schedule);
        let total = rows.len() as i64;
        let offset = ((page - 1) * limit).max(0) as usize;
        let page_rows = rows
            .into_iter()
            .skip(offset)
            .take(limit.max(0) as usize)
            .collect();

        Ok((page_rows, total))
    }

    async fn list_on(&self, date: NaiveDate) -> Result<Vec<Appointment>, StoreError> {
        let mut rows = self
            .db
            .read(|t| {
                t.appointments
                    .values()
                    .filter(|a| a.date == date)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        rows.sort_by_key(|a| a.start_time);
        Ok(rows)
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let mut rows = self
            .db
            .read(|t| {
                t.appointments
                    .values()
                    .filter(|a| a.patient_id == patient_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.start_time.cmp(&b.start_time)));
        Ok(rows)
    }

    async fn upcoming(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut rows = self
            .db
            .read(|t| {
                t.appointments
                    .values()
                    .filter(|a| a.date >= from && a.date <= to && !a.status.is_terminal())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        rows.sort_by(by_schedule);
        Ok(rows)
    }
}

struct MemoryAppointmentTx {
    tx: SnapshotTx<AppointmentTables>,
}

#[async_trait]
impl AppointmentTx for MemoryAppointmentTx {
    async fn get(&mut self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.tx.rows().appointments.get(&id).cloned())
    }

    async fn on_date(&mut self, date: NaiveDate) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .tx
            .rows()
            .appointments
            .values()
            .filter(|a| a.date == date)
            .cloned()
            .collect())
    }

    async fn insert(&mut self, row: &Appointment) -> Result<(), StoreError> {
        self.tx.rows_mut().appointments.insert(row.id, row.clone());
        Ok(())
    }

    async fn update(&mut self, row: &Appointment) -> Result<(), StoreError> {
        self.tx.rows_mut().appointments.insert(row.id, row.clone());
        Ok(())
    }

    async fn remove(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tx.rows_mut().appointments.remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback();
        Ok(())
    }
}
