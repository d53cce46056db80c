use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use shared_database::{SnapshotStore, SnapshotTx, StoreError};

use crate::models::Patient;

/// Registry rows, keyed by patient id.
#[derive(Debug, Clone, Default)]
pub struct PatientTables {
    pub patients: HashMap<Uuid, Patient>,
}

#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn PatientTx>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Patient>, StoreError>;

    /// Active patients matching the optional search term, newest first,
    /// with the total match count for pagination.
    async fn search(
        &self,
        term: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Patient>, i64), StoreError>;

    /// Subject-directory lookup used by the scheduling cell.
    async fn is_active(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait PatientTx: Send {
    async fn get(&mut self, id: Uuid) -> Result<Option<Patient>, StoreError>;

    async fn find_record_number(&mut self, record_number: &str)
        -> Result<Option<Uuid>, StoreError>;

    async fn upsert(&mut self, patient: &Patient) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[derive(Clone, Default)]
pub struct MemoryPatientStore {
    db: SnapshotStore<PatientTables>,
}

impl MemoryPatientStore {
    pub fn new() -> Self {
        Self {
            db: SnapshotStore::new(PatientTables::default()),
        }
    }
}

#[async_trait]
impl PatientStore for MemoryPatientStore {
    async fn begin(&self) -> Result<Box<dyn PatientTx>, StoreError> {
        Ok(Box::new(MemoryPatientTx {
            tx: self.db.begin().await,
        }))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        Ok(self.db.read(|t| t.patients.get(&id).cloned()).await)
    }

    async fn search(
        &self,
        term: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Patient>, i64), StoreError> {
        let needle = term.map(str::to_lowercase);
        let mut matches = self
            .db
            .read(|t| {
                t.patients
                    .values()
                    .filter(|p| p.active)
                    .filter(|p| match &needle {
                        Some(n) => {
                            p.first_name.to_lowercase().contains(n)
                                || p.last_name.to_lowercase().contains(n)
                                || p.record_number.to_lowercase().contains(n)
                        }
                        None => true,
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matches.len() as i64;
        let offset = ((page - 1) * limit).max(0) as usize;
        let page_rows = matches
            .into_iter()
            .skip(offset)
            .take(limit.max(0) as usize)
            .collect();

        Ok((page_rows, total))
    }

    async fn is_active(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .db
            .read(|t| t.patients.get(&id).map(|p| p.active).unwrap_or(false))
            .await)
    }
}

struct MemoryPatientTx {
    tx: SnapshotTx<PatientTables>,
}

#[async_trait]
impl PatientTx for MemoryPatientTx {
    async fn get(&mut self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        Ok(self.tx.rows().patients.get(&id).cloned())
    }

    async fn find_record_number(
        &mut self,
        record_number: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        Ok(self
            .tx
            .rows()
            .patients
            .values()
            .find(|p| p.record_number == record_number)
            .map(|p| p.id))
    }

    async fn upsert(&mut self, patient: &Patient) -> Result<(), StoreError> {
        self.tx
            .rows_mut()
            .patients
            .insert(patient.id, patient.clone());
        Ok(())
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
