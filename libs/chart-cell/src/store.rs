use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use shared_database::{SnapshotStore, SnapshotTx, StoreError};

use crate::models::Chart;

#[derive(Debug, Clone, Default)]
pub struct ChartTables {
    pub charts: HashMap<Uuid, Chart>,
}

#[async_trait]
pub trait ChartStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn ChartTx>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Chart>, StoreError>;

    /// Active charts for a patient, most recent chart date first.
    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Chart>, StoreError>;

    /// Chart-directory lookup used by the ledger cell.
    async fn is_active(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ChartTx: Send {
    async fn get(&mut self, id: Uuid) -> Result<Option<Chart>, StoreError>;

    async fn upsert(&mut self, chart: &Chart) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[derive(Clone, Default)]
pub struct MemoryChartStore {
    db: SnapshotStore<ChartTables>,
}

impl MemoryChartStore {
    pub fn new() -> Self {
        Self {
            db: SnapshotStore::new(ChartTables::default()),
        }
    }
}

#[async_trait]
impl ChartStore for MemoryChartStore {
    async fn begin(&self) -> Result<Box<dyn ChartTx>, StoreError> {
        Ok(Box::new(MemoryChartTx {
            tx: self.db.begin().await,
        }))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Chart>, StoreError> {
        Ok(self.db.read(|t| t.charts.get(&id).cloned()).await)
    }

    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Chart>, StoreError> {
        let mut charts = self
            .db
            .read(|t| {
                t.charts
                    .values()
                    .filter(|c| c.patient_id == patient_id && c.active)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        charts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(charts)
    }

    async fn is_active(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .db
            .read(|t| t.charts.get(&id).map(|c| c.active).unwrap_or(false))
            .await)
    }
}

struct MemoryChartTx {
    tx: SnapshotTx<ChartTables>,
}

#[async_trait]
impl ChartTx for MemoryChartTx {
    async fn get(&mut self, id: Uuid) -> Result<Option<Chart>, StoreError> {
        Ok(self.tx.rows().charts.get(&id).cloned())
    }

    async fn upsert(&mut self, chart: &Chart) -> Result<(), StoreError> {
        self.tx.rows_mut().charts.insert(chart.id, chart.clone());
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
