use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use shared_database::{SnapshotStore, SnapshotTx, StoreError};

use crate::models::{Ledger, LineItem, Payment};

#[derive(Debug, Clone, Default)]
pub struct LedgerTables {
    pub ledgers: HashMap<Uuid, Ledger>,
    pub line_items: HashMap<Uuid, LineItem>,
    pub payments: HashMap<Uuid, Payment>,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a transaction for a read-validate-write sequence over one
    /// ledger aggregate. Writers are serialized, so a balance read inside
    /// the transaction cannot go stale before its payment commits.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Ledger>, StoreError>;

    async fn get_by_chart(&self, chart_id: Uuid) -> Result<Option<Ledger>, StoreError>;

    /// Line items ordered by sequence number ascending.
    async fn line_items(&self, ledger_id: Uuid) -> Result<Vec<LineItem>, StoreError>;

    /// Payments ordered most recent first.
    async fn payments(&self, ledger_id: Uuid) -> Result<Vec<Payment>, StoreError>;
}

#[async_trait]
pub trait LedgerTx: Send {
    async fn get(&mut self, id: Uuid) -> Result<Option<Ledger>, StoreError>;

    async fn find_by_chart(&mut self, chart_id: Uuid) -> Result<Option<Uuid>, StoreError>;

    async fn insert_ledger(&mut self, ledger: &Ledger) -> Result<(), StoreError>;

    async fn update_ledger(&mut self, ledger: &Ledger) -> Result<(), StoreError>;

    /// Discard every line item of the ledger and insert the replacement set.
    async fn replace_line_items(
        &mut self,
        ledger_id: Uuid,
        items: &[LineItem],
    ) -> Result<(), StoreError>;

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError>;

    async fn payments(&mut self, ledger_id: Uuid) -> Result<Vec<Payment>, StoreError>;

    /// Cascading delete: the ledger's line items and payments go with it.
    /// Returns whether the ledger existed.
    async fn delete_ledger(&mut self, id: Uuid) -> Result<bool, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    db: SnapshotStore<LedgerTables>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            db: SnapshotStore::new(LedgerTables::default()),
        }
    }
}

fn sorted_items(tables: &LedgerTables, ledger_id: Uuid) -> Vec<LineItem> {
    let mut items: Vec<LineItem> = tables
        .line_items
        .values()
        .filter(|i| i.ledger_id == ledger_id)
        .cloned()
        .collect();
    items.sort_by_key(|i| i.sequence);
    items
}

fn sorted_payments(tables: &LedgerTables, ledger_id: Uuid) -> Vec<Payment> {
    let mut payments: Vec<Payment> = tables
        .payments
        .values()
        .filter(|p| p.ledger_id == ledger_id)
        .cloned()
        .collect();
    payments.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
    payments
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        Ok(Box::new(MemoryLedgerTx {
            tx: self.db.begin().await,
        }))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Ledger>, StoreError> {
        Ok(self.db.read(|t| t.ledgers.get(&id).cloned()).await)
    }

    async fn get_by_chart(&self, chart_id: Uuid) -> Result<Option<Ledger>, StoreError> {
        Ok(self
            .db
            .read(|t| {
                t.ledgers
                    .values()
                    .find(|l| l.chart_id == chart_id)
                    .cloned()
            })
            .await)
    }

    async fn line_items(&self, ledger_id: Uuid) -> Result<Vec<LineItem>, StoreError> {
        Ok(self.db.read(|t| sorted_items(t, ledger_id)).await)
    }

    async fn payments(&self, ledger_id: Uuid) -> Result<Vec<Payment>, StoreError> {
        Ok(self.db.read(|t| sorted_payments(t, ledger_id)).await)
    }
}

struct MemoryLedgerTx {
    tx: SnapshotTx<LedgerTables>,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn get(&mut self, id: Uuid) -> Result<Option<Ledger>, StoreError> {
        Ok(self.tx.rows().ledgers.get(&id).cloned())
    }

    async fn find_by_chart(&mut self, chart_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self
            .tx
            .rows()
            .ledgers
            .values()
            .find(|l| l.chart_id == chart_id)
            .map(|l| l.id))
    }

    async fn insert_ledger(&mut self, ledger: &Ledger) -> Result<(), StoreError> {
        self.tx.rows_mut().ledgers.insert(ledger.id, ledger.clone());
        Ok(())
    }

    async fn update_ledger(&mut self, ledger: &Ledger) -> Result<(), StoreError> {
        self.tx.rows_mut().ledgers.insert(ledger.id, ledger.clone());
        Ok(())
    }

    async fn replace_line_items(
        &mut self,
        ledger_id: Uuid,
        items: &[LineItem],
    ) -> Result<(), StoreError> {
        let rows = self.tx.rows_mut();
        rows.line_items.retain(|_, i| i.ledger_id != ledger_id);
        for item in items {
            rows.line_items.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        self.tx
            .rows_mut()
            .payments
            .insert(payment.id, payment.clone());
        Ok(())
    }

    async fn payments(&mut self, ledger_id: Uuid) -> Result<Vec<Payment>, StoreError> {
        Ok(sorted_payments(self.tx.rows(), ledger_id))
    }

    async fn delete_ledger(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let rows = self.tx.rows_mut();
        if rows.ledgers.remove(&id).is_none() {
            return Ok(false);
        }
        rows.line_items.retain(|_, i| i.ledger_id != id);
        rows.payments.retain(|_, p| p.ledger_id != id);
        Ok(true)
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
