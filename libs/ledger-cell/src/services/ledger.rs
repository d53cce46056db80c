//! The ledger transaction manager: the authorized total, the paid total and
//! the balance are maintained together under one store transaction per
//! mutation, so the aggregate can never drift from its line items and
//! payment history.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use chart_cell::store::ChartStore;
use shared_utils::Clock;

use crate::error::LedgerError;
use crate::models::{
    Ledger, LedgerView, LineItem, LineItemDraft, OpenLedgerRequest, Payment, PaymentReceipt,
    RecordPaymentRequest, ReplaceLineItemsRequest,
};
use crate::store::LedgerStore;

pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    charts: Arc<dyn ChartStore>,
    clock: Arc<dyn Clock>,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        charts: Arc<dyn ChartStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            charts,
            clock,
        }
    }

    /// Open the ledger for a chart. The at-most-one-ledger-per-chart rule is
    /// re-checked inside the transaction, not left to the caller.
    pub async fn open(&self, request: OpenLedgerRequest) -> Result<LedgerView, LedgerError> {
        let drafts = validate_drafts(&request.line_items)?;

        if !self.charts.is_active(request.chart_id).await? {
            return Err(LedgerError::ChartNotFound);
        }

        let mut tx = self.store.begin().await?;

        if tx.find_by_chart(request.chart_id).await?.is_some() {
            debug!("Chart {} already has a ledger", request.chart_id);
            tx.rollback().await?;
            return Err(LedgerError::AlreadyExists);
        }

        let now = self.clock.now();
        let ledger_id = Uuid::new_v4();
        let line_items = materialize(ledger_id, drafts);
        let total: i64 = line_items.iter().map(|i| i.line_total_cents).sum();

        let ledger = Ledger {
            id: ledger_id,
            chart_id: request.chart_id,
            total_cents: total,
            total_paid_cents: 0,
            balance_cents: total,
            created_at: now,
            updated_at: now,
        };

        tx.insert_ledger(&ledger).await?;
        tx.replace_line_items(ledger_id, &line_items).await?;
        tx.commit().await?;

        info!(
            "Ledger {} opened for chart {} with total {} cents",
            ledger.id, ledger.chart_id, ledger.total_cents
        );
        Ok(LedgerView::new(ledger, line_items, vec![]))
    }

    /// Wholesale line-item replacement. `total` and `balance` are recomputed;
    /// payments already made are untouched. A replacement whose total falls
    /// below what has already been paid is rejected outright rather than
    /// driving the balance negative.
    pub async fn replace_line_items(
        &self,
        id: Uuid,
        request: ReplaceLineItemsRequest,
    ) -> Result<LedgerView, LedgerError> {
        let drafts = validate_drafts(&request.line_items)?;

        let mut tx = self.store.begin().await?;

        let mut ledger = match tx.get(id).await? {
            Some(l) => l,
            None => {
                tx.rollback().await?;
                return Err(LedgerError::NotFound);
            }
        };

        let line_items = materialize(id, drafts);
        let new_total: i64 = line_items.iter().map(|i| i.line_total_cents).sum();

        if new_total < ledger.total_paid_cents {
            warn!(
                "Replacement for ledger {} rejected: new total {} below paid {}",
                id, new_total, ledger.total_paid_cents
            );
            let rejection = LedgerError::ReplacementBelowPaid {
                new_total,
                total_paid: ledger.total_paid_cents,
            };
            tx.rollback().await?;
            return Err(rejection);
        }

        ledger.total_cents = new_total;
        ledger.balance_cents = new_total - ledger.total_paid_cents;
        ledger.updated_at = self.clock.now();

        tx.replace_line_items(id, &line_items).await?;
        tx.update_ledger(&ledger).await?;
        let payments = tx.payments(id).await?;
        tx.commit().await?;

        info!(
            "Ledger {} line items replaced, new total {} cents",
            id, new_total
        );
        Ok(LedgerView::new(ledger, line_items, payments))
    }

    /// Record a payment. The balance bound is the core invariant check: a
    /// payment above the outstanding balance is rejected, never capped or
    /// partially applied.
    pub async fn pay(
        &self,
        id: Uuid,
        request: RecordPaymentRequest,
    ) -> Result<PaymentReceipt, LedgerError> {
        if request.amount_cents <= 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let mut tx = self.store.begin().await?;

        let mut ledger = match tx.get(id).await? {
            Some(l) => l,
            None => {
                tx.rollback().await?;
                return Err(LedgerError::NotFound);
            }
        };

        if request.amount_cents > ledger.balance_cents {
            warn!(
                "Payment of {} cents rejected for ledger {}: balance is {}",
                request.amount_cents, id, ledger.balance_cents
            );
            let rejection = LedgerError::ExceedsBalance {
                requested: request.amount_cents,
                balance: ledger.balance_cents,
            };
            tx.rollback().await?;
            return Err(rejection);
        }

        let now = self.clock.now();
        let balance_before = ledger.balance_cents;
        let balance_after = balance_before - request.amount_cents;

        let payment = Payment {
            id: Uuid::new_v4(),
            ledger_id: id,
            amount_cents: request.amount_cents,
            date: request.date.unwrap_or_else(|| self.clock.today()),
            note: clean_text(request.note),
            balance_before_cents: balance_before,
            balance_after_cents: balance_after,
            created_at: now,
        };

        ledger.total_paid_cents += request.amount_cents;
        ledger.balance_cents = balance_after;
        ledger.updated_at = now;

        tx.insert_payment(&payment).await?;
        tx.update_ledger(&ledger).await?;
        tx.commit().await?;

        info!(
            "Payment of {} cents recorded for ledger {}, balance now {}",
            payment.amount_cents, id, ledger.balance_cents
        );
        let settlement = ledger.settlement();
        Ok(PaymentReceipt {
            payment,
            ledger,
            settlement,
        })
    }

    pub async fn read(&self, id: Uuid) -> Result<LedgerView, LedgerError> {
        let ledger = self.store.get(id).await?.ok_or(LedgerError::NotFound)?;
        self.assemble(ledger).await
    }

    pub async fn read_by_chart(&self, chart_id: Uuid) -> Result<LedgerView, LedgerError> {
        let ledger = self
            .store
            .get_by_chart(chart_id)
            .await?
            .ok_or(LedgerError::NotFound)?;
        self.assemble(ledger).await
    }

    pub async fn payments(&self, id: Uuid) -> Result<Vec<Payment>, LedgerError> {
        if self.store.get(id).await?.is_none() {
            return Err(LedgerError::NotFound);
        }
        Ok(self.store.payments(id).await?)
    }

    /// Cascading delete: no orphan line items or payments survive.
    pub async fn delete(&self, id: Uuid) -> Result<(), LedgerError> {
        let mut tx = self.store.begin().await?;

        if !tx.delete_ledger(id).await? {
            tx.rollback().await?;
            return Err(LedgerError::NotFound);
        }

        tx.commit().await?;

        info!("Ledger {} deleted with its line items and payments", id);
        Ok(())
    }

    async fn assemble(&self, ledger: Ledger) -> Result<LedgerView, LedgerError> {
        let line_items = self.store.line_items(ledger.id).await?;
        let payments = self.store.payments(ledger.id).await?;
        Ok(LedgerView::new(ledger, line_items, payments))
    }
}

struct CleanDraft {
    sequence: i32,
    description: String,
    unit_cost_cents: i64,
    quantity: i32,
}

fn validate_drafts(drafts: &[LineItemDraft]) -> Result<Vec<CleanDraft>, LedgerError> {
    if drafts.is_empty() {
        return Err(LedgerError::Validation(
            "at least one line item is required".to_string(),
        ));
    }

    drafts
        .iter()
        .map(|draft| {
            if draft.sequence < 1 {
                return Err(LedgerError::Validation(
                    "line item sequence must be positive".to_string(),
                ));
            }
            let description = draft.description.trim().to_string();
            if description.is_empty() {
                return Err(LedgerError::Validation(
                    "line item description is required".to_string(),
                ));
            }
            if draft.unit_cost_cents < 0 {
                return Err(LedgerError::Validation(
                    "line item unit cost must not be negative".to_string(),
                ));
            }
            let quantity = draft.quantity.unwrap_or(1);
            if quantity < 1 {
                return Err(LedgerError::Validation(
                    "line item quantity must be at least 1".to_string(),
                ));
            }
            Ok(CleanDraft {
                sequence: draft.sequence,
                description,
                unit_cost_cents: draft.unit_cost_cents,
                quantity,
            })
        })
        .collect()
}

fn materialize(ledger_id: Uuid, drafts: Vec<CleanDraft>) -> Vec<LineItem> {
    drafts
        .into_iter()
        .map(|draft| LineItem {
            id: Uuid::new_v4(),
            ledger_id,
            sequence: draft.sequence,
            description: draft.description,
            unit_cost_cents: draft.unit_cost_cents,
            quantity: draft.quantity,
            line_total_cents: draft.unit_cost_cents * i64::from(draft.quantity),
        })
        .collect()
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
