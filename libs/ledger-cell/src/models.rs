use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// All monetary values are integer minor units (cents) so ledger sums stay
// exact under arithmetic.

// ==============================================================================
// LEDGER AGGREGATE
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub id: Uuid,
    /// Owning clinical chart; at most one ledger per chart.
    pub chart_id: Uuid,
    pub total_cents: i64,
    pub total_paid_cents: i64,
    /// Maintained as `total - total_paid` on every mutation; clients read
    /// this field, they never recompute it.
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ledger {
    /// Payment band derived from the aggregate fields. Deliberately not a
    /// persisted status: `pay` and `replace_line_items` move the ledger
    /// between bands purely by changing the sums.
    pub fn settlement(&self) -> Settlement {
        if self.balance_cents == 0 && self.total_paid_cents > 0 {
            Settlement::Settled
        } else if self.total_paid_cents == 0 {
            Settlement::OpenUnpaid
        } else {
            Settlement::PartiallyPaid
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    OpenUnpaid,
    PartiallyPaid,
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub ledger_id: Uuid,
    pub sequence: i32,
    pub description: String,
    pub unit_cost_cents: i64,
    pub quantity: i32,
    pub line_total_cents: i64,
}

/// Immutable movement record. Never updated after insertion; the running
/// balances are captured at payment time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub ledger_id: Uuid,
    pub amount_cents: i64,
    pub date: NaiveDate,
    pub note: Option<String>,
    pub balance_before_cents: i64,
    pub balance_after_cents: i64,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemDraft {
    pub sequence: i32,
    pub description: String,
    pub unit_cost_cents: i64,
    /// Defaults to 1 when omitted.
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenLedgerRequest {
    pub chart_id: Uuid,
    pub line_items: Vec<LineItemDraft>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceLineItemsRequest {
    pub line_items: Vec<LineItemDraft>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount_cents: i64,
    /// Defaults to today when omitted.
    pub date: Option<NaiveDate>,
    pub note: Option<String>,
}

/// Aggregate read: line items sequence-ascending, payments most recent
/// first.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerView {
    pub ledger: Ledger,
    pub settlement: Settlement,
    pub line_items: Vec<LineItem>,
    pub payments: Vec<Payment>,
}

impl LedgerView {
    pub fn new(ledger: Ledger, line_items: Vec<LineItem>, payments: Vec<Payment>) -> Self {
        let settlement = ledger.settlement();
        Self {
            ledger,
            settlement,
            line_items,
            payments,
        }
    }
}

/// Result of a successful payment: the movement plus the updated summary.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub ledger: Ledger,
    pub settlement: Settlement,
}
