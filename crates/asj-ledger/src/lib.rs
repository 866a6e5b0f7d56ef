//! asj-ledger: money movement rules for artist accounts and invoices.
//!
//! Pure crate — no IO, no DB. The persistence layer loads entries and
//! allocations, calls into here, and writes the results back:
//!
//! - [`artist`]: balances, space-fee deductions, winnings + commission runs,
//!   cheque drafting.
//! - [`invoice`]: cashier invoice totals and payment-method completion rules.

pub mod artist;
pub mod invoice;

pub use artist::{
    balance, cheque_for_balance, deduction_details, space_charge, space_fee_description,
    space_fee_entry, winnings_and_commission, ChequeDraft, DeductionDetails, PaymentEntry,
    PaymentKind, PieceSummary, PricedAllocation, WinningsOutcome,
};
pub use invoice::{invoice_totals, tax_on, InvoicePayment, InvoiceTotals, PaymentMethod};
