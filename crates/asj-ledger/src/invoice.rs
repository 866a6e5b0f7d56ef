//! Invoice totals and payment-method rules for the cashier station.

use asj_money::{Cents, RateBps};

/// How a bidder settled (part of) an invoice.
///
/// The discriminants are stable and stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    NotPaid = 0,
    Cash = 1,
    Check = 2,
    /// Manually keyed credit card transaction.
    ManualCard = 3,
    Other = 4,
    /// Card captured by a Square Terminal checkout.
    SquareCard = 5,
}

impl PaymentMethod {
    /// Square Terminal payments complete asynchronously via webhook; the
    /// rest are complete the moment the cashier records them.
    pub fn completes_immediately(&self) -> bool {
        !matches!(self, PaymentMethod::NotPaid | PaymentMethod::SquareCard)
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(PaymentMethod::NotPaid),
            1 => Some(PaymentMethod::Cash),
            2 => Some(PaymentMethod::Check),
            3 => Some(PaymentMethod::ManualCard),
            4 => Some(PaymentMethod::Other),
            5 => Some(PaymentMethod::SquareCard),
            _ => None,
        }
    }

    pub fn code(&self) -> i16 {
        *self as i16
    }
}

/// One payment recorded against an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoicePayment {
    pub amount: Cents,
    pub method: PaymentMethod,
    /// Only complete payments count toward the paid total.
    pub complete: bool,
}

/// Derived totals for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    /// Σ item prices.
    pub item_total: Cents,
    pub tax_paid: Cents,
    /// item_total + tax_paid.
    pub item_and_tax_total: Cents,
    /// Σ complete payments.
    pub total_paid: Cents,
    /// item_and_tax_total − total_paid. May go negative on overpayment;
    /// the cashier surface treats that as change due.
    pub payment_remaining: Cents,
}

/// Compute invoice totals from item prices and recorded payments.
pub fn invoice_totals(
    item_prices: &[Cents],
    tax_paid: Cents,
    payments: &[InvoicePayment],
) -> InvoiceTotals {
    let item_total: Cents = item_prices.iter().copied().sum();
    let item_and_tax_total = item_total + tax_paid;
    let total_paid: Cents = payments
        .iter()
        .filter(|p| p.complete)
        .map(|p| p.amount)
        .sum();
    InvoiceTotals {
        item_total,
        tax_paid,
        item_and_tax_total,
        total_paid,
        payment_remaining: item_and_tax_total - total_paid,
    }
}

/// Tax due on a subtotal at the show's rate.
pub fn tax_on(subtotal: Cents, tax_rate: RateBps) -> Cents {
    tax_rate.apply(subtotal)
}
