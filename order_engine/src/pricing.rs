//! The price calculator.
//!
//! Totals are always recomputed server-side from the cart snapshot; a client-supplied total is never trusted. All
//! arithmetic is integer arithmetic on [`Cents`], with overflow reported as an error rather than wrapped.

use opg_common::Cents;
use thiserror::Error;

use crate::db_types::CartItem;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidCartError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Item '{0}' has a non-positive quantity ({1})")]
    NonPositiveQuantity(String, i64),
    #[error("Item '{0}' has a negative unit price ({1})")]
    NegativeUnitPrice(String, Cents),
    #[error("The order total overflows the money type")]
    Overflow,
}

/// Computes the order total: `Σ(unit_price × quantity) + delivery_fee`.
///
/// Fails if the cart is empty, any quantity is not strictly positive, any unit price is negative, or the sum cannot
/// be represented. The result is never negative.
pub fn calculate_order_total(items: &[CartItem], delivery_fee: Cents) -> Result<Cents, InvalidCartError> {
    if items.is_empty() {
        return Err(InvalidCartError::EmptyCart);
    }
    if delivery_fee.is_negative() {
        return Err(InvalidCartError::NegativeUnitPrice("delivery fee".to_string(), delivery_fee));
    }
    let mut total = delivery_fee;
    for item in items {
        if item.quantity <= 0 {
            return Err(InvalidCartError::NonPositiveQuantity(item.name.clone(), item.quantity));
        }
        if item.unit_price.is_negative() {
            return Err(InvalidCartError::NegativeUnitPrice(item.name.clone(), item.unit_price));
        }
        let line = item.unit_price.checked_mul(item.quantity).ok_or(InvalidCartError::Overflow)?;
        total = total.checked_add(line).ok_or(InvalidCartError::Overflow)?;
    }
    Ok(total)
}
