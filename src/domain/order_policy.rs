//! Order-placement policy shared by every venue.
//!
//! Applied before any order leaves the process:
//! 1. Refuse sizes under the symbol's minimum size or minimum notional.
//! 2. Truncate the size down to the size precision (never up).
//! 3. Move the price one tick away from the touch (buys lower, sells
//!    higher) and snap it onto the tick grid on the requested side, so
//!    the order rests as a maker instead of crossing.

use rust_decimal::{Decimal, RoundingStrategy};

use super::market::SymbolDetails;
use super::order::{OrderRequest, PreparedOrder, Side};
use crate::error::ExchangeError;

/// Whether a size and its notional value clear the symbol's minimums.
pub fn meets_minimums(details: &SymbolDetails, size: Decimal, notional: Decimal) -> bool {
    size >= details.min_limit_order_size && notional >= details.min_order_value
}

/// Truncate `size` toward zero at `precision` decimal places.
pub fn truncate_size(size: Decimal, precision: u32) -> Decimal {
    size.round_dp_with_strategy(precision, RoundingStrategy::ToZero)
}

/// Shift `price` one tick away from the touch and snap it to the grid.
///
/// For a buy the result lies in `[price - tick, price)`, for a sell in
/// `(price, price + tick]`. Returns `None` when the shift overflows or
/// the value is too large to carry a tick at this precision.
pub fn adjust_price(details: &SymbolDetails, side: Side, price: Decimal) -> Option<Decimal> {
    let tick = details.tick_size;
    let precision = details.price_precision;
    let snapped = match side {
        Side::Buy => price
            .checked_sub(tick)?
            .round_dp_with_strategy(precision, RoundingStrategy::ToPositiveInfinity),
        Side::Sell => price
            .checked_add(tick)?
            .round_dp_with_strategy(precision, RoundingStrategy::ToNegativeInfinity),
    };
    let moved = match side {
        Side::Buy => snapped < price,
        Side::Sell => snapped > price,
    };
    moved.then_some(snapped)
}

/// Validate and adjust a request against `details`.
///
/// # Errors
/// - [`ExchangeError::InvalidRequest`] when the request has no price, a
///   non-positive size or price, a notional or tick shift that overflows,
///   or an adjusted price that falls to zero.
/// - [`ExchangeError::BelowMinimum`] when the order is too small to place.
pub fn prepare(details: &SymbolDetails, request: OrderRequest) -> Result<PreparedOrder, ExchangeError> {
    let Some(price) = request.price else {
        return Err(ExchangeError::InvalidRequest(format!(
            "{} order on {} requires a price",
            request.order_type, details.symbol
        )));
    };
    if request.size <= Decimal::ZERO || price <= Decimal::ZERO {
        return Err(ExchangeError::InvalidRequest(format!(
            "size and price must be positive, got size={} price={price}",
            request.size
        )));
    }

    let notional = request.size.checked_mul(price).ok_or_else(|| {
        ExchangeError::InvalidRequest(format!(
            "notional of size {} at price {price} overflows",
            request.size
        ))
    })?;
    if !meets_minimums(details, request.size, notional) {
        return Err(ExchangeError::BelowMinimum {
            symbol: details.symbol.clone(),
            reason: format!(
                "size {} (min {}) value {notional} (min {})",
                request.size, details.min_limit_order_size, details.min_order_value
            ),
        });
    }

    let size = truncate_size(request.size, details.size_precision);
    if size.is_zero() {
        return Err(ExchangeError::BelowMinimum {
            symbol: details.symbol.clone(),
            reason: format!(
                "size {} truncates to zero at precision {}",
                request.size, details.size_precision
            ),
        });
    }

    let adjusted = adjust_price(details, request.side, price)
        .filter(|adjusted| *adjusted > Decimal::ZERO)
        .ok_or_else(|| {
            ExchangeError::InvalidRequest(format!(
                "price {price} leaves no room for a one-tick shift at precision {}",
                details.price_precision
            ))
        })?;

    let mut request = request;
    request.symbol = details.symbol.clone();
    Ok(PreparedOrder {
        request,
        size,
        price: adjusted,
    })
}
