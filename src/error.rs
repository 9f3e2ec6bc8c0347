//! Error taxonomy for exchange operations.
//!
//! Every variant is detected before the first mutation of its call: a failing
//! operation leaves the ledger and every order chain exactly as they were.

/// Why an exchange call was rejected. Nothing here is fatal to the exchange
/// itself; retry (after a deposit, say) is the caller's business.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// Zero amount, zero price, or a buy whose collateral rounds to nothing.
    #[error("invalid order: amount and price must be nonzero")]
    InvalidOrder,
    /// Available funds below the required collateral (or withdrawal amount).
    #[error("insufficient balance")]
    InsufficientBalance,
    /// Cancel attempted by an account that does not own the order.
    #[error("unauthorized")]
    Unauthorized,
    /// The order id was never allocated or its slot has been cleared.
    #[error("order not found")]
    OrderNotFound,
    /// The asset has no market (the native asset cannot trade against itself).
    #[error("invalid market")]
    InvalidMarket,
    /// A collateral or value product exceeds the representable range.
    #[error("amount overflow")]
    AmountOverflow,
}
