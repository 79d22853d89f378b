use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstrumentError {
    #[error("quantity {quantity} is below lot size {lot_size}")]
    BelowLotSize { quantity: Decimal, lot_size: Decimal },

    #[error("notional {notional} is below minNotional {min_notional}")]
    BelowMinNotional { notional: Decimal, min_notional: Decimal },

    #[error("price {price} is not a multiple of tick size {tick_size}")]
    InvalidTickAlignment { price: Decimal, tick_size: Decimal },

    #[error("symbol {venue}:{base}/{quote} is not trading (status {status:?})")]
    NotTrading {
        venue: String,
        base: String,
        quote: String,
        status: crate::symbol::SymbolStatus,
    },
}
