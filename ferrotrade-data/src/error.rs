use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("exchange adapter error: {0}")]
    Exchange(#[from] ferrotrade_exchange::ExchangeError),

    #[error("unknown subscriber {0}")]
    UnknownSubscriber(String),
}
