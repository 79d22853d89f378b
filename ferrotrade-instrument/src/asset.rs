use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// The name of an asset (e.g. `BTC`, `USDT`), interned as a [`SmolStr`] to keep [`crate::symbol::Symbol`]
/// cheap to clone across subscription fan-out and order construction.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct AssetName(pub SmolStr);

impl AssetName {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<SmolStr>> From<T> for AssetName {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
