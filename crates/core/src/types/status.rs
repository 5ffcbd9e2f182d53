//! Order workflow state.

use core::convert::Infallible;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order workflow state.
///
/// Only [`OrderState::Draft`] orders are mutable carts; every other state
/// means the order has left the shopping phase. Workflows define their own
/// states, so anything not named here is kept as [`OrderState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum OrderState {
    #[default]
    Draft,
    Validation,
    Fulfillment,
    Completed,
    Canceled,
    Other(String),
}

impl OrderState {
    /// Storage representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Validation => "validation",
            Self::Fulfillment => "fulfillment",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Other(state) => state,
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderState {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "draft" => Self::Draft,
            "validation" => Self::Validation,
            "fulfillment" => Self::Fulfillment,
            "completed" => Self::Completed,
            "canceled" => Self::Canceled,
            other => Self::Other(other.to_owned()),
        })
    }
}

impl From<String> for OrderState {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(state) => state,
            Err(never) => match never {},
        }
    }
}

impl From<OrderState> for String {
    fn from(state: OrderState) -> Self {
        match state {
            OrderState::Other(state) => state,
            known => known.as_str().to_owned(),
        }
    }
}
