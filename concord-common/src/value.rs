//! value.rs
//!
//! Value stored by registers and agreed on by consensus.
//!
//! A value is either undefined (nothing written or proposed yet) or a defined
//! integer. Undefined never compares equal to any defined value, zero included.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Value(Option<i64>);

impl Value {
    pub const UNDEFINED: Value = Value(None);

    pub fn defined(v: i64) -> Self {
        Value(Some(v))
    }

    pub fn is_defined(&self) -> bool {
        self.0.is_some()
    }

    pub fn get(&self) -> Option<i64> {
        self.0
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::defined(v)
    }
}

impl From<Option<i64>> for Value {
    fn from(v: Option<i64>) -> Self {
        Value(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "undefined"),
        }
    }
}
