//! MDB device address validation.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A validated device address in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u8);

impl Address {
    /// Validate a raw numeric address as typed into a number field.
    ///
    /// Fails unless `value` is a finite whole number in `0..=255`.
    ///
    /// ```
    /// use mdblink_core::Address;
    ///
    /// assert_eq!(Address::validate(255.0).unwrap().value(), 255);
    /// assert!(Address::validate(3.5).is_err());
    /// assert!(Address::validate(-1.0).is_err());
    /// ```
    pub fn validate(value: f64) -> Result<Self> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(Error::InvalidAddress(format!("{value} is not a whole number")));
        }
        if !(0.0..=255.0).contains(&value) {
            return Err(Error::InvalidAddress(format!("{value} is out of range 0-255")));
        }
        Ok(Address(value as u8))
    }

    /// The address as a byte.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for Address {
    fn from(value: u8) -> Self {
        Address(value)
    }
}

impl TryFrom<i64> for Address {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u8::try_from(value)
            .map(Address)
            .map_err(|_| Error::InvalidAddress(format!("{value} is out of range 0-255")))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let value: f64 = s
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("\"{s}\" is not a number")))?;
        Self::validate(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
