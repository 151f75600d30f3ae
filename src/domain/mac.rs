use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::domain::ConvertError;

/// Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

/// Canonical form: six lower-case two-digit hex octets joined by `:`.
impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().map(|b| hex::encode([*b])).join(":"))
    }
}

impl FromStr for MacAddress {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: String| ConvertError::Mac {
            text: s.to_string(),
            reason,
        };

        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(fail(format!("expected 6 octets, found {}", parts.len())));
        }

        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            if part.len() != 2 {
                return Err(fail(format!("octet '{}' is not two hex digits", part)));
            }
            let bytes = hex::decode(part).map_err(|e| fail(e.to_string()))?;
            *slot = bytes[0];
        }
        Ok(Self(octets))
    }
}
