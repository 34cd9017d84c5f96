// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Globally unique 64-bit identifiers.
//!
//! Every fabric device reports a node [`Guid`], which is the key used to
//! recognize a device that has already been discovered through some other path.
//!
//! # Examples
//!
//! ```
//! use ibnetdisc_topology::Guid;
//!
//! let guid = Guid::new(0x0002_c903_0000_1234);
//! assert_eq!(format!("{guid}"), "0x0002c90300001234");
//! assert_eq!(format!("{guid:x}"), "0002c90300001234");
//! assert_eq!("0x2c90300001234".parse::<Guid>().unwrap(), guid);
//! ```

use std::num::ParseIntError;
use std::str::FromStr;

/// A 64-bit globally unique identifier.
///
/// The value zero is used by devices to signal "not set" (for instance, an
/// absent system-image GUID); see [`Guid::is_zero`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Guid(u64);

impl Guid {
    /// Creates a new GUID from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw GUID value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Checks if this GUID is the unset value zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Guid {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Guid> for u64 {
    fn from(guid: Guid) -> Self {
        guid.0
    }
}

impl std::fmt::LowerHex for Guid {
    /// Formats the GUID as 16 hexadecimal digits, without prefix.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl FromStr for Guid {
    type Err = ParseIntError;

    /// Parses a GUID from a hexadecimal string, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u64::from_str_radix(digits, 16).map(Guid)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::Guid;
    use serde::de::{Error, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Guid {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    struct GuidVisitor;

    impl Visitor<'_> for GuidVisitor {
        type Value = Guid;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("an unsigned 64-bit integer or a hexadecimal string")
        }

        fn visit_u64<E: Error>(self, v: u64) -> Result<Guid, E> {
            Ok(Guid(v))
        }

        fn visit_i64<E: Error>(self, v: i64) -> Result<Guid, E> {
            u64::try_from(v)
                .map(Guid)
                .map_err(|_| E::custom(format!("negative GUID {v}")))
        }

        fn visit_str<E: Error>(self, v: &str) -> Result<Guid, E> {
            v.parse()
                .map_err(|e| E::custom(format!("invalid GUID '{v}': {e}")))
        }
    }

    impl<'de> Deserialize<'de> for Guid {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(GuidVisitor)
        }
    }
}
