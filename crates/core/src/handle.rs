//! Handles: opaque scalar values identifying one record instance.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifying value for a single record.
///
/// A handle is compared against every configured identity field of a record
/// type, so the same value may match a primary key or an alternate external id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Handle {
    Int(i64),
    Uuid(Uuid),
    Text(String),
}

impl Handle {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Handle::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Handle::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Handle::Uuid(u) => Some(u),
            _ => None,
        }
    }

    /// Loose equality used when matching stored field values.
    ///
    /// Different scalar kinds match when their rendered forms agree, so the
    /// handle `"77"` finds a record whose integer `id` is `77`.
    pub fn loosely_eq(&self, other: &Handle) -> bool {
        self == other || self.to_string() == other.to_string()
    }
}

impl core::fmt::Display for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Handle::Int(v) => core::fmt::Display::fmt(v, f),
            Handle::Uuid(u) => core::fmt::Display::fmt(u, f),
            Handle::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_handle_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Handle {
                fn from(value: $t) -> Self {
                    Handle::$variant(value.into())
                }
            }
        )*
    };
}

impl_handle_from!(
    i64 => Int,
    i32 => Int,
    u32 => Int,
    i16 => Int,
    u16 => Int,
    Uuid => Uuid,
    String => Text,
    &str => Text,
);

impl From<&String> for Handle {
    fn from(value: &String) -> Self {
        Handle::Text(value.clone())
    }
}

impl FromStr for Handle {
    type Err = core::convert::Infallible;

    /// Parses the most specific kind: integer, then UUID, then text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Handle::Int(v));
        }
        if let Ok(u) = Uuid::from_str(s) {
            return Ok(Handle::Uuid(u));
        }
        Ok(Handle::Text(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_raw_scalar() {
        assert_eq!(Handle::from(77i64).to_string(), "77");
        assert_eq!(Handle::from("X123").to_string(), "X123");

        let u = Uuid::nil();
        assert_eq!(Handle::from(u).to_string(), "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn parse_prefers_specific_kinds() {
        assert_eq!("42".parse::<Handle>().unwrap(), Handle::Int(42));
        assert_eq!(
            "00000000-0000-0000-0000-000000000000".parse::<Handle>().unwrap(),
            Handle::Uuid(Uuid::nil())
        );
        assert_eq!("abc".parse::<Handle>().unwrap(), Handle::Text("abc".into()));
    }

    #[test]
    fn loose_equality_crosses_kinds() {
        assert!(Handle::from("77").loosely_eq(&Handle::from(77i64)));
        assert!(!Handle::from("78").loosely_eq(&Handle::from(77i64)));
        // strict equality does not
        assert_ne!(Handle::from("77"), Handle::from(77i64));
    }

    #[test]
    fn serde_is_untagged() {
        let json = serde_json::to_string(&Handle::from(5i64)).unwrap();
        assert_eq!(json, "5");
        let back: Handle = serde_json::from_str("\"X123\"").unwrap();
        assert_eq!(back, Handle::from("X123"));
    }
}
