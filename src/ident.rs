//! Wire-flexible identifiers.
//!
//! Field ids, template ids, subquery ids and variable-template ids all arrive
//! over JSON, and different callers spell them differently — some as JSON
//! strings, some as JSON integers. `Id` accepts either on deserialization and
//! normalizes to a `String` so every lookup inside the compiler works against
//! a single representation.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(String);

impl Id {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id(s)
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = Id;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer identifier")
            }

            fn visit_str<E>(self, v: &str) -> Result<Id, E>
            where
                E: de::Error,
            {
                Ok(Id(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> Result<Id, E>
            where
                E: de::Error,
            {
                Ok(Id(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Id, E>
            where
                E: de::Error,
            {
                Ok(Id(v.to_string()))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Id, E>
            where
                E: de::Error,
            {
                Ok(Id(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_string_and_integer_json() {
        let from_str: Id = serde_json::from_str("\"7\"").unwrap();
        let from_int: Id = serde_json::from_str("7").unwrap();
        assert_eq!(from_str, from_int);
        assert_eq!(from_str.as_str(), "7");
    }
}
