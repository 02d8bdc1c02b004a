//! Shared configuration types and hierarchical loading for the ledger mirror.
//!
//! Configuration is read from `configuration/base.(yaml|yml|json)`, overlaid with the
//! environment-specific file selected by `APP_ENVIRONMENT`, then with `APP_`-prefixed
//! environment variables. Secrets are held in [`SerializableSecretString`] so they are
//! redacted in debug output and never leave the process in serialized form.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

pub mod environment;
pub mod load;
pub mod shared;

/// A secret string that can cross serde boundaries without leaking its value.
///
/// Deserializes from a plain string; serializes as the fixed marker `REDACTED`. Use
/// [`SerializableSecretString::expose_secret`] at the single point where the real
/// value is needed.
#[derive(Clone)]
pub struct SerializableSecretString(SecretString);

impl SerializableSecretString {
    /// Returns the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SerializableSecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SerializableSecretString(REDACTED)")
    }
}

impl From<String> for SerializableSecretString {
    fn from(value: String) -> Self {
        SerializableSecretString(SecretString::new(value.into()))
    }
}

impl Serialize for SerializableSecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("REDACTED")
    }
}

impl<'de> Deserialize<'de> for SerializableSecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SecretVisitor;

        impl Visitor<'_> for SecretVisitor {
            type Value = SerializableSecretString;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a secret string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(SerializableSecretString::from(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(SerializableSecretString::from(value))
            }
        }

        deserializer.deserialize_string(SecretVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let secret = SerializableSecretString::from("hunter2".to_string());
        assert_eq!(format!("{secret:?}"), "SerializableSecretString(REDACTED)");
    }

    #[test]
    fn serialization_never_carries_the_value() {
        let secret = SerializableSecretString::from("hunter2".to_string());
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"REDACTED\"");
    }

    #[test]
    fn deserializes_from_plain_string() {
        let secret: SerializableSecretString = serde_json::from_str("\"hunter2\"").unwrap();
        assert_eq!(secret.expose_secret(), "hunter2");
    }
}
