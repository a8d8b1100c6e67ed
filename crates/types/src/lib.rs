//! Shared validated value types for the CRF registry system.
//!
//! These types sit at the bottom of the workspace dependency graph: they carry
//! no domain logic, only construction-time validation, so every other crate
//! can rely on their invariants instead of re-checking raw strings.

use std::fmt;
use std::str::FromStr;

/// Errors that can occur when creating validated registry types.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// The input text was empty or contained only whitespace
    #[error("Code cannot be empty")]
    EmptyCode,
    /// The input did not name a known registry
    #[error("Unknown registry type: {0}")]
    UnknownRegistry(String),
}

/// The clinical protocol a patient record belongs to.
///
/// Fixed at record creation and never changed thereafter; it selects the
/// active form schema for the whole lifetime of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryType {
    /// ALK-positive NSCLC registry.
    Alk,
    /// ROS1-positive NSCLC registry.
    Ros1,
}

impl RegistryType {
    /// Returns the wire code for this registry (`"ALK"` / `"ROS1"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryType::Alk => "ALK",
            RegistryType::Ros1 => "ROS1",
        }
    }
}

impl FromStr for RegistryType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALK" => Ok(RegistryType::Alk),
            "ROS1" => Ok(RegistryType::Ros1),
            other => Err(TypeError::UnknownRegistry(other.to_owned())),
        }
    }
}

impl fmt::Display for RegistryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for RegistryType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for RegistryType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A dictionary code: a non-empty, trimmed reference-data identifier.
///
/// Codes come from the dictionary collaborator (`CISPLATIN`, `STOPPED`, ...)
/// and are treated as authoritative once fetched. This type only guarantees
/// the string is usable as a key; it does not validate against any catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DictCode(String);

impl DictCode {
    /// Creates a new `DictCode` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyCode);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DictCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DictCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for DictCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for DictCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DictCode::new(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_type_round_trips_through_wire_code() {
        assert_eq!("ALK".parse::<RegistryType>().unwrap(), RegistryType::Alk);
        assert_eq!("ROS1".parse::<RegistryType>().unwrap(), RegistryType::Ros1);
        assert_eq!(RegistryType::Alk.to_string(), "ALK");
        assert_eq!(RegistryType::Ros1.to_string(), "ROS1");
    }

    #[test]
    fn test_registry_type_rejects_unknown_code() {
        let err = "EGFR".parse::<RegistryType>().expect_err("should reject");
        assert!(matches!(err, TypeError::UnknownRegistry(code) if code == "EGFR"));
    }

    #[test]
    fn test_dict_code_trims_whitespace() {
        let code = DictCode::new("  CISPLATIN  ").unwrap();
        assert_eq!(code.as_str(), "CISPLATIN");
    }

    #[test]
    fn test_dict_code_rejects_empty() {
        assert!(matches!(DictCode::new(""), Err(TypeError::EmptyCode)));
        assert!(matches!(DictCode::new("   "), Err(TypeError::EmptyCode)));
    }

    #[test]
    fn test_dict_code_serde_round_trip() {
        let code = DictCode::new("ALECTINIB").unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"ALECTINIB\"");
        let back: DictCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn test_dict_code_deserialize_rejects_blank() {
        let result: Result<DictCode, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());
    }
}
