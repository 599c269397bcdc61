//! The `DriveType` enum shared by accounts, sync configs, and the provider
//! client registry.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Which third-party cloud-drive provider an account/config targets.
///
/// Wire representation matches the source system's enum values exactly
/// (`"BaiduDrive"`, `"QuarkDrive"`, `"AlistDrive"`) so persisted rows and
/// admin-API payloads round-trip without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriveType {
    #[serde(rename = "BaiduDrive")]
    BaiduDrive,
    #[serde(rename = "QuarkDrive")]
    QuarkDrive,
    #[serde(rename = "AlistDrive")]
    AlistDrive,
}

impl DriveType {
    /// Decode a wire string, per design note: the validator path only,
    /// never silently defaulting.
    ///
    /// # Errors
    /// Returns `DomainError::UnknownEnumValue` for anything else.
    pub fn from_wire(value: &str) -> Result<Self, DomainError> {
        match value {
            "BaiduDrive" => Ok(Self::BaiduDrive),
            "QuarkDrive" => Ok(Self::QuarkDrive),
            "AlistDrive" => Ok(Self::AlistDrive),
            other => Err(DomainError::UnknownEnumValue {
                kind: "DriveType".to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// The wire string for this variant.
    #[must_use]
    pub const fn as_wire(&self) -> &'static str {
        match self {
            Self::BaiduDrive => "BaiduDrive",
            Self::QuarkDrive => "QuarkDrive",
            Self::AlistDrive => "AlistDrive",
        }
    }
}

impl Display for DriveType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

impl FromStr for DriveType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_wire_values() {
        for dt in [DriveType::BaiduDrive, DriveType::QuarkDrive, DriveType::AlistDrive] {
            assert_eq!(DriveType::from_wire(dt.as_wire()).unwrap(), dt);
        }
    }

    #[test]
    fn rejects_unknown_value() {
        let err = DriveType::from_wire("AliyunDrive").unwrap_err();
        assert!(matches!(err, DomainError::UnknownEnumValue { .. }));
    }

    #[test]
    fn serde_round_trip_uses_wire_names() {
        let json = serde_json::to_string(&DriveType::QuarkDrive).unwrap();
        assert_eq!(json, "\"QuarkDrive\"");
        let back: DriveType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DriveType::QuarkDrive);
    }
}
