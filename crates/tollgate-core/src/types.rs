//! Common types used throughout Tollgate.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Error returned when parsing an identifier or enum from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseError {
    /// What was being parsed (e.g. "plan id", "risk level").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Defines a UUID-backed identifier with a display prefix.
///
/// Parsing accepts both the prefixed form (`plan:<uuid>`) and a bare UUID.
macro_rules! prefixed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from a UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|_| ParseError::new($kind, s))
            }
        }
    };
}

prefixed_id!(
    /// Unique identifier for an action plan.
    PlanId,
    "plan",
    "plan id"
);

prefixed_id!(
    /// Unique identifier for a single action within a plan.
    ActionId,
    "action",
    "action id"
);

prefixed_id!(
    /// Unique identifier for an approval request.
    RequestId,
    "req",
    "request id"
);

/// Timestamp wrapper for consistent handling throughout Tollgate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Return this timestamp shifted forward by `duration`.
    ///
    /// Saturates at the maximum representable time instead of overflowing.
    #[must_use]
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let shifted = TimeDelta::from_std(duration)
            .ok()
            .and_then(|delta| self.0.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self(shifted)
    }

    /// Time remaining until this timestamp, or zero if it is already past.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.0
            .signed_duration_since(Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Check if this timestamp is in the past.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

/// Coarse severity bucket assigned to a proposed tool call.
///
/// Deliberately not `Ord`: levels are only ever compared through the
/// autonomy policy table, never by relative severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Read-only or otherwise harmless.
    Safe,
    /// Privilege escalation, package management, destructive or mutating ops.
    Elevated,
    /// Network egress that could move data off the machine.
    Exfil,
    /// Navigation to banking, email, cloud-console or government sites.
    SensitiveDomain,
}

impl RiskLevel {
    /// All risk levels, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Safe,
        Self::Elevated,
        Self::Exfil,
        Self::SensitiveDomain,
    ];

    /// Canonical wire name (`SAFE`, `ELEVATED`, `EXFIL`, `SENSITIVE_DOMAIN`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Elevated => "ELEVATED",
            Self::Exfil => "EXFIL",
            Self::SensitiveDomain => "SENSITIVE_DOMAIN",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SAFE" => Ok(Self::Safe),
            "ELEVATED" => Ok(Self::Elevated),
            "EXFIL" => Ok(Self::Exfil),
            "SENSITIVE_DOMAIN" => Ok(Self::SensitiveDomain),
            _ => Err(ParseError::new("risk level", s)),
        }
    }
}

/// Global policy dial controlling how much approval friction applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutonomyMode {
    /// Every tool call is allowed without prompting.
    Unrestricted,
    /// Elevated actions run freely; exfiltration and sensitive sites prompt.
    #[default]
    Guided,
    /// Anything that is not classified safe prompts.
    Safe,
}

impl AutonomyMode {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unrestricted => "unrestricted",
            Self::Guided => "guided",
            Self::Safe => "safe",
        }
    }
}

impl fmt::Display for AutonomyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutonomyMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unrestricted" => Ok(Self::Unrestricted),
            "guided" => Ok(Self::Guided),
            "safe" => Ok(Self::Safe),
            _ => Err(ParseError::new("autonomy mode", s)),
        }
    }
}

/// Result of classifying a proposed tool call.
///
/// `reason` and `detail` are empty when `risk` is [`RiskLevel::Safe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskClassification {
    /// The assigned risk level.
    pub risk: RiskLevel,
    /// Human-readable explanation of the level.
    pub reason: String,
    /// What matched (rule label and the offending command or URL).
    pub detail: String,
}

impl RiskClassification {
    /// A safe classification with empty reason and detail.
    #[must_use]
    pub fn safe() -> Self {
        Self {
            risk: RiskLevel::Safe,
            reason: String::new(),
            detail: String::new(),
        }
    }

    /// A non-safe classification.
    #[must_use]
    pub fn new(risk: RiskLevel, reason: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            risk,
            reason: reason.into(),
            detail: detail.into(),
        }
    }

    /// Whether this classification is [`RiskLevel::Safe`].
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.risk == RiskLevel::Safe
    }
}

impl fmt::Display for RiskClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "[{}]", self.risk)
        } else {
            write!(f, "[{}] {}", self.risk, self.reason)
        }
    }
}
