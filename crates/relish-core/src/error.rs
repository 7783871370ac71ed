use std::fmt;

/// Machine-readable error codes for the cart engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    DerivationAnomaly,
    ItemNotFound,
    StorageReadFailed,
    StorageWriteFailed,
    StorageLocked,
    MalformedPayload,
    ConfigParseError,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::DerivationAnomaly => "E1001",
            Self::ItemNotFound => "E2001",
            Self::StorageReadFailed => "E3001",
            Self::StorageWriteFailed => "E3002",
            Self::StorageLocked => "E3003",
            Self::MalformedPayload => "E4001",
            Self::ConfigParseError => "E5001",
        }
    }

    /// Short human-facing summary for logs.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::DerivationAnomaly => "Identity key derivation anomaly",
            Self::ItemNotFound => "Cart entry not found",
            Self::StorageReadFailed => "Persisted cart read failed",
            Self::StorageWriteFailed => "Persisted cart write failed",
            Self::StorageLocked => "Persisted cart locked by another process",
            Self::MalformedPayload => "Persisted cart payload malformed",
            Self::ConfigParseError => "Config file parse error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::DerivationAnomaly => {
                Some("Check catalog data for items with blank identifiers.")
            }
            Self::ItemNotFound => Some("Re-render from the current cart snapshot and retry."),
            Self::StorageReadFailed => None,
            Self::StorageWriteFailed => Some("Check disk space and write permissions."),
            Self::StorageLocked => Some("Close the other process using this cart file."),
            Self::MalformedPayload => {
                Some("The payload was discarded and replaced with an empty cart.")
            }
            Self::ConfigParseError => Some("Fix syntax in the relish config file and retry."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by cart store operations.
///
/// Derivation anomalies and persistence failures are recovered at their
/// boundaries (fallback keys, logged best-effort writes) and never reach the
/// caller through this type; see the taxonomy notes on each module.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// A remove/adjust operation referenced a key that is not in the cart.
    #[error("{}: no cart entry with key '{key}'", ErrorCode::ItemNotFound.code())]
    ItemNotFound { key: String },
}

impl CartError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ItemNotFound { .. } => ErrorCode::ItemNotFound,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
