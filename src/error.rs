//! Simulation-specific error types.
//!
//! Only data problems surface as errors: a level file that references an
//! unknown material, a config value outside its safe range.  Runtime physics
//! anomalies (a body that vanished between ticks, a bird that never settles)
//! are soft no-ops handled where they occur and never reach this type.
//!
//! ## Usage
//!
//! ```rust
//! use slingshot::error::{SlingshotError, SlingshotResult};
//!
//! fn parse_tier(name: &str) -> SlingshotResult<u8> {
//!     match name {
//!         "small" => Ok(0),
//!         other => Err(SlingshotError::UnknownTargetSize {
//!             level: "demo".into(),
//!             name: other.into(),
//!         }),
//!     }
//! }
//! assert!(parse_tier("huge").is_err());
//! ```

use std::fmt;

/// Top-level error enum for level loading and configuration.
#[derive(Debug)]
pub enum SlingshotError {
    /// An obstacle placement names a material that does not exist.
    UnknownMaterial {
        /// Level the placement belongs to.
        level: String,
        /// The rejected material name.
        name: String,
    },

    /// A target placement names a size tier that does not exist.
    UnknownTargetSize { level: String, name: String },

    /// A roster entry names a bird kind that does not exist.
    UnknownBirdKind { level: String, name: String },

    /// A level has no birds to launch.
    EmptyRoster { level: String },

    /// Star thresholds must be strictly ascending.
    ThresholdsNotAscending { level: String, thresholds: [u32; 3] },

    /// A placement value is outside its allowed range (normalized coordinate
    /// outside `[0, 1]`, non-positive size, ...).
    InvalidPlacement {
        level: String,
        /// Which placement list and index, e.g. `"obstacles[3]"`.
        placement: String,
        reason: &'static str,
    },

    /// Requested level index is not in the catalog.
    LevelNotFound { index: usize, available: usize },

    /// Physics or gameplay constant is outside its safe operating range.
    UnsafeConstant {
        /// Name of the constant (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },

    /// TOML could not be deserialized.
    Parse(toml::de::Error),
}

impl fmt::Display for SlingshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlingshotError::UnknownMaterial { level, name } => {
                write!(f, "level '{}': unknown obstacle material '{}'", level, name)
            }
            SlingshotError::UnknownTargetSize { level, name } => {
                write!(f, "level '{}': unknown target size '{}'", level, name)
            }
            SlingshotError::UnknownBirdKind { level, name } => {
                write!(f, "level '{}': unknown bird kind '{}'", level, name)
            }
            SlingshotError::EmptyRoster { level } => {
                write!(f, "level '{}': roster is empty", level)
            }
            SlingshotError::ThresholdsNotAscending { level, thresholds } => write!(
                f,
                "level '{}': star thresholds {:?} are not strictly ascending",
                level, thresholds
            ),
            SlingshotError::InvalidPlacement {
                level,
                placement,
                reason,
            } => write!(f, "level '{}': {} {}", level, placement, reason),
            SlingshotError::LevelNotFound { index, available } => write!(
                f,
                "level {} not found ({} levels available)",
                index, available
            ),
            SlingshotError::UnsafeConstant {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "constant '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
            SlingshotError::Parse(e) => write!(f, "malformed TOML: {}", e),
        }
    }
}

impl std::error::Error for SlingshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SlingshotError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for SlingshotError {
    fn from(e: toml::de::Error) -> Self {
        SlingshotError::Parse(e)
    }
}

/// Convenience alias: a `Result` using `SlingshotError` as the error type.
pub type SlingshotResult<T> = Result<T, SlingshotError>;

// ── Validation helpers ────────────────────────────────────────────────────────

/// Returns an error unless `value` is finite and strictly positive.
pub fn validate_positive(name: &'static str, value: f32) -> SlingshotResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SlingshotError::UnsafeConstant {
            name,
            value,
            safe_range: "(0.0, ∞)",
        })
    }
}

/// Returns an error unless `value` lies in `[0.0, 1.0]`.
pub fn validate_unit_interval(name: &'static str, value: f32) -> SlingshotResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SlingshotError::UnsafeConstant {
            name,
            value,
            safe_range: "[0.0, 1.0]",
        })
    }
}
