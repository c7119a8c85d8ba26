//! Zero-threshold configuration
//!
//! Every shape carries the [`ShapeConfig`] it was built with, and every shape
//! derived from it inherits the same value. There is no mutable global state:
//! [`ShapeConfig::global`] is a write-once cell that callers may install at
//! startup, before the first shape is constructed.

use crate::error::{Error, Result, ensure};
use std::sync::OnceLock;

/// Environment variable read by [`ShapeConfig::from_env`]
pub const THRESHOLD_ENV: &str = "TILESPARSE_ZERO_THRESHOLD";

/// Default zero threshold: machine epsilon of the stored norm type
pub const DEFAULT_THRESHOLD: f32 = f32::EPSILON;

static GLOBAL: OnceLock<ShapeConfig> = OnceLock::new();

/// Configuration threaded through shape constructors and algebra
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeConfig {
    threshold: f32,
}

impl ShapeConfig {
    /// Create a configuration with the given zero threshold.
    ///
    /// Scaled tile norms strictly below `threshold` are treated as zero.
    pub fn new(threshold: f32) -> Result<Self> {
        ensure!(
            threshold.is_finite() && threshold >= 0.0,
            Error::invalid_argument(
                "threshold",
                format!("must be finite and non-negative, got {threshold}"),
            )
        );
        Ok(Self { threshold })
    }

    /// The zero threshold
    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether a scaled norm counts as zero under this configuration
    #[inline]
    pub fn is_zero(&self, value: f32) -> bool {
        value < self.threshold
    }

    /// Canonicalize a scaled norm: values below the threshold become exactly 0
    #[inline]
    pub fn canonicalize(&self, value: f32) -> f32 {
        if self.is_zero(value) { 0.0 } else { value }
    }

    /// Build a configuration from [`THRESHOLD_ENV`], falling back to the default.
    pub fn from_env() -> Result<Self> {
        match std::env::var(THRESHOLD_ENV) {
            Ok(raw) => {
                let threshold = raw.trim().parse::<f32>().map_err(|e| {
                    Error::invalid_argument("threshold", format!("{THRESHOLD_ENV}={raw:?}: {e}"))
                })?;
                Self::new(threshold)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// Install the process-wide configuration.
    ///
    /// Fails if a configuration was already installed or [`global`](Self::global)
    /// was already read.
    pub fn install(config: ShapeConfig) -> Result<()> {
        GLOBAL.set(config).map_err(|_| {
            Error::invalid_argument("config", "process-wide configuration is already initialized")
        })?;
        tracing::debug!(threshold = config.threshold, "installed process-wide shape config");
        Ok(())
    }

    /// The process-wide configuration.
    ///
    /// The first read freezes the value: an installed configuration if there is
    /// one, otherwise [`from_env`](Self::from_env), otherwise the default.
    pub fn global() -> &'static ShapeConfig {
        GLOBAL.get_or_init(|| {
            Self::from_env().unwrap_or_else(|err| {
                tracing::warn!(%err, "ignoring invalid {THRESHOLD_ENV}");
                Self::default()
            })
        })
    }
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}
