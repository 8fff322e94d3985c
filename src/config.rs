use crate::builder::SOFT_EPOCH_MAX_GAP_NS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Epoch segmentation rule.
///
/// Strict trusts only durability flags: everything since the last barrier may
/// be lost. Soft additionally treats a long quiescent gap between submissions
/// as evidence the cache drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    Strict,
    Soft,
}

/// Build-time knobs for the epoch builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Granularity used when decomposing bios into sector slices, in bytes.
    pub sector_size: u32,
    pub mode: BuildMode,
    /// Quiescent gap that closes a soft epoch, in nanoseconds.
    pub soft_gap_ns: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            sector_size: 4096,
            mode: BuildMode::Strict,
            soft_gap_ns: SOFT_EPOCH_MAX_GAP_NS,
        }
    }
}

impl BuilderConfig {
    pub fn strict(sector_size: u32) -> Self {
        Self {
            sector_size,
            mode: BuildMode::Strict,
            ..Self::default()
        }
    }

    pub fn soft(sector_size: u32) -> Self {
        Self {
            sector_size,
            mode: BuildMode::Soft,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sector_size == 0 {
            return Err(ConfigError::ZeroSectorSize);
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sector size must be non-zero")]
    ZeroSectorSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BuilderConfig::default();
        assert_eq!(config.sector_size, 4096);
        assert_eq!(config.mode, BuildMode::Strict);
        assert_eq!(config.soft_gap_ns, SOFT_EPOCH_MAX_GAP_NS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_a_zero_sector_size() {
        assert_eq!(
            BuilderConfig::strict(0).validate(),
            Err(ConfigError::ZeroSectorSize)
        );
        // Odd sizes are allowed; decomposition just yields a short last slice.
        assert!(BuilderConfig::strict(1000).validate().is_ok());
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: BuilderConfig = serde_json::from_str(r#"{"mode":"soft"}"#).unwrap();
        assert_eq!(config.mode, BuildMode::Soft);
        assert_eq!(config.sector_size, 4096);
        assert_eq!(config.soft_gap_ns, SOFT_EPOCH_MAX_GAP_NS);
    }
}
