//! Encoder output settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Target video codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    H264,
    H265,
}

impl Default for VideoCodec {
    fn default() -> Self {
        Self::H264
    }
}

/// Encoder quality tier (maps onto the native preset ladder)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    Speed,
    Balanced,
    Quality,
}

impl Default for QualityTier {
    fn default() -> Self {
        Self::Balanced
    }
}

/// Policy governing how the bitrate may vary during encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateControlMode {
    /// Constant bitrate at the configured target
    Fixed,
    /// Variable bitrate around the configured target
    Variable,
    /// Target derived from resolution and frame rate, ignoring the
    /// configured bitrate
    PlatformRecommended,
}

impl Default for RateControlMode {
    fn default() -> Self {
        Self::PlatformRecommended
    }
}

/// Output settings for one encoding session
///
/// The settings UI binds to a long-lived instance of this struct; sessions
/// clone it when they are created and never observe later edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Target codec
    pub codec: VideoCodec,
    /// Configured target bitrate in kbps (clamped to 100..=200000 when
    /// resolved)
    pub bitrate_kbps: u32,
    /// Quality tier
    pub quality: QualityTier,
    /// Rate control mode
    pub rate_control: RateControlMode,
    /// Explicit path to the external encoder binary; when unset the binary
    /// is searched next to the application and on PATH
    pub encoder_path: Option<PathBuf>,
    /// Enable the asynchronous HEVC submission mode of the native encoder
    pub hevc_async: bool,
    /// Enable verbose native encoder logging
    pub debug_log: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            bitrate_kbps: 12_000,
            quality: QualityTier::Balanced,
            rate_control: RateControlMode::PlatformRecommended,
            encoder_path: None,
            hevc_async: false,
            debug_log: false,
        }
    }
}
