//! Bitrate policy resolution
//!
//! Pure function of the output settings and session geometry. Both encoder
//! backends resolve their rate-control targets here so a session produces
//! the same bitrate regardless of which pipeline carries it.

use writer_config::{EncodingConfig, RateControlMode, SessionGeometry};

/// Lower clamp for the resolved target bitrate in kbps
pub const TARGET_BITRATE_MIN_KBPS: u32 = 100;
/// Upper clamp for the resolved target bitrate in kbps
pub const TARGET_BITRATE_MAX_KBPS: u32 = 200_000;
/// Upper clamp for the derived max bitrate in kbps
pub const MAX_BITRATE_CAP_KBPS: u32 = 300_000;

/// Resolved rate-control targets handed to either encoder backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitrateTargets {
    /// Target bitrate in kbps
    pub target_kbps: u32,
    /// Max bitrate in kbps; equals the target in fixed mode
    pub max_kbps: u32,
}

/// Resolve the effective target and max bitrate for a session
pub fn resolve_bitrate(config: &EncodingConfig, geometry: &SessionGeometry) -> BitrateTargets {
    let target_kbps = match config.rate_control {
        RateControlMode::PlatformRecommended => recommended_target(geometry),
        RateControlMode::Fixed | RateControlMode::Variable => config
            .bitrate_kbps
            .clamp(TARGET_BITRATE_MIN_KBPS, TARGET_BITRATE_MAX_KBPS),
    };

    let max_kbps = match config.rate_control {
        RateControlMode::Fixed => target_kbps,
        RateControlMode::Variable | RateControlMode::PlatformRecommended => {
            ((target_kbps as f64 * 1.2) as u32)
                .clamp(TARGET_BITRATE_MIN_KBPS, MAX_BITRATE_CAP_KBPS)
        }
    };

    BitrateTargets {
        target_kbps,
        max_kbps,
    }
}

/// Platform-recommended ladder: resolution and frame rate decide the target,
/// with the higher figure of each rung applying from 48 fps upward.
fn recommended_target(geometry: &SessionGeometry) -> u32 {
    let high_fps = geometry.fps >= 48;
    match geometry.height {
        h if h >= 2160 => {
            if high_fps {
                60_000
            } else {
                40_000
            }
        }
        h if h >= 1440 => {
            if high_fps {
                24_000
            } else {
                16_000
            }
        }
        h if h >= 1080 => {
            if high_fps {
                12_000
            } else {
                8_000
            }
        }
        h if h >= 720 => {
            if high_fps {
                7_500
            } else {
                5_000
            }
        }
        _ => {
            if high_fps {
                4_000
            } else {
                3_000
            }
        }
    }
}
