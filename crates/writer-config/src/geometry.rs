//! Session geometry

use serde::{Deserialize, Serialize};

use crate::DEFAULT_AUDIO_CHANNELS;

/// Fixed geometry of one recording session
///
/// Delivered by the host up front and immutable for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGeometry {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frames per second
    pub fps: u32,
    /// Audio sample rate in Hz
    pub sample_rate: u32,
    /// Audio channel count; [`DEFAULT_AUDIO_CHANNELS`] when the host does
    /// not report a layout
    pub channels: u16,
}

impl SessionGeometry {
    /// Whether frames of this geometry contain any pixels at all
    pub fn is_drawable(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Hardware encoders require even dimensions for chroma alignment
    pub fn is_even(&self) -> bool {
        self.width % 2 == 0 && self.height % 2 == 0
    }

    /// Pixels per frame
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for SessionGeometry {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            sample_rate: 48_000,
            channels: DEFAULT_AUDIO_CHANNELS,
        }
    }
}
