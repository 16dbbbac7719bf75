//! Video Encoder - recording sessions for Telecine
//!
//! Two delivery strategies behind one contract (one finished video file per
//! session):
//! - Direct hardware pipeline: [`HwEncoderSession`] submits GPU textures
//!   straight to the native encoder library.
//! - Staged external pipeline: [`ExternalEncoderSession`] transcodes frames
//!   to NV12, stages them in a scratch file and drives an external encoder
//!   binary at finalize.

mod bitrate;
mod convert;
mod error;
mod native;
mod process;
mod resolve;
mod session;
mod staged;

#[cfg(target_os = "windows")]
mod nvenc;

pub use bitrate::*;
pub use convert::*;
pub use error::*;
pub use native::*;
pub use process::*;
pub use resolve::*;
pub use session::*;
pub use staged::*;

#[cfg(target_os = "windows")]
pub use nvenc::NvencApi;
