//! Native hardware-encoder boundary
//!
//! The vendor library exposes a C capability set over an opaque session
//! handle: create, encode-frame, write-audio, finalize, destroy, last-error.
//! [`HwEncoderApi`] is the seam the direct pipeline drives; the production
//! implementation lives in the platform module, tests substitute a fake.

use std::ffi::c_void;
use std::path::PathBuf;

use writer_config::{QualityTier, RateControlMode, VideoCodec};

#[cfg(target_os = "windows")]
use crate::{EncoderError, EncoderResult};

/// DXGI format codes the host is known to hand us
pub const DXGI_FORMAT_R8G8B8A8_UNORM: u32 = 28;
pub const DXGI_FORMAT_R8G8B8A8_UNORM_SRGB: u32 = 29;
pub const DXGI_FORMAT_B8G8R8A8_UNORM: u32 = 87;
pub const DXGI_FORMAT_B8G8R8A8_UNORM_SRGB: u32 = 91;

/// Encoder-recognized packed-pixel layout tags (vendor constants)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BufferFormat {
    Argb = 0x0100_0000,
    Abgr = 0x1000_0000,
}

impl BufferFormat {
    /// Map a DXGI format code to an encoder layout tag
    ///
    /// Unrecognized codes fall back to ARGB, the layout every known host
    /// surface uses.
    pub fn from_dxgi(code: u32) -> Self {
        match code {
            DXGI_FORMAT_B8G8R8A8_UNORM | DXGI_FORMAT_B8G8R8A8_UNORM_SRGB => BufferFormat::Argb,
            DXGI_FORMAT_R8G8B8A8_UNORM | DXGI_FORMAT_R8G8B8A8_UNORM_SRGB => BufferFormat::Abgr,
            _ => BufferFormat::Argb,
        }
    }
}

/// Opaque handle to one open native encoder session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEncoderHandle(*mut c_void);

impl RawEncoderHandle {
    pub fn new(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }
}

// The handle is only ever dereferenced by the vendor library, and the owning
// session serializes every call on it behind one lock.
unsafe impl Send for RawEncoderHandle {}

/// One frame delivered by the host as GPU handles
#[derive(Debug, Clone, Copy)]
pub struct GpuFrame {
    /// Native device the texture lives on
    pub device: *mut c_void,
    /// Native texture holding the rendered frame
    pub texture: *mut c_void,
    /// DXGI format code of the texture
    pub format_code: u32,
}

unsafe impl Send for GpuFrame {}

#[cfg(target_os = "windows")]
impl GpuFrame {
    /// Derive device, texture and pixel format from a D3D11 texture
    pub fn from_texture(
        texture: &windows::Win32::Graphics::Direct3D11::ID3D11Texture2D,
    ) -> EncoderResult<Self> {
        use windows::Win32::Graphics::Direct3D11::{D3D11_TEXTURE2D_DESC, ID3D11Device};
        use windows::core::Interface;

        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let mut device: Option<ID3D11Device> = None;
        unsafe { texture.GetDevice(&mut device) };
        let device = device.ok_or_else(|| {
            EncoderError::InitFailed(
                "failed to resolve the D3D11 device from the incoming frame".into(),
            )
        })?;

        Ok(Self {
            device: device.as_raw(),
            texture: texture.as_raw(),
            format_code: desc.Format.0 as u32,
        })
    }
}

/// Parameters for opening one native encoder session
#[derive(Debug, Clone)]
pub struct EncoderOpenParams {
    pub device: *mut c_void,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_kbps: u32,
    pub max_bitrate_kbps: u32,
    pub codec: VideoCodec,
    pub quality: QualityTier,
    pub rate_control: RateControlMode,
    pub buffer_format: BufferFormat,
    pub hevc_async: bool,
    pub debug_log: bool,
    pub output_path: PathBuf,
}

/// Capability set of the native encoder library
///
/// All calls return plain success codes; diagnostic text is retrieved
/// separately via [`HwEncoderApi::last_error`]. Callers must serialize every
/// call on the same handle.
pub trait HwEncoderApi: Send + Sync {
    /// Open a session; a null handle means failure
    fn create(&self, params: &EncoderOpenParams) -> RawEncoderHandle;

    /// Push one frame; false means the encode failed
    fn encode_frame(&self, handle: RawEncoderHandle, texture: *mut c_void) -> bool;

    /// Forward interleaved audio samples; false means the write failed
    fn write_audio(
        &self,
        handle: RawEncoderHandle,
        samples: &[f32],
        sample_rate: u32,
        channels: u16,
    ) -> bool;

    /// Flush buffered output and close the container; false means failure
    fn finalize(&self, handle: RawEncoderHandle) -> bool;

    /// Release the session; the handle is invalid afterwards
    fn destroy(&self, handle: RawEncoderHandle);

    /// Most recent diagnostic text for the session, empty when none recorded
    fn last_error(&self, handle: RawEncoderHandle) -> String;
}
