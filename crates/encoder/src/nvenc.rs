//! Vendor encoder bindings (Windows)
//!
//! Thin adapter between [`HwEncoderApi`] and the NVENC vendor library the
//! application ships next to its binaries. The library owns all encoder
//! state behind the opaque handle; this module only marshals parameters and
//! diagnostic strings across the C boundary.

use std::ffi::c_void;
use std::path::Path;

use writer_config::{QualityTier, RateControlMode, VideoCodec};

use crate::native::{EncoderOpenParams, HwEncoderApi, RawEncoderHandle};

#[link(name = "NvencNative")]
unsafe extern "C" {
    unsafe fn NvencCreate(
        device: *mut c_void,
        width: i32,
        height: i32,
        fps: i32,
        bitrate_kbps: i32,
        codec: i32,
        quality: i32,
        fast_preset: i32,
        rate_control_mode: i32,
        max_bitrate_kbps: i32,
        buffer_format: i32,
        hevc_async: i32,
        enable_debug_log: i32,
        output_path: *const u16,
    ) -> *mut c_void;

    unsafe fn NvencEncode(handle: *mut c_void, texture: *mut c_void) -> i32;

    unsafe fn NvencWriteAudio(
        handle: *mut c_void,
        samples: *const f32,
        sample_count: i32,
        sample_rate: i32,
        channels: i32,
    ) -> i32;

    unsafe fn NvencFinalize(handle: *mut c_void) -> i32;

    unsafe fn NvencDestroy(handle: *mut c_void);

    unsafe fn NvencGetLastError(handle: *mut c_void) -> *const u16;
}

fn to_wide(path: &Path) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;

    path.as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn from_wide_ptr(ptr: *const u16) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut len = 0usize;
    unsafe {
        while *ptr.add(len) != 0 {
            len += 1;
        }
        String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
    }
}

/// The production [`HwEncoderApi`] over the vendor library
#[derive(Debug, Default)]
pub struct NvencApi;

impl NvencApi {
    pub fn new() -> Self {
        Self
    }
}

impl HwEncoderApi for NvencApi {
    fn create(&self, params: &EncoderOpenParams) -> RawEncoderHandle {
        let output_path = to_wide(&params.output_path);
        let codec = match params.codec {
            VideoCodec::H264 => 0,
            VideoCodec::H265 => 1,
        };
        let quality = match params.quality {
            QualityTier::Speed => 0,
            QualityTier::Balanced => 1,
            QualityTier::Quality => 2,
        };
        let rate_control_mode = match params.rate_control {
            RateControlMode::Fixed => 0,
            RateControlMode::Variable | RateControlMode::PlatformRecommended => 1,
        };

        let handle = unsafe {
            NvencCreate(
                params.device,
                params.width as i32,
                params.height as i32,
                params.fps as i32,
                params.bitrate_kbps as i32,
                codec,
                quality,
                // Reserved by the vendor API.
                0,
                rate_control_mode,
                params.max_bitrate_kbps as i32,
                params.buffer_format as i32,
                params.hevc_async as i32,
                params.debug_log as i32,
                output_path.as_ptr(),
            )
        };
        RawEncoderHandle::new(handle)
    }

    fn encode_frame(&self, handle: RawEncoderHandle, texture: *mut c_void) -> bool {
        unsafe { NvencEncode(handle.as_ptr(), texture) != 0 }
    }

    fn write_audio(
        &self,
        handle: RawEncoderHandle,
        samples: &[f32],
        sample_rate: u32,
        channels: u16,
    ) -> bool {
        unsafe {
            NvencWriteAudio(
                handle.as_ptr(),
                samples.as_ptr(),
                samples.len() as i32,
                sample_rate as i32,
                channels as i32,
            ) != 0
        }
    }

    fn finalize(&self, handle: RawEncoderHandle) -> bool {
        unsafe { NvencFinalize(handle.as_ptr()) != 0 }
    }

    fn destroy(&self, handle: RawEncoderHandle) {
        unsafe { NvencDestroy(handle.as_ptr()) }
    }

    fn last_error(&self, handle: RawEncoderHandle) -> String {
        if handle.is_null() {
            return String::new();
        }
        from_wide_ptr(unsafe { NvencGetLastError(handle.as_ptr()) })
    }
}
