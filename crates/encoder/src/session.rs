//! Direct hardware encoding session
//!
//! Owns the native encoder handle across its lifecycle and serializes every
//! native call through one lock. The handle is opened lazily on the first
//! frame, once the texture reveals the device and pixel layout, and is
//! destroyed exactly once on close.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use writer_config::{EncodingConfig, SessionGeometry};

use crate::native::{BufferFormat, EncoderOpenParams, GpuFrame, HwEncoderApi, RawEncoderHandle};
use crate::{EncoderError, EncoderResult, resolve_bitrate};

#[derive(Clone, Copy)]
enum EncoderState {
    Unopened,
    Open(RawEncoderHandle),
    Closed,
}

struct SessionInner {
    state: EncoderState,
    /// Audio that arrived before the first frame opened the encoder
    pending_audio: Vec<f32>,
}

/// One recording session on the native hardware encoder
pub struct HwEncoderSession {
    api: Arc<dyn HwEncoderApi>,
    config: EncodingConfig,
    geometry: SessionGeometry,
    output_path: PathBuf,
    inner: Mutex<SessionInner>,
}

impl HwEncoderSession {
    /// Create a session writing to `output_path`
    ///
    /// No native resources are acquired until the first frame arrives.
    pub fn new(
        api: Arc<dyn HwEncoderApi>,
        config: EncodingConfig,
        geometry: SessionGeometry,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api,
            config,
            geometry,
            output_path: output_path.into(),
            inner: Mutex::new(SessionInner {
                state: EncoderState::Unopened,
                pending_audio: Vec::new(),
            }),
        }
    }

    /// Push one rendered frame to the encoder
    ///
    /// Opens the native session on the first call. A session whose geometry
    /// has a zero dimension produces no usable output and accepts frames as
    /// no-ops.
    pub fn submit_frame(&self, frame: &GpuFrame) -> EncoderResult<()> {
        if !self.geometry.is_drawable() {
            return Ok(());
        }

        let mut inner = self.inner.lock();
        let handle = match inner.state {
            EncoderState::Closed => return Err(EncoderError::SessionClosed),
            EncoderState::Open(handle) => handle,
            EncoderState::Unopened => self.open_encoder(&mut inner, frame)?,
        };

        if !self.api.encode_frame(handle, frame.texture) {
            return Err(EncoderError::EncodeFailed(self.api.last_error(handle)));
        }
        Ok(())
    }

    /// Forward interleaved audio samples
    ///
    /// Samples arriving before the encoder exists are buffered and drained,
    /// in order, right after the first frame opens it.
    pub fn submit_audio(&self, samples: &[f32]) -> EncoderResult<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.lock();
        match inner.state {
            EncoderState::Closed => Err(EncoderError::SessionClosed),
            EncoderState::Open(handle) => self.write_audio_locked(handle, samples),
            EncoderState::Unopened => {
                inner.pending_audio.extend_from_slice(samples);
                Ok(())
            }
        }
    }

    /// Finalize the container and release the native session
    ///
    /// Idempotent; a session that never encoded a frame closes without
    /// touching the native layer.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if let EncoderState::Open(handle) = inner.state {
            if !self.api.finalize(handle) {
                warn!(
                    error = %self.api.last_error(handle),
                    "native finalize reported failure"
                );
            }
            self.api.destroy(handle);
            info!(path = %self.output_path.display(), "hardware encoder session closed");
        }
        inner.state = EncoderState::Closed;
    }

    fn open_encoder(
        &self,
        inner: &mut SessionInner,
        frame: &GpuFrame,
    ) -> EncoderResult<RawEncoderHandle> {
        if !self.geometry.is_even() {
            return Err(EncoderError::InvalidGeometry {
                width: self.geometry.width,
                height: self.geometry.height,
            });
        }

        let targets = resolve_bitrate(&self.config, &self.geometry);
        let params = EncoderOpenParams {
            device: frame.device,
            width: self.geometry.width,
            height: self.geometry.height,
            fps: self.geometry.fps.max(1),
            bitrate_kbps: targets.target_kbps,
            max_bitrate_kbps: targets.max_kbps,
            codec: self.config.codec,
            quality: self.config.quality,
            rate_control: self.config.rate_control,
            buffer_format: BufferFormat::from_dxgi(frame.format_code),
            hevc_async: self.config.hevc_async,
            debug_log: self.config.debug_log,
            output_path: self.output_path.clone(),
        };

        let handle = self.api.create(&params);
        if handle.is_null() {
            return Err(EncoderError::InitFailed(
                "native encoder returned no session".into(),
            ));
        }

        // The native layer can hand back a live handle and still record a
        // startup error; treat that as a failed open.
        let startup_error = self.api.last_error(handle);
        if !startup_error.trim().is_empty() {
            self.api.destroy(handle);
            return Err(EncoderError::InitFailed(startup_error));
        }

        info!(
            width = self.geometry.width,
            height = self.geometry.height,
            fps = params.fps,
            target_kbps = targets.target_kbps,
            max_kbps = targets.max_kbps,
            codec = ?self.config.codec,
            "opened hardware encoder session"
        );
        inner.state = EncoderState::Open(handle);

        if !inner.pending_audio.is_empty() {
            let buffered = std::mem::take(&mut inner.pending_audio);
            debug!(
                samples = buffered.len(),
                "draining audio buffered before encoder open"
            );
            self.write_audio_locked(handle, &buffered)?;
        }

        Ok(handle)
    }

    fn write_audio_locked(&self, handle: RawEncoderHandle, samples: &[f32]) -> EncoderResult<()> {
        let sample_rate = self.geometry.sample_rate.max(8_000);
        if !self
            .api
            .write_audio(handle, samples, sample_rate, self.geometry.channels)
        {
            return Err(EncoderError::AudioWriteFailed(self.api.last_error(handle)));
        }
        Ok(())
    }
}

impl Drop for HwEncoderSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create,
        Encode,
        Audio(Vec<f32>, u32, u16),
        Finalize,
        Destroy,
    }

    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<Call>>,
        fail_create: bool,
        startup_error: Option<String>,
        fail_encode: bool,
        error_text: String,
        recorded_error: Mutex<String>,
    }

    impl FakeApi {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    impl HwEncoderApi for FakeApi {
        fn create(&self, _params: &EncoderOpenParams) -> RawEncoderHandle {
            self.calls.lock().push(Call::Create);
            if self.fail_create {
                RawEncoderHandle::new(ptr::null_mut())
            } else {
                RawEncoderHandle::new(0x1usize as *mut std::ffi::c_void)
            }
        }

        fn encode_frame(&self, _handle: RawEncoderHandle, _texture: *mut std::ffi::c_void) -> bool {
            self.calls.lock().push(Call::Encode);
            if self.fail_encode {
                *self.recorded_error.lock() = self.error_text.clone();
                return false;
            }
            true
        }

        fn write_audio(
            &self,
            _handle: RawEncoderHandle,
            samples: &[f32],
            sample_rate: u32,
            channels: u16,
        ) -> bool {
            self.calls
                .lock()
                .push(Call::Audio(samples.to_vec(), sample_rate, channels));
            true
        }

        fn finalize(&self, _handle: RawEncoderHandle) -> bool {
            self.calls.lock().push(Call::Finalize);
            true
        }

        fn destroy(&self, _handle: RawEncoderHandle) {
            self.calls.lock().push(Call::Destroy);
        }

        fn last_error(&self, _handle: RawEncoderHandle) -> String {
            if let Some(text) = &self.startup_error {
                text.clone()
            } else {
                self.recorded_error.lock().clone()
            }
        }
    }

    fn frame() -> GpuFrame {
        GpuFrame {
            device: ptr::null_mut(),
            texture: ptr::null_mut(),
            format_code: crate::native::DXGI_FORMAT_B8G8R8A8_UNORM,
        }
    }

    fn geometry(width: u32, height: u32) -> SessionGeometry {
        SessionGeometry {
            width,
            height,
            ..Default::default()
        }
    }

    fn session(api: Arc<FakeApi>, geometry: SessionGeometry) -> HwEncoderSession {
        HwEncoderSession::new(api, EncodingConfig::default(), geometry, "out.mp4")
    }

    #[test]
    fn test_audio_before_first_frame_is_drained_in_order_once() {
        let api = Arc::new(FakeApi::default());
        let session = session(api.clone(), geometry(1280, 720));

        session.submit_audio(&[1.0, 2.0]).unwrap();
        session.submit_audio(&[3.0]).unwrap();
        session.submit_frame(&frame()).unwrap();
        session.submit_audio(&[4.0]).unwrap();

        let audio: Vec<Call> = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Audio(..)))
            .collect();
        assert_eq!(
            audio,
            vec![
                Call::Audio(vec![1.0, 2.0, 3.0], 48_000, 2),
                Call::Audio(vec![4.0], 48_000, 2),
            ]
        );

        // The drain happens after the open but before the first encode.
        assert_eq!(
            api.calls()[..3],
            [
                Call::Create,
                Call::Audio(vec![1.0, 2.0, 3.0], 48_000, 2),
                Call::Encode
            ]
        );
    }

    #[test]
    fn test_empty_audio_batch_is_a_noop() {
        let api = Arc::new(FakeApi::default());
        let session = session(api.clone(), geometry(1280, 720));
        session.submit_audio(&[]).unwrap();
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_double_close_destroys_exactly_once() {
        let api = Arc::new(FakeApi::default());
        let session = session(api.clone(), geometry(1280, 720));
        session.submit_frame(&frame()).unwrap();

        session.close();
        session.close();

        let calls = api.calls();
        assert_eq!(calls.iter().filter(|c| **c == Call::Finalize).count(), 1);
        assert_eq!(calls.iter().filter(|c| **c == Call::Destroy).count(), 1);
    }

    #[test]
    fn test_odd_geometry_fails_before_any_native_call() {
        let api = Arc::new(FakeApi::default());
        let session = session(api.clone(), geometry(1281, 720));

        let err = session.submit_frame(&frame()).unwrap_err();
        assert!(matches!(
            err,
            EncoderError::InvalidGeometry {
                width: 1281,
                height: 720
            }
        ));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_zero_geometry_accepts_frames_as_noops() {
        let api = Arc::new(FakeApi::default());
        let session = session(api.clone(), geometry(0, 720));
        session.submit_frame(&frame()).unwrap();
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_submit_after_close_is_rejected() {
        let api = Arc::new(FakeApi::default());
        let session = session(api.clone(), geometry(1280, 720));
        session.close();

        assert!(matches!(
            session.submit_frame(&frame()),
            Err(EncoderError::SessionClosed)
        ));
        assert!(matches!(
            session.submit_audio(&[1.0]),
            Err(EncoderError::SessionClosed)
        ));
    }

    #[test]
    fn test_null_handle_from_create_fails_without_destroy() {
        let api = Arc::new(FakeApi {
            fail_create: true,
            ..Default::default()
        });
        let session = session(api.clone(), geometry(1280, 720));

        assert!(matches!(
            session.submit_frame(&frame()),
            Err(EncoderError::InitFailed(_))
        ));
        assert_eq!(api.calls(), vec![Call::Create]);
    }

    #[test]
    fn test_startup_error_destroys_partial_handle() {
        let api = Arc::new(FakeApi {
            startup_error: Some("driver refused the session".into()),
            ..Default::default()
        });
        let session = session(api.clone(), geometry(1280, 720));

        match session.submit_frame(&frame()) {
            Err(EncoderError::InitFailed(text)) => {
                assert_eq!(text, "driver refused the session");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(api.calls(), vec![Call::Create, Call::Destroy]);
    }

    #[test]
    fn test_encode_failure_surfaces_native_diagnostic() {
        let api = Arc::new(FakeApi {
            fail_encode: true,
            error_text: "NVENC queue full".into(),
            ..Default::default()
        });
        let session = session(api.clone(), geometry(1280, 720));

        match session.submit_frame(&frame()) {
            Err(EncoderError::EncodeFailed(text)) => assert_eq!(text, "NVENC queue full"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_drop_releases_the_native_session() {
        let api = Arc::new(FakeApi::default());
        {
            let session = session(api.clone(), geometry(1280, 720));
            session.submit_frame(&frame()).unwrap();
        }
        let calls = api.calls();
        assert_eq!(calls.iter().filter(|c| **c == Call::Destroy).count(), 1);
    }

    #[test]
    fn test_audio_clamps_sample_rate_floor() {
        let api = Arc::new(FakeApi::default());
        let geometry = SessionGeometry {
            width: 1280,
            height: 720,
            sample_rate: 4_000,
            ..Default::default()
        };
        let session = session(api.clone(), geometry);
        session.submit_frame(&frame()).unwrap();
        session.submit_audio(&[0.5]).unwrap();

        assert!(
            api.calls()
                .iter()
                .any(|c| *c == Call::Audio(vec![0.5], 8_000, 2))
        );
    }
}
