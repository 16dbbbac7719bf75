//! Staged external-process encoding session
//!
//! The fallback strategy when no hardware encoder is available: each frame
//! is transcoded to NV12 and appended to a scratch file next to the output,
//! and finalize hands the finished stream to the external encoder binary.
//! Externally the session behaves like the direct pipeline: one finished
//! video file per session.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use writer_config::{EncodingConfig, SessionGeometry};

use crate::convert::FrameConverter;
use crate::process::{EncodeJob, EncoderProcessRunner};
use crate::{EncoderError, EncoderResult, resolve_bitrate, resolve_encoder_binary};

/// One recording session staged through the external encoder
pub struct ExternalEncoderSession {
    converter: FrameConverter,
    runner: EncoderProcessRunner,
    config: EncodingConfig,
    geometry: SessionGeometry,
    scratch_path: PathBuf,
    output_path: PathBuf,
    writer: Option<BufWriter<File>>,
    finished: bool,
}

impl ExternalEncoderSession {
    /// Create a session writing to `output_path`
    ///
    /// Fails fast when the external encoder binary cannot be found, before
    /// any pixel data is computed or staged.
    pub fn new(
        config: EncodingConfig,
        geometry: SessionGeometry,
        output_path: impl Into<PathBuf>,
    ) -> EncoderResult<Self> {
        let output_path = output_path.into();
        let binary = resolve_encoder_binary(&config)?;
        let scratch_path = scratch_path_for(&output_path);
        let file = File::create(&scratch_path)?;

        debug!(
            scratch = %scratch_path.display(),
            binary = %binary.display(),
            "staged encoder session opened"
        );

        Ok(Self {
            converter: FrameConverter::new(geometry.width, geometry.height),
            runner: EncoderProcessRunner::new(binary),
            config,
            geometry,
            scratch_path,
            output_path,
            writer: Some(BufWriter::new(file)),
            finished: false,
        })
    }

    /// Transient sibling of the output file holding the raw frame stream
    pub fn scratch_path(&self) -> &Path {
        &self.scratch_path
    }

    /// Convert one packed-BGRA frame and append it to the scratch stream
    pub fn submit_frame(&mut self, bgra: &[u8]) -> EncoderResult<()> {
        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => return Err(EncoderError::SessionClosed),
        };
        let planar = self.converter.convert(bgra)?;
        writer.write_all(planar)?;
        Ok(())
    }

    /// Audio is deferred to the external tool on this path; samples are
    /// accepted and dropped.
    pub fn submit_audio(&mut self, _samples: &[f32]) -> EncoderResult<()> {
        Ok(())
    }

    /// Flush the scratch stream and run the external encoder to completion
    ///
    /// Idempotent; a second call is a no-op. On success the scratch file is
    /// removed, on failure it stays behind for diagnosis.
    pub fn finish(&mut self) -> EncoderResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let job = EncodeJob {
            width: self.geometry.width,
            height: self.geometry.height,
            fps: self.geometry.fps.max(1),
            codec: self.config.codec,
            bitrate: resolve_bitrate(&self.config, &self.geometry),
            scratch_path: self.scratch_path.clone(),
            output_path: self.output_path.clone(),
        };
        self.runner.run(&job)?;

        info!(path = %self.output_path.display(), "external encoder session finished");
        Ok(())
    }
}

impl Drop for ExternalEncoderSession {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.finish() {
                warn!(error = %err, "best-effort finalize on drop failed");
            }
        }
    }
}

/// `<output>.nv12` keeps the intermediate next to its final artifact
fn scratch_path_for(output: &Path) -> PathBuf {
    let mut path = output.as_os_str().to_owned();
    path.push(".nv12");
    PathBuf::from(path)
}
