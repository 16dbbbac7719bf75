//! External encoder invocation
//!
//! Drives the external encoder binary over a finished scratch file and
//! cleans up afterwards. The wait is intentionally synchronous: finalize is
//! a slow, terminal operation, not a hot path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use writer_config::VideoCodec;

use crate::bitrate::BitrateTargets;
use crate::{EncoderError, EncoderResult};

/// One finalize run of the external encoder
pub struct EncoderProcessRunner {
    binary: PathBuf,
}

/// Everything the external tool needs to turn a raw frame stream into a
/// finished container
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: VideoCodec,
    pub bitrate: BitrateTargets,
    pub scratch_path: PathBuf,
    pub output_path: PathBuf,
}

impl EncoderProcessRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Raw-input command line: input mode, geometry, pixel format, codec,
    /// constant-bitrate targets, then input and output paths.
    fn arguments(job: &EncodeJob) -> Vec<OsString> {
        let codec = match job.codec {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
        };

        let mut args: Vec<OsString> = Vec::new();
        args.push("-f".into());
        args.push("rawvideo".into());
        args.push("-pix_fmt".into());
        args.push("nv12".into());
        args.push("-s".into());
        args.push(format!("{}x{}", job.width, job.height).into());
        args.push("-r".into());
        args.push(job.fps.to_string().into());
        args.push("-i".into());
        args.push(job.scratch_path.clone().into());
        args.push("-c:v".into());
        args.push(codec.into());
        args.push("-b:v".into());
        args.push(format!("{}k", job.bitrate.target_kbps).into());
        args.push("-maxrate".into());
        args.push(format!("{}k", job.bitrate.max_kbps).into());
        args.push("-bufsize".into());
        args.push(format!("{}k", job.bitrate.target_kbps * 2).into());
        args.push("-y".into());
        args.push(job.output_path.clone().into());
        args
    }

    /// Run the tool to completion, blocking until it exits
    ///
    /// On success the scratch file is deleted; on failure it is left on disk
    /// for diagnosis and the captured stderr is surfaced verbatim.
    pub fn run(&self, job: &EncodeJob) -> EncoderResult<()> {
        info!(
            binary = %self.binary.display(),
            output = %job.output_path.display(),
            "launching external encoder"
        );

        let output = Command::new(&self.binary)
            .args(Self::arguments(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            return Err(EncoderError::ExternalEncoder {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        // A stray scratch file is not a session failure.
        if let Err(err) = std::fs::remove_file(&job.scratch_path) {
            debug!(
                path = %job.scratch_path.display(),
                error = %err,
                "failed to remove scratch file"
            );
        }
        Ok(())
    }
}
