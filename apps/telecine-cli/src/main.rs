//! Telecine CLI
//!
//! Records a synthetic test clip through the staged encoder pipeline.
//! Useful for checking an encoder installation end to end without a host
//! application.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use encoder::ExternalEncoderSession;
use writer_config::{EncodingConfig, RateControlMode, SessionGeometry, VideoCodec};

#[derive(Parser)]
#[command(
    name = "telecine",
    about = "Record a synthetic test clip through the external encoder pipeline"
)]
struct Args {
    /// Output video file
    #[arg(short, long, default_value = "telecine-test.mp4")]
    output: PathBuf,

    /// Frame width
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Frame height
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Clip length in frames
    #[arg(long, default_value_t = 90)]
    frames: u32,

    /// Output settings file (JSON); flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixed target bitrate in kbps
    #[arg(long)]
    bitrate: Option<u32>,

    /// Encode H.265 instead of H.264
    #[arg(long)]
    hevc: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file {}", path.display()))?;
            serde_json::from_str::<EncodingConfig>(&text)
                .with_context(|| format!("invalid settings file {}", path.display()))?
        }
        None => EncodingConfig::default(),
    };
    if let Some(bitrate) = args.bitrate {
        config.bitrate_kbps = bitrate;
        config.rate_control = RateControlMode::Fixed;
    }
    if args.hevc {
        config.codec = VideoCodec::H265;
    }

    let geometry = SessionGeometry {
        width: args.width,
        height: args.height,
        fps: args.fps,
        ..Default::default()
    };

    let mut session = ExternalEncoderSession::new(config, geometry, &args.output)
        .context("failed to open the recording session")?;

    let mut frame = vec![0u8; geometry.pixel_count() * 4];
    for index in 0..args.frames {
        fill_test_pattern(&mut frame, args.width, args.height, index);
        session
            .submit_frame(&frame)
            .with_context(|| format!("failed to stage frame {index}"))?;
    }
    session.finish().context("external encode failed")?;

    info!(
        path = %args.output.display(),
        frames = args.frames,
        "test clip written"
    );
    Ok(())
}

/// Moving diagonal gradient, enough motion to exercise the encoder
fn fill_test_pattern(bgra: &mut [u8], width: u32, height: u32, frame_index: u32) {
    let shift = frame_index * 4;
    for y in 0..height {
        for x in 0..width {
            let offset = ((y * width + x) * 4) as usize;
            bgra[offset] = ((x + shift) % 256) as u8;
            bgra[offset + 1] = ((y + shift) % 256) as u8;
            bgra[offset + 2] = ((x + y) % 256) as u8;
            bgra[offset + 3] = 255;
        }
    }
}
