//! External encoder binary discovery
//!
//! The staged pipeline needs an encoder binary on disk before it stages a
//! single frame. Resolution order: the explicitly configured path, the
//! conventional names next to the running application, then the same names
//! across the process's PATH.

use std::path::{Path, PathBuf};

use tracing::debug;

use writer_config::EncodingConfig;

use crate::{EncoderError, EncoderResult};

/// Conventional names of the external encoder, probed in order
pub const ENCODER_BINARY_NAMES: &[&str] = &["ffmpeg", "ffmpeg.exe"];

/// Locate the external encoder binary for this configuration
pub fn resolve_encoder_binary(config: &EncodingConfig) -> EncoderResult<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let path_dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect())
        .unwrap_or_default();

    resolve_with_search_dirs(config, exe_dir.as_deref(), &path_dirs)
}

fn resolve_with_search_dirs(
    config: &EncodingConfig,
    exe_dir: Option<&Path>,
    path_dirs: &[PathBuf],
) -> EncoderResult<PathBuf> {
    if let Some(configured) = &config.encoder_path {
        if configured.is_file() {
            return Ok(configured.clone());
        }
        debug!(
            path = %configured.display(),
            "configured encoder path does not exist, falling back to search"
        );
    }

    if let Some(hit) = exe_dir.and_then(probe_dir) {
        return Ok(hit);
    }

    if let Some(hit) = path_dirs.iter().find_map(|dir| probe_dir(dir)) {
        return Ok(hit);
    }

    Err(EncoderError::ToolNotFound(format!(
        "no {} found next to the application or on PATH; install it or set \
         an explicit encoder path in the output settings",
        ENCODER_BINARY_NAMES.join("/")
    )))
}

fn probe_dir(dir: &Path) -> Option<PathBuf> {
    ENCODER_BINARY_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_configured_path_wins_when_it_exists() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("custom-encoder");
        touch(&tool);

        let config = EncodingConfig {
            encoder_path: Some(tool.clone()),
            ..Default::default()
        };
        let resolved = resolve_with_search_dirs(&config, None, &[]).unwrap();
        assert_eq!(resolved, tool);
    }

    #[test]
    fn test_missing_configured_path_falls_back_to_exe_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("ffmpeg");
        touch(&tool);

        let config = EncodingConfig {
            encoder_path: Some(dir.path().join("does-not-exist")),
            ..Default::default()
        };
        let resolved = resolve_with_search_dirs(&config, Some(dir.path()), &[]).unwrap();
        assert_eq!(resolved, tool);
    }

    #[test]
    fn test_search_path_is_probed_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&second.path().join("ffmpeg"));

        let config = EncodingConfig::default();
        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let resolved = resolve_with_search_dirs(&config, None, &dirs).unwrap();
        assert_eq!(resolved, second.path().join("ffmpeg"));
    }

    #[test]
    fn test_no_tool_anywhere_fails_with_guidance() {
        let empty = tempfile::tempdir().unwrap();
        let config = EncodingConfig::default();
        let err = resolve_with_search_dirs(&config, Some(empty.path()), &[]).unwrap_err();
        match err {
            EncoderError::ToolNotFound(text) => {
                assert!(text.contains("ffmpeg"));
                assert!(text.contains("output settings"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_directory_named_like_the_tool_is_not_a_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("ffmpeg")).unwrap();

        let config = EncodingConfig::default();
        assert!(resolve_with_search_dirs(&config, Some(dir.path()), &[]).is_err());
    }
}
