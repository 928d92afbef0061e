//! FFmpeg Detection Module
//!
//! Locates and validates the system FFmpeg/FFprobe binaries.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{FFmpegError, FFmpegResult};
use crate::core::process::std_command;

/// Directory checked before the common locations and `PATH`
pub const FFMPEG_DIR_ENV: &str = "CAPGEN_FFMPEG_DIR";

/// Information about detected FFmpeg installation
#[derive(Debug, Clone)]
pub struct FFmpegInfo {
    /// Path to ffmpeg binary
    pub ffmpeg_path: PathBuf,
    /// Path to ffprobe binary
    pub ffprobe_path: PathBuf,
    /// FFmpeg version string
    pub version: String,
}

/// Detect FFmpeg, honoring `CAPGEN_FFMPEG_DIR` before the system search
pub fn detect_ffmpeg() -> FFmpegResult<FFmpegInfo> {
    if let Some(dir) = std::env::var_os(FFMPEG_DIR_ENV).map(PathBuf::from) {
        let ffmpeg_path = dir.join(binary_name("ffmpeg"));
        let ffprobe_path = dir.join(binary_name("ffprobe"));
        if ffmpeg_path.exists() && ffprobe_path.exists() {
            let version = get_ffmpeg_version(&ffmpeg_path)?;
            info!("Using FFmpeg {} from {}", version, dir.display());
            return Ok(FFmpegInfo {
                ffmpeg_path,
                ffprobe_path,
                version,
            });
        }
        debug!(
            "{} is set but {} has no ffmpeg/ffprobe, searching the system",
            FFMPEG_DIR_ENV,
            dir.display()
        );
    }

    detect_system_ffmpeg()
}

/// Detect FFmpeg from system PATH
pub fn detect_system_ffmpeg() -> FFmpegResult<FFmpegInfo> {
    let ffmpeg_path = which_binary("ffmpeg")?;
    let ffprobe_path = which_binary("ffprobe")?;

    let version = get_ffmpeg_version(&ffmpeg_path)?;
    info!("Detected FFmpeg {} at {}", version, ffmpeg_path.display());

    Ok(FFmpegInfo {
        ffmpeg_path,
        ffprobe_path,
        version,
    })
}

fn binary_name(stem: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.exe", stem)
    } else {
        stem.to_string()
    }
}

/// Find a binary in the common install locations, then via `where`/`which`
fn which_binary(stem: &str) -> FFmpegResult<PathBuf> {
    let name = binary_name(stem);

    for dir in get_common_ffmpeg_paths() {
        let candidate = dir.join(&name);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let finder = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };
    let output = std_command(finder)
        .arg(stem)
        .output()
        .map_err(|_| FFmpegError::NotFound)?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        if let Some(first_line) = path_str.lines().map(str::trim).find(|l| !l.is_empty()) {
            return Ok(PathBuf::from(first_line));
        }
    }

    Err(FFmpegError::NotFound)
}

#[cfg(target_os = "windows")]
const INSTALL_DIRS: &[&str] = &[r"C:\ffmpeg\bin", r"C:\Program Files\ffmpeg\bin"];
#[cfg(target_os = "macos")]
const INSTALL_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/opt/local/bin"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const INSTALL_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/snap/bin"];

/// Package-manager and conventional install locations, most specific first
fn get_common_ffmpeg_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = INSTALL_DIRS.iter().map(PathBuf::from).collect();

    if cfg!(target_os = "windows") {
        // Chocolatey and Scoop shims
        if let Some(data) = std::env::var_os("ProgramData") {
            paths.push(Path::new(&data).join("chocolatey").join("bin"));
        }
        if let Some(home) = std::env::var_os("USERPROFILE") {
            paths.push(Path::new(&home).join("scoop").join("shims"));
        }
    }

    paths
}

/// Parses the version from `ffmpeg -version` output
pub fn parse_version(output: &str) -> Option<String> {
    let first_line = output.lines().next()?.trim();
    if first_line.is_empty() {
        return None;
    }
    // "ffmpeg version 6.1.1-3ubuntu5 Copyright ..."
    let version = first_line
        .strip_prefix("ffmpeg version ")
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or(first_line);
    Some(version.to_string())
}

fn get_ffmpeg_version(ffmpeg_path: &Path) -> FFmpegResult<String> {
    let output = std_command(ffmpeg_path).arg("-version").output()?;

    if !output.status.success() {
        return Err(FFmpegError::ExecutionFailed(
            "Failed to get FFmpeg version".to_string(),
        ));
    }

    parse_version(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| FFmpegError::ParseError("Could not parse FFmpeg version".to_string()))
}
