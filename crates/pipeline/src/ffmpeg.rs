//! FFmpeg-backed [`FrameSource`].
//!
//! The stream is probed with `ffprobe` for its dimensions and frame rate,
//! then decoded by an `ffmpeg` child process writing packed `rgb24` frames
//! to stdout. Each frame is exactly `width * height * 3` bytes.

use std::process::Stdio;

use async_trait::async_trait;
use image::RgbImage;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

use crate::source::{FrameSource, FrameSourceError, SourceOpener};

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// ffprobe
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    /// e.g. "30/1" or "24000/1001"
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Geometry and rate of the first video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Run `ffprobe` against a stream URL or file path.
pub async fn probe_stream(ffprobe_bin: &str, url: &str) -> Result<StreamInfo, FfmpegError> {
    let output = Command::new(ffprobe_bin)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate",
            "-of",
            "json",
        ])
        .arg(url)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    parse_probe(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe(stdout: &str) -> Result<StreamInfo, FfmpegError> {
    let probe = serde_json::from_str::<FfprobeOutput>(stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))?;
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| FfmpegError::ParseError("no video stream".into()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(FfmpegError::ParseError("missing frame dimensions".into())),
    };

    let avg = stream.avg_frame_rate.as_deref().map(parse_fraction).unwrap_or(0.0);
    let fps = if avg > 0.0 {
        avg
    } else {
        stream.r_frame_rate.as_deref().map(parse_fraction).unwrap_or(0.0)
    };

    Ok(StreamInfo { width, height, fps })
}

/// Parse a fraction string like `"30/1"` into a float.
fn parse_fraction(s: &str) -> f64 {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() == 2 {
        let num = parts[0].parse::<f64>().unwrap_or(0.0);
        let den = parts[1].parse::<f64>().unwrap_or(1.0);
        if den > 0.0 {
            return num / den;
        }
    }
    s.parse::<f64>().unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// FfmpegOpener / FfmpegFrameSource
// ---------------------------------------------------------------------------

/// Opens streams by spawning `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegOpener {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl FfmpegOpener {
    pub fn new(ffmpeg_bin: impl Into<String>, ffprobe_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }

    async fn spawn(&self, url: &str, info: StreamInfo) -> Result<FfmpegFrameSource, FfmpegError> {
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.arg("-hide_banner").arg("-loglevel").arg("error");
        if url.starts_with("rtsp://") {
            cmd.arg("-rtsp_transport").arg("tcp");
        }
        cmd.arg("-i")
            .arg(url)
            .arg("-an")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-f")
            .arg("rawvideo")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(FfmpegError::NotFound)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FfmpegError::ParseError("ffmpeg stdout was not captured".into()))?;

        Ok(FfmpegFrameSource {
            child,
            stdout,
            info,
            frame_len: info.width as usize * info.height as usize * 3,
        })
    }
}

impl Default for FfmpegOpener {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl SourceOpener for FfmpegOpener {
    async fn open(&self, url: &str) -> Result<Box<dyn FrameSource>, FrameSourceError> {
        let open_err = |e: FfmpegError| FrameSourceError::Open {
            url: url.to_string(),
            message: e.to_string(),
        };
        let info = probe_stream(&self.ffprobe_bin, url).await.map_err(open_err)?;
        let source = self.spawn(url, info).await.map_err(open_err)?;
        tracing::info!(
            %url,
            width = info.width,
            height = info.height,
            fps = info.fps,
            "Opened video stream"
        );
        Ok(Box::new(source))
    }
}

/// A running `ffmpeg` decoder.
pub struct FfmpegFrameSource {
    child: Child,
    stdout: ChildStdout,
    info: StreamInfo,
    frame_len: usize,
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    fn fps(&self) -> f64 {
        self.info.fps
    }

    async fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameSourceError> {
        let mut buf = vec![0u8; self.frame_len];
        match self.stdout.read_exact(&mut buf).await {
            Ok(_) => RgbImage::from_raw(self.info.width, self.info.height, buf)
                .map(Some)
                .ok_or_else(|| FrameSourceError::Read("frame buffer size mismatch".into())),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(FrameSourceError::Read(e.to_string())),
        }
    }

    async fn close(&mut self) {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fraction_handles_ntsc_rates() {
        assert_eq!(parse_fraction("30/1"), 30.0);
        assert!((parse_fraction("30000/1001") - 29.97).abs() < 0.01);
        assert_eq!(parse_fraction("0/0"), 0.0);
        assert_eq!(parse_fraction("25"), 25.0);
    }

    #[test]
    fn parse_probe_prefers_average_rate() {
        let json = r#"{"streams":[{"width":1280,"height":720,"r_frame_rate":"90000/1","avg_frame_rate":"25/1"}]}"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(
            info,
            StreamInfo {
                width: 1280,
                height: 720,
                fps: 25.0
            }
        );
    }

    #[test]
    fn parse_probe_falls_back_to_real_rate() {
        let json = r#"{"streams":[{"width":640,"height":480,"r_frame_rate":"15/1","avg_frame_rate":"0/0"}]}"#;
        assert_eq!(parse_probe(json).unwrap().fps, 15.0);
    }

    #[test]
    fn parse_probe_rejects_missing_video_stream() {
        assert!(matches!(
            parse_probe(r#"{"streams":[]}"#),
            Err(FfmpegError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn missing_binary_reports_not_found() {
        let result = probe_stream("/nonexistent/ffprobe", "rtsp://example/stream").await;
        assert!(matches!(result, Err(FfmpegError::NotFound(_))));
    }
}
