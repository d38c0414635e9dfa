//! Video collaborator backed by the system `ffprobe`/`ffmpeg`.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::core::VideoSize;
use crate::foundation::error::{OverlayError, OverlayResult};

/// Basic metadata about a source video file.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoSourceInfo {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Average frame rate; `0.0` when `ffprobe` could not report one.
    pub fps: f64,
    /// Container duration, when known.
    pub duration_secs: Option<f64>,
}

impl VideoSourceInfo {
    pub fn size(&self) -> VideoSize {
        VideoSize::new(self.width, self.height)
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Probe source video metadata through `ffprobe`.
#[tracing::instrument(skip_all, fields(path = %source_path.display()))]
pub fn probe_video(source_path: &Path) -> OverlayResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        avg_frame_rate: Option<String>,
        r_frame_rate: Option<String>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| OverlayError::load(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(OverlayError::load(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| OverlayError::load(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| OverlayError::load("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| OverlayError::load("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| OverlayError::load("missing video height from ffprobe"))?;

    let fps = [&video_stream.avg_frame_rate, &video_stream.r_frame_rate]
        .into_iter()
        .filter_map(|r| r.as_deref().and_then(parse_frame_rate))
        .next()
        .unwrap_or(0.0);
    let duration_secs = video_stream
        .duration
        .as_deref()
        .or_else(|| parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);

    tracing::debug!(width, height, fps, ?duration_secs, "video probed");
    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps,
        duration_secs,
    })
}

/// Parse an `ffprobe` rate such as `30000/1001` or `25`. `0/0` and other non-positive rates are
/// `None`.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let s = s.trim();
    let fps = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Decode a single straight-alpha RGBA frame at `source_time_sec`.
pub fn decode_video_frame_rgba8(
    source: &VideoSourceInfo,
    source_time_sec: f64,
) -> OverlayResult<Vec<u8>> {
    let expected_len = source.frame_len();
    if expected_len == 0 {
        return Err(OverlayError::load(
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }

    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{:.9}", source_time_sec.max(0.0))])
        .arg("-i")
        .arg(&source.source_path)
        .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
        .output()
        .map_err(|e| OverlayError::load(format!("failed to run ffmpeg for video decode: {e}")))?;

    if !out.status.success() {
        return Err(OverlayError::load(format!(
            "ffmpeg video decode failed for '{}': {}",
            source.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    if out.stdout.len() < expected_len {
        return Err(OverlayError::load(format!(
            "ffmpeg returned no video frame at {source_time_sec:.3}s for '{}'",
            source.source_path.display()
        )));
    }
    let mut frame = out.stdout;
    frame.truncate(expected_len);
    Ok(frame)
}

/// Sequential decode of every frame through one `ffmpeg` process.
pub struct VideoFrameStream {
    child: Child,
    stdout: ChildStdout,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
    finished: bool,
}

impl VideoFrameStream {
    pub fn open(source: &VideoSourceInfo) -> OverlayResult<Self> {
        let frame_len = source.frame_len();
        if frame_len == 0 {
            return Err(OverlayError::load(
                "cannot stream frames from a zero-sized video",
            ));
        }

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&source.source_path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                OverlayError::load(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OverlayError::load("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| OverlayError::load("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        Ok(Self {
            child,
            stdout,
            stderr_drain: Some(stderr_drain),
            frame_len,
            finished: false,
        })
    }

    /// Next frame, `Ok(None)` at end of stream. A trailing partial frame is discarded.
    pub fn next_frame(&mut self) -> OverlayResult<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }
        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .stdout
                .read(&mut buf[filled..])
                .map_err(|e| OverlayError::load(format!("ffmpeg stdout read failed: {e}")))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == buf.len() {
            return Ok(Some(buf));
        }
        if filled > 0 {
            tracing::debug!(bytes = filled, "partial trailing video frame discarded");
        }
        self.finish()?;
        Ok(None)
    }

    fn finish(&mut self) -> OverlayResult<()> {
        self.finished = true;
        let status = self
            .child
            .wait()
            .map_err(|e| OverlayError::load(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| OverlayError::load("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| OverlayError::load(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        if !status.success() {
            return Err(OverlayError::load(format!(
                "ffmpeg decode exited with status {status}: {}",
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        Ok(())
    }
}

impl Drop for VideoFrameStream {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
