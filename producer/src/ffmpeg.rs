use frame_sieve_common::config::SourceConfig;
use frame_sieve_common::frame::{DecodeError, RawFrame};
use serde::Deserialize;
use std::ffi::OsString;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::source::FrameSource;
use crate::OpenError;

/// ffmpeg always hands us packed RGB.
const CHANNELS: u8 = 3;

/// What ffprobe told us about the first video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
    pub frame_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl StreamInfo {
    /// Parse `ffprobe -of json` output for the first video stream.
    pub fn from_probe_json(json: &str, path: &str) -> Result<Self, OpenError> {
        let probe: ProbeOutput =
            serde_json::from_str(json).map_err(|e| OpenError::Probe(e.to_string()))?;
        let stream = probe
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| OpenError::NoVideoStream(path.to_string()))?;

        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => return Err(OpenError::NoVideoStream(path.to_string())),
        };

        let fps = stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_rate)
            .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate));

        let duration = probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0);

        let frame_count = stream
            .nb_frames
            .and_then(|n| n.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .or_else(|| match (duration, fps) {
                (Some(d), Some(r)) => Some((d * r).round() as u64),
                _ => None,
            });

        Ok(Self {
            width,
            height,
            fps,
            frame_count,
        })
    }
}

/// Parse an ffprobe rational such as `30000/1001`. `0/0` means unknown.
fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if num <= 0.0 || den <= 0.0 {
        return None;
    }
    Some(num / den)
}

/// Decodes a video file through an `ffmpeg` subprocess emitting raw RGB frames
/// on stdout.
pub struct FfmpegSource {
    child: Child,
    stdout: Option<BufReader<ChildStdout>>,
    info: StreamInfo,
    frame_len: usize,
    index: u64,
}

impl FfmpegSource {
    pub fn open(path: &Path, config: &SourceConfig) -> Result<Self, OpenError> {
        if !path.exists() {
            return Err(OpenError::NotFound(path.display().to_string()));
        }

        let info = probe(path, config)?;
        info!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            frames = info.frame_count,
            "opened video"
        );

        let mut child = Command::new(&config.ffmpeg_path)
            .args(ffmpeg_args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| OpenError::Spawn {
                program: config.ffmpeg_path.display().to_string(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| OpenError::Spawn {
            program: config.ffmpeg_path.display().to_string(),
            reason: "could not get stdout handle".into(),
        })?;

        let frame_len = info.width as usize * info.height as usize * CHANNELS as usize;
        Ok(Self {
            child,
            stdout: Some(BufReader::with_capacity(frame_len, stdout)),
            info,
            frame_len,
            index: 0,
        })
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn read_frame(&mut self) -> Result<Option<Vec<u8>>, DecodeError> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < buf.len() {
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(DecodeError::Io(e.to_string())),
            }
        }

        if filled == self.frame_len {
            return Ok(Some(buf));
        }

        // EOF: reap ffmpeg and decide whether the stream ended cleanly.
        self.stdout = None;
        let status = self
            .child
            .wait()
            .map_err(|e| DecodeError::Io(e.to_string()))?;
        if filled > 0 {
            return Err(DecodeError::Truncated {
                got: filled,
                expected: self.frame_len,
            });
        }
        if !status.success() {
            return Err(DecodeError::Io(format!("ffmpeg exited with {status}")));
        }
        debug!(frames = self.index, "ffmpeg stream ended");
        Ok(None)
    }

    fn pts(&self, index: u64) -> Option<Duration> {
        self.info
            .fps
            .and_then(|fps| Duration::try_from_secs_f64(index as f64 / fps).ok())
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, DecodeError> {
        let Some(data) = self.read_frame()? else {
            return Ok(None);
        };
        let mut frame = RawFrame::new(self.info.width, self.info.height, CHANNELS, data);
        frame.pts = self.pts(self.index);
        self.index += 1;
        Ok(Some(frame))
    }

    fn estimated_frame_count(&self) -> Option<u64> {
        self.info.frame_count
    }

    fn close(&mut self) {
        if self.stdout.take().is_none() {
            return;
        }
        if let Err(e) = self.child.kill() {
            // Already exited is the common case here.
            debug!(error = %e, "ffmpeg kill");
        }
        if let Err(e) = self.child.wait() {
            warn!(error = %e, "failed to reap ffmpeg");
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Decode arguments. Frames are emitted exactly as decoded: no frame rate
/// conversion (variable-rate input would gain or lose frames) and no
/// autorotation (the probed width and height are the unrotated ones).
fn ffmpeg_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-noautorotate", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_owned());
    args.extend(
        [
            "-fps_mode",
            "passthrough",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args
}

fn probe(path: &Path, config: &SourceConfig) -> Result<StreamInfo, OpenError> {
    let output = Command::new(&config.ffprobe_path)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| OpenError::Spawn {
            program: config.ffprobe_path.display().to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(OpenError::Probe(stderr.trim().to_string()));
    }

    let json = String::from_utf8_lossy(&output.stdout);
    StreamInfo::from_probe_json(&json, &path.display().to_string())
}
