//! Frame and audio extraction for the analysis tracks.
//!
//! `FfmpegFrameExtractor` decodes real JPEG frames and a mono WAV track.
//! `SampledFrameExtractor` needs no external tools: its "frames" are evenly
//! spaced byte windows of the container, and its audio is the whole file.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::process::Command;

/// Size of each sampled window
const SAMPLE_WINDOW_BYTES: u64 = 64 * 1024;

/// One representative frame handed to image classifiers
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: usize,
    /// Position in the video, when known
    pub timestamp_secs: Option<f64>,
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Media submitted to the speech-to-text model
#[derive(Debug, Clone, PartialEq)]
pub struct MediaClip {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Container MIME type from the file extension
pub fn video_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        Some("m4v") => "video/x-m4v",
        _ => "application/octet-stream",
    }
}

#[async_trait]
pub trait FrameExtractor: Send + Sync + Debug {
    /// Up to `count` representative frames, in order
    async fn extract_frames(&self, video: &Path, count: usize) -> Result<Vec<Frame>>;

    /// The audio to transcribe. By default the whole container is sent.
    async fn extract_audio(&self, video: &Path) -> Result<MediaClip> {
        let data = tokio::fs::read(video)
            .await
            .with_context(|| format!("Failed to read video {}", video.display()))?;
        Ok(MediaClip {
            data,
            mime_type: video_mime_type(video).to_string(),
        })
    }
}

/// Placeholder frames sampled from the raw file without decoding
#[derive(Debug, Clone, Default)]
pub struct SampledFrameExtractor;

#[async_trait]
impl FrameExtractor for SampledFrameExtractor {
    async fn extract_frames(&self, video: &Path, count: usize) -> Result<Vec<Frame>> {
        let mut file = tokio::fs::File::open(video)
            .await
            .with_context(|| format!("Failed to open video {}", video.display()))?;
        let len = file
            .metadata()
            .await
            .context("Failed to read video metadata")?
            .len();

        if len == 0 {
            return Err(anyhow!("Video {} is empty", video.display()));
        }

        let mime_type = video_mime_type(video).to_string();
        let mut frames = Vec::with_capacity(count);

        for index in 0..count {
            let offset = len * index as u64 / count as u64;
            let window = SAMPLE_WINDOW_BYTES.min(len - offset);

            file.seek(std::io::SeekFrom::Start(offset))
                .await
                .context("Failed to seek video")?;
            let mut data = vec![0u8; window as usize];
            file.read_exact(&mut data)
                .await
                .context("Failed to read video sample")?;

            frames.push(Frame {
                index,
                timestamp_secs: None,
                data,
                mime_type: mime_type.clone(),
            });
        }

        Ok(frames)
    }
}

/// Real frames decoded with ffmpeg, evenly spaced over the probed duration
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

impl FfmpegFrameExtractor {
    /// `ffprobe` is expected next to the given `ffmpeg` binary.
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        let ffmpeg_path = ffmpeg_path.into();
        let ffprobe_path = match ffmpeg_path.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.contains("ffmpeg") => {
                ffmpeg_path.with_file_name(name.replace("ffmpeg", "ffprobe"))
            }
            _ => PathBuf::from("ffprobe"),
        };

        FfmpegFrameExtractor {
            ffmpeg_path,
            ffprobe_path,
        }
    }

    async fn probe_duration(&self, video: &Path) -> Result<f64> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(video)
            .output()
            .await
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let probe_data: serde_json::Value =
            serde_json::from_slice(&output.stdout).context("Failed to parse ffprobe output")?;

        probe_data["format"]["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| *d > 0.0)
            .ok_or_else(|| anyhow!("Could not parse duration"))
    }

    async fn frame_at(&self, video: &Path, timestamp: f64) -> Result<Vec<u8>> {
        let output = Command::new(&self.ffmpeg_path)
            .arg("-ss")
            .arg(format!("{:.3}", timestamp))
            .arg("-i")
            .arg(video)
            .args([
                "-vframes", "1", "-q:v", "2", "-f", "image2pipe", "-vcodec", "mjpeg", "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !output.status.success() {
            return Err(anyhow!(
                "FFmpeg frame extraction failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        if output.stdout.is_empty() {
            return Err(anyhow!("FFmpeg produced no frame at {:.3}s", timestamp));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_frames(&self, video: &Path, count: usize) -> Result<Vec<Frame>> {
        let duration = self.probe_duration(video).await?;
        let mut frames = Vec::with_capacity(count);

        for index in 0..count {
            let timestamp = duration * (index + 1) as f64 / (count + 1) as f64;
            let data = self.frame_at(video, timestamp).await?;
            frames.push(Frame {
                index,
                timestamp_secs: Some(timestamp),
                data,
                mime_type: "image/jpeg".to_string(),
            });
        }

        tracing::debug!(
            video = %video.display(),
            frames = frames.len(),
            duration_secs = duration,
            "Frames extracted with ffmpeg"
        );

        Ok(frames)
    }

    async fn extract_audio(&self, video: &Path) -> Result<MediaClip> {
        let output = Command::new(&self.ffmpeg_path)
            .arg("-i")
            .arg(video)
            .args(["-vn", "-ac", "1", "-ar", "16000", "-f", "wav", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !output.status.success() {
            return Err(anyhow!(
                "FFmpeg audio extraction failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(MediaClip {
            data: output.stdout,
            mime_type: "audio/wav".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn sampled_frames_are_evenly_spaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ad.mp4");
        let data: Vec<u8> = (0..300u32).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        let frames = SampledFrameExtractor
            .extract_frames(&path, 3)
            .await
            .unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].data, data[0..300].to_vec());
        assert_eq!(frames[1].data, data[100..300].to_vec());
        assert_eq!(frames[2].data, data[200..300].to_vec());
        assert!(frames.iter().all(|f| f.mime_type == "video/mp4"));
    }

    #[tokio::test]
    async fn sampled_extraction_fails_for_missing_or_empty_files() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.mov");
        tokio::fs::write(&empty, b"").await.unwrap();

        assert!(SampledFrameExtractor
            .extract_frames(&dir.path().join("missing.mp4"), 3)
            .await
            .is_err());
        assert!(SampledFrameExtractor.extract_frames(&empty, 3).await.is_err());
    }

    #[tokio::test]
    async fn default_audio_is_whole_container() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.MOV");
        tokio::fs::write(&path, b"moov").await.unwrap();

        let clip = SampledFrameExtractor.extract_audio(&path).await.unwrap();
        assert_eq!(clip.data, b"moov");
        assert_eq!(clip.mime_type, "video/quicktime");
    }

    #[test]
    fn ffprobe_lives_next_to_ffmpeg() {
        let extractor = FfmpegFrameExtractor::new("/opt/media/bin/ffmpeg");
        assert_eq!(
            extractor.ffprobe_path,
            PathBuf::from("/opt/media/bin/ffprobe")
        );
        let extractor = FfmpegFrameExtractor::new("avconv");
        assert_eq!(extractor.ffprobe_path, PathBuf::from("ffprobe"));
    }
}
