//! ffmpeg based transcoding.

use super::{run_tool, TranscodeProfile, Transcoder};
use crate::error::{Result, VoicecastError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

/// Re-encodes audio to MP3 with ffmpeg.
pub struct FfmpegTranscoder {
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn args(input: &Path, output: &Path, profile: &TranscodeProfile) -> Vec<OsString> {
        vec![
            "-i".into(),
            input.as_os_str().to_owned(),
            "-t".into(),
            profile.duration_seconds.to_string().into(),
            "-vn".into(),
            "-codec:a".into(),
            "libmp3lame".into(),
            "-b:a".into(),
            profile.bitrate.clone().into(),
            "-ar".into(),
            profile.sample_rate.to_string().into(),
            "-ac".into(),
            profile.channels.to_string().into(),
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            output.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, profile: &TranscodeProfile) -> Result<()> {
        run_tool(
            "ffmpeg",
            Self::args(input, output, profile),
            self.timeout,
            VoicecastError::TransformFailed,
        )
        .await
        .map(|_| ())
    }
}
