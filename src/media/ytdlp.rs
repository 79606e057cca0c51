//! yt-dlp based audio download.

use super::{run_tool, MediaFetcher};
use crate::error::{Result, VoicecastError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

/// Where yt-dlp gets its cookies from.
#[derive(Debug, Clone, Default)]
pub enum CookieSource {
    /// Netscape cookie file contents, written to a temp file per call.
    Inline(String),
    /// Path to an existing cookie file.
    File(PathBuf),
    #[default]
    None,
}

impl CookieSource {
    /// Inline cookies win over the file; a missing file means no cookies.
    pub fn resolve(inline: Option<String>, file: Option<PathBuf>) -> Self {
        match (inline, file) {
            (Some(contents), _) => CookieSource::Inline(contents),
            (None, Some(path)) if path.is_file() => CookieSource::File(path),
            _ => CookieSource::None,
        }
    }
}

/// Downloads audio with yt-dlp, converting to MP3 via ffmpeg.
pub struct YtDlpFetcher {
    timeout: Duration,
    cookies: CookieSource,
}

impl YtDlpFetcher {
    pub fn new(timeout: Duration, cookies: CookieSource) -> Self {
        Self { timeout, cookies }
    }

    /// Materialize cookies for one call. The returned temp file must outlive the call.
    fn cookie_file(&self) -> Result<(Option<PathBuf>, Option<NamedTempFile>)> {
        match &self.cookies {
            CookieSource::Inline(contents) => {
                debug!("Using cookies from environment variable");
                let mut file = tempfile::Builder::new()
                    .prefix("cookies_")
                    .suffix(".txt")
                    .tempfile()
                    .map_err(|e| {
                        VoicecastError::AcquisitionFailed(format!(
                            "failed to create temporary cookies file: {}",
                            e
                        ))
                    })?;
                file.write_all(contents.as_bytes()).map_err(|e| {
                    VoicecastError::AcquisitionFailed(format!("failed to write cookies: {}", e))
                })?;
                Ok((Some(file.path().to_path_buf()), Some(file)))
            }
            CookieSource::File(path) => {
                debug!("Using local cookies file: {}", path.display());
                Ok((Some(path.clone()), None))
            }
            CookieSource::None => Ok((None, None)),
        }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    #[instrument(skip(self, output_path), fields(output = %output_path.display()))]
    async fn fetch(
        &self,
        reference: &str,
        output_path: &Path,
        max_duration_seconds: u32,
    ) -> Result<()> {
        info!("Downloading audio from {}", reference);

        // yt-dlp fills in the extension; --audio-format makes it .mp3
        let template = output_path.with_extension("%(ext)s");
        let (cookies_path, _cookies_guard) = self.cookie_file()?;

        let mut args: Vec<OsString> = vec![
            "--extract-audio".into(),
            "--audio-format".into(),
            "mp3".into(),
            "--output".into(),
            template.into_os_string(),
            "--postprocessor-args".into(),
            format!("ffmpeg:-t {}", max_duration_seconds).into(),
            "--no-playlist".into(),
            "--no-warnings".into(),
        ];

        if let Some(path) = cookies_path {
            args.push("--cookies".into());
            args.push(path.into_os_string());
        }

        args.push(reference.into());

        run_tool("yt-dlp", args, self.timeout, VoicecastError::AcquisitionFailed).await?;

        debug!("yt-dlp completed");
        Ok(())
    }
}
