//! Uploaded audio validation.

use crate::error::{Result, VoicecastError};

/// Accepted audio formats: (content type, file extension).
const ACCEPTED_FORMATS: &[(&str, &str)] = &[
    ("audio/mpeg", "mp3"),
    ("audio/mp3", "mp3"),
    ("audio/wav", "wav"),
    ("audio/wave", "wav"),
    ("audio/x-wav", "wav"),
    ("audio/mp4", "m4a"),
    ("audio/m4a", "m4a"),
    ("audio/x-m4a", "m4a"),
    ("audio/ogg", "ogg"),
    ("audio/flac", "flac"),
    ("audio/webm", "webm"),
];

/// An uploaded audio file that passed format and size validation.
#[derive(Debug, Clone)]
pub struct UploadedAudio {
    bytes: Vec<u8>,
    extension: String,
}

impl UploadedAudio {
    /// Validate an upload by content type or file name.
    pub fn new(
        bytes: Vec<u8>,
        file_name: &str,
        content_type: Option<&str>,
        max_bytes: usize,
    ) -> Result<Self> {
        check_audio_size(bytes.len(), max_bytes)?;

        let extension = Self::detect_extension(file_name, content_type).ok_or_else(|| {
            VoicecastError::InvalidInput(
                "Invalid file type. Please upload MP3, WAV, M4A, OGG, FLAC or WebM files".into(),
            )
        })?;

        Ok(Self { bytes, extension })
    }

    /// The file extension wins over the content type, since browsers often
    /// send `application/octet-stream`.
    fn detect_extension(file_name: &str, content_type: Option<&str>) -> Option<String> {
        let from_name = std::path::Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "mp4" => Some("m4a".to_string()),
                _ => ACCEPTED_FORMATS
                    .iter()
                    .find(|(_, known)| *known == ext)
                    .map(|(_, known)| known.to_string()),
            });

        from_name.or_else(|| {
            let content_type = content_type?.to_lowercase();
            ACCEPTED_FORMATS
                .iter()
                .find(|(mime, _)| content_type.starts_with(mime))
                .map(|(_, ext)| ext.to_string())
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// Reject empty audio and audio over `max_bytes`.
pub fn check_audio_size(len: usize, max_bytes: usize) -> Result<()> {
    if len == 0 {
        return Err(VoicecastError::InvalidInput("No audio data provided".into()));
    }
    if len > max_bytes {
        return Err(VoicecastError::InvalidInput(format!(
            "File too large ({} bytes, limit {} bytes)",
            len, max_bytes
        )));
    }
    Ok(())
}

/// Content type for an audio file extension, `audio/mpeg` when unknown.
pub fn content_type_for(extension: &str) -> &'static str {
    let extension = extension.to_lowercase();
    ACCEPTED_FORMATS
        .iter()
        .find(|(_, ext)| *ext == extension)
        .map(|(mime, _)| *mime)
        .unwrap_or("audio/mpeg")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 1024;

    #[test]
    fn test_accepts_by_extension_or_content_type() {
        let upload = UploadedAudio::new(vec![0; 10], "voice.WAV", None, LIMIT).unwrap();
        assert_eq!(upload.extension(), "wav");

        let upload = UploadedAudio::new(vec![0; 10], "blob", Some("audio/mpeg"), LIMIT).unwrap();
        assert_eq!(upload.extension(), "mp3");

        let upload =
            UploadedAudio::new(vec![0; 10], "clip.mp4", Some("video/mp4"), LIMIT).unwrap();
        assert_eq!(upload.extension(), "m4a");
    }

    #[test]
    fn test_rejects_bad_uploads() {
        assert!(UploadedAudio::new(vec![], "a.mp3", None, LIMIT).is_err());
        assert!(UploadedAudio::new(vec![0; LIMIT + 1], "a.mp3", None, LIMIT).is_err());
        assert!(UploadedAudio::new(vec![0; 10], "notes.txt", Some("text/plain"), LIMIT).is_err());
    }

    #[test]
    fn test_size_limits() {
        assert!(check_audio_size(1, LIMIT).is_ok());
        assert!(check_audio_size(LIMIT, LIMIT).is_ok());
        assert!(check_audio_size(0, LIMIT).is_err());
        assert!(check_audio_size(LIMIT + 1, LIMIT).is_err());
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for("WAV"), "audio/wav");
        assert_eq!(content_type_for("webm"), "audio/webm");
        assert_eq!(content_type_for("xyz"), "audio/mpeg");
    }
}
