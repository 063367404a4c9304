//! Upload validation.
//!
//! Runs at the request boundary before any artifact is written or any job
//! is registered. Every check returns [`CoreError::Validation`] with a
//! message suitable for the client.

use crate::error::CoreError;
use crate::types::JobId;

/// Accepted content types for the input video.
pub const VIDEO_CONTENT_TYPES: &[&str] = &["video/mp4"];

/// Accepted content types for the input audio.
pub const AUDIO_CONTENT_TYPES: &[&str] = &["audio/wav", "audio/x-wav", "audio/mpeg"];

/// Validate the declared content type of the video upload.
pub fn validate_video_content_type(content_type: Option<&str>) -> Result<(), CoreError> {
    if matches_any(content_type, VIDEO_CONTENT_TYPES) {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "Invalid video format. Only mp4 allowed.".into(),
        ))
    }
}

/// Encoding of an accepted audio upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    /// File extension the stored input keeps, so inference scripts can
    /// branch on it.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }
}

/// Validate the declared content type of the audio upload and report its
/// format.
pub fn validate_audio_content_type(content_type: Option<&str>) -> Result<AudioFormat, CoreError> {
    match essence(content_type).as_deref() {
        Some("audio/wav" | "audio/x-wav") => Ok(AudioFormat::Wav),
        Some("audio/mpeg") => Ok(AudioFormat::Mp3),
        _ => Err(CoreError::Validation(
            "Invalid audio format. Only wav or mp3 allowed.".into(),
        )),
    }
}

/// Parse a client-supplied job identifier.
pub fn parse_job_id(raw: &str) -> Result<JobId, CoreError> {
    JobId::parse_str(raw.trim())
        .map_err(|_| CoreError::Validation(format!("Invalid task id '{raw}'")))
}

/// Compare the MIME essence against an allow-list.
fn matches_any(content_type: Option<&str>, allowed: &[&str]) -> bool {
    essence(content_type).is_some_and(|e| allowed.contains(&e.as_str()))
}

/// MIME essence (type/subtype, parameters stripped), lowercased.
fn essence(content_type: Option<&str>) -> Option<String> {
    let raw = content_type?;
    let essence = raw.split(';').next().unwrap_or("").trim();
    Some(essence.to_ascii_lowercase())
}
