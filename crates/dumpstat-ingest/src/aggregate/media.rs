//! File extension classification

use serde::Serialize;
use std::fmt;

pub const UNKNOWN_EXTENSION: &str = "unknown";

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif", "heic", "ico", "jfif", "svg",
    "psd", "exr",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "webm", "mp4", "mov", "avi", "mkv", "flv", "wmv", "m4v", "3gp", "ogv", "vob", "mts", "m2ts",
];

const FLASH_EXTENSIONS: &[&str] = &["swf", "spl"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Video,
    Flash,
    Unknown,
}

impl MediaCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
            MediaCategory::Flash => "flash",
            MediaCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A post's file type after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// Lowercased extension, or `unknown` when unrecognized
    pub extension: String,
    pub category: MediaCategory,
}

impl MediaType {
    pub fn is_gif(&self) -> bool {
        self.extension == "gif"
    }
}

/// Classify a raw `file_ext` value
pub fn classify_extension(raw: &str) -> MediaType {
    let ext = raw.trim().trim_start_matches('.').to_ascii_lowercase();

    let category = if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        MediaCategory::Image
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaCategory::Video
    } else if FLASH_EXTENSIONS.contains(&ext.as_str()) {
        MediaCategory::Flash
    } else {
        return MediaType {
            extension: UNKNOWN_EXTENSION.to_string(),
            category: MediaCategory::Unknown,
        };
    };

    MediaType {
        extension: ext,
        category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(classify_extension("png").category, MediaCategory::Image);
        assert_eq!(classify_extension(" WEBM ").extension, "webm");
        assert_eq!(classify_extension("webm").category, MediaCategory::Video);
        assert_eq!(classify_extension("swf").category, MediaCategory::Flash);
    }

    #[test]
    fn test_unrecognized_and_empty_are_unknown() {
        for raw in ["", "  ", "zip", "txt"] {
            let media = classify_extension(raw);
            assert_eq!(media.extension, UNKNOWN_EXTENSION);
            assert_eq!(media.category, MediaCategory::Unknown);
        }
    }

    #[test]
    fn test_gif_flag() {
        assert!(classify_extension("GIF").is_gif());
        assert!(!classify_extension("png").is_gif());
    }
}
