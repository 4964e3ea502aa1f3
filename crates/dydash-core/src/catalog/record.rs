//! Per-file derived attributes.

use chrono::{DateTime, NaiveDateTime};
use dydash_api_models::FileEntry;
use serde::Serialize;

/// Source assigned when no path segment qualifies.
pub const UNKNOWN_SOURCE: &str = "unknown source";

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "flv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "flac", "m4a"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const DATA_EXTENSIONS: &[&str] = &["json", "txt", "log"];

/// Directory markers that identify a user or collection folder.
const SOURCE_MARKERS: &[&str] = &["user_", "MS4w", "合集", "用户"];
/// Segments longer than this are taken as opaque identifiers.
const OPAQUE_SEGMENT_CHARS: usize = 10;

/// File category derived from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Video container.
    Video,
    /// Audio track.
    Audio,
    /// Still image.
    Image,
    /// Metadata or text.
    Data,
    /// Anything else.
    Other,
}

impl FileType {
    /// Classify by the final extension of `name`, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let Some(extension) = extension_of(name) else {
            return Self::Other;
        };
        let extension = extension.to_ascii_lowercase();
        let ext = extension.as_str();
        if VIDEO_EXTENSIONS.contains(&ext) {
            Self::Video
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            Self::Audio
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Self::Image
        } else if DATA_EXTENSIONS.contains(&ext) {
            Self::Data
        } else {
            Self::Other
        }
    }

    /// Lowercase label, also accepted by [`FileType::parse`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Data => "data",
            Self::Other => "other",
        }
    }

    /// Parse a lowercase label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "image" => Some(Self::Image),
            "data" => Some(Self::Data),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

fn extension_of(name: &str) -> Option<&str> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Pick a display source for `path` from its directory segments.
///
/// The first directory carrying a user/collection marker, or long enough to
/// be an opaque identifier, wins; otherwise the top-level directory; otherwise
/// [`UNKNOWN_SOURCE`]. The file name itself is never a source.
#[must_use]
pub fn derive_source(path: &str) -> String {
    let segments: Vec<&str> = path.split(['/', '\\']).collect();
    let directories = &segments[..segments.len().saturating_sub(1)];
    let usable = |segment: &str| !matches!(segment, "" | "." | "..");

    let marked = directories.iter().copied().find(|segment| {
        usable(*segment)
            && (SOURCE_MARKERS.iter().any(|marker| segment.contains(marker))
                || segment.chars().count() > OPAQUE_SEGMENT_CHARS)
    });
    marked
        .or_else(|| {
            directories
                .iter()
                .copied()
                .find(|segment| !segment.is_empty())
                .filter(|segment| usable(*segment))
        })
        .map_or_else(|| UNKNOWN_SOURCE.to_string(), str::to_string)
}

/// Parse the backend's modification timestamp.
#[must_use]
pub fn parse_modified(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|stamp| stamp.naive_utc())
        })
}

/// A listed file with its derived attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// File name.
    pub name: String,
    /// Path relative to the download directory, as reported.
    pub relative_path: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Parsed modification time; `None` sorts as oldest.
    pub modified_at: Option<NaiveDateTime>,
    /// Modification time as reported.
    pub modified_raw: String,
    /// Category from the extension.
    pub file_type: FileType,
    /// Display source; never empty.
    pub source: String,
}

impl FileRecord {
    /// Lowercase extension, empty when the name has none.
    #[must_use]
    pub fn extension(&self) -> String {
        extension_of(&self.name)
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }

    /// Path with `/` separators, as the media endpoints expect.
    #[must_use]
    pub fn normalized_path(&self) -> String {
        self.relative_path.replace('\\', "/")
    }
}

impl From<FileEntry> for FileRecord {
    fn from(entry: FileEntry) -> Self {
        let file_type = FileType::from_name(&entry.name);
        let source = derive_source(&entry.path);
        let modified_at = parse_modified(&entry.modified);
        Self {
            name: entry.name,
            relative_path: entry.path,
            size_bytes: entry.size,
            modified_at,
            modified_raw: entry.modified,
            file_type,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_final_extension() {
        assert_eq!(FileType::from_name("clip.MP4"), FileType::Video);
        assert_eq!(FileType::from_name("song.m4a"), FileType::Audio);
        assert_eq!(FileType::from_name("cover.tar.jpeg"), FileType::Image);
        assert_eq!(FileType::from_name("meta.json"), FileType::Data);
        assert_eq!(FileType::from_name("README"), FileType::Other);
        assert_eq!(FileType::from_name("trailing."), FileType::Other);
        assert_eq!(FileType::parse("image"), Some(FileType::Image));
        assert_eq!(FileType::parse("all"), None);
    }

    #[test]
    fn source_prefers_marked_directories() {
        assert_eq!(derive_source("downloads/user_alice/clip.mp4"), "user_alice");
        assert_eq!(
            derive_source(r"root\MS4wLjABAAAA\post\clip.mp4"),
            "MS4wLjABAAAA"
        );
        assert_eq!(derive_source("a/我的合集/clip.mp4"), "我的合集");
        assert_eq!(derive_source("x/some_long_folder_name/clip.mp4"), "some_long_folder_name");
    }

    #[test]
    fn source_falls_back_to_top_directory_then_sentinel() {
        assert_eq!(derive_source("short/clip.mp4"), "short");
        assert_eq!(derive_source("a_very_long_file_name_without_dirs.mp4"), UNKNOWN_SOURCE);
        assert_eq!(derive_source("./clip.mp4"), UNKNOWN_SOURCE);
        assert_eq!(derive_source("/user/x.mp4"), "user");
        assert_eq!(derive_source(r"\\share\clip.mp4"), "share");
        assert_eq!(derive_source("/clip.mp4"), UNKNOWN_SOURCE);
        assert_eq!(derive_source(""), UNKNOWN_SOURCE);
    }

    #[test]
    fn parses_naive_and_offset_timestamps() {
        assert!(parse_modified("2024-05-01T10:00:00").is_some());
        assert!(parse_modified("2024-05-01T10:00:00.123456").is_some());
        assert!(parse_modified("2024-05-01T10:00:00+08:00").is_some());
        assert!(parse_modified("yesterday").is_none());
    }

    #[test]
    fn record_derives_attributes_once() {
        let record = FileRecord::from(FileEntry {
            name: "Clip.MOV".into(),
            path: r"user_bob\Clip.MOV".into(),
            size: 10,
            modified: "bad".into(),
        });
        assert_eq!(record.file_type, FileType::Video);
        assert_eq!(record.source, "user_bob");
        assert_eq!(record.extension(), "mov");
        assert_eq!(record.normalized_path(), "user_bob/Clip.MOV");
        assert!(record.modified_at.is_none());
    }
}
