//! Catalog entities and local file records.
//!
//! [`Album`], [`Track`] and [`Artist`] mirror what the remote catalog
//! returns. [`FileRecord`] is one locally read audio file; the matching
//! engine only sees it through the [`TaggedFile`] capability so it stays
//! independent of whatever tag-reading library produced it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::features;

/// Tag fields the matching engine knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagField {
    Album,
    AlbumArtist,
    Artist,
    Title,
    TrackNumber,
    ReleaseId,
}

/// The view of an audio file the matcher needs: path, tags and duration.
pub trait TaggedFile {
    /// Absolute path, the identity of the file.
    fn path(&self) -> &Path;

    /// Trimmed, non-empty value of a tag field.
    fn tag(&self, field: TagField) -> Option<&str>;

    /// Audio length in milliseconds, `None` when unknown or unreadable.
    fn duration_ms(&self) -> Option<u64>;
}

/// Raw tag values as read from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_artist: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_id: Option<String>,
}

impl FileTags {
    fn get(&self, field: TagField) -> Option<&str> {
        let value = match field {
            TagField::Album => &self.album,
            TagField::AlbumArtist => &self.album_artist,
            TagField::Artist => &self.artist,
            TagField::Title => &self.title,
            TagField::TrackNumber => &self.track_number,
            TagField::ReleaseId => &self.release_id,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// A file as listed in a JSON manifest by an external tag reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub tags: FileTags,
}

impl From<FileEntry> for FileRecord {
    fn from(entry: FileEntry) -> Self {
        FileRecord::new(entry.path, entry.tags, entry.duration_ms.filter(|ms| *ms > 0))
    }
}

/// One local audio file plus derived features and its match result.
#[derive(Debug, Clone)]
pub struct FileRecord {
    path: PathBuf,
    tags: FileTags,
    duration_ms: Option<u64>,
    features: Vec<String>,
    track: Option<Track>,
    score: f64,
}

impl FileRecord {
    /// Build a record and extract its features.
    pub fn new(path: impl Into<PathBuf>, tags: FileTags, duration_ms: Option<u64>) -> Self {
        let mut record = FileRecord {
            path: path.into(),
            tags,
            duration_ms,
            features: Vec::new(),
            track: None,
            score: 0.0,
        };
        record.features = features::extract_features(&record);
        record
    }

    pub fn tags(&self) -> &FileTags {
        &self.tags
    }

    /// Deduplicated matching evidence, in insertion order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Track this file was matched to, if any.
    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Record the final match. Overwrites any previous assignment.
    pub fn assign(&mut self, track: &Track, score: f64) {
        self.track = Some(track.clone());
        self.score = score;
    }
}

impl TaggedFile for FileRecord {
    fn path(&self) -> &Path {
        &self.path
    }

    fn tag(&self, field: TagField) -> Option<&str> {
        self.tags.get(field)
    }

    fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub sort_name: Option<String>,
}

impl Artist {
    pub fn new(id: impl Into<String>, name: impl Into<String>, sort_name: Option<String>) -> Self {
        Artist {
            id: id.into(),
            name: name.into(),
            sort_name,
        }
    }
}

/// A track on a catalog album.
///
/// `album_id` and `album_title` are a back-reference filled in by
/// [`Album::new`]; the album owns its tracks, not the other way round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: Artist,
    /// 1-based position on the album
    pub number: u32,
    pub duration_ms: u64,
    album_id: String,
    album_title: String,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: Artist,
        number: u32,
        duration_ms: u64,
    ) -> Self {
        Track {
            id: id.into(),
            title: title.into(),
            artist,
            number,
            duration_ms,
            album_id: String::new(),
            album_title: String::new(),
        }
    }

    pub fn album_id(&self) -> &str {
        &self.album_id
    }

    pub fn album_title(&self) -> &str {
        &self.album_title
    }
}

/// A catalog release and its ordered track list.
///
/// Search results come back as partial albums: a single track, and no
/// artist or release date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist: Option<Artist>,
    pub released: Option<String>,
    pub album_type: Option<String>,
    tracks: Vec<Track>,
}

impl Album {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: Option<Artist>,
        released: Option<String>,
        album_type: Option<String>,
        mut tracks: Vec<Track>,
    ) -> Self {
        let id = id.into();
        let title = title.into();
        for track in &mut tracks {
            track.album_id = id.clone();
            track.album_title = title.clone();
        }
        Album {
            id,
            title,
            artist,
            released,
            album_type,
            tracks,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn is_partial(&self) -> bool {
        self.artist.is_none()
    }
}

impl std::fmt::Display for Album {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.artist {
            Some(artist) => write!(f, "{} - {} [{}]", artist.name, self.title, self.id),
            None => write!(f, "{} [{}]", self.title, self.id),
        }
    }
}

/// Files believed to come from the same release.
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    files: Vec<FileRecord>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Group {
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_file(&mut self, file: FileRecord) {
        self.files.push(file);
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut [FileRecord] {
        &mut self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_entry_to_record() {
        let entries: Vec<FileEntry> = serde_json::from_str(
            r#"[
                {"path": "/m/abbey/01.flac", "duration_ms": 259000,
                 "tags": {"album": "Abbey Road", "track_number": "1"}},
                {"path": "/m/unknown.mp3", "duration_ms": 0}
            ]"#,
        )
        .unwrap();

        let records: Vec<FileRecord> = entries.into_iter().map(FileRecord::from).collect();
        assert_eq!(records[0].duration_ms(), Some(259_000));
        assert_eq!(records[0].tag(TagField::Album), Some("Abbey Road"));
        assert_eq!(records[0].features()[0], "Abbey Road");
        assert_eq!(records[1].duration_ms(), None);
        assert_eq!(records[1].tags(), &FileTags::default());
    }

    fn artist() -> Artist {
        Artist::new("b10bbbfc", "The Beatles", Some("Beatles, The".to_string()))
    }

    #[test]
    fn test_album_sets_track_back_reference() {
        let tracks = vec![
            Track::new("t1", "Come Together", artist(), 1, 259_000),
            Track::new("t2", "Something", artist(), 2, 182_000),
        ];
        let album = Album::new("a1", "Abbey Road", Some(artist()), None, None, tracks);

        for track in album.tracks() {
            assert_eq!(track.album_id(), "a1");
            assert_eq!(track.album_title(), "Abbey Road");
        }
        assert!(!album.is_partial());
    }

    #[test]
    fn test_tags_are_trimmed_and_blank_is_absent() {
        let tags = FileTags {
            album: Some("  Abbey Road ".to_string()),
            artist: Some("   ".to_string()),
            ..FileTags::default()
        };
        let file = FileRecord::new("/music/x.flac", tags, None);
        assert_eq!(file.tag(TagField::Album), Some("Abbey Road"));
        assert_eq!(file.tag(TagField::Artist), None);
        assert_eq!(file.tag(TagField::Title), None);
    }

    #[test]
    fn test_assign_overwrites() {
        let mut file = FileRecord::new("/music/x.flac", FileTags::default(), Some(1000));
        assert!(file.track().is_none());
        assert_eq!(file.score(), 0.0);

        let a = Track::new("t1", "One", artist(), 1, 1000);
        let b = Track::new("t2", "Two", artist(), 2, 1000);
        file.assign(&a, 0.5);
        file.assign(&b, 0.9);
        assert_eq!(file.track().map(|t| t.id.as_str()), Some("t2"));
        assert_eq!(file.score(), 0.9);
    }

    #[test]
    fn test_group_keeps_files_in_order() {
        let mut group = Group::new("Abbey Road");
        group.add_file(FileRecord::new("/a/1.flac", FileTags::default(), None));
        group.add_file(FileRecord::new("/a/2.flac", FileTags::default(), None));
        let paths: Vec<_> = group.files().iter().map(|f| f.path().to_path_buf()).collect();
        assert_eq!(paths, vec![PathBuf::from("/a/1.flac"), PathBuf::from("/a/2.flac")]);
    }
}
