//! Feature extraction: the free-text evidence a file offers for matching.
//!
//! Features come from tags first, then from fragments of the parent
//! directory name and of the file's base name. A candidate is only kept if
//! it is not already similar (>= 0.8) to something collected earlier, so
//! "Abbey Road" from the tag suppresses "Abbey_Road" from the directory.
//! Insertion order matters to the scorer and is preserved.

use crate::metadata::{TagField, TaggedFile};
use crate::similarity::similarity;

/// Candidates at or above this similarity to an existing feature are dropped.
pub const DEDUP_THRESHOLD: f64 = 0.8;

const TAG_ORDER: [TagField; 5] = [
    TagField::Album,
    TagField::AlbumArtist,
    TagField::Artist,
    TagField::Title,
    TagField::TrackNumber,
];

/// Collect the deduplicated feature list for a file.
pub fn extract_features<F: TaggedFile + ?Sized>(file: &F) -> Vec<String> {
    let mut features = Vec::new();

    for field in TAG_ORDER {
        if let Some(value) = file.tag(field) {
            push_unique(&mut features, value);
        }
    }

    let path = file.path();

    // "The_Beatles - Abbey_Road" -> ["The Beatles", "Abbey Road"]
    if let Some(dir) = path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()) {
        for piece in dir.split('-') {
            push_unique(&mut features, &clean(piece));
        }
    }

    // "01 - Come_Together.flac" -> ["01", "Come Together"]
    if let Some(stem) = path.file_stem().and_then(|n| n.to_str()) {
        for part in stem.split('-') {
            for piece in part.split('.') {
                push_unique(&mut features, &clean(piece));
            }
        }
    }

    features
}

fn clean(piece: &str) -> String {
    piece.replace('_', " ").trim().to_string()
}

fn push_unique(features: &mut Vec<String>, value: &str) {
    if value.is_empty() {
        return;
    }
    if features.iter().all(|existing| similarity(value, existing) < DEDUP_THRESHOLD) {
        features.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FileRecord, FileTags};

    fn tags(album: &str, artist: &str, title: &str, track: &str) -> FileTags {
        FileTags {
            album: Some(album.to_string()),
            artist: Some(artist.to_string()),
            title: Some(title.to_string()),
            track_number: Some(track.to_string()),
            ..FileTags::default()
        }
    }

    fn assert_no_similar_pairs(features: &[String]) {
        for (i, a) in features.iter().enumerate() {
            for b in &features[i + 1..] {
                assert!(
                    similarity(a, b) < DEDUP_THRESHOLD,
                    "{:?} and {:?} are too similar in {:?}",
                    a,
                    b,
                    features
                );
            }
        }
    }

    #[test]
    fn test_tags_come_first_in_fixed_order() {
        let file = FileRecord::new(
            "/music/x/y.flac",
            tags("Abbey Road", "The Beatles", "Come Together", "1"),
            None,
        );
        assert_eq!(
            &file.features()[..4],
            &["Abbey Road", "The Beatles", "Come Together", "1"]
        );
    }

    #[test]
    fn test_path_fragments_without_tags() {
        let file = FileRecord::new(
            "/music/The_Beatles - Abbey_Road/07 - Here_Comes_the_Sun.remaster.flac",
            FileTags::default(),
            None,
        );
        assert_eq!(
            file.features(),
            &["The Beatles", "Abbey Road", "07", "Here Comes the Sun", "remaster"]
        );
    }

    #[test]
    fn test_path_fragments_similar_to_tags_are_dropped() {
        let file = FileRecord::new(
            "/music/The Beatles - Abbey Road/01 - Come Together.flac",
            tags("Abbey Road", "The Beatles", "Come Together", "1"),
            None,
        );
        // "01" vs "1" is only 0.5 similar, so it survives
        assert_eq!(
            file.features(),
            &["Abbey Road", "The Beatles", "Come Together", "1", "01"]
        );
    }

    #[test]
    fn test_album_artist_equal_to_artist_is_deduplicated() {
        let mut t = tags("Abbey Road", "The Beatles", "Something", "2");
        t.album_artist = Some("The Beatles".to_string());
        let file = FileRecord::new("/m/a/b.mp3", t, None);
        assert_eq!(
            file.features().iter().filter(|f| f.as_str() == "The Beatles").count(),
            1
        );
    }

    #[test]
    fn test_no_empty_features() {
        let file = FileRecord::new("/music/-a--b-/--c..d-.ogg", FileTags::default(), None);
        assert!(file.features().iter().all(|f| !f.is_empty()));
        assert_eq!(file.features(), &["a", "b", "c", "d"]);
    }

    #[test]
    fn test_extension_is_not_a_feature() {
        let file = FileRecord::new("/music/dir/song.flac", FileTags::default(), None);
        assert!(!file.features().iter().any(|f| f == "flac"));
    }

    #[test]
    fn test_never_two_similar_features() {
        let cases = [
            ("/music/Pink Floyd - The Wall/02 - Another Brick.flac",
             tags("The Wall", "Pink Floyd", "Another Brick in the Wall", "2")),
            ("/music/pink_floyd-the_wall/pink_floyd-the_wall-02-another_brick.flac",
             tags("The Wall", "Pink Floyd", "Another Brick", "02")),
            ("/x/Radiohead - OK Computer - 1997/03.Subterranean Homesick Alien.mp3",
             tags("OK Computer", "Radiohead", "Subterranean Homesick Alien", "3")),
            ("/x/a - a - a/a.a.a.mp3", tags("a", "a", "a", "a")),
        ];
        for (path, t) in cases {
            let file = FileRecord::new(path, t, None);
            assert_no_similar_pairs(file.features());
        }
    }
}
