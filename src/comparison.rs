//! Score matrices relating a group's files to candidate albums.
//!
//! [`compare_group_with_album`] fills a [`Comparison`] with every
//! (track, file) score worth keeping for one candidate album. Once all
//! candidates are in, [`Comparison::best_album`] picks the winner using
//! the per-album score from [`AlbumComparison::album_score`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::MatchError;
use crate::metadata::{Album, FileRecord, TaggedFile};
use crate::scorer;

/// Pairs scoring below this are not stored.
pub const DEFAULT_LOW_RELEVANCE_FLOOR: f64 = 0.2;

/// Files scoring above this against any track leave the search queue.
pub const DEFAULT_HIGH_CONFIDENCE_FLOOR: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub low_relevance_floor: f64,
    pub high_confidence_floor: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            low_relevance_floor: DEFAULT_LOW_RELEVANCE_FLOOR,
            high_confidence_floor: DEFAULT_HIGH_CONFIDENCE_FLOOR,
        }
    }
}

/// Scores for one candidate album: track index -> file index -> score.
///
/// Indices are positions in `album.tracks()` and in the group's file list.
#[derive(Debug, Clone)]
pub struct AlbumComparison {
    album: Arc<Album>,
    tracks: BTreeMap<usize, BTreeMap<usize, f64>>,
}

impl AlbumComparison {
    fn new(album: Arc<Album>) -> Self {
        AlbumComparison {
            album,
            tracks: BTreeMap::new(),
        }
    }

    pub fn album(&self) -> &Arc<Album> {
        &self.album
    }

    pub(crate) fn record(&mut self, track_index: usize, file_index: usize, score: f64) {
        self.tracks.entry(track_index).or_default().insert(file_index, score);
    }

    /// Stored scores, in track order.
    pub fn tracks(&self) -> impl Iterator<Item = (usize, &BTreeMap<usize, f64>)> {
        self.tracks.iter().map(|(track, files)| (*track, files))
    }

    pub fn score(&self, track_index: usize, file_index: usize) -> Option<f64> {
        self.tracks.get(&track_index)?.get(&file_index).copied()
    }

    /// Best file for each track that has any stored score.
    ///
    /// Ties go to the lower file index.
    pub fn best_per_track(&self) -> Vec<(usize, usize, f64)> {
        self.tracks
            .iter()
            .filter_map(|(&track, files)| {
                let mut best: Option<(usize, f64)> = None;
                for (&file, &score) in files {
                    if best.map_or(true, |(_, b)| score > b) {
                        best = Some((file, score));
                    }
                }
                best.map(|(file, score)| (track, file, score))
            })
            .collect()
    }

    /// Sum of best-per-track scores, scaled by the share of the album's
    /// tracks covered by distinct best files.
    ///
    /// Two perfect matches on a four-track album score `2 * 2/4 = 1.0`,
    /// so a partial match loses to a complete one of similar quality.
    pub fn album_score(&self) -> f64 {
        let track_count = self.album.tracks().len();
        if track_count == 0 {
            return 0.0;
        }

        let mut total = 0.0;
        let mut files = BTreeSet::new();
        for (_, file, score) in self.best_per_track() {
            total += score;
            files.insert(file);
        }

        total * files.len() as f64 / track_count as f64
    }
}

/// All candidate albums compared so far for one group, in discovery order.
#[derive(Debug, Default)]
pub struct Comparison {
    albums: Vec<AlbumComparison>,
}

impl Comparison {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }

    pub fn len(&self) -> usize {
        self.albums.len()
    }

    pub fn albums(&self) -> &[AlbumComparison] {
        &self.albums
    }

    pub fn get(&self, album_id: &str) -> Option<&AlbumComparison> {
        self.albums.iter().find(|c| c.album.id == album_id)
    }

    pub fn clear(&mut self) {
        self.albums.clear();
    }

    fn entry(&mut self, album: &Arc<Album>) -> &mut AlbumComparison {
        match self.albums.iter().position(|c| c.album.id == album.id) {
            Some(idx) => &mut self.albums[idx],
            None => {
                self.albums.push(AlbumComparison::new(Arc::clone(album)));
                let last = self.albums.len() - 1;
                &mut self.albums[last]
            }
        }
    }

    /// The album with the highest album score, with that score.
    ///
    /// Only positive scores qualify. On a tie the album compared first wins.
    pub fn best_album(&self) -> Option<(&AlbumComparison, f64)> {
        let mut best: Option<(&AlbumComparison, f64)> = None;
        for candidate in &self.albums {
            let score = candidate.album_score();
            info!("Album score for {}: {:.3}", candidate.album, score);
            if score > best.map_or(0.0, |(_, b)| b) {
                best = Some((candidate, score));
            }
        }
        best
    }
}

/// Score every file in the group against every track of `album`.
///
/// Pairs below the low-relevance floor are dropped. When `queue` is given,
/// files scoring above the high-confidence floor are removed from it; the
/// final decision is still made later from the stored scores. Returns the
/// number of stored pairs.
pub fn compare_group_with_album(
    files: &[FileRecord],
    album: &Arc<Album>,
    comparison: &mut Comparison,
    mut queue: Option<&mut VecDeque<usize>>,
    thresholds: &Thresholds,
) -> Result<usize, MatchError> {
    if album.tracks().is_empty() {
        return Err(MatchError::NoComparableTracks(album.id.clone()));
    }

    let mut stored = 0;
    for (file_index, file) in files.iter().enumerate() {
        for (track_index, track) in album.tracks().iter().enumerate() {
            let score = scorer::score(file, track);
            debug!(
                "Compared {} with \"{}\": {:.3} {:?}",
                file.path().display(),
                track.title,
                score,
                file.features()
            );
            if score < thresholds.low_relevance_floor {
                continue;
            }

            if score > thresholds.high_confidence_floor {
                if let Some(queue) = queue.as_deref_mut() {
                    if let Some(pos) = queue.iter().position(|&i| i == file_index) {
                        info!(
                            "Removing {} from search queue, match score {:.3}",
                            file.path().display(),
                            score
                        );
                        queue.remove(pos);
                    }
                }
            }

            comparison.entry(album).record(track_index, file_index, score);
            stored += 1;
        }
    }

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{abbey_road, beatles};
    use crate::metadata::{FileTags, Track};

    fn tagged(path: &str, album: &str, artist: &str, title: &str, number: &str, duration_ms: u64) -> FileRecord {
        let tags = FileTags {
            album: Some(album.to_string()),
            artist: Some(artist.to_string()),
            title: Some(title.to_string()),
            track_number: Some(number.to_string()),
            ..FileTags::default()
        };
        FileRecord::new(path, tags, Some(duration_ms))
    }

    fn abbey_files() -> Vec<FileRecord> {
        vec![
            tagged("/m/a/1.flac", "Abbey Road", "The Beatles", "Come Together", "1", 259_000),
            tagged("/m/a/2.flac", "Abbey Road", "The Beatles", "Something", "2", 182_000),
        ]
    }

    fn album_with_tracks(id: &str, count: u32) -> Arc<Album> {
        let tracks = (1..=count)
            .map(|n| Track::new(format!("{}-{}", id, n), format!("Track {}", n), beatles(), n, 100_000))
            .collect();
        Arc::new(Album::new(id, id, Some(beatles()), None, None, tracks))
    }

    #[test]
    fn test_low_scores_are_not_stored() {
        let album = Arc::new(abbey_road());
        let files = abbey_files();
        let mut comparison = Comparison::new();
        let thresholds = Thresholds::default();

        compare_group_with_album(&files, &album, &mut comparison, None, &thresholds).unwrap();

        let stored = comparison.get("abbey").unwrap();
        let mut count = 0;
        for (track, scores) in stored.tracks() {
            for (&file, &score) in scores {
                assert!(score >= thresholds.low_relevance_floor);
                assert_eq!(score, scorer::score(&files[file], &album.tracks()[track]));
                count += 1;
            }
        }
        assert!(count > 0);
    }

    #[test]
    fn test_unrelated_files_store_nothing() {
        let album = Arc::new(abbey_road());
        let files = vec![tagged("/x/y/z.mp3", "Kind of Blue", "Miles Davis", "So What", "9", 545_000)];
        let mut comparison = Comparison::new();

        let stored =
            compare_group_with_album(&files, &album, &mut comparison, None, &Thresholds::default()).unwrap();
        assert_eq!(stored, 0);
        assert!(comparison.is_empty());
    }

    #[test]
    fn test_confident_files_leave_the_queue() {
        let album = Arc::new(abbey_road());
        let mut files = abbey_files();
        files.push(tagged("/x/y/z.mp3", "Kind of Blue", "Miles Davis", "So What", "9", 545_000));
        let mut queue: VecDeque<usize> = (0..files.len()).collect();
        let mut comparison = Comparison::new();

        compare_group_with_album(&files, &album, &mut comparison, Some(&mut queue), &Thresholds::default())
            .unwrap();
        assert_eq!(queue, VecDeque::from(vec![2]));
    }

    #[test]
    fn test_empty_album_is_rejected() {
        let album = Arc::new(Album::new("empty", "Nothing", None, None, None, Vec::new()));
        let mut comparison = Comparison::new();
        let result = compare_group_with_album(&abbey_files(), &album, &mut comparison, None, &Thresholds::default());
        assert_eq!(result, Err(MatchError::NoComparableTracks("empty".to_string())));
        assert!(comparison.is_empty());
    }

    #[test]
    fn test_partial_album_is_penalised() {
        let mut comparison = Comparison::new();
        let entry = comparison.entry(&album_with_tracks("four", 4));
        entry.record(0, 0, 1.0);
        entry.record(1, 1, 1.0);
        assert_eq!(comparison.get("four").unwrap().album_score(), 1.0);
    }

    #[test]
    fn test_same_best_file_counts_once() {
        let mut comparison = Comparison::new();
        let entry = comparison.entry(&album_with_tracks("two", 2));
        entry.record(0, 0, 0.8);
        entry.record(1, 0, 0.6);
        entry.record(1, 1, 0.4);
        // best per track: 0.8 + 0.6, one distinct file over two tracks
        let score = comparison.get("two").unwrap().album_score();
        assert!((score - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_complete_album_beats_partial() {
        let mut comparison = Comparison::new();
        let partial = comparison.entry(&album_with_tracks("partial", 4));
        partial.record(0, 0, 0.9);
        partial.record(1, 1, 0.9);
        let complete = comparison.entry(&album_with_tracks("complete", 2));
        complete.record(0, 0, 0.8);
        complete.record(1, 1, 0.8);

        let (best, score) = comparison.best_album().unwrap();
        assert_eq!(best.album().id, "complete");
        assert!((score - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_tie_goes_to_first_compared() {
        let mut comparison = Comparison::new();
        for id in ["first", "second"] {
            let entry = comparison.entry(&album_with_tracks(id, 1));
            entry.record(0, 0, 0.5);
        }
        assert_eq!(comparison.best_album().unwrap().0.album().id, "first");
    }

    #[test]
    fn test_no_positive_score_means_no_album() {
        let mut comparison = Comparison::new();
        assert!(comparison.best_album().is_none());
        comparison.entry(&album_with_tracks("zero", 3));
        assert!(comparison.best_album().is_none());
    }

    #[test]
    fn test_recomparing_an_album_reuses_its_entry() {
        let album = Arc::new(abbey_road());
        let files = abbey_files();
        let mut comparison = Comparison::new();
        let thresholds = Thresholds::default();
        compare_group_with_album(&files, &album, &mut comparison, None, &thresholds).unwrap();
        compare_group_with_album(&files, &album, &mut comparison, None, &thresholds).unwrap();
        assert_eq!(comparison.len(), 1);
    }
}
