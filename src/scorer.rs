//! Scoring one file against one catalog track.
//!
//! Every feature is compared with the track's album title, artist name and
//! title, and checked for an exact match against the track number. The
//! best assignment of four *distinct* features to those four roles is found
//! by exhaustive search, then a duration bonus is added and the sum is
//! normalised by [`SCORE_COMPONENTS`].

use crate::metadata::{FileRecord, TaggedFile, Track};
use crate::similarity::similarity;

/// Files within this many milliseconds of the track length earn a duration bonus.
pub const DURATION_WINDOW_MS: u64 = 15_000;

/// Album, artist, title, track number and duration.
pub const SCORE_COMPONENTS: f64 = 5.0;

/// Upper bound on features fed to the O(n^4) role search. Features past this
/// point (the least reliable ones, from the file name) are ignored.
pub const MAX_SCORED_FEATURES: usize = 24;

const ALBUM: usize = 0;
const ARTIST: usize = 1;
const TITLE: usize = 2;
const TRACK_NUMBER: usize = 3;

/// Score `file` against `track`, in `[0.0, 1.0]`.
pub fn score(file: &FileRecord, track: &Track) -> f64 {
    score_features(file.features(), file.duration_ms(), track)
}

/// Score a feature list and optional duration against `track`.
///
/// Returns 0.0 for an empty feature list. With fewer than four features no
/// role assignment exists and only the duration term can contribute.
pub fn score_features(features: &[String], duration_ms: Option<u64>, track: &Track) -> f64 {
    if features.is_empty() {
        return 0.0;
    }
    let features = &features[..features.len().min(MAX_SCORED_FEATURES)];

    let track_number = track.number.to_string();
    let roles: Vec<[f64; 4]> = features
        .iter()
        .map(|value| {
            [
                similarity(value, track.album_title()),
                similarity(value, &track.artist.name),
                similarity(value, &track.title),
                if *value == track_number { 1.0 } else { 0.0 },
            ]
        })
        .collect();

    let mut total = best_role_assignment(&roles);

    if let Some(duration) = duration_ms {
        let diff = duration.abs_diff(track.duration_ms);
        if diff < DURATION_WINDOW_MS {
            total += 1.0 - diff as f64 / DURATION_WINDOW_MS as f64;
        }
    }

    total / SCORE_COMPONENTS
}

/// Highest sum over pairwise-distinct (album, artist, title, number) indices.
fn best_role_assignment(roles: &[[f64; 4]]) -> f64 {
    let n = roles.len();
    let mut best = 0.0;

    for album in 0..n {
        for artist in 0..n {
            if artist == album {
                continue;
            }
            for title in 0..n {
                if title == artist || title == album {
                    continue;
                }
                for number in 0..n {
                    if number == title || number == artist || number == album {
                        continue;
                    }
                    let sum = roles[album][ALBUM]
                        + roles[artist][ARTIST]
                        + roles[title][TITLE]
                        + roles[number][TRACK_NUMBER];
                    if sum > best {
                        best = sum;
                    }
                }
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Album, Artist, FileTags};

    fn track(album: &str, artist: &str, title: &str, number: u32, duration_ms: u64) -> Track {
        let t = Track::new("t", title, Artist::new("ar", artist, None), number, duration_ms);
        Album::new("al", album, None, None, None, vec![t]).tracks()[0].clone()
    }

    fn features(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    const ABBEY_ROAD: [&str; 4] = ["Abbey Road", "The Beatles", "Come Together", "1"];

    #[test]
    fn test_empty_features_score_zero() {
        let t = track("Abbey Road", "The Beatles", "Come Together", 1, 259_000);
        assert_eq!(score_features(&[], Some(259_000), &t), 0.0);

        let file = FileRecord::new("", FileTags::default(), Some(259_000));
        assert!(file.features().is_empty());
        assert_eq!(score(&file, &t), 0.0);
    }

    #[test]
    fn test_perfect_match_scores_one() {
        let t = track("Abbey Road", "The Beatles", "Come Together", 1, 259_000);
        assert_eq!(score_features(&features(&ABBEY_ROAD), Some(259_000), &t), 1.0);
    }

    #[test]
    fn test_perfect_match_through_file_record() {
        let tags = FileTags {
            album: Some("Abbey Road".to_string()),
            artist: Some("The Beatles".to_string()),
            title: Some("Come Together".to_string()),
            track_number: Some("1".to_string()),
            ..FileTags::default()
        };
        let file = FileRecord::new("/m/Abbey Road/Come Together.flac", tags, Some(259_000));
        assert_eq!(file.features(), &ABBEY_ROAD);

        let t = track("Abbey Road", "The Beatles", "Come Together", 1, 259_000);
        assert_eq!(score(&file, &t), 1.0);
    }

    #[test]
    fn test_feature_order_does_not_matter() {
        let t = track("Abbey Road", "The Beatles", "Come Together", 1, 259_000);
        let shuffled = features(&["1", "Come Together", "Abbey Road", "The Beatles"]);
        assert_eq!(score_features(&shuffled, Some(259_000), &t), 1.0);
    }

    #[test]
    fn test_disjoint_track_gets_no_duration_bonus() {
        let t = track("Kind of Blue", "Miles Davis", "So What", 7, 259_000 + 15_000);
        let f = features(&ABBEY_ROAD);

        let with_duration = score_features(&f, Some(259_000), &t);
        let without_duration = score_features(&f, None, &t);
        assert_eq!(with_duration, without_duration);
        assert!(with_duration < 0.2, "score {}", with_duration);
    }

    #[test]
    fn test_duration_bonus_is_linear() {
        let t = track("zzz", "zzz", "zzz", 99, 100_000);
        let f = features(&["a", "b", "c", "d"]);
        let half = score_features(&f, Some(107_500), &t);
        assert!((half - 0.5 / SCORE_COMPONENTS).abs() < 1e-12);
        let shorter = score_features(&f, Some(92_500), &t);
        assert!((shorter - half).abs() < 1e-12);
    }

    #[test]
    fn test_track_number_is_exact_match() {
        let t = track("zzz", "zzz", "zzz", 1, 0);
        assert_eq!(score_features(&features(&["a", "b", "c", "01"]), None, &t), 0.0);
        assert_eq!(
            score_features(&features(&["a", "b", "c", "1"]), None, &t),
            1.0 / SCORE_COMPONENTS
        );
    }

    #[test]
    fn test_fewer_than_four_features_only_duration_counts() {
        let t = track("Abbey Road", "The Beatles", "Come Together", 1, 259_000);
        let f = features(&["Abbey Road", "The Beatles", "Come Together"]);
        assert_eq!(score_features(&f, None, &t), 0.0);
        assert_eq!(score_features(&f, Some(259_000), &t), 1.0 / SCORE_COMPONENTS);
    }

    #[test]
    fn test_one_feature_cannot_fill_two_roles() {
        // Self-titled: album and artist share a value but a single feature
        // may only be used once.
        let t = track("Weezer", "Weezer", "Buddy Holly", 4, 0);
        let f = features(&["Weezer", "Buddy Holly", "4", "x"]);
        let s = score_features(&f, None, &t);
        assert!((s - 3.0 / SCORE_COMPONENTS).abs() < 1e-12, "score {}", s);
    }

    #[test]
    fn test_many_features_are_capped() {
        let t = track("Abbey Road", "The Beatles", "Come Together", 1, 259_000);
        let mut f = features(&ABBEY_ROAD);
        f.extend((0..100).map(|i| format!("noise {}", i)));
        assert_eq!(score_features(&f, Some(259_000), &t), 1.0);
    }

    #[test]
    fn test_score_is_bounded() {
        let t = track("Abbey Road", "The Beatles", "Come Together", 1, 259_000);
        let f = features(&["Abbey Road", "Abbey Road!", "The Beatles", "Beatles", "Come Together", "1"]);
        for d in [None, Some(0), Some(259_000), Some(270_000)] {
            let s = score_features(&f, d, &t);
            assert!((0.0..=1.0).contains(&s));
        }
    }
}
