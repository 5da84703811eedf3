//! Turning an album's score matrix into file-to-track assignments.
//!
//! The default [`GreedyPerTrack`] picks the best file for every track
//! independently. One file can therefore win two tracks; it is then
//! assigned to both in turn and the later track wins, because
//! [`FileRecord::assign`] overwrites. [`ExclusiveGreedy`] never reuses a
//! file or a track and can be selected through configuration.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::comparison::AlbumComparison;
use crate::metadata::{FileRecord, TaggedFile};

/// One committed (track, file) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub track_index: usize,
    pub file_index: usize,
    pub score: f64,
}

/// Chooses assignments from one album's stored scores.
pub trait AssignmentStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Assignments to apply, in application order.
    fn assign(&self, comparison: &AlbumComparison) -> Vec<Assignment>;
}

/// Best file per track, tracks in album order.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyPerTrack;

impl AssignmentStrategy for GreedyPerTrack {
    fn name(&self) -> &str {
        "greedy-per-track"
    }

    fn assign(&self, comparison: &AlbumComparison) -> Vec<Assignment> {
        comparison
            .best_per_track()
            .into_iter()
            .map(|(track_index, file_index, score)| Assignment {
                track_index,
                file_index,
                score,
            })
            .collect()
    }
}

/// Highest-scoring pair first; each file and each track is used at most once.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExclusiveGreedy;

impl AssignmentStrategy for ExclusiveGreedy {
    fn name(&self) -> &str {
        "exclusive-greedy"
    }

    fn assign(&self, comparison: &AlbumComparison) -> Vec<Assignment> {
        let mut pairs: Vec<Assignment> = comparison
            .tracks()
            .flat_map(|(track_index, files)| {
                files.iter().map(move |(&file_index, &score)| Assignment {
                    track_index,
                    file_index,
                    score,
                })
            })
            .collect();
        // Stable: equal scores keep track-then-file order
        pairs.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut used_tracks = HashSet::new();
        let mut used_files = HashSet::new();
        let mut chosen = Vec::new();
        for pair in pairs {
            if used_tracks.contains(&pair.track_index) || used_files.contains(&pair.file_index) {
                continue;
            }
            used_tracks.insert(pair.track_index);
            used_files.insert(pair.file_index);
            chosen.push(pair);
        }
        chosen.sort_by_key(|a| a.track_index);
        chosen
    }
}

/// Look up a strategy by its configured name.
pub fn strategy_by_name(name: &str) -> Option<Box<dyn AssignmentStrategy>> {
    match name {
        "greedy-per-track" | "greedy" => Some(Box::new(GreedyPerTrack)),
        "exclusive-greedy" | "exclusive" => Some(Box::new(ExclusiveGreedy)),
        _ => None,
    }
}

/// Write `assignments` onto `files`. Returns how many were applied.
pub fn apply(assignments: &[Assignment], comparison: &AlbumComparison, files: &mut [FileRecord]) -> usize {
    let tracks = comparison.album().tracks();
    let mut applied = 0;
    for a in assignments {
        let (Some(track), Some(file)) = (tracks.get(a.track_index), files.get_mut(a.file_index)) else {
            continue;
        };
        if file.track().is_some() {
            debug!(
                "{} reassigned to \"{}\" ({:.3})",
                file.path().display(),
                track.title,
                a.score
            );
        }
        info!(
            "Assigned {} to track {} \"{}\" ({:.3})",
            file.path().display(),
            track.number,
            track.title,
            a.score
        );
        file.assign(track, a.score);
        applied += 1;
    }
    applied
}
