//! Per-group matching run.
//!
//! A [`GroupMatcher`] owns one group of files and decides which catalog
//! album it is. It moves `Idle -> Running -> Finished` exactly once; a
//! group that needs matching again needs a new matcher.
//!
//! While running it either works through a queue of the group's files,
//! finding a candidate album for each (by the file's release id tag, or
//! by a track search), or compares a fixed list of album ids. Each
//! candidate is scored against every file. When the queue or list is
//! exhausted the best album is selected and its tracks are assigned to
//! files.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assignment::{self, AssignmentStrategy, GreedyPerTrack};
use crate::catalog::{CatalogGateway, SearchHints};
use crate::comparison::{compare_group_with_album, Comparison, Thresholds};
use crate::metadata::{Album, FileRecord, Group, TagField, TaggedFile};
use crate::scorer;

pub type MatcherId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherState {
    Idle,
    Running,
    Finished,
}

/// Tuning shared by every matcher of a run.
#[derive(Clone)]
pub struct MatchSettings {
    pub thresholds: Thresholds,
    pub strategy: Arc<dyn AssignmentStrategy>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        MatchSettings {
            thresholds: Thresholds::default(),
            strategy: Arc::new(GreedyPerTrack),
        }
    }
}

impl fmt::Debug for MatchSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchSettings")
            .field("thresholds", &self.thresholds)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

/// Outcome of one finished matcher.
#[derive(Debug, Clone)]
pub struct MatchedGroup {
    pub matcher: MatcherId,
    pub group: Group,
    pub album: Option<Arc<Album>>,
    pub album_score: f64,
}

/// Signals sent to whoever drives the matchers.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    /// Final assignment done. Sent even when no album was selected.
    GroupMatched(MatchedGroup),
    /// The matcher will do no more work.
    MatcherFinished(MatcherId),
}

pub struct GroupMatcher {
    id: MatcherId,
    state: MatcherState,
    group: Group,
    gateway: Arc<CatalogGateway>,
    settings: MatchSettings,
    album_ids: Option<Vec<String>>,
    events: Option<Sender<MatchEvent>>,
    album: Option<Arc<Album>>,
    album_score: f64,
}

impl GroupMatcher {
    pub fn new(group: Group, gateway: Arc<CatalogGateway>, settings: MatchSettings) -> Self {
        GroupMatcher {
            id: Uuid::new_v4(),
            state: MatcherState::Idle,
            group,
            gateway,
            settings,
            album_ids: None,
            events: None,
            album: None,
            album_score: 0.0,
        }
    }

    /// Compare only these albums instead of searching.
    pub fn with_albums(mut self, album_ids: Vec<String>) -> Self {
        self.album_ids = Some(album_ids);
        self
    }

    pub fn with_events(mut self, events: Sender<MatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn id(&self) -> MatcherId {
        self.id
    }

    pub fn state(&self) -> MatcherState {
        self.state
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Selected album, once finished.
    pub fn album(&self) -> Option<&Arc<Album>> {
        self.album.as_ref()
    }

    pub fn album_score(&self) -> f64 {
        self.album_score
    }

    /// Run the match to completion on the calling thread.
    ///
    /// Returns `false` without doing anything unless the matcher is idle.
    pub fn start(&mut self) -> bool {
        if self.state != MatcherState::Idle {
            debug!("Matcher {} for \"{}\" already started", self.id, self.group.name());
            return false;
        }
        self.state = MatcherState::Running;
        info!(
            "Matching group \"{}\" ({} files)",
            self.group.name(),
            self.group.files().len()
        );

        let mut comparison = Comparison::new();
        match self.album_ids.clone() {
            Some(ids) => self.compare_listed_albums(&ids, &mut comparison),
            None => self.search_loop(&mut comparison),
        }

        self.finish(&comparison);
        true
    }

    fn search_loop(&self, comparison: &mut Comparison) {
        let files = self.group.files();
        let mut queue: VecDeque<usize> = (0..files.len()).collect();

        while let Some(file_index) = queue.pop_front() {
            if self.gateway.gate().is_shut_down() {
                info!("Shutting down, {} files of \"{}\" left unsearched", queue.len() + 1, self.group.name());
                break;
            }

            let file = &files[file_index];
            let album = self
                .album_from_release_tag(file)
                .or_else(|| self.album_from_search(file));
            if let Some(album) = album {
                self.compare(&album, comparison, Some(&mut queue));
            }
        }
    }

    fn compare_listed_albums(&self, ids: &[String], comparison: &mut Comparison) {
        for id in ids {
            match self.gateway.fetch_album(id) {
                Some(album) => self.compare(&album, comparison, None),
                None => warn!("Album {} not found, skipping", id),
            }
        }
    }

    fn album_from_release_tag(&self, file: &FileRecord) -> Option<Arc<Album>> {
        let id = file.tag(TagField::ReleaseId)?;
        debug!("{} is tagged with release {}", file.path().display(), id);
        self.gateway.fetch_album(id)
    }

    /// Search for the file's track and load the album of the best hit.
    fn album_from_search(&self, file: &FileRecord) -> Option<Arc<Album>> {
        let hints = SearchHints::from_file(file);
        let candidates = self.gateway.search_tracks(&hints);

        let mut best: Option<(&Album, f64)> = None;
        for candidate in &candidates {
            let Some(track) = candidate.tracks().first() else {
                continue;
            };
            let score = scorer::score(file, track);
            if score > best.map_or(0.0, |(_, b)| b) {
                best = Some((candidate, score));
            }
        }

        let (candidate, score) = best?;
        info!(
            "Best search hit for {}: {} ({:.3})",
            file.path().display(),
            candidate,
            score
        );
        self.gateway.fetch_album(&candidate.id)
    }

    fn compare(&self, album: &Arc<Album>, comparison: &mut Comparison, queue: Option<&mut VecDeque<usize>>) {
        match compare_group_with_album(
            self.group.files(),
            album,
            comparison,
            queue,
            &self.settings.thresholds,
        ) {
            Ok(stored) => debug!("Compared \"{}\" with {}: {} scores kept", self.group.name(), album, stored),
            Err(e) => warn!("Not comparing \"{}\" with {}: {}", self.group.name(), album, e),
        }
    }

    fn finish(&mut self, comparison: &Comparison) {
        if let Some((best, score)) = comparison.best_album() {
            info!("Group \"{}\" matched {} ({:.3})", self.group.name(), best.album(), score);
            let assignments = self.settings.strategy.assign(best);
            assignment::apply(&assignments, best, self.group.files_mut());
            self.album = Some(Arc::clone(best.album()));
            self.album_score = score;
        } else {
            info!("No album found for group \"{}\"", self.group.name());
        }
        self.state = MatcherState::Finished;

        if let Some(events) = &self.events {
            let matched = MatchedGroup {
                matcher: self.id,
                group: self.group.clone(),
                album: self.album.clone(),
                album_score: self.album_score,
            };
            if events.send(MatchEvent::GroupMatched(matched)).is_err()
                || events.send(MatchEvent::MatcherFinished(self.id)).is_err()
            {
                debug!("Nobody listening for results of \"{}\"", self.group.name());
            }
        }
    }
}
