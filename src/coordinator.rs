//! Grouping loaded files and running one matcher per group.
//!
//! Files arrive one at a time through [`MatchCoordinator::file_loaded`]
//! and are grouped by [`group_name`]. Once loading is done,
//! [`MatchCoordinator::all_files_loaded`] starts a [`GroupMatcher`] for
//! every group on the coordinator's thread pool. Matchers report back over
//! a channel; [`MatchCoordinator::wait_for_all`] collects their results and
//! retires them as they finish.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::catalog::CatalogGateway;
use crate::error::MatchError;
use crate::group_matcher::{GroupMatcher, MatchEvent, MatchSettings, MatchedGroup, MatcherId};
use crate::metadata::{FileRecord, Group, TagField, TaggedFile};

/// Name of the group a file belongs to: its release id tag, else its album
/// tag, else its parent directory, else `<none>`.
pub fn group_name<F: TaggedFile + ?Sized>(file: &F) -> String {
    if let Some(id) = file.tag(TagField::ReleaseId) {
        return id.to_string();
    }
    if let Some(album) = file.tag(TagField::Album) {
        return album.to_string();
    }
    match file.path().parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.display().to_string(),
        _ => "<none>".to_string(),
    }
}

pub struct MatchCoordinator {
    gateway: Arc<CatalogGateway>,
    settings: MatchSettings,
    pool: ThreadPool,
    pending: BTreeMap<String, Group>,
    running: HashMap<MatcherId, String>,
    events_tx: Sender<MatchEvent>,
    events_rx: Receiver<MatchEvent>,
}

impl MatchCoordinator {
    pub fn new(gateway: Arc<CatalogGateway>, settings: MatchSettings, workers: usize) -> Result<Self, MatchError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("matcher-{}", i))
            .build()?;
        let (events_tx, events_rx) = unbounded();

        Ok(MatchCoordinator {
            gateway,
            settings,
            pool,
            pending: BTreeMap::new(),
            running: HashMap::new(),
            events_tx,
            events_rx,
        })
    }

    pub fn gateway(&self) -> &Arc<CatalogGateway> {
        &self.gateway
    }

    /// Groups still waiting for [`MatchCoordinator::all_files_loaded`].
    pub fn pending_groups(&self) -> impl Iterator<Item = &Group> {
        self.pending.values()
    }

    /// Number of matchers started and not yet finished.
    pub fn running(&self) -> usize {
        self.running.len()
    }

    pub fn file_loaded(&mut self, file: FileRecord) {
        let name = group_name(&file);
        debug!("Loaded {} into group \"{}\"", file.path().display(), name);
        self.pending
            .entry(name.clone())
            .or_insert_with(|| Group::new(name))
            .add_file(file);
    }

    /// Start a matcher for every pending group. Returns the ids started.
    pub fn all_files_loaded(&mut self) -> Vec<MatcherId> {
        let groups = std::mem::take(&mut self.pending);
        info!("All files loaded, matching {} groups", groups.len());

        groups
            .into_values()
            .map(|group| {
                let matcher = GroupMatcher::new(group, Arc::clone(&self.gateway), self.settings.clone());
                self.spawn(matcher)
            })
            .collect()
    }

    /// Match `group` against the given albums only, skipping the search.
    pub fn match_group_with_albums(&mut self, group: Group, album_ids: Vec<String>) -> MatcherId {
        let matcher = GroupMatcher::new(group, Arc::clone(&self.gateway), self.settings.clone())
            .with_albums(album_ids);
        self.spawn(matcher)
    }

    fn spawn(&mut self, matcher: GroupMatcher) -> MatcherId {
        let mut matcher = matcher.with_events(self.events_tx.clone());
        let id = matcher.id();
        self.running.insert(id, matcher.group().name().to_string());
        self.pool.spawn(move || {
            matcher.start();
        });
        id
    }

    /// Block until every started matcher has finished.
    ///
    /// `on_matched` sees each result as it arrives. Results are also
    /// returned, in completion order.
    pub fn wait_for_all<F>(&mut self, mut on_matched: F) -> Vec<MatchedGroup>
    where
        F: FnMut(&MatchedGroup),
    {
        let mut results = Vec::new();
        while !self.running.is_empty() {
            match self.events_rx.recv() {
                Ok(MatchEvent::GroupMatched(matched)) => {
                    on_matched(&matched);
                    results.push(matched);
                }
                Ok(MatchEvent::MatcherFinished(id)) => {
                    if let Some(name) = self.running.remove(&id) {
                        debug!("Matcher for \"{}\" finished, {} still running", name, self.running.len());
                    }
                }
                Err(e) => {
                    warn!("Matcher event channel closed: {}", e);
                    break;
                }
            }
        }
        results
    }

    /// Refuse further catalog requests. Running matchers finish with what
    /// they already have.
    pub fn stop(&self) {
        info!("Stopping, {} matchers still running", self.running.len());
        self.gateway.shut_down();
    }
}
