//! Access to the remote catalog as the matching engine sees it.
//!
//! A [`CatalogClient`] is the raw transport (see [`crate::musicbrainz`]).
//! [`CatalogGateway`] wraps one with the shared [`RequestGate`] and the
//! [`AlbumCache`], and turns every failure into "no result" so a network
//! or parse problem never aborts a matching run.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::album_cache::AlbumCache;
use crate::error::CatalogError;
use crate::metadata::{Album, TagField, TaggedFile};
use crate::rate_limiter::RequestGate;

/// Textual and numeric hints for a track search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHints {
    pub track_number: Option<u32>,
    pub approx_duration_secs: Option<u64>,
    pub artist_text: String,
    pub title_text: String,
    pub release_text: String,
}

impl SearchHints {
    /// Build hints from a file's tags, parent directory and base name.
    ///
    /// The directory and base name are folded into the artist, title and
    /// release texts since untagged files often carry that information
    /// only in their path.
    pub fn from_file<F: TaggedFile + ?Sized>(file: &F) -> Self {
        let path = file.path();
        let directory = last_directory(path);
        let basename = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");

        // "3/12" style values carry the total after the slash
        let track_number = file
            .tag(TagField::TrackNumber)
            .and_then(|v| v.split('/').next())
            .and_then(|v| v.trim().parse::<u32>().ok());

        let approx_duration_secs = file
            .duration_ms()
            .map(|ms| ms / 1000)
            .filter(|secs| *secs > 0);

        SearchHints {
            track_number,
            approx_duration_secs,
            artist_text: join_text(&[file.tag(TagField::Artist), Some(directory), Some(basename)]),
            title_text: join_text(&[file.tag(TagField::Title), Some(basename)]),
            release_text: join_text(&[file.tag(TagField::Album), Some(directory), Some(basename)]),
        }
    }
}

fn last_directory(path: &Path) -> &str {
    path.parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("")
}

fn join_text(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remote catalog transport.
///
/// Implementations do not rate limit or cache; [`CatalogGateway`] does.
pub trait CatalogClient: Send + Sync {
    /// Short display name, e.g. "MusicBrainz".
    fn name(&self) -> &str;

    /// Load a complete album. `Ok(None)` when the identifier is unknown.
    fn fetch_album(&self, id: &str) -> Result<Option<Album>, CatalogError>;

    /// Search for tracks. Each returned album is partial and holds exactly
    /// one track.
    fn search_tracks(&self, hints: &SearchHints) -> Result<Vec<Album>, CatalogError>;
}

/// Rate-limited, cached catalog access shared by all group matchers.
pub struct CatalogGateway {
    client: Box<dyn CatalogClient>,
    gate: Arc<RequestGate>,
    cache: AlbumCache,
}

impl CatalogGateway {
    pub fn new(client: impl CatalogClient + 'static, gate: Arc<RequestGate>) -> Self {
        CatalogGateway {
            client: Box::new(client),
            gate,
            cache: AlbumCache::new(),
        }
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub fn cache(&self) -> &AlbumCache {
        &self.cache
    }

    /// Fetch an album by identifier, from cache when possible.
    ///
    /// Lock order is cache, then gate.
    pub fn fetch_album(&self, id: &str) -> Option<Arc<Album>> {
        let result = self.cache.get_or_fetch(id, || {
            let permit = self.gate.acquire()?;
            debug!("Loading album {} from {}", id, self.client.name());
            let fetched = self.client.fetch_album(id);
            permit.finish(fetched.is_ok());
            fetched
        });

        match result {
            Ok(Some(album)) => Some(album),
            Ok(None) => {
                debug!("{}: no album with id {}", self.client.name(), id);
                None
            }
            Err(e) => {
                warn!("{}: unable to load album {}: {}", self.client.name(), id, e);
                None
            }
        }
    }

    /// Search for single-track partial albums matching `hints`.
    pub fn search_tracks(&self, hints: &SearchHints) -> Vec<Album> {
        let result = self.gate.acquire().and_then(|permit| {
            debug!("Searching {} with {:?}", self.client.name(), hints);
            let found = self.client.search_tracks(hints);
            permit.finish(found.is_ok());
            found
        });

        match result {
            Ok(albums) => albums,
            Err(e) => {
                warn!("{}: track search failed: {}", self.client.name(), e);
                Vec::new()
            }
        }
    }

    /// Stop issuing new remote requests.
    pub fn shut_down(&self) {
        self.gate.shut_down();
    }
}
