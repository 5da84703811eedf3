//! In-memory cache of fully loaded albums, keyed by catalog identifier.
//!
//! Shared by every group matcher through the catalog gateway. Lookup,
//! fetch and insert happen under a single lock so two workers asking for
//! the same identifier never both hit the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::CatalogError;
use crate::metadata::Album;

#[derive(Debug, Default)]
pub struct AlbumCache {
    albums: Mutex<HashMap<String, Arc<Album>>>,
}

impl AlbumCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<Arc<Album>> {
        self.lock().get(id).cloned()
    }

    /// Insert an album under its own identifier, replacing any previous entry.
    pub fn insert(&self, album: Album) -> Arc<Album> {
        let album = Arc::new(album);
        self.lock().insert(album.id.clone(), Arc::clone(&album));
        album
    }

    /// Return the cached album for `id`, or run `fetch` and cache what it finds.
    ///
    /// The lock is held across `fetch`. A fetch that finds nothing or fails
    /// is not cached, so a later call retries.
    pub fn get_or_fetch<F>(&self, id: &str, fetch: F) -> Result<Option<Arc<Album>>, CatalogError>
    where
        F: FnOnce() -> Result<Option<Album>, CatalogError>,
    {
        let mut albums = self.lock();
        if let Some(album) = albums.get(id) {
            debug!("Album cache hit: {}", id);
            return Ok(Some(Arc::clone(album)));
        }

        let album = match fetch()? {
            Some(album) => Arc::new(album),
            None => return Ok(None),
        };
        albums.insert(id.to_string(), Arc::clone(&album));
        // Catalogs may redirect merged identifiers; make the canonical id hit too
        if album.id != id {
            albums.insert(album.id.clone(), Arc::clone(&album));
        }
        Ok(Some(album))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Album>>> {
        self.albums.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
