//! MusicBrainz web service (ws/2, JSON) as a [`CatalogClient`].
//!
//! Releases are loaded with their recordings and artist credits. Track
//! searches go through the recording search endpoint with a Lucene query
//! built from [`SearchHints`]; each (recording, release) pair found becomes
//! one partial album holding that single track.

use serde::Deserialize;
use tracing::{debug, info};

use crate::catalog::{CatalogClient, SearchHints};
use crate::error::CatalogError;
use crate::metadata::{Album, Artist, Track};

pub const DEFAULT_BASE_URL: &str = "https://musicbrainz.org/ws/2";
pub const DEFAULT_USER_AGENT: &str = "autotag/0.1 (https://github.com/hifiberry/autorec)";
pub const DEFAULT_SEARCH_LIMIT: u32 = 25;

/// Seconds either side of the file's duration accepted by a track search.
const DURATION_SLACK_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct ArtistCredit {
    name: String,
    artist: CreditedArtist,
}

#[derive(Debug, Deserialize)]
struct CreditedArtist {
    id: String,
    name: String,
    #[serde(rename = "sort-name", default)]
    sort_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReleaseGroup {
    #[serde(rename = "primary-type", default)]
    primary_type: Option<String>,
}

// Release lookup response types
#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    id: String,
    title: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(rename = "release-group", default)]
    release_group: Option<ReleaseGroup>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    media: Vec<ReleaseMedium>,
}

#[derive(Debug, Deserialize)]
struct ReleaseMedium {
    #[serde(default)]
    tracks: Vec<ReleaseTrack>,
}

#[derive(Debug, Deserialize)]
struct ReleaseTrack {
    title: String,
    #[serde(default)]
    length: Option<u64>,
    recording: ReleaseRecording,
}

#[derive(Debug, Deserialize)]
struct ReleaseRecording {
    id: String,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
}

// Recording search response types
#[derive(Debug, Deserialize)]
struct RecordingSearchResponse {
    #[serde(default)]
    recordings: Vec<SearchRecording>,
}

#[derive(Debug, Deserialize)]
struct SearchRecording {
    id: String,
    title: String,
    #[serde(default)]
    length: Option<u64>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    releases: Vec<SearchRelease>,
}

#[derive(Debug, Deserialize)]
struct SearchRelease {
    id: String,
    title: String,
    #[serde(rename = "release-group", default)]
    release_group: Option<ReleaseGroup>,
    #[serde(default)]
    media: Vec<SearchMedium>,
}

#[derive(Debug, Deserialize)]
struct SearchMedium {
    #[serde(rename = "track-offset", default)]
    track_offset: Option<u32>,
}

fn first_artist(credits: &[ArtistCredit]) -> Option<Artist> {
    credits.first().map(|c| {
        let name = if c.name.is_empty() { &c.artist.name } else { &c.name };
        Artist::new(c.artist.id.clone(), name.clone(), c.artist.sort_name.clone())
    })
}

/// Build an album from a release lookup response.
///
/// Tracks without a length are skipped. The rest are numbered 1.. across
/// all media in release order.
pub fn parse_release(json: &str) -> Result<Album, CatalogError> {
    let release: ReleaseResponse = serde_json::from_str(json)?;
    let album_artist = first_artist(&release.artist_credit);

    let mut tracks = Vec::new();
    for track in release.media.iter().flat_map(|m| &m.tracks) {
        let Some(length) = track.length else {
            debug!("Skipping \"{}\" on release {}: no length", track.title, release.id);
            continue;
        };
        let artist = first_artist(&track.recording.artist_credit)
            .or_else(|| album_artist.clone())
            .unwrap_or_else(|| Artist::new("", "", None));
        let number = tracks.len() as u32 + 1;
        tracks.push(Track::new(track.recording.id.clone(), track.title.clone(), artist, number, length));
    }

    let album_type = release.release_group.and_then(|g| g.primary_type);
    Ok(Album::new(
        release.id,
        release.title,
        album_artist,
        release.date.filter(|d| !d.is_empty()),
        album_type,
        tracks,
    ))
}

/// Build partial albums from a recording search response.
///
/// One album per (recording, release) pair. Recordings without a length
/// and releases without a track offset are skipped.
pub fn parse_recording_search(json: &str) -> Result<Vec<Album>, CatalogError> {
    let response: RecordingSearchResponse = serde_json::from_str(json)?;

    let mut albums = Vec::new();
    for recording in &response.recordings {
        let Some(length) = recording.length else {
            continue;
        };
        let artist = first_artist(&recording.artist_credit).unwrap_or_else(|| Artist::new("", "", None));

        for release in &recording.releases {
            let Some(offset) = release.media.first().and_then(|m| m.track_offset) else {
                continue;
            };
            let track = Track::new(recording.id.clone(), recording.title.clone(), artist.clone(), offset + 1, length);
            let album_type = release.release_group.as_ref().and_then(|g| g.primary_type.clone());
            albums.push(Album::new(
                release.id.clone(),
                release.title.clone(),
                None,
                None,
                album_type,
                vec![track],
            ));
        }
    }
    Ok(albums)
}

/// Escape Lucene query syntax. Returns `None` when nothing is left.
pub fn escape(text: &str) -> Option<String> {
    let chars: Vec<char> = text.trim().chars().collect();
    let mut out = String::with_capacity(chars.len());

    for (i, &c) in chars.iter().enumerate() {
        match c {
            ':' | '+' | '-' | '!' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '"' | '~' | '*' | '\\' | '/' => {
                out.push('\\');
                out.push(c);
            }
            // Only doubled && and || are operators
            '|' | '&' => {
                if chars.get(i + 1) == Some(&c) {
                    out.push('\\');
                }
                out.push(c);
            }
            '_' | '?' | ';' | '#' => out.push(' '),
            _ => out.push(c),
        }
    }

    let out = out.trim();
    if out.is_empty() {
        None
    } else {
        Some(out.to_string())
    }
}

/// Lucene query for a recording search.
pub fn build_query(hints: &SearchHints) -> String {
    let mut clauses = Vec::new();

    if let Some(number) = hints.track_number {
        clauses.push(format!("tnum:{}", number));
    }
    if let Some(secs) = hints.approx_duration_secs {
        let lower = secs.saturating_sub(DURATION_SLACK_SECS) * 1000;
        let upper = (secs + DURATION_SLACK_SECS) * 1000;
        clauses.push(format!("dur:[{} TO {}]", lower, upper));
    }
    for (field, text) in [
        ("artist", &hints.artist_text),
        ("recording", &hints.title_text),
        ("release", &hints.release_text),
    ] {
        if let Some(text) = escape(text) {
            clauses.push(format!("{}:({})", field, text));
        }
    }

    clauses.join(" ")
}

/// Extract a release id from a MusicBrainz release URL, or accept a bare id.
pub fn parse_release_id(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(idx) = input.rfind("/release/") {
        let id = &input[idx + "/release/".len()..];
        let id = id.split(['?', '#', '/']).next().unwrap_or(id);
        return (!id.is_empty()).then(|| id.to_string());
    }
    if input.len() == 36 && input.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        Some(input.to_string())
    } else {
        None
    }
}

pub struct MusicBrainzClient {
    agent: ureq::Agent,
    base_url: String,
    user_agent: String,
    search_limit: u32,
}

impl Default for MusicBrainzClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_USER_AGENT, DEFAULT_SEARCH_LIMIT)
    }
}

impl MusicBrainzClient {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>, search_limit: u32) -> Self {
        MusicBrainzClient {
            agent: ureq::Agent::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            search_limit,
        }
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Option<String>, CatalogError> {
        info!("Connecting to MusicBrainz: {}", url);
        let mut request = self.agent.get(url).set("User-Agent", &self.user_agent);
        for (key, value) in query {
            request = request.query(key, value);
        }

        match request.call() {
            Ok(response) => Ok(Some(response.into_string()?)),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(ureq::Error::Status(code, response)) => Err(CatalogError::InvalidResponse(format!(
                "HTTP {} {}",
                code,
                response.status_text()
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

impl CatalogClient for MusicBrainzClient {
    fn name(&self) -> &str {
        "MusicBrainz"
    }

    fn fetch_album(&self, id: &str) -> Result<Option<Album>, CatalogError> {
        let url = format!(
            "{}/release/{}?inc=recordings+artist-credits+release-groups&fmt=json",
            self.base_url, id
        );
        let Some(body) = self.get(&url, &[])? else {
            return Ok(None);
        };
        let album = parse_release(&body)?;
        info!("Album loaded: {} ({} tracks)", album, album.tracks().len());
        Ok(Some(album))
    }

    fn search_tracks(&self, hints: &SearchHints) -> Result<Vec<Album>, CatalogError> {
        let query = build_query(hints);
        debug!("MusicBrainz recording query: {}", query);
        let url = format!("{}/recording/", self.base_url);
        let limit = self.search_limit.to_string();
        let Some(body) = self.get(&url, &[("query", query.as_str()), ("limit", limit.as_str()), ("fmt", "json")])? else {
            return Ok(Vec::new());
        };
        let albums = parse_recording_search(&body)?;
        debug!("MusicBrainz returned {} candidate tracks", albums.len());
        Ok(albums)
    }
}
