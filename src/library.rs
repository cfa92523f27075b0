//! # Local Library
//!
//! The player's local library is reached through `Browse`: the top level
//! lists media sources, the configured source lists sections, the `Albums`
//! section lists letter groups, and each group lists albums with a ready-made
//! `playURL`. The full walk takes dozens of requests, so every step goes
//! through the cached query client.

use crate::device::{DeviceControlClient, DeviceQueryClient};
use crate::transport::DeviceError;
use crate::xml::lenient_string;
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// An album in the local library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryAlbum {
    /// Device-relative link that appends the album to the end of the queue
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub artist: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub album: String,
}

impl LibraryAlbum {
    /// Key under which random picks are remembered.
    #[must_use]
    pub fn history_label(&self) -> String {
        format!("{}: {}", self.album, self.artist)
    }
}

impl fmt::Display for LibraryAlbum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.artist, self.album)
    }
}

/// Turn a "play now" link into one that appends to the queue.
#[must_use]
pub fn append_link(url: &str) -> String {
    url.replace("playnow=1", "playnow=-1&where=last")
}

const BROWSE_ENTRIES: &str = r#"browse.item[].{"text": text, "key": browseKey}"#;

#[derive(Deserialize)]
struct BrowseEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    text: String,
    #[serde(default, deserialize_with = "lenient_string")]
    key: String,
}

/// Browsing access to one media source.
pub struct Library<'a> {
    query: DeviceQueryClient<'a>,
    location: &'a str,
}

impl<'a> Library<'a> {
    #[must_use]
    pub fn new(query: DeviceQueryClient<'a>, location: &'a str) -> Self {
        Self { query, location }
    }

    /// Browse key of the first entry titled `text`. Titles are compared
    /// here rather than inside the path expression, so any name works.
    fn first_key(&self, params: &[(&str, &str)], text: &str) -> Result<String, DeviceError> {
        let items = self.query.query("Browse", params, BROWSE_ENTRIES)?;
        let entries: Vec<BrowseEntry> =
            serde_json::from_value(items).map_err(|e| DeviceError::MalformedResponse {
                endpoint: "Browse".to_string(),
                reason: e.to_string(),
            })?;
        entries
            .into_iter()
            .find(|entry| entry.text == text && !entry.key.is_empty())
            .map(|entry| entry.key)
            .ok_or_else(|| DeviceError::PathNotFound {
                endpoint: "Browse".to_string(),
                expr: format!("{BROWSE_ENTRIES} (text {text:?})"),
            })
    }

    /// Every album of the source, in browse order.
    ///
    /// # Errors
    ///
    /// [`DeviceError::PathNotFound`] if the source or its `Albums` section is
    /// missing; transport and decoding errors otherwise.
    pub fn albums(&self) -> Result<Vec<LibraryAlbum>, DeviceError> {
        let source = self.first_key(&[], self.location)?;
        debug!("library source key {source}");
        let albums_key = self.first_key(&[("key", source.as_str())], "Albums")?;

        let sections = self
            .query
            .query("Browse", &[("key", albums_key.as_str())], "browse.item[].browseKey")?;
        let sections: Vec<String> = sections
            .as_array()
            .map(|keys| keys.iter().filter_map(|k| k.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        let mut albums = Vec::new();
        for section in &sections {
            let items = match self.query.query(
                "Browse",
                &[("key", section.as_str())],
                r#"browse.item[].{"url": playURL, "artist": text2, "album": text}"#,
            ) {
                Ok(items) => items,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            let found: Vec<LibraryAlbum> =
                serde_json::from_value(items).map_err(|e| DeviceError::MalformedResponse {
                    endpoint: "Browse".to_string(),
                    reason: e.to_string(),
                })?;
            albums.extend(
                found
                    .into_iter()
                    .filter(|album| !album.url.is_empty())
                    .map(|album| LibraryAlbum {
                        url: append_link(&album.url),
                        ..album
                    }),
            );
        }
        debug!("library has {} albums in {} sections", albums.len(), sections.len());
        Ok(albums)
    }
}

/// Append `album` to the queue.
///
/// # Errors
///
/// Transport errors.
pub fn enqueue(control: &DeviceControlClient<'_>, album: &LibraryAlbum) -> Result<(), DeviceError> {
    control.follow_link(&album.url)
}

/// Sorted, de-duplicated artist names.
#[must_use]
pub fn artists(albums: &[LibraryAlbum]) -> Vec<&str> {
    albums
        .iter()
        .map(|a| a.artist.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Albums by `artist`, sorted by title.
#[must_use]
pub fn albums_by<'a>(albums: &'a [LibraryAlbum], artist: &str) -> Vec<&'a LibraryAlbum> {
    let mut found: Vec<&LibraryAlbum> = albums.iter().filter(|a| a.artist == artist).collect();
    found.sort_by(|a, b| a.album.cmp(&b.album));
    found.dedup_by(|a, b| a.album == b.album);
    found
}

/// Pick a random album whose history label is not in `recent`.
#[must_use]
pub fn pick_random<'a, R: Rng + ?Sized>(
    albums: &'a [LibraryAlbum],
    recent: &HashSet<String>,
    rng: &mut R,
) -> Option<&'a LibraryAlbum> {
    let candidates: Vec<&LibraryAlbum> = albums
        .iter()
        .filter(|album| !recent.contains(&album.history_label()))
        .collect();
    if candidates.is_empty() {
        warn!("Every library album is in the recent history");
    }
    candidates.choose(rng).copied()
}

/// Split an `Artist - Album` line.
#[must_use]
pub fn split_line(line: &str) -> Option<(&str, &str)> {
    let (artist, album) = line.split_once(" - ").or_else(|| line.split_once('-'))?;
    let (artist, album) = (artist.trim(), album.trim());
    if artist.is_empty() || album.is_empty() {
        return None;
    }
    Some((artist, album))
}

/// Find the library album for an artist/album pair: a unique title match wins;
/// with several, the first whose artist contains (or is contained in)
/// `artist`.
#[must_use]
pub fn find_album<'a>(albums: &'a [LibraryAlbum], artist: &str, album: &str) -> Option<&'a LibraryAlbum> {
    let matches: Vec<&LibraryAlbum> = albums.iter().filter(|a| a.album == album).collect();
    match matches.as_slice() {
        [] => None,
        [only] => Some(*only),
        several => several
            .iter()
            .find(|a| a.artist.contains(artist) || artist.contains(a.artist.as_str()))
            .copied(),
    }
}
