//! # Streaming Service
//!
//! Search and browse a streaming service (Tidal by default) through the
//! player. Listings are paged: each page carries a `nextlink` attribute with
//! the relative URL of the next one, and a single result decodes as an object
//! rather than a list, which the path expressions already absorb.
//!
//! Every listing is cached; how long depends on how quickly the answer goes
//! stale:
//!
//! | Listing | TTL |
//! |---------|-----|
//! | artist search, favourites, artist albums | 1 day |
//! | album and song search | 7 days |
//! | album tracks, artist info | 30 days |

use crate::device::{DeviceControlClient, DeviceQueryClient};
use crate::query_path::PathExpr;
use crate::transport::{borrow_params, split_link, DeviceError};
use crate::xml::lenient_string;
use log::{debug, warn};
use scraper::{Html, Node};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on followed `nextlink`s for one listing.
pub const MAX_PAGES: usize = 50;

/// Lines of artist info shown in previews.
pub const INFO_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub artist: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tracks: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quality: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
}

impl Album {
    /// Picker label: `Artist: Title / date - tracks - quality`.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{}: {} / {} - {} - {}",
            self.artist, self.title, self.date, self.tracks, self.quality
        )
    }

    /// Whether `artist` and this album's artist contain one another,
    /// ignoring case. A blank name on either side never matches.
    #[must_use]
    pub fn artist_matches(&self, artist: &str) -> bool {
        let ours = self.artist.trim().to_lowercase();
        let theirs = artist.trim().to_lowercase();
        if ours.is_empty() || theirs.is_empty() {
            return false;
        }
        ours.contains(&theirs) || theirs.contains(&ours)
    }
}

impl fmt::Display for Album {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} Tracks: {} Quality: {}",
            self.title, self.date, self.tracks, self.quality
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineSong {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub artist: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quality: String,
    /// Length in seconds
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: String,
}

impl OnlineSong {
    #[must_use]
    pub fn label(&self) -> String {
        let secs: u32 = self.time.trim().parse().unwrap_or(0);
        format!(
            "{}: {} / {} - {}",
            self.artist,
            self.title,
            crate::song::format_time(secs),
            self.quality
        )
    }

    /// The id `Add` expects: song ids come back as `Service:1234`.
    #[must_use]
    pub fn add_id(&self) -> &str {
        self.id.rsplit(':').next().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default, deserialize_with = "lenient_string")]
    pub track: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub artist: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub album: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quality: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub duration: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs: u32 = self.duration.trim().parse().unwrap_or(0);
        write!(
            f,
            " {} {} {} {}",
            self.track,
            self.title,
            crate::song::format_time(secs),
            self.quality
        )
    }
}

/// One paged listing: endpoint, root element, and the per-page item
/// expression relative to that root.
struct Listing<'p> {
    path: &'p str,
    root: &'p str,
    items: &'p str,
    ttl: Duration,
}

const ARTISTS: Listing<'static> = Listing {
    path: "Artists",
    root: "artists",
    items: r##"art[].{"id": artistid, "name": "#text"}"##,
    ttl: DAY,
};

const ALBUMS: Listing<'static> = Listing {
    path: "Albums",
    root: "albums",
    items: r#"album[].{"id": albumid, "title": title, "artist": art, "tracks": tracks, "quality": quality, "date": date}"#,
    ttl: DAY,
};

const SONGS: Listing<'static> = Listing {
    path: "Songs",
    root: "songs",
    items: r#"song[].{"id": songid, "title": title, "artist": art, "quality": quality, "time": time}"#,
    ttl: DAY,
};

const TRACKS_EXPR: &str = r#"songs.album.song[].{"track": track, "title": title, "artist": art, "album": alb, "quality": quality, "duration": time, "date": date}"#;

/// Search and enqueue on one streaming service.
pub struct OnlineService<'a> {
    query: DeviceQueryClient<'a>,
    service: &'a str,
}

impl<'a> OnlineService<'a> {
    #[must_use]
    pub fn new(query: DeviceQueryClient<'a>, service: &'a str) -> Self {
        Self { query, service }
    }

    #[must_use]
    pub fn service(&self) -> &str {
        self.service
    }

    fn collect<T: DeserializeOwned>(
        &self,
        listing: &Listing<'_>,
        params: &[(&str, &str)],
        ttl: Duration,
    ) -> Result<Vec<T>, DeviceError> {
        let items_expr = PathExpr::compile(listing.items).map_err(|e| DeviceError::BadExpression {
            expr: listing.items.to_string(),
            reason: e.to_string(),
        })?;

        let mut path = listing.path.to_string();
        let mut owned: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mut items: Vec<Value> = Vec::new();

        for page in 0..MAX_PAGES {
            let root = match self
                .query
                .query_with_ttl(&path, &borrow_params(&owned), listing.root, ttl)
            {
                Ok(root) => root,
                Err(e) if e.is_not_found() => break,
                Err(e) => return Err(e),
            };

            if let Some(Value::Array(found)) = items_expr.search(&root) {
                debug!("{} page {page}: {} items", listing.path, found.len());
                items.extend(found);
            }

            match root.get("nextlink").and_then(Value::as_str) {
                Some(next) if !next.is_empty() => (path, owned) = split_link(next),
                _ => break,
            }
            if page + 1 == MAX_PAGES {
                warn!("Stopped {} listing after {MAX_PAGES} pages", listing.path);
            }
        }

        serde_json::from_value(Value::Array(items)).map_err(|e| DeviceError::MalformedResponse {
            endpoint: listing.path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Artists matching `keyword`.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures. No match is an empty list.
    pub fn search_artists(&self, keyword: &str) -> Result<Vec<Artist>, DeviceError> {
        let expr = quoted(keyword);
        self.collect(&ARTISTS, &[("service", self.service), ("expr", expr.as_str())], ARTISTS.ttl)
    }

    /// Favourite artists, most recently added first.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures.
    pub fn favourite_artists(&self) -> Result<Vec<Artist>, DeviceError> {
        self.collect(
            &ARTISTS,
            &[("service", self.service), ("category", "FAVOURITES"), ("sort", "recent")],
            ARTISTS.ttl,
        )
    }

    /// All albums of one artist.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures.
    pub fn artist_albums(&self, artist_id: &str) -> Result<Vec<Album>, DeviceError> {
        self.collect(&ALBUMS, &[("service", self.service), ("artistid", artist_id)], ALBUMS.ttl)
    }

    /// Albums matching `keyword`.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures.
    pub fn search_albums(&self, keyword: &str) -> Result<Vec<Album>, DeviceError> {
        let expr = quoted(keyword);
        self.collect(&ALBUMS, &[("service", self.service), ("expr", expr.as_str())], 7 * DAY)
    }

    /// Songs matching `keyword`.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures.
    pub fn search_songs(&self, keyword: &str) -> Result<Vec<OnlineSong>, DeviceError> {
        let expr = quoted(keyword);
        self.collect(&SONGS, &[("service", self.service), ("expr", expr.as_str())], 7 * DAY)
    }

    /// Track list of one album.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures.
    pub fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>, DeviceError> {
        let value = match self.query.query_with_ttl(
            "Songs",
            &[("service", self.service), ("albumid", album_id)],
            TRACKS_EXPR,
            30 * DAY,
        ) {
            Ok(value) => value,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        serde_json::from_value(value).map_err(|e| DeviceError::MalformedResponse {
            endpoint: "Songs".to_string(),
            reason: e.to_string(),
        })
    }

    /// Plain-text artist biography, cut to [`INFO_LINES`] lines.
    ///
    /// # Errors
    ///
    /// Transport failures.
    pub fn artist_info(&self, artist_id: &str) -> Result<String, DeviceError> {
        let body = self.query.query_text_with_ttl(
            "Info",
            &[("service", self.service), ("artistid", artist_id)],
            30 * DAY,
        )?;
        Ok(truncate_lines(&html_to_text(&body), INFO_LINES))
    }

    /// Append an album to the end of the queue.
    ///
    /// # Errors
    ///
    /// Transport failures.
    pub fn add_album(&self, control: &DeviceControlClient<'_>, album_id: &str) -> Result<(), DeviceError> {
        control.add(&[
            ("service", self.service),
            ("albumid", album_id),
            ("playnow", "-1"),
            ("where", "last"),
        ])
    }

    /// Append a single song to the end of the queue.
    ///
    /// # Errors
    ///
    /// Transport failures.
    pub fn add_song(&self, control: &DeviceControlClient<'_>, song: &OnlineSong) -> Result<(), DeviceError> {
        control.add(&[
            ("service", self.service),
            ("songid", song.add_id()),
            ("playnow", "-1"),
            ("where", "last"),
        ])
    }
}

/// Search expressions are sent as quoted phrases.
fn quoted(keyword: &str) -> String {
    format!("\"{}\"", keyword.trim())
}

/// The album with the greatest `date`.
#[must_use]
pub fn latest(albums: &[Album]) -> Option<&Album> {
    albums.iter().max_by(|a, b| a.date.cmp(&b.date))
}

/// Best album for an artist/title recommendation: the first whose artist
/// matches, else the first result.
#[must_use]
pub fn best_match<'a>(albums: &'a [Album], artist: &str) -> Option<&'a Album> {
    albums
        .iter()
        .find(|album| album.artist_matches(artist))
        .or_else(|| albums.first())
}

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "br", "div", "li", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "section",
];

/// Visible text of an HTML fragment, one block per line.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_fragment(html);
    let mut raw = String::new();

    for node in document.root_element().descendants() {
        match node.value() {
            Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => raw.push('\n'),
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|parent| parent.value().as_element().map(|e| matches!(e.name(), "script" | "style")))
                    .unwrap_or(false);
                if !hidden {
                    raw.push_str(text);
                }
            }
            _ => {}
        }
    }

    let mut lines: Vec<String> = Vec::new();
    for line in raw.lines().map(|line| line.split_whitespace().collect::<Vec<_>>().join(" ")) {
        if line.is_empty() && lines.last().map_or(true, String::is_empty) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines.join("\n")
}

/// First `max` lines of `text`, with a `...` marker when anything was cut.
#[must_use]
pub fn truncate_lines(text: &str, max: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max {
        return text.to_string();
    }
    format!("{}\n...\n", lines[..max].join("\n"))
}
