//! # Play Queue
//!
//! The player calls its queue a "playlist": an ordered list of songs, each
//! with a position id and the id of the album it came from. This module
//! decodes it and implements the queue-level commands on top of the device
//! clients.
//!
//! ## Operations
//!
//! - **Overview**: albums up to the current one, plus the now-playing line
//! - **Next album**: first song after the current one from a different album
//! - **Cleanup**: drop played songs, clear everything, or remove one album
//!
//! The queue changes under our feet (every delete shifts positions), so it is
//! always read live and re-read after each destructive step.

use crate::device::{DeviceControlClient, DeviceQueryClient};
use crate::song::Status;
use crate::transport::DeviceError;
use crate::xml::lenient_string;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::fmt;

const PLAYLIST_EXPR: &str =
    r#"playlist.song[].{"id": id, "artist": art, "album": alb, "title": title, "album_id": albumid}"#;

/// One queue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSong {
    /// Position id, as used by `Play` and reported as `song` in the status
    pub id: u32,
    pub artist: String,
    pub album: String,
    pub title: String,
    pub album_id: u64,
}

impl fmt::Display for PlaylistSong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>3}: {} - {}: {}", self.id, self.artist, self.album, self.title)
    }
}

#[derive(Deserialize)]
struct RawSong {
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    artist: String,
    #[serde(default, deserialize_with = "lenient_string")]
    album: String,
    #[serde(default, deserialize_with = "lenient_string")]
    title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    album_id: String,
}

/// An album as it appears in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedAlbum {
    pub artist: String,
    pub album: String,
    pub album_id: u64,
    pub songs: usize,
    /// Position id of the album's first song in the queue
    pub first_id: u32,
}

impl QueuedAlbum {
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} - {} ({} songs)", self.artist, self.album, self.songs)
    }
}

/// The whole queue, in play order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    pub songs: Vec<PlaylistSong>,
}

impl Playlist {
    /// Read the queue from the player. An empty queue is not an error.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures.
    pub fn fetch(query: &DeviceQueryClient<'_>) -> Result<Self, DeviceError> {
        let value = match query.live("Playlist", &[], PLAYLIST_EXPR) {
            Ok(value) => value,
            Err(e) if e.is_not_found() => return Ok(Self::default()),
            Err(e) => return Err(e),
        };

        let raw: Vec<RawSong> = serde_json::from_value(value).map_err(|e| DeviceError::MalformedResponse {
            endpoint: "Playlist".to_string(),
            reason: e.to_string(),
        })?;

        let songs = raw
            .into_iter()
            .filter_map(|song| {
                let id = song.id.trim().parse().ok()?;
                Some(PlaylistSong {
                    id,
                    artist: song.artist,
                    album: song.album,
                    title: song.title,
                    album_id: song.album_id.trim().parse().unwrap_or(0),
                })
            })
            .collect();

        Ok(Self { songs })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Distinct albums in order of first appearance.
    #[must_use]
    pub fn albums(&self) -> Vec<QueuedAlbum> {
        let mut albums: Vec<QueuedAlbum> = Vec::new();
        for song in &self.songs {
            match albums.iter_mut().find(|a| {
                a.album_id == song.album_id && a.artist == song.artist && a.album == song.album
            }) {
                Some(album) => album.songs += 1,
                None => albums.push(QueuedAlbum {
                    artist: song.artist.clone(),
                    album: song.album.clone(),
                    album_id: song.album_id,
                    songs: 1,
                    first_id: song.id,
                }),
            }
        }
        albums
    }

    /// Albums shown in the queue overview: all of them, except that the
    /// playing album is left out when its first song comes after `current`.
    #[must_use]
    pub fn overview_albums(&self, current: u32, artist: &str, album: &str) -> Vec<QueuedAlbum> {
        self.albums()
            .into_iter()
            .filter(|queued| {
                !(queued.artist == artist && queued.album == album && queued.first_id > current)
            })
            .collect()
    }

    /// First song after `current` that belongs to another album, wrapping to
    /// the start of the queue when the current album is the last one.
    #[must_use]
    pub fn next_album_song(&self, current: u32) -> Option<&PlaylistSong> {
        let index = self.songs.iter().position(|song| song.id == current)?;
        let album = &self.songs[index].album;
        self.songs[index + 1..]
            .iter()
            .find(|song| &song.album != album)
            .or_else(|| self.songs.first())
    }

    /// Position of the first song of album `album_id`.
    #[must_use]
    pub fn position_of_album(&self, album_id: u64) -> Option<usize> {
        self.songs.iter().position(|song| song.album_id == album_id)
    }
}

/// Queue overview lines: one per queued album, then the now-playing line.
#[must_use]
pub fn overview(playlist: &Playlist, status: &Status) -> Vec<String> {
    let current = status.song_id.unwrap_or(0);
    let mut lines = Vec::new();
    let mut playing_album = 0;

    let albums = playlist.overview_albums(current, &status.artist, &status.album);
    for (number, album) in albums.iter().enumerate() {
        let number = number + 1;
        let is_current = album.artist == status.artist && album.album == status.album;
        let id = if is_current {
            playing_album = number;
            current
        } else {
            album.first_id
        };
        let marker = if is_current { '>' } else { ' ' };
        lines.push(format!("{marker}{number:02}/{id:03} {} - {}", album.artist, album.album));
    }

    lines.push(format!(
        "Playing Album No. {playing_album} Song No. {current} {}: {} - {}{}",
        status.album,
        status.title,
        status.artist,
        status.progress().unwrap_or_default()
    ));
    lines
}

/// Skip to the first song of the next album. Returns the song jumped to.
///
/// # Errors
///
/// Fails if nothing is playing or the player cannot be reached.
pub fn next_album(query: &DeviceQueryClient<'_>, control: &DeviceControlClient<'_>) -> Result<Option<PlaylistSong>> {
    let status = query.status().context("Failed to read player status")?;
    let current = status.song_id.context("Nothing is playing")?;
    let playlist = Playlist::fetch(query).context("Failed to read the queue")?;

    let Some(next) = playlist.next_album_song(current).cloned() else {
        return Ok(None);
    };
    control
        .play_id(next.id)
        .with_context(|| format!("Failed to play song {}", next.id))?;
    Ok(Some(next))
}

/// Delete songs from the head of the queue until the current song is first.
/// Returns how many were removed.
///
/// # Errors
///
/// Fails if the player cannot be reached.
pub fn cleanup_played(query: &DeviceQueryClient<'_>, control: &DeviceControlClient<'_>) -> Result<usize> {
    let played = query.status().context("Failed to read player status")?.song_id.unwrap_or(0);
    let mut removed = 0;

    // Each delete moves the current song up by one; the limit guards against a
    // player that reports positions we do not expect.
    while removed <= played as usize {
        let current = query.status().context("Failed to read player status")?.song_id.unwrap_or(0);
        if current == 0 {
            break;
        }
        debug!("Deleting queue head, current song at {current}");
        control.delete(0).context("Failed to delete queue entry")?;
        removed += 1;
    }

    if removed > played as usize {
        warn!("Stopped cleanup after {removed} deletions");
    }
    Ok(removed)
}

/// Remove every song of album `album_id` from the queue. Returns how many
/// songs were removed.
///
/// # Errors
///
/// Fails if the player cannot be reached.
pub fn remove_album(query: &DeviceQueryClient<'_>, control: &DeviceControlClient<'_>, album_id: u64) -> Result<usize> {
    let limit = Playlist::fetch(query).context("Failed to read the queue")?.songs.len();
    let mut removed = 0;

    while removed < limit {
        let playlist = Playlist::fetch(query).context("Failed to read the queue")?;
        let Some(position) = playlist.position_of_album(album_id) else {
            break;
        };
        control
            .delete(position)
            .with_context(|| format!("Failed to delete queue entry {position}"))?;
        removed += 1;
    }
    Ok(removed)
}
