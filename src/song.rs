use crate::volume::clamp_level;
use crate::xml::lenient_string;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// What the player reports as now playing, decoded from `/Status`.
///
/// The player sends everything as text and omits fields freely (an idle
/// player has no `song`, a radio stream has no `totlen`), so numeric fields
/// are optional and unparseable numbers count as absent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Status {
    /// Queue position of the current song.
    pub song_id: Option<u32>,
    pub artist: String,
    pub album: String,
    pub title: String,
    /// Elapsed seconds.
    pub secs: Option<u32>,
    /// Song length in seconds.
    pub totlen: Option<u32>,
    pub volume: Option<u8>,
    /// `play`, `pause`, `stop`, `stream`, ...
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    #[serde(default, deserialize_with = "lenient_string")]
    song: String,
    #[serde(default, deserialize_with = "lenient_string")]
    artist: String,
    #[serde(default, deserialize_with = "lenient_string")]
    album: String,
    #[serde(default, deserialize_with = "lenient_string")]
    name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    secs: String,
    #[serde(default, deserialize_with = "lenient_string")]
    totlen: String,
    #[serde(default, deserialize_with = "lenient_string")]
    volume: String,
    #[serde(default, deserialize_with = "lenient_string")]
    state: String,
}

fn number<T: FromStr>(text: &str) -> Option<T> {
    text.trim().parse().ok()
}

impl TryFrom<Value> for Status {
    type Error = serde_json::Error;

    /// Build from the `status` element of a decoded response.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let raw: RawStatus = serde_json::from_value(value)?;
        Ok(Self {
            song_id: number(&raw.song),
            artist: raw.artist,
            album: raw.album,
            title: raw.name,
            secs: number(&raw.secs),
            totlen: number(&raw.totlen),
            volume: number::<i64>(&raw.volume).map(clamp_level),
            state: raw.state,
        })
    }
}

impl Status {
    /// Whether artist and album are both known.
    #[must_use]
    pub fn has_album(&self) -> bool {
        !self.artist.is_empty() && !self.album.is_empty()
    }

    /// ` [1:35 / 9:22 (16%)]`, or `None` without timing information.
    #[must_use]
    pub fn progress(&self) -> Option<String> {
        let (secs, totlen) = (self.secs?, self.totlen?);
        let percent = if totlen > 0 {
            u64::from(secs) * 100 / u64::from(totlen)
        } else {
            0
        };
        Some(format!(
            " [{} / {} ({percent}%)]",
            format_time(secs),
            format_time(totlen)
        ))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.song_id {
            Some(id) => write!(f, "{id}: {} - {} - {}", self.artist, self.album, self.title),
            None => write!(f, "{} - {} - {}", self.artist, self.album, self.title),
        }
    }
}

/// Seconds as `M:SS`.
#[must_use]
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
