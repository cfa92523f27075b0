//! # Album Recommendations
//!
//! Asks a chat-completion model for albums similar to the one playing and
//! explains the picks afterwards.
//!
//! ## Flow
//!
//! 1. [`build_prompt`] turns the current artist/album and the genre exclusions
//!    into a request for `Band - Album` lines
//! 2. A [`Recommender`] answers with free text
//! 3. [`parse_candidates`] pulls the pairs out, dropping list numbering and
//!    trailing parentheticals
//! 4. [`RecommendationService`] caches answers by prompt, so asking twice
//!    about the same album costs one request
//!
//! Any OpenAI-compatible endpoint works; set `base_url` in the keys file to
//! use another provider.

use crate::cache::{Fingerprint, ResultCache, DEFAULT_TTL};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-5-2025-08-07";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Genres left out of recommendations unless configured otherwise.
pub const DEFAULT_EXCLUDE: &[&str] = &["Rap", "Hip-Hop"];

const MAX_COMPLETION_TOKENS: u32 = 5000;

lazy_static! {
    static ref NUMBERING: Regex = Regex::new(r"^\d+\.\s*").expect("valid numbering pattern");
    static ref PAIR: Regex =
        Regex::new(r"^(.+?)\s*-\s*(.+?)(?:\s*\(.*\))?$").expect("valid pair pattern");
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no API key configured; set OPENAI_API_KEY or add \"api_key\" to the keys file")]
    MissingKey,
    #[error("request to the recommendation provider failed: {0}")]
    Request(String),
    #[error("recommendation provider answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("recommendation provider returned an empty answer")]
    Empty,
}

/// A recommended album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub artist: String,
    pub album: String,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.album)
    }
}

/// Something that answers a prompt with text.
pub trait Recommender {
    /// # Errors
    ///
    /// [`ProviderError`] for transport, HTTP or empty answers.
    fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Chat-completions client for OpenAI-compatible APIs.
pub struct OpenAiRecommender {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_completion_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiRecommender {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(api_key: &str, model: &str, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to create HTTP client: {e}"))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

impl Recommender for OpenAiRecommender {
    fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {url} model={}", self.model);

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_completion_tokens: MAX_COMPLETION_TOKENS,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let answer: ChatResponse = response
            .json()
            .map_err(|e| ProviderError::Request(format!("invalid response body: {e}")))?;
        answer
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ProviderError::Empty)
    }
}

/// Prompt asking for five similar albums, one `Band - Album` per line.
#[must_use]
pub fn build_prompt(artist: &str, album: &str, exclude: &[String]) -> String {
    let mut prompt = format!(
        "Can you provide a list of 5 bands that are similar in musical style to {artist} \
         (specifically their album '{album}'), or that share band members, producers, \
         or other key collaborators with them? "
    );
    if !exclude.is_empty() {
        prompt.push_str(&format!("Exclude any {} artists. ", exclude.join(" or ")));
    }
    prompt.push_str(
        "For each band, please include a notable album or release. \
         Format your response as: Band Name - Album Name (one per line). \
         Nothing more in response, just the list of bands and albums.",
    );
    prompt
}

/// Prompt for a short explanation of the whole set.
#[must_use]
pub fn general_prompt(artist: &str, album: &str, candidates: &[Candidate]) -> String {
    let list = candidates
        .iter()
        .map(|c| format!("{} ({})", c.artist, c.album))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "I was listening to '{album}' by {artist} and got these music recommendations: {list}. \
         Provide a brief 2-3 sentence explanation of the overall musical connections and themes \
         that link these recommendations to {artist}'s '{album}'. Focus on musical style, era, \
         influences, or collaborative connections."
    )
}

/// Prompt for a short explanation of one pick.
#[must_use]
pub fn specific_prompt(artist: &str, album: &str, candidate: &Candidate) -> String {
    format!(
        "Explain in 1-2 sentences why '{}' by {} was recommended based on '{album}' by {artist}. \
         Focus on specific musical connections, shared members, producers, similar sound, era, \
         or influence relationships.",
        candidate.album, candidate.artist
    )
}

/// Extract `Band - Album` pairs from a model answer.
#[must_use]
pub fn parse_candidates(text: &str) -> Vec<Candidate> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let line = NUMBERING.replace(line, "");
            let captures = PAIR.captures(&line)?;
            Some(Candidate {
                artist: captures[1].trim().to_string(),
                album: captures[2].trim().to_string(),
            })
        })
        .collect()
}

/// Answer from the model together with the pairs found in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendations {
    pub text: String,
    pub candidates: Vec<Candidate>,
}

/// Cached access to a [`Recommender`].
pub struct RecommendationService<'a> {
    recommender: &'a dyn Recommender,
    cache: &'a ResultCache,
    ttl: Duration,
}

impl<'a> RecommendationService<'a> {
    #[must_use]
    pub fn new(recommender: &'a dyn Recommender, cache: &'a ResultCache) -> Self {
        Self {
            recommender,
            cache,
            ttl: DEFAULT_TTL,
        }
    }

    fn ask(&self, kind: &str, prompt: &str) -> Result<String, ProviderError> {
        let fingerprint = Fingerprint::of_text(kind, prompt);
        self.cache
            .get_or_compute(&fingerprint, self.ttl, || self.recommender.complete(prompt))
    }

    /// # Errors
    ///
    /// [`ProviderError`] from the recommender.
    pub fn recommend(&self, artist: &str, album: &str, exclude: &[String]) -> Result<Recommendations, ProviderError> {
        let text = self.ask("recommend", &build_prompt(artist, album, exclude))?;
        let candidates = parse_candidates(&text);
        Ok(Recommendations { text, candidates })
    }

    /// # Errors
    ///
    /// [`ProviderError`] from the recommender.
    pub fn explain_all(&self, artist: &str, album: &str, candidates: &[Candidate]) -> Result<String, ProviderError> {
        self.ask("explain", &general_prompt(artist, album, candidates))
    }

    /// # Errors
    ///
    /// [`ProviderError`] from the recommender.
    pub fn explain_one(&self, artist: &str, album: &str, candidate: &Candidate) -> Result<String, ProviderError> {
        self.ask("explain", &specific_prompt(artist, album, candidate))
    }
}
