//! # Device Transport
//!
//! The player exposes a small HTTP API on port 11000: reads are `GET`
//! requests answered with XML, control commands are `POST`s with form
//! parameters. Everything above this module talks to the device through the
//! [`Transport`] trait so that tests can substitute a recording fake.
//!
//! ## Error Taxonomy
//!
//! [`DeviceError`] separates the failures a user cares about:
//!
//! - **TransportUnavailable**: connection refused, timeout, non-2xx status
//! - **MalformedResponse**: the body is not the XML we expected
//! - **PathNotFound**: the body parsed, but the requested field is absent
//!   (often simply "no results")
//! - **BadExpression**: a path expression failed to compile

use log::debug;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to, or understanding, the device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Cannot reach the player at {endpoint}: {reason}")]
    TransportUnavailable { endpoint: String, reason: String },

    #[error("The player sent a response for {endpoint} that could not be parsed: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("Nothing found at `{expr}` in the response for {endpoint}")]
    PathNotFound { endpoint: String, expr: String },

    #[error("Invalid path expression `{expr}`: {reason}")]
    BadExpression { expr: String, reason: String },
}

impl DeviceError {
    /// True when the device answered but had nothing at the requested path.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound { .. })
    }
}

/// GET/POST capability against the player.
pub trait Transport {
    /// Perform a read. `params` are sent as the query string.
    ///
    /// # Errors
    ///
    /// [`DeviceError::TransportUnavailable`] on connection or HTTP errors.
    fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<String, DeviceError>;

    /// Perform a control command. `params` are sent form-encoded.
    ///
    /// # Errors
    ///
    /// [`DeviceError::TransportUnavailable`] on connection or HTTP errors.
    fn post(&self, path: &str, params: &[(&str, &str)]) -> Result<String, DeviceError>;
}

/// `reqwest`-backed transport for a player at `http://host:port`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed (TLS backend missing).
    pub fn new(host: &str, port: u16, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to create HTTP client: {e}"))?;

        Ok(Self {
            base_url: format!("http://{host}:{port}"),
            client,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn finish(
        &self,
        endpoint: &str,
        result: reqwest::Result<reqwest::blocking::Response>,
    ) -> Result<String, DeviceError> {
        let unavailable = |reason: String| DeviceError::TransportUnavailable {
            endpoint: endpoint.to_string(),
            reason,
        };

        let response = result.map_err(|e| {
            if e.is_timeout() {
                unavailable("request timed out".to_string())
            } else {
                unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {status}")));
        }

        response
            .text()
            .map_err(|e| unavailable(format!("failed to read body: {e}")))
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<String, DeviceError> {
        let url = self.url(path);
        debug!("GET {url} {params:?}");
        let result = self.client.get(&url).query(params).send();
        self.finish(path, result)
    }

    fn post(&self, path: &str, params: &[(&str, &str)]) -> Result<String, DeviceError> {
        let url = self.url(path);
        debug!("POST {url} {params:?}");
        let result = self.client.post(&url).form(params).send();
        self.finish(path, result)
    }
}

/// Split a device-supplied relative link (`/Add?service=X&playnow=-1`) into
/// its path and decoded parameters.
#[must_use]
pub fn split_link(link: &str) -> (String, Vec<(String, String)>) {
    let link = link.trim_start_matches('/');
    match link.split_once('?') {
        Some((path, query)) => {
            let params = url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            (path.to_string(), params)
        }
        None => (link.to_string(), Vec::new()),
    }
}

/// Borrow owned parameter pairs in the shape [`Transport`] expects.
#[must_use]
pub fn borrow_params(params: &[(String, String)]) -> Vec<(&str, &str)> {
    params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}
