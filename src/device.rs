//! # Device Clients
//!
//! Two thin views over one [`Transport`]:
//!
//! - [`DeviceQueryClient`] answers read-only questions (`GET` + XML decode +
//!   path expression) and routes every one of them through the
//!   [`ResultCache`]. Fast-changing state such as the current status or the
//!   queue is read with a zero TTL, which bypasses the cache entirely.
//! - [`DeviceControlClient`] sends uncached commands (`POST` with form
//!   parameters) and owns the volume ramp.
//!
//! Both are `Copy` and borrow everything they use, so a dispatcher can build
//! fresh ones for every command without any setup cost.
//!
//! ## Logging
//!
//! Cache decisions are logged by the cache itself. Control commands are
//! logged at debug, ramp start at info and each ramp step at debug:
//!
//! ```bash
//! RUST_LOG=blue::device=debug blue volume 40
//! ```

use crate::cache::{Fingerprint, ResultCache, DEFAULT_TTL};
use crate::query_path::PathExpr;
use crate::song::Status;
use crate::transport::{borrow_params, split_link, DeviceError, Transport};
use crate::volume::{clamp_level, plan_ramp, RampConfig, VolumeChange, VolumeError};
use crate::xml;
use log::{debug, info};
use serde_json::Value;
use std::thread;
use std::time::Duration;

/// Expression slot used for raw-body cache entries; it never compiles, so it
/// cannot collide with a real query.
const RAW_BODY: &str = "#body";

/// Cached, read-only access to the player.
#[derive(Clone, Copy)]
pub struct DeviceQueryClient<'a> {
    transport: &'a dyn Transport,
    cache: &'a ResultCache,
    ttl: Duration,
}

impl<'a> DeviceQueryClient<'a> {
    #[must_use]
    pub fn new(transport: &'a dyn Transport, cache: &'a ResultCache) -> Self {
        Self {
            transport,
            cache,
            ttl: DEFAULT_TTL,
        }
    }

    /// Same client with a different default TTL.
    #[must_use]
    pub fn with_ttl(self, ttl: Duration) -> Self {
        Self { ttl, ..self }
    }

    /// `GET path?params`, decode, and return what `expr` selects.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::BadExpression`] before any network I/O
    /// - [`DeviceError::TransportUnavailable`] from the transport
    /// - [`DeviceError::MalformedResponse`] if the body is not XML
    /// - [`DeviceError::PathNotFound`] if `expr` selects nothing
    pub fn query(&self, path: &str, params: &[(&str, &str)], expr: &str) -> Result<Value, DeviceError> {
        self.query_with_ttl(path, params, expr, self.ttl)
    }

    /// [`query`](Self::query) with an explicit TTL for this call only.
    ///
    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub fn query_with_ttl(
        &self,
        path: &str,
        params: &[(&str, &str)],
        expr: &str,
        ttl: Duration,
    ) -> Result<Value, DeviceError> {
        let compiled = PathExpr::compile(expr).map_err(|e| DeviceError::BadExpression {
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;
        let fingerprint = Fingerprint::of_query(path, params, expr);
        self.cache
            .get_or_compute(&fingerprint, ttl, || self.fetch(path, params, &compiled))
    }

    /// Uncached query, for state that changes between two commands.
    ///
    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub fn live(&self, path: &str, params: &[(&str, &str)], expr: &str) -> Result<Value, DeviceError> {
        self.query_with_ttl(path, params, expr, Duration::ZERO)
    }

    /// Raw response body, cached like a query. For endpoints that answer with
    /// HTML or plain text.
    ///
    /// # Errors
    ///
    /// [`DeviceError::TransportUnavailable`] from the transport.
    pub fn query_text_with_ttl(
        &self,
        path: &str,
        params: &[(&str, &str)],
        ttl: Duration,
    ) -> Result<String, DeviceError> {
        let fingerprint = Fingerprint::of_query(path, params, RAW_BODY);
        self.cache
            .get_or_compute(&fingerprint, ttl, || self.transport.get(path, params))
    }

    fn fetch(&self, path: &str, params: &[(&str, &str)], expr: &PathExpr) -> Result<Value, DeviceError> {
        let body = self.transport.get(path, params)?;
        let document = xml::parse(&body).map_err(|e| DeviceError::MalformedResponse {
            endpoint: path.to_string(),
            reason: e.to_string(),
        })?;
        expr.search(&document).ok_or_else(|| DeviceError::PathNotFound {
            endpoint: path.to_string(),
            expr: expr.to_string(),
        })
    }

    /// Current now-playing status.
    ///
    /// # Errors
    ///
    /// Any [`DeviceError`]; a status that does not decode is
    /// [`DeviceError::MalformedResponse`].
    pub fn status(&self) -> Result<Status, DeviceError> {
        let value = self.live("Status", &[], "status")?;
        Status::try_from(value).map_err(|e| DeviceError::MalformedResponse {
            endpoint: "Status".to_string(),
            reason: e.to_string(),
        })
    }

    /// Current volume, clamped to `0..=100`.
    ///
    /// # Errors
    ///
    /// Any [`DeviceError`]; a non-numeric volume is
    /// [`DeviceError::MalformedResponse`].
    pub fn volume(&self) -> Result<u8, DeviceError> {
        let value = self.live("Status", &[], "status.volume")?;
        value
            .as_str()
            .and_then(|text| text.trim().parse::<i64>().ok())
            .map(clamp_level)
            .ok_or_else(|| DeviceError::MalformedResponse {
                endpoint: "Status".to_string(),
                reason: format!("volume is not a number: {value}"),
            })
    }
}

/// Uncached commands against the player.
#[derive(Clone, Copy)]
pub struct DeviceControlClient<'a> {
    transport: &'a dyn Transport,
    query: DeviceQueryClient<'a>,
    ramp: RampConfig,
}

impl<'a> DeviceControlClient<'a> {
    #[must_use]
    pub fn new(transport: &'a dyn Transport, query: DeviceQueryClient<'a>, ramp: RampConfig) -> Self {
        Self {
            transport,
            query,
            ramp,
        }
    }

    /// Send one command.
    ///
    /// # Errors
    ///
    /// [`DeviceError::TransportUnavailable`] from the transport.
    pub fn send(&self, path: &str, params: &[(&str, &str)]) -> Result<(), DeviceError> {
        debug!("control {path} {params:?}");
        self.transport.post(path, params).map(|_| ())
    }

    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn pause(&self) -> Result<(), DeviceError> {
        self.send("Pause", &[("toggle", "1")])
    }

    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn skip(&self) -> Result<(), DeviceError> {
        self.send("Skip", &[])
    }

    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn back(&self) -> Result<(), DeviceError> {
        self.send("Back", &[])
    }

    /// Jump to the queue entry with position id `id`.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn play_id(&self, id: u32) -> Result<(), DeviceError> {
        let id = id.to_string();
        self.send("Play", &[("id", id.as_str())])
    }

    /// Empty the whole queue.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn clear(&self) -> Result<(), DeviceError> {
        self.send("Clear", &[])
    }

    /// Remove the queue entry at `position`; later entries move up by one.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn delete(&self, position: usize) -> Result<(), DeviceError> {
        let position = position.to_string();
        self.send("Delete", &[("id", position.as_str())])
    }

    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn add(&self, params: &[(&str, &str)]) -> Result<(), DeviceError> {
        self.send("Add", params)
    }

    /// Send a device-supplied relative link such as a library `playURL`.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn follow_link(&self, link: &str) -> Result<(), DeviceError> {
        let (path, params) = split_link(link);
        self.send(&path, &borrow_params(&params))
    }

    /// Set the level in one call, without ramping.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn set_level(&self, level: u8) -> Result<(), DeviceError> {
        let level = level.min(100).to_string();
        self.send("Volume", &[("level", level.as_str())])
    }

    /// Move the volume to `target`, ramping large changes.
    ///
    /// The starting level is read live so a ramp never starts from a cached
    /// value. Levels are sent strictly in order and a failure stops the ramp
    /// where it is.
    ///
    /// # Errors
    ///
    /// - [`VolumeError::Device`] if nothing was changed
    /// - [`VolumeError::Interrupted`] with the last acknowledged level otherwise
    pub fn set_volume(&self, target: u8) -> Result<VolumeChange, VolumeError> {
        let from = self.query.volume().map_err(VolumeError::Device)?;
        let target = target.min(100);
        let levels = plan_ramp(from, target, &self.ramp);

        if levels.len() > 1 {
            info!("Ramping volume {from} -> {target} in {} steps", levels.len());
        }

        let mut reached: Option<u8> = None;
        for (i, &level) in levels.iter().enumerate() {
            if i > 0 && !self.ramp.pause.is_zero() {
                thread::sleep(self.ramp.pause);
            }
            debug!("volume step {level}");
            if let Err(source) = self.set_level(level) {
                return Err(match reached {
                    None => VolumeError::Device(source),
                    Some(reached) => VolumeError::Interrupted {
                        reached,
                        target,
                        source,
                    },
                });
            }
            reached = Some(level);
        }

        Ok(VolumeChange {
            from,
            to: target,
            steps: levels,
        })
    }
}
