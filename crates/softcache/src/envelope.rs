// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Storage representation of soft cache entries.
//!
//! A soft entry is persisted as a JSON object with exactly two keys: a reserved metadata marker
//! and the payload.
//!
//! ```json
//! { "__softcache": { "expiration": 150, "status": "loading" }, "data": "v1" }
//! ```
//!
//! Optional metadata fields are omitted while empty. Values stored without a time-to-live are
//! kept verbatim, so plain values and legacy entries share the same keyspace with soft entries.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Reserved key holding envelope metadata.
pub const MARKER: &str = "__softcache";

/// Key holding the payload of an envelope.
pub const DATA: &str = "data";

/// Refresh state of a soft entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No refresh is outstanding.
    #[default]
    Ok,
    /// A refresh task has been scheduled and has not yet stored a new value.
    Loading,
}

#[expect(clippy::trivially_copy_pass_by_ref, reason = "signature required by serde")]
fn is_zero(retries: &u32) -> bool {
    *retries == 0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration: Option<u64>,
    #[serde(default)]
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    task_args: Vec<Value>,
    #[serde(default, skip_serializing_if = "is_zero")]
    retries: u32,
}

/// A payload together with its expiration and refresh bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<V> {
    /// The cached payload.
    pub data: V,
    /// Unix seconds after which the payload is stale. `None` or `0` never expires.
    pub expiration: Option<u64>,
    /// Whether a refresh is outstanding.
    pub status: Status,
    /// Task invoked to refresh the payload. Falls back to [`default_task_id`] when unset.
    pub refresh_task_id: Option<String>,
    /// Arguments passed to the refresh task after the key.
    pub refresh_task_args: Vec<Value>,
    /// Number of stuck refreshes re-enqueued since the payload was last stored.
    pub retries: u32,
}

impl<V> Envelope<V> {
    /// Creates an envelope expiring at `expiration` with no refresh outstanding.
    #[must_use]
    pub fn new(data: V, expiration: Option<u64>) -> Self {
        Self {
            data,
            expiration,
            status: Status::Ok,
            refresh_task_id: None,
            refresh_task_args: Vec::new(),
            retries: 0,
        }
    }

    /// Returns `true` if the envelope has a non-zero expiration at or before `now`.
    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expiration.is_some_and(|at| at != 0 && at <= unix_seconds(now))
    }

    /// Returns the refresh task id, deriving it from `key` when none is stored.
    #[must_use]
    pub fn task_id(&self, key: &str) -> String {
        self.refresh_task_id.clone().unwrap_or_else(|| default_task_id(key))
    }

    /// Returns the full refresh task arguments: the key followed by the stored arguments.
    #[must_use]
    pub fn task_args(&self, key: &str) -> Vec<Value> {
        task_args(key, &self.refresh_task_args)
    }

    /// Replaces the payload, keeping the metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Envelope<U> {
        Envelope {
            data: f(self.data),
            expiration: self.expiration,
            status: self.status,
            refresh_task_id: self.refresh_task_id,
            refresh_task_args: self.refresh_task_args,
            retries: self.retries,
        }
    }

    fn split(self) -> (V, Meta) {
        let meta = Meta {
            expiration: self.expiration,
            status: self.status,
            task_id: self.refresh_task_id,
            task_args: self.refresh_task_args,
            retries: self.retries,
        };
        (self.data, meta)
    }

    fn join(data: V, meta: Meta) -> Self {
        Self {
            data,
            expiration: meta.expiration,
            status: meta.status,
            refresh_task_id: meta.task_id,
            refresh_task_args: meta.task_args,
            retries: meta.retries,
        }
    }
}

impl<V: Serialize> Envelope<V> {
    /// Encodes the envelope into its stored representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be represented as JSON.
    pub fn into_raw(self) -> Result<Value, serde_json::Error> {
        let (data, meta) = self.split();
        let mut object = Map::with_capacity(2);
        object.insert(MARKER.to_string(), serde_json::to_value(meta)?);
        object.insert(DATA.to_string(), serde_json::to_value(data)?);
        Ok(Value::Object(object))
    }
}

/// The result of [`wrap`]: either a verbatim value or an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Wrapped<V> {
    /// Stored as-is, without expiration semantics.
    Bare(V),
    /// Stored inside an envelope.
    Soft(Envelope<V>),
}

impl<V: Serialize> Wrapped<V> {
    /// Encodes the value into its stored representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn into_raw(self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Bare(value) => serde_json::to_value(value),
            Self::Soft(envelope) => envelope.into_raw(),
        }
    }
}

impl<V: DeserializeOwned> Wrapped<V> {
    /// Decodes a stored value, recognizing envelopes by their marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not deserialize as `V`.
    pub fn from_raw(raw: Value) -> Result<Self, serde_json::Error> {
        match split_raw(raw) {
            Ok((data, meta)) => Ok(Self::Soft(Envelope::join(serde_json::from_value(data)?, meta))),
            Err(raw) => serde_json::from_value(raw).map(Self::Bare),
        }
    }
}

fn split_raw(raw: Value) -> Result<(Value, Meta), Value> {
    let Value::Object(mut object) = raw else {
        return Err(raw);
    };

    let meta = match (object.len(), object.get(MARKER)) {
        (2, Some(marker)) if object.contains_key(DATA) => Meta::deserialize(marker).ok(),
        _ => None,
    };

    match (meta, object.remove(DATA)) {
        (Some(meta), Some(data)) => Ok((data, meta)),
        (_, data) => {
            if let Some(data) = data {
                object.insert(DATA.to_string(), data);
            }
            Err(Value::Object(object))
        }
    }
}

/// Wraps `value` for storage.
///
/// A zero `ttl` yields [`Wrapped::Bare`]. Otherwise the envelope expires `ttl` after `now`,
/// with sub-second remainders rounded up to the next whole second.
pub fn wrap<V>(value: V, ttl: Duration, now: SystemTime, task_id: Option<String>, task_args: Vec<Value>) -> Wrapped<V> {
    if ttl.is_zero() {
        return Wrapped::Bare(value);
    }

    let ttl_seconds = ttl.as_secs().saturating_add(u64::from(ttl.subsec_nanos() > 0));
    let mut envelope = Envelope::new(value, Some(unix_seconds(now).saturating_add(ttl_seconds)));
    envelope.refresh_task_id = task_id;
    envelope.refresh_task_args = task_args;
    Wrapped::Soft(envelope)
}

/// Returns `true` if `raw` is an envelope rather than an application value.
#[must_use]
pub fn is_envelope(raw: &Value) -> bool {
    let Value::Object(object) = raw else {
        return false;
    };

    object.len() == 2
        && object.contains_key(DATA)
        && object.get(MARKER).is_some_and(|marker| Meta::deserialize(marker).is_ok())
}

/// Returns `true` if `envelope` has a non-zero expiration at or before `now`.
#[must_use]
pub fn is_expired<V>(envelope: &Envelope<V>, now: SystemTime) -> bool {
    envelope.is_expired(now)
}

/// The task id used when an entry configures none.
#[must_use]
pub fn default_task_id(key: &str) -> String {
    format!("transient_refresh_{key}")
}

pub(crate) fn task_args(key: &str, extra: &[Value]) -> Vec<Value> {
    let mut args = Vec::with_capacity(extra.len() + 1);
    args.push(Value::String(key.to_string()));
    args.extend_from_slice(extra);
    args
}

/// Whole seconds since the unix epoch. Times before the epoch map to zero.
#[must_use]
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs())
}
