// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The key/value persistence port.

use serde_json::Value;

use crate::Error;

/// Raw key/value persistence for soft cache entries.
///
/// Values are stored as [`serde_json::Value`] so a store can hold both bare application
/// values and enveloped soft entries without knowing which is which.
///
/// The boolean results follow the usual cache-store contract: `write` reports whether the
/// store accepted a change (a store that treats an identical write as a no-op returns
/// `false`), and `remove` reports whether something was deleted. An `Err` means the
/// backend could not be reached or failed outright.
pub trait Store: Send + Sync {
    /// Reads the raw value stored under `key`, or `None` when nothing is stored.
    fn read(&self, key: &str) -> impl Future<Output = Result<Option<Value>, Error>> + Send;

    /// Stores `raw` under `key`, replacing any previous value.
    fn write(&self, key: &str, raw: Value) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Removes the value stored under `key`.
    fn remove(&self, key: &str) -> impl Future<Output = Result<bool, Error>> + Send;
}
