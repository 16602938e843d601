//! Persisted order manager records.
//!
//! An [`OrderManagerConfig`] is the opaque blob a persistence backend stores
//! for one `(family, category)` ordering domain. Backends address records by
//! [`persistence_key`].

use serde::{Deserialize, Serialize};

use crate::category::OrderCategory;

/// Separator between family and category id in persistence keys.
pub const KEY_SEPARATOR: &str = "::";

/// Builds the backend key for a family and category id: `family::categoryId`.
#[must_use]
pub fn persistence_key(family: &str, category_id: &str) -> String {
    format!("{family}{KEY_SEPARATOR}{category_id}")
}

/// A participant id and the order value it held when persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantOrder {
    pub id: String,
    pub order: i32,
}

/// Persisted state of one order manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderManagerConfig {
    pub family: String,
    pub category: OrderCategory,
    /// Ascending by order when produced by a manager; not guaranteed for
    /// records written elsewhere.
    #[serde(default)]
    pub participants: Vec<ParticipantOrder>,
}

impl OrderManagerConfig {
    #[must_use]
    pub fn new(
        family: impl Into<String>,
        category: OrderCategory,
        participants: Vec<ParticipantOrder>,
    ) -> Self {
        Self {
            family: family.into(),
            category,
            participants,
        }
    }

    /// Backend key this record is stored under.
    #[must_use]
    pub fn persistence_key(&self) -> String {
        persistence_key(&self.family, self.category.id())
    }

    /// Encodes the record as `MsgPack` (named fields).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_msgpack(&self) -> anyhow::Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decodes a record previously produced by [`to_msgpack`](Self::to_msgpack).
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a valid encoded record.
    pub fn from_msgpack(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Converts the record to a JSON value for text-based backends.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reads a record from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not describe a record.
    pub fn from_json(value: serde_json::Value) -> anyhow::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
