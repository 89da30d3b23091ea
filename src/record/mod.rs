//! Typed view over raw records returned by the cluster API.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::kind::ResourceKind;

/// Errors raised when a raw record lacks the fields the janitor relies on.
///
/// A conformant API never produces these; they abort the current drain.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RecordError {
    /// A required field is absent or empty.
    #[error("malformed {kind} record: missing {field}")]
    Malformed {
        /// Kind of the offending record.
        kind: ResourceKind,
        /// Dotted path of the missing field.
        field: String,
    },
    /// The entry does not have the shape of an API object.
    #[error("malformed {kind} record: {message}")]
    InvalidShape {
        /// Kind of the offending record.
        kind: ResourceKind,
        /// Decoder message.
        message: String,
    },
}

#[derive(Deserialize)]
struct RecordView {
    #[serde(default)]
    metadata: Option<MetadataView>,
    #[serde(default, rename = "type")]
    record_type: Option<String>,
}

#[derive(Deserialize)]
struct MetadataView {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
}

/// Immutable snapshot of one remote resource's observed state.
///
/// Identified by `(kind, name)`. Snapshots are never mutated locally; drains
/// fetch fresh ones on every iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectRecord {
    kind: ResourceKind,
    name: String,
    labels: BTreeMap<String, String>,
    record_type: Option<String>,
    raw: Value,
}

impl ObjectRecord {
    /// Wraps a raw API record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Malformed`] when `metadata.name` is absent or
    /// empty, and [`RecordError::InvalidShape`] when `raw` has the wrong shape.
    pub fn from_value(kind: ResourceKind, raw: Value) -> Result<Self, RecordError> {
        let view = RecordView::deserialize(&raw).map_err(|err| RecordError::InvalidShape {
            kind,
            message: err.to_string(),
        })?;
        let metadata = view.metadata.ok_or_else(|| RecordError::Malformed {
            kind,
            field: String::from("metadata"),
        })?;
        let name = metadata
            .name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RecordError::Malformed {
                kind,
                field: String::from("metadata.name"),
            })?;

        Ok(Self {
            kind,
            name,
            labels: metadata.labels.unwrap_or_default(),
            record_type: view.record_type,
            raw,
        })
    }

    /// Kind this record belongs to.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// `metadata.name`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `metadata.labels`; empty when the record carries none.
    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Value of a single label.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Secret `type` (for example `kubernetes.io/service-account-token`).
    ///
    /// Always `None` for kinds without a top-level `type` field.
    #[must_use]
    pub fn secret_type(&self) -> Option<&str> {
        match self.kind {
            ResourceKind::Secret => self.record_type.as_deref(),
            _ => None,
        }
    }

    /// The record exactly as returned by the API.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }
}
