//! Cart persistence port.
//!
//! Carts are stored as a JSON array of line items, the same document the
//! storefront keeps in browser local storage. Loading never fails: entries that
//! don't look like line items are filtered out and unreadable documents are
//! discarded.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use crate::domain::aggregates::cart::LineItem;

pub trait CartStorage {
    fn load(&self) -> Vec<LineItem>;
    fn save(&self, items: &[LineItem]);
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Malformed cart document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Cart document is not an array")]
    NotAnArray,

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Decodes a stored cart, keeping only plausible line items.
pub fn decode_items(raw: &str) -> Result<Vec<LineItem>, StorageError> {
    let Value::Array(entries) = serde_json::from_str::<Value>(raw)? else {
        return Err(StorageError::NotAnArray);
    };
    let total = entries.len();
    let items: Vec<LineItem> = entries.into_iter()
        .filter(is_plausible_entry)
        .filter_map(|entry| match serde_json::from_value::<LineItem>(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable cart entry");
                None
            }
        })
        .collect();
    if items.len() < total {
        tracing::info!(kept = items.len(), dropped = total - items.len(), "filtered stored cart");
    }
    Ok(items)
}

pub fn encode_items(items: &[LineItem]) -> Result<String, StorageError> {
    Ok(serde_json::to_string(items)?)
}

fn is_plausible_entry(entry: &Value) -> bool {
    let positive_quantity = entry.get("quantity").and_then(Value::as_f64).is_some_and(|q| q > 0.0);
    let non_empty = |field: &str| entry.get(field).and_then(Value::as_str).is_some_and(|s| !s.is_empty());
    positive_quantity && non_empty("id") && non_empty("productId")
}

/// Stores one cart per JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn write(&self, items: &[LineItem]) -> Result<(), StorageError> {
        let body = encode_items(items)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CartStorage for JsonFileStorage {
    fn load(&self) -> Vec<LineItem> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return vec![],
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "failed to read cart");
                return vec![];
            }
        };
        match decode_items(&raw) {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "discarding unreadable cart");
                if let Err(e) = fs::remove_file(&self.path) {
                    tracing::warn!(path = %self.path.display(), error = %e, "failed to remove unreadable cart");
                }
                vec![]
            }
        }
    }

    fn save(&self, items: &[LineItem]) {
        if let Err(e) = self.write(items) {
            tracing::error!(path = %self.path.display(), error = %e, "failed to save cart");
        }
    }
}

/// In-memory storage holding the encoded document.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn with_raw(raw: impl Into<String>) -> Self { Self { slot: Mutex::new(Some(raw.into())) } }

    /// The stored document, if anything was ever written.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self) -> Vec<LineItem> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        let Some(raw) = slot.as_deref() else { return vec![] };
        match decode_items(raw) {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(error = %e, "discarding unreadable cart");
                *slot = None;
                vec![]
            }
        }
    }

    fn save(&self, items: &[LineItem]) {
        match encode_items(items) {
            Ok(raw) => *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(raw),
            Err(e) => tracing::error!(error = %e, "failed to save cart"),
        }
    }
}
