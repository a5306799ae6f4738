//! Property storage. The web layer only sees [`PropertyStore`]; the `.xlsx`
//! directory is one backend and an in-memory map is another.

mod memory;
pub mod sample;
mod workbook;
mod xlsx;

pub use memory::MemoryStore;
pub use xlsx::XlsxStore;

use super::models::{CellEdit, PropertyRecord, SaveReceipt};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("property {0:?} not found")]
    NotFound(String),
    #[error("could not read property {id:?}: {reason}")]
    ReadError { id: String, reason: String },
    #[error("could not save property {id:?}: {reason}")]
    WriteError { id: String, reason: String },
}

impl StoreError {
    pub fn read(id: &str, reason: impl ToString) -> Self {
        StoreError::ReadError {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn write(id: &str, reason: impl ToString) -> Self {
        StoreError::WriteError {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Property identifiers in discovery order. An empty store is not an
    /// error.
    async fn list_properties(&self) -> Result<Vec<String>, StoreError>;

    async fn load_property(&self, id: &str)
        -> Result<PropertyRecord, StoreError>;

    /// Take a backup of the current state, then write `edits` into their
    /// cells. When the backup cannot be taken nothing is written.
    async fn save_property(
        &self,
        id: &str,
        edits: &[CellEdit],
    ) -> Result<SaveReceipt, StoreError>;
}

/// A property id is a bare file stem: no path separators, no parent
/// references, nothing that would resolve outside the property directory.
pub fn is_valid_id(id: &str) -> bool {
    static ID_RE: OnceLock<Regex> = OnceLock::new();
    let re = ID_RE.get_or_init(|| {
        Regex::new(r#"^[^/\\:*?"<>|\x00-\x1f]+$"#)
            .expect("property id pattern compiles")
    });
    re.is_match(id)
        && !id.starts_with('.')
        && !id.starts_with('~')
        && !id.contains("..")
}
