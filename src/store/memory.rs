use super::{is_valid_id, PropertyStore, StoreError};
use crate::{
    layout,
    models::{CellEdit, PropertyRecord, SaveReceipt},
    sheet::Sheet,
};
use async_trait::async_trait;
use chrono::Local;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Snapshots are kept for the life of the process; nothing reads them back
/// outside of tests.
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Clone, Debug)]
pub struct Backup {
    pub id: String,
    pub name: String,
    pub sheet: Sheet,
}

/// Snapshots kept per property; older ones are dropped.
const MAX_BACKUPS_PER_PROPERTY: usize = 20;

/// Sheets held in memory, in insertion order. Every save snapshots the
/// previous sheet into `backups` first; only the latest
/// `MAX_BACKUPS_PER_PROPERTY` snapshots of each property are kept.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: RwLock<Vec<(String, Sheet)>>,
    backups: RwLock<Vec<Backup>>,
    saves: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: &str, sheet: Sheet) {
        let mut sheets = self.sheets.write().await;
        match sheets.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, s)) => *s = sheet,
            None => sheets.push((id.to_string(), sheet)),
        }
    }

    pub async fn sheet(&self, id: &str) -> Option<Sheet> {
        self.sheets
            .read()
            .await
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, s)| s.clone())
    }

    #[cfg(test)]
    pub async fn backups(&self, id: &str) -> Vec<Backup> {
        self.backups
            .read()
            .await
            .iter()
            .filter(|b| b.id == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PropertyStore for MemoryStore {
    async fn list_properties(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .sheets
            .read()
            .await
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn load_property(
        &self,
        id: &str,
    ) -> Result<PropertyRecord, StoreError> {
        self.sheet(id)
            .await
            .map(|sheet| layout::extract_record(id, &sheet))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save_property(
        &self,
        id: &str,
        edits: &[CellEdit],
    ) -> Result<SaveReceipt, StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let mut sheets = self.sheets.write().await;
        let (_, sheet) = sheets
            .iter_mut()
            .find(|(existing, _)| existing == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut backups = self.backups.write().await;
        let name = format!(
            "{id}_{}_{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            self.saves.fetch_add(1, Ordering::Relaxed)
        );
        backups.push(Backup {
            id: id.to_string(),
            name: name.clone(),
            sheet: sheet.clone(),
        });
        let kept = backups.iter().filter(|b| b.id == id).count();
        if kept > MAX_BACKUPS_PER_PROPERTY {
            if let Some(oldest) = backups.iter().position(|b| b.id == id) {
                backups.remove(oldest);
            }
        }

        let changed = layout::apply_edits(sheet, edits);
        tracing::info!(id, changed, backup = %name, "property saved in memory");
        Ok(SaveReceipt { backup: name })
    }
}
