//! One `.xlsx` file per property in a directory, with timestamped backups in
//! a sibling directory.

use super::{is_valid_id, workbook::Workbook, PropertyStore, StoreError};
use crate::{
    layout,
    models::{CellEdit, PropertyRecord, SaveReceipt},
};
use async_trait::async_trait;
use chrono::Local;
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

const EXTENSION: &str = "xlsx";

#[derive(Clone, Debug)]
pub struct XlsxStore {
    dir: PathBuf,
    backup_dir: PathBuf,
    sheet_name: String,
}

impl XlsxStore {
    pub fn new(
        dir: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        sheet_name: &str,
    ) -> Self {
        Self {
            dir: dir.into(),
            backup_dir: backup_dir.into(),
            sheet_name: sheet_name.to_string(),
        }
    }

    /// The workbook for `id`. Discovery accepts the extension in any case,
    /// so resolution does too: `Upper.XLSX` is property `Upper`.
    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let not_found = || StoreError::NotFound(id.to_string());
        if !is_valid_id(id) {
            return Err(not_found());
        }
        let path = self.dir.join(format!("{id}.{EXTENSION}"));
        if path.is_file() {
            return Ok(path);
        }
        fs::read_dir(&self.dir)
            .map_err(|_| not_found())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|p| p.is_file() && property_id(p).as_deref() == Some(id))
            .ok_or_else(not_found)
    }

    fn list_blocking(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(dir = %self.dir.display(), "property directory does not exist");
                return Ok(vec![]);
            }
            Err(e) => return Err(StoreError::read("*", e)),
        };
        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| property_id(&entry.path()))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn read_blocking(
        &self,
        id: &str,
    ) -> Result<(PathBuf, Vec<u8>, Workbook), StoreError> {
        let path = self.path_for(id)?;
        let bytes = fs::read(&path).map_err(|e| StoreError::read(id, e))?;
        let book =
            Workbook::from_bytes(&bytes).map_err(|e| StoreError::read(id, e))?;
        Ok((path, bytes, book))
    }

    fn load_blocking(&self, id: &str) -> Result<PropertyRecord, StoreError> {
        let (_, _, book) = self.read_blocking(id)?;
        let idx = book
            .sheet_index(&self.sheet_name)
            .ok_or_else(|| StoreError::read(id, "workbook has no sheets"))?;
        if book.sheets[idx].name != self.sheet_name {
            tracing::warn!(
                id,
                expected = %self.sheet_name,
                using = %book.sheets[idx].name,
                "property sheet not found by name; reading the first sheet"
            );
        }
        Ok(layout::extract_record(id, &book.sheets[idx]))
    }

    fn save_blocking(
        &self,
        id: &str,
        edits: &[CellEdit],
    ) -> Result<SaveReceipt, StoreError> {
        let (path, original, mut book) = self.read_blocking(id)?;
        let idx = book
            .sheet_index(&self.sheet_name)
            .ok_or_else(|| StoreError::read(id, "workbook has no sheets"))?;

        let backup = write_backup(&self.backup_dir, id, &original)
            .map_err(|e| StoreError::write(id, format!("backup failed: {e}")))?;
        tracing::info!(id, backup = %backup.display(), "backup created");

        let changed = layout::apply_edits(&mut book.sheets[idx], edits);
        let bytes = book.to_bytes().map_err(|e| StoreError::write(id, e))?;
        replace_file(&path, &bytes).map_err(|e| StoreError::write(id, e))?;
        tracing::info!(id, changed, "property saved");

        Ok(SaveReceipt {
            backup: backup
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })
    }
}

/// `Foo.xlsx` -> `Foo`; `None` for lock files, hidden files and anything
/// that isn't a workbook.
fn property_id(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case(EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if is_valid_id(stem) {
        Some(stem.to_string())
    } else {
        None
    }
}

/// Copy the pre-save bytes to `{id}_{YYYYMMDD_HHMMSS}.xlsx`. Existing backups
/// are never overwritten; a second save within the same second gets a
/// counter suffix.
fn write_backup(dir: &Path, id: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut attempt = 0;
    loop {
        let name = if attempt == 0 {
            format!("{id}_{stamp}.{EXTENSION}")
        } else {
            format!("{id}_{stamp}_{attempt}.{EXTENSION}")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                fill_or_remove(&path, file, |f| {
                    f.write_all(bytes)?;
                    f.sync_all()
                })?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Run `fill` on a freshly created file; a file that could not be filled
/// completely is removed rather than left behind truncated.
fn fill_or_remove(
    path: &Path,
    mut file: File,
    fill: impl FnOnce(&mut File) -> io::Result<()>,
) -> io::Result<()> {
    let result = fill(&mut file);
    drop(file);
    if let Err(e) = result {
        if let Err(remove) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %remove, "could not remove partial backup");
        }
        return Err(e);
    }
    Ok(())
}

/// Write to a temp file next to `path`, then rename over it, so a failed
/// write never leaves a truncated workbook behind.
fn replace_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::read("*", format!("storage task failed: {e}")))?
}

#[async_trait]
impl PropertyStore for XlsxStore {
    async fn list_properties(&self) -> Result<Vec<String>, StoreError> {
        let store = self.clone();
        blocking(move || store.list_blocking()).await
    }

    async fn load_property(
        &self,
        id: &str,
    ) -> Result<PropertyRecord, StoreError> {
        let store = self.clone();
        let id = id.to_string();
        blocking(move || store.load_blocking(&id)).await
    }

    async fn save_property(
        &self,
        id: &str,
        edits: &[CellEdit],
    ) -> Result<SaveReceipt, StoreError> {
        let store = self.clone();
        let id = id.to_string();
        let edits = edits.to_vec();
        blocking(move || store.save_blocking(&id, &edits)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layout::{COL_B, COL_C, COL_F},
        models::{SectionKey, ValueColumn},
        sheet::Sheet,
        store::sample,
    };
    use tempfile::TempDir;

    const SHEET: &str = "Property Info";

    fn store_in(tmp: &TempDir) -> XlsxStore {
        XlsxStore::new(tmp.path(), tmp.path().join("backups"), SHEET)
    }

    fn write_property(tmp: &TempDir, id: &str) -> PathBuf {
        let path = tmp.path().join(format!("{id}.xlsx"));
        fs::write(&path, sample::sample_workbook_bytes(SHEET).unwrap())
            .unwrap();
        path
    }

    fn edit(
        section: SectionKey,
        row: u32,
        column: ValueColumn,
        value: &str,
    ) -> CellEdit {
        CellEdit {
            section,
            row,
            column,
            value: value.to_string(),
        }
    }

    fn read_sheet(path: &Path) -> Sheet {
        let book = Workbook::from_bytes(&fs::read(path).unwrap()).unwrap();
        book.sheets.into_iter().next().unwrap()
    }

    #[tokio::test]
    async fn test_list_and_missing_property() {
        let tmp = TempDir::new().unwrap();
        write_property(&tmp, "B");
        write_property(&tmp, "A");
        fs::write(tmp.path().join("~$A.xlsx"), b"lock").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"not a property").unwrap();
        let store = store_in(&tmp);

        assert_eq!(store.list_properties().await.unwrap(), vec!["A", "B"]);
        assert!(matches!(
            store.load_property("C").await,
            Err(StoreError::NotFound(id)) if id == "C"
        ));
    }

    #[tokio::test]
    async fn test_empty_or_missing_directory_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(store_in(&tmp).list_properties().await.unwrap().is_empty());

        let gone = XlsxStore::new(
            tmp.path().join("nope"),
            tmp.path().join("backups"),
            SHEET,
        );
        assert!(gone.list_properties().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_traversal_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        assert!(matches!(
            store.load_property("../A").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_load_reads_all_sections() {
        let tmp = TempDir::new().unwrap();
        write_property(&tmp, "A");
        let record = store_in(&tmp).load_property("A").await.unwrap();

        assert_eq!(record.id, "A");
        assert_eq!(record.sections.len(), 8);
        assert!(record.sections.iter().all(|s| !s.fields.is_empty()));
        assert_eq!(
            record.value(SectionKey::PropertyInfo, "Lot Number"),
            Some("1004031")
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_is_read_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Broken.xlsx"), b"garbage").unwrap();
        let store = store_in(&tmp);

        assert!(matches!(
            store.load_property("Broken").await,
            Err(StoreError::ReadError { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        write_property(&tmp, "A");
        let store = store_in(&tmp);
        let edits = vec![
            edit(SectionKey::PropertyInfo, 1, ValueColumn::Primary, "9 Rue Saint-Paul"),
            edit(SectionKey::OwnerInfo, 1, ValueColumn::Primary, "Jean Tremblay"),
            edit(SectionKey::Income, 30, ValueColumn::Primary, "$310,000"),
            edit(SectionKey::Questions, 29, ValueColumn::Primary, "Roof age?"),
            edit(SectionKey::OurOffer, 27, ValueColumn::Primary, "0.07"),
        ];

        store.save_property("A", &edits).await.unwrap();
        let record = store.load_property("A").await.unwrap();

        assert_eq!(
            record.value(SectionKey::PropertyInfo, "Address"),
            Some("9 Rue Saint-Paul")
        );
        assert_eq!(
            record.value(SectionKey::OwnerInfo, "Names of Owners"),
            Some("Jean Tremblay")
        );
        assert_eq!(
            record.value(SectionKey::Income, "Gross Income / Year"),
            Some("$310,000")
        );
        assert_eq!(
            record.value(SectionKey::Questions, "Questions/Notes"),
            Some("Roof age?")
        );
        assert_eq!(record.value(SectionKey::OurOffer, "Cap Rate"), Some("0.07"));
    }

    #[tokio::test]
    async fn test_backup_matches_pre_save_bytes() {
        let tmp = TempDir::new().unwrap();
        let path = write_property(&tmp, "A");
        let before = fs::read(&path).unwrap();
        let store = store_in(&tmp);

        let receipt = store
            .save_property(
                "A",
                &[edit(SectionKey::PropertyInfo, 1, ValueColumn::Primary, "new")],
            )
            .await
            .unwrap();

        assert!(receipt.backup.starts_with("A_"));
        assert!(receipt.backup.ends_with(".xlsx"));
        let backup = fs::read(tmp.path().join("backups").join(&receipt.backup))
            .unwrap();
        assert_eq!(backup, before);
        assert_ne!(fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_saves_in_the_same_second_keep_every_backup() {
        let tmp = TempDir::new().unwrap();
        write_property(&tmp, "A");
        let store = store_in(&tmp);
        let e = [edit(SectionKey::PropertyInfo, 1, ValueColumn::Primary, "x")];

        let first = store.save_property("A", &e).await.unwrap();
        let second = store.save_property("A", &e).await.unwrap();

        assert_ne!(first.backup, second.backup);
        assert_eq!(fs::read_dir(tmp.path().join("backups")).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_vendor_values_land_in_column_c() {
        let tmp = TempDir::new().unwrap();
        let path = write_property(&tmp, "A");
        let store = store_in(&tmp);
        let edits = vec![
            edit(SectionKey::OurOffer, 23, ValueColumn::Primary, "3600000"),
            edit(SectionKey::OurOffer, 23, ValueColumn::Vendor, "4100000"),
            edit(SectionKey::TitleInfo, 8, ValueColumn::Primary, "No"),
        ];

        store.save_property("A", &edits).await.unwrap();
        let sheet = read_sheet(&path);

        assert_eq!(sheet.text(23, COL_B), "3600000");
        assert_eq!(sheet.text(23, COL_C), "4100000");
        assert_eq!(sheet.text(8, COL_F), "No");
    }

    #[tokio::test]
    async fn test_cells_outside_edits_are_preserved() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("A.xlsx");
        let mut info = sample::sample_sheet(SHEET);
        info.set_text(45, 8, "scratch note in I46");
        info.set_formula(34, COL_B, "B31-B33");
        let mut comps = Sheet::new("Comparables");
        comps.set_text(0, 0, "123 Other St");
        let bytes = Workbook::new(vec![comps, info]).to_bytes().unwrap();
        fs::write(&path, bytes).unwrap();
        let store = store_in(&tmp);

        store
            .save_property(
                "A",
                &[edit(SectionKey::PropertyInfo, 1, ValueColumn::Primary, "moved")],
            )
            .await
            .unwrap();

        let book = Workbook::from_bytes(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(book.sheets[0].name, "Comparables");
        assert_eq!(book.sheets[0].text(0, 0), "123 Other St");
        let info = &book.sheets[1];
        assert_eq!(info.text(1, COL_B), "moved");
        assert_eq!(info.text(45, 8), "scratch note in I46");
        assert_eq!(
            info.get(34, COL_B).unwrap().formula.as_deref(),
            Some("B31-B33")
        );
    }

    #[tokio::test]
    async fn test_backup_failure_leaves_file_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = write_property(&tmp, "A");
        let before = fs::read(&path).unwrap();
        // a regular file where the backup directory should be
        let blocker = tmp.path().join("backups");
        fs::write(&blocker, b"in the way").unwrap();
        let store = store_in(&tmp);

        let result = store
            .save_property(
                "A",
                &[edit(SectionKey::PropertyInfo, 1, ValueColumn::Primary, "lost?")],
            )
            .await;

        assert!(matches!(result, Err(StoreError::WriteError { .. })));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_uppercase_extension_can_be_opened_and_saved() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Upper.XLSX");
        fs::write(&path, sample::sample_workbook_bytes(SHEET).unwrap()).unwrap();
        let store = store_in(&tmp);

        assert_eq!(store.list_properties().await.unwrap(), vec!["Upper"]);
        let record = store.load_property("Upper").await.unwrap();
        assert_eq!(
            record.value(SectionKey::PropertyInfo, "Lot Number"),
            Some("1004031")
        );

        store
            .save_property(
                "Upper",
                &[edit(SectionKey::PropertyInfo, 1, ValueColumn::Primary, "2 Rue Ouest")],
            )
            .await
            .unwrap();
        assert_eq!(read_sheet(&path).text(1, COL_B), "2 Rue Ouest");
        assert_eq!(store.list_properties().await.unwrap(), vec!["Upper"]);
    }

    #[test]
    fn test_partial_backup_is_removed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("A_20250101_120000.xlsx");
        let file = File::create(&path).unwrap();

        let result = fill_or_remove(&path, file, |f| {
            f.write_all(b"PK")?;
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        });

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_save_unknown_property_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        assert!(matches!(
            store.save_property("C", &[]).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(!tmp.path().join("backups").exists());
    }
}
