use std::{
    fs::{self, File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ContactIndex, RecordOutcome, ScamContact, ScamContactStore};
use crate::risk::ScamCheckResult;

/// Registry persisted as an `email,phone` CSV file.
///
/// The file is read once on open; new reports are appended.
pub struct CsvScamStore {
    path: PathBuf,
    index: RwLock<ContactIndex>,
}

impl CsvScamStore {
    /// Open the registry, creating the file (with header) and its directory if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create scam database directory {}", parent.display())
            })?;
        }
        if !path.exists() {
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("failed to create scam database at {}", path.display()))?;
            writer.write_record(["email", "phone"])?;
            writer.flush()?;
        }
        let contacts = read_contacts(&path)?;
        debug!(path = %path.display(), contacts = contacts.len(), "loaded scam database");
        Ok(Self {
            path,
            index: RwLock::new(ContactIndex::new(contacts)),
        })
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    fn append(&self, contact: &ScamContact) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open scam database {}", self.path.display()))?;
        if !ends_with_newline(&mut file)? {
            file.write_all(b"\n")
                .with_context(|| format!("failed to terminate last row of {}", self.path.display()))?;
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .serialize(contact)
            .context("failed to append scam contact")?;
        writer.flush()?;
        Ok(())
    }
}

/// Empty files count as terminated.
fn ends_with_newline(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn read_contacts(path: &Path) -> Result<Vec<ScamContact>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to read scam database {}", path.display()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<ScamContact>, _>>()
        .with_context(|| format!("malformed row in scam database {}", path.display()))
}

#[async_trait]
impl ScamContactStore for CsvScamStore {
    async fn lookup(&self, email: Option<&str>, phone: Option<&str>) -> Result<ScamCheckResult> {
        Ok(self.index.read().await.check(email, phone))
    }

    async fn record(&self, email: Option<&str>, phone: Option<&str>) -> Result<RecordOutcome> {
        let mut index = self.index.write().await;
        match index.pending(email, phone)? {
            Some(contact) => {
                self.append(&contact)?;
                index.commit(contact);
                Ok(RecordOutcome::Added)
            }
            None => Ok(RecordOutcome::AlreadyKnown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_file_with_header() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("data/scam_contacts.csv");
        let store = CsvScamStore::open(&path).unwrap();
        assert_eq!(store.len().await, 0);
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "email,phone");
    }

    #[tokio::test]
    async fn recorded_contacts_survive_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("scam_contacts.csv");
        {
            let store = CsvScamStore::open(&path).unwrap();
            let outcome = store
                .record(Some("payroll@fastcash.xyz"), Some("(555) 222-3333"))
                .await
                .unwrap();
            assert_eq!(outcome, RecordOutcome::Added);
            let again = store
                .record(None, Some("555.222.3333"))
                .await
                .unwrap();
            assert_eq!(again, RecordOutcome::AlreadyKnown);
        }

        let reopened = CsvScamStore::open(&path).unwrap();
        assert_eq!(reopened.len().await, 1);
        let result = reopened
            .lookup(Some("PAYROLL@fastcash.xyz"), Some("5552223333"))
            .await
            .unwrap();
        assert!(result.email_flagged);
        assert!(result.phone_flagged);
    }

    #[tokio::test]
    async fn appends_after_unterminated_last_row() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("hand_edited.csv");
        fs::write(&path, "email,phone\nold@scam.example,5551112222").unwrap();
        {
            let store = CsvScamStore::open(&path).unwrap();
            let outcome = store.record(Some("new@scam.example"), None).await.unwrap();
            assert_eq!(outcome, RecordOutcome::Added);
        }

        let reopened = CsvScamStore::open(&path).unwrap();
        assert_eq!(reopened.len().await, 2);
        let old = reopened
            .lookup(Some("old@scam.example"), Some("555-111-2222"))
            .await
            .unwrap();
        assert!(old.email_flagged);
        assert!(old.phone_flagged);
        let new = reopened.lookup(Some("new@scam.example"), None).await.unwrap();
        assert!(new.email_flagged);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_append_leaves_index_unchanged() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("readonly.csv");
        let store = CsvScamStore::open(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();
        // Privileged users bypass file modes; nothing to observe then.
        if OpenOptions::new().append(true).open(&path).is_ok() {
            return;
        }

        let result = store.record(Some("lost@scam.example"), None).await;
        assert!(result.is_err());
        let lookup = store.lookup(Some("lost@scam.example"), None).await.unwrap();
        assert!(!lookup.email_flagged);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn tolerates_missing_phone_column() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("legacy.csv");
        fs::write(&path, "email\nold@scam.example\n").unwrap();
        let store = CsvScamStore::open(&path).unwrap();
        let result = store.lookup(Some("old@scam.example"), None).await.unwrap();
        assert!(result.email_flagged);
    }
}
