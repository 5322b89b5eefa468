//! File-backed vehicle entry record
//!
//! The CLI's implementation of the flow's `EntryHost` seam: one JSON
//! record binding an entry id to the managed VIN. A re-authentication
//! rewrites the VIN under the existing id instead of minting a second
//! record.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lynkco_flow::{EntryHost, Error, Result};

/// The durable vehicle binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    pub entry_id: String,
    pub vin: String,
}

/// Entry host persisting the record as a JSON file.
pub struct FileEntryHost {
    path: PathBuf,
}

impl FileEntryHost {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the current entry record, if one exists and parses.
    pub async fn load(&self) -> Option<EntryRecord> {
        let contents = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&contents) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "entry record unreadable, ignoring");
                None
            }
        }
    }

    async fn write(&self, record: &EntryRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| Error::Persistence(format!("serializing entry record: {e}")))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| Error::Persistence(format!("writing entry record: {e}")))
    }
}

impl EntryHost for FileEntryHost {
    fn create_entry<'a>(
        &'a self,
        vin: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let record = EntryRecord {
                entry_id: uuid::Uuid::new_v4().to_string(),
                vin: vin.to_owned(),
            };
            self.write(&record).await?;
            info!(entry_id = %record.entry_id, vin, "created entry record");
            Ok(())
        })
    }

    fn update_entry<'a>(
        &'a self,
        entry_id: &'a str,
        vin: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            // The existing id survives a re-auth; only the VIN moves
            let record = EntryRecord {
                entry_id: entry_id.to_owned(),
                vin: vin.to_owned(),
            };
            self.write(&record).await?;
            info!(entry_id, vin, "updated entry record");
            Ok(())
        })
    }

    fn reload_entry<'a>(
        &'a self,
        entry_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            match self.load().await {
                Some(record) if record.entry_id == entry_id => {
                    info!(entry_id, vin = %record.vin, "reloaded entry record");
                    Ok(())
                }
                _ => Err(Error::Persistence(format!(
                    "no entry record {entry_id} to reload"
                ))),
            }
        })
    }
}
