//! Durable token storage
//!
//! Manages a JSON file holding a flat key→value bundle of named
//! credentials (refresh token, CCC token). All writes are whole-bundle:
//! load the map, overwrite the named keys, persist the full map — so keys
//! this flow does not own survive every update. Writes use atomic
//! temp-file + rename, and a tokio Mutex serializes the read-merge-write
//! cycle against concurrent login attempts finalizing at the same time.
//!
//! The bundle file is the single source of truth for credential state
//! across restarts; no other component reads or writes it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Thread-safe credential bundle manager.
///
/// The Mutex guards the whole read-merge-write sequence, not just the file
/// write; two attempts finalizing concurrently cannot lose each other's
/// keys.
pub struct TokenStore {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl TokenStore {
    /// Load the bundle from the given file path.
    ///
    /// If the file doesn't exist yet, starts with an empty bundle and
    /// creates the file so future loads skip the cold-start path.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading token bundle: {e}")))?;
            let bundle: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing token bundle: {e}")))?;
            info!(path = %path.display(), keys = bundle.len(), "loaded token bundle");
            bundle
        } else {
            info!(path = %path.display(), "token bundle not found, starting empty");
            let bundle = HashMap::new();
            write_atomic(&path, &bundle).await?;
            bundle
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Get a clone of a single credential value.
    pub async fn get(&self, key: &str) -> Option<String> {
        let state = self.state.lock().await;
        state.get(key).cloned()
    }

    /// Clone the whole bundle (tests and diagnostics).
    pub async fn snapshot(&self) -> HashMap<String, String> {
        let state = self.state.lock().await;
        state.clone()
    }

    /// Overwrite the given keys and persist the full bundle.
    ///
    /// Keys not named in `entries` keep their current values. The lock is
    /// held across merge and write; a persist failure leaves the on-disk
    /// bundle at its previous state.
    pub async fn merge<I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut state = self.state.lock().await;
        let mut updated = 0usize;
        for (key, value) in entries {
            state.insert(key, value);
            updated += 1;
        }
        debug!(updated, "merged credential keys");
        write_atomic(&self.path, &state).await
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.len()
    }

    /// Whether the bundle is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Write the bundle to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target, so a crash mid-write cannot leave a torn bundle. The file
/// gets 0600 permissions since it contains live tokens.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing token bundle: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("token bundle path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".tokens.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token bundle: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token bundle permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token bundle: {e}")))?;

    debug!(path = %path.display(), "persisted token bundle");
    Ok(())
}
