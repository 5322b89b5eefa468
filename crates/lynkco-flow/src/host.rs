//! Entry-host abstraction
//!
//! Defines the `EntryHost` trait that decouples the login flow from the
//! host's entry persistence mechanics. The flow only decides WHEN a
//! vehicle record is created, updated, or reloaded; WHERE and HOW it lives
//! is the host's concern (a config-entry registry, a file, a database).
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn EntryHost>`).

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Host-side persistence of the vehicle entry record.
///
/// A fresh login calls `create_entry`; a re-authentication calls
/// `update_entry` followed by `reload_entry` so dependent host state picks
/// up the new binding instead of a second record appearing.
pub trait EntryHost: Send + Sync {
    /// Create a new entry record bound to the given VIN.
    fn create_entry<'a>(
        &'a self,
        vin: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Rebind an existing entry record to the given VIN, in place.
    fn update_entry<'a>(
        &'a self,
        entry_id: &'a str,
        vin: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Reload whatever host state depends on the entry record.
    fn reload_entry<'a>(
        &'a self,
        entry_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
