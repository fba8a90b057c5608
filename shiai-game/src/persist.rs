//! Versioned save state and the storage seam it is written through.
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::rc::Rc;
use thiserror::Error;

use crate::constants::SAVE_VERSION;
use crate::meta::StyleMeta;
use crate::sponsorship::SponsorLedger;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u64, supported: u32 },
    #[error("save payload must be a JSON object")]
    NotAnObject,
    #[error("malformed save payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Everything that outlives a single bout or allocation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    #[serde(default)]
    pub style_meta: StyleMeta,
    #[serde(default)]
    pub sponsor_ledger: SponsorLedger,
}

impl Default for SaveState {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            style_meta: StyleMeta::default(),
            sponsor_ledger: SponsorLedger::default(),
        }
    }
}

/// Bring a stored payload up to the current layout and type it.
///
/// Version 0 saves carry no `version` field and keep their state under
/// `meta` and `sponsors`.
///
/// # Errors
///
/// Returns an error for non-object payloads, versions from the future and
/// payloads that do not deserialize after migration.
pub fn migrate(payload: Value) -> Result<SaveState, SaveError> {
    let Value::Object(mut fields) = payload else {
        return Err(SaveError::NotAnObject);
    };
    let found = fields.get("version").and_then(Value::as_u64).unwrap_or(0);
    if found > u64::from(SAVE_VERSION) {
        return Err(SaveError::UnsupportedVersion {
            found,
            supported: SAVE_VERSION,
        });
    }
    if found == 0 {
        migrate_v0(&mut fields);
    }

    Ok(serde_json::from_value(Value::Object(fields))?)
}

fn migrate_v0(fields: &mut Map<String, Value>) {
    debug!("migrating save from version 0 to {SAVE_VERSION}");
    if let Some(meta) = fields.remove("meta") {
        fields.entry("style_meta").or_insert(meta);
    }
    if let Some(ledger) = fields.remove("sponsors") {
        fields.entry("sponsor_ledger").or_insert(ledger);
    }
    fields.insert(String::from("version"), Value::from(SAVE_VERSION));
}

/// Platform-specific persistence for raw save payloads.
pub trait SaveStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn write_save(&self, save_name: &str, payload: &Value) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the payload cannot be read.
    fn read_save(&self, save_name: &str) -> Result<Option<Value>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Process-local storage; clones share the same saves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    saves: Rc<RefCell<BTreeMap<String, Value>>>,
}

impl SaveStorage for MemoryStorage {
    type Error = Infallible;

    fn write_save(&self, save_name: &str, payload: &Value) -> Result<(), Self::Error> {
        self.saves
            .borrow_mut()
            .insert(save_name.to_string(), payload.clone());
        Ok(())
    }

    fn read_save(&self, save_name: &str) -> Result<Option<Value>, Self::Error> {
        Ok(self.saves.borrow().get(save_name).cloned())
    }

    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
        self.saves.borrow_mut().remove(save_name);
        Ok(())
    }
}

/// Load a save.
///
/// # Errors
///
/// Returns an error if storage fails or the payload cannot be migrated.
pub fn load_state<S: SaveStorage>(
    storage: &S,
    save_name: &str,
) -> Result<Option<SaveState>, SaveError> {
    storage
        .read_save(save_name)
        .map_err(|err| SaveError::Storage(Box::new(err)))?
        .map(migrate)
        .transpose()
}

/// Write a save in the current layout.
///
/// # Errors
///
/// Returns an error if the state cannot be encoded or storage fails.
pub fn store_state<S: SaveStorage>(
    storage: &S,
    save_name: &str,
    state: &SaveState,
) -> Result<(), SaveError> {
    let payload = serde_json::to_value(state)?;
    storage
        .write_save(save_name, &payload)
        .map_err(|err| SaveError::Storage(Box::new(err)))
}

/// Scoped handle on one save: loaded on open, written back on close or drop.
pub struct StoreSession<'s, S: SaveStorage> {
    storage: &'s S,
    save_name: String,
    state: SaveState,
    dirty: bool,
}

impl<'s, S: SaveStorage> StoreSession<'s, S> {
    /// Open `save_name`, starting fresh when nothing is stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing save cannot be read or migrated.
    pub fn open(storage: &'s S, save_name: &str) -> Result<Self, SaveError> {
        let state = load_state(storage, save_name)?.unwrap_or_default();
        Ok(Self {
            storage,
            save_name: save_name.to_string(),
            state,
            dirty: false,
        })
    }

    #[must_use]
    pub const fn state(&self) -> &SaveState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SaveState {
        self.dirty = true;
        &mut self.state
    }

    /// # Errors
    ///
    /// Returns an error if the write fails; the session stays dirty.
    pub fn flush(&mut self) -> Result<(), SaveError> {
        if self.dirty {
            store_state(self.storage, &self.save_name, &self.state)?;
            self.dirty = false;
        }
        Ok(())
    }

    /// Flush and release the session, surfacing any write error.
    ///
    /// # Errors
    ///
    /// Returns an error if the final write fails.
    pub fn close(mut self) -> Result<(), SaveError> {
        self.flush()
    }
}

impl<S: SaveStorage> Drop for StoreSession<'_, S> {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            warn!("failed to flush save '{}': {err}", self.save_name);
        }
    }
}
