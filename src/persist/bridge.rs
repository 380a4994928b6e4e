use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::storage::Storage;
use crate::error::PersistError;
use crate::value::Value;

/// Best-effort mirror of one store's data under a single storage key.
///
/// Inert when no storage is attached. Every failure is logged and swallowed.
pub(crate) struct PersistenceBridge {
    key: String,
    storage: Option<Arc<dyn Storage>>,
}

impl PersistenceBridge {
    pub(crate) fn new(key: &str, enabled: bool, storage: Option<Arc<dyn Storage>>) -> Self {
        let storage = match (enabled, storage) {
            (true, Some(storage)) => Some(storage),
            (true, None) => {
                debug!(store = key, "persistence requested but no storage attached");
                None
            }
            (false, _) => None,
        };
        Self {
            key: key.to_owned(),
            storage,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.storage.is_some()
    }

    /// Read back the last saved data, if any.
    pub(crate) fn load(&self) -> Option<BTreeMap<String, Value>> {
        let storage = self.storage.as_deref()?;
        match self.try_load(storage) {
            Ok(data) => data,
            Err(err) => {
                warn!(store = %self.key, error = %err, "error loading persisted store");
                None
            }
        }
    }

    fn try_load(&self, storage: &dyn Storage) -> Result<Option<BTreeMap<String, Value>>, PersistError> {
        let Some(raw) = storage.get_item(&self.key)? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(PersistError::NotAnObject {
                key: self.key.clone(),
            }),
        }
    }

    /// Write the full data map under the store key.
    pub(crate) fn save(&self, data: &BTreeMap<String, Value>) {
        let Some(storage) = self.storage.as_deref() else {
            return;
        };
        let result = serde_json::to_string(data)
            .map_err(PersistError::from)
            .and_then(|json| storage.set_item(&self.key, &json));
        if let Err(err) = result {
            warn!(store = %self.key, error = %err, "error saving store");
        }
    }

    pub(crate) fn clear(&self) {
        let Some(storage) = self.storage.as_deref() else {
            return;
        };
        if let Err(err) = storage.remove_item(&self.key) {
            warn!(store = %self.key, error = %err, "error clearing persisted store");
        }
    }
}
