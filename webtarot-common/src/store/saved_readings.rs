//! Ordered list of reading ids the user keeps open

use super::KeyValueStore;
use crate::Result;
use std::sync::Arc;
use tracing::warn;

const SAVED_READINGS_KEY: &str = "savedReadings";

/// Saved reading ids, persisted as a JSON array under `savedReadings`
#[derive(Clone)]
pub struct SavedReadings {
    store: Arc<dyn KeyValueStore>,
}

impl SavedReadings {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saved ids in insertion order
    ///
    /// An unreadable value is logged and treated as an empty list.
    pub fn list(&self) -> Result<Vec<String>> {
        let Some(raw) = self.store.get(SAVED_READINGS_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => Ok(ids),
            Err(e) => {
                warn!("Ignoring malformed saved readings list: {}", e);
                Ok(Vec::new())
            }
        }
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|saved| saved == id))
    }

    /// Append `id` unless already present; returns true when added
    pub fn add(&self, id: &str) -> Result<bool> {
        let mut ids = self.list()?;
        if ids.iter().any(|saved| saved == id) {
            return Ok(false);
        }
        ids.push(id.to_string());
        self.save(&ids)?;
        Ok(true)
    }

    /// Remove `id` and return the id that takes its place
    ///
    /// The neighbour is the id now at the removed position, else the one before
    /// it, else `None`. Removing an unknown id changes nothing and returns `None`.
    pub fn remove(&self, id: &str) -> Result<Option<String>> {
        let mut ids = self.list()?;
        let Some(index) = ids.iter().position(|saved| saved == id) else {
            return Ok(None);
        };
        ids.remove(index);
        self.save(&ids)?;

        let next = ids
            .get(index)
            .or_else(|| index.checked_sub(1).and_then(|prev| ids.get(prev)))
            .cloned();
        Ok(next)
    }

    fn save(&self, ids: &[String]) -> Result<()> {
        let json = serde_json::to_string(ids)?;
        self.store.set(SAVED_READINGS_KEY, &json)
    }
}
