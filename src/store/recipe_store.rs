use super::medium::{JsonFileMedium, RecordMedium};
use super::record::RecipeRecord;
use crate::recipes::Recipe;
use serde_json::Value;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Durable set of liked recipes keyed by recipe id.
///
/// Each operation holds the store lock from read to persisted write.
/// Persistence failures never reach callers: the medium is recreated empty
/// and the operation is applied to the fresh medium. The in-memory cache only
/// ever reflects what the medium last accepted.
pub struct RecipeStore {
    medium: Box<dyn RecordMedium>,
    records: Mutex<Vec<Value>>,
}

impl RecipeStore {
    /// Load the medium, recreating it empty if it cannot be read
    pub async fn open(medium: Box<dyn RecordMedium>) -> Self {
        let records = match medium.load().await {
            Ok(records) => {
                info!(
                    "Opened recipe store at {} ({} records)",
                    medium.describe(),
                    records.len()
                );
                records
            }
            Err(e) => {
                error!("Recipe store unusable, recreating it empty: {}", e);
                if let Err(e) = medium.recreate().await {
                    error!("Failed to recreate recipe store: {}", e);
                }
                Vec::new()
            }
        };

        Self {
            medium,
            records: Mutex::new(records),
        }
    }

    pub async fn open_file<P: AsRef<Path>>(path: P) -> Self {
        Self::open(Box::new(JsonFileMedium::new(path))).await
    }

    /// Store `recipe` unless a record with its id exists. Never overwrites.
    ///
    /// Returns whether a record was written.
    pub async fn upsert_if_absent(&self, recipe: &Recipe, owner: Option<&str>) -> bool {
        let mut records = self.records.lock().await;
        if find(&records, recipe.id).is_some() {
            debug!("Recipe {} already stored", recipe.id);
            return false;
        }

        let value = match RecipeRecord::from_recipe(recipe, owner)
            .and_then(|record| serde_json::to_value(record).map_err(invalid))
        {
            Ok(value) => value,
            Err(e) => {
                error!("Cannot store recipe {}: {}", recipe.id, e);
                return false;
            }
        };

        self.commit(&mut records, move |records| {
            records.push(value.clone());
            true
        })
        .await
    }

    /// Remove the record for `id`. Returns whether one was present.
    pub async fn delete(&self, id: Uuid) -> bool {
        let mut records = self.records.lock().await;
        if find(&records, id).is_none() {
            return false;
        }

        self.commit(&mut records, |records| match find(records, id) {
            Some(index) => {
                records.remove(index);
                true
            }
            None => false,
        })
        .await
    }

    /// Update the stored expansion flag. No-op when `id` is not stored.
    pub async fn update_expansion(&self, id: Uuid, expanded: bool) -> bool {
        let mut records = self.records.lock().await;
        if find(&records, id).is_none() {
            return false;
        }

        self.commit(&mut records, |records| {
            match find(records, id).and_then(|index| records[index].as_object_mut()) {
                Some(record) => {
                    record.insert("is_expanded".to_string(), Value::Bool(expanded));
                    true
                }
                None => false,
            }
        })
        .await
    }

    /// Every record that can be rebuilt into a recipe; the rest are skipped
    pub async fn fetch_all(&self) -> Vec<Recipe> {
        let records = self.records.lock().await;

        records
            .iter()
            .filter_map(|value| {
                let recipe = serde_json::from_value::<RecipeRecord>(value.clone())
                    .map_err(invalid)
                    .and_then(RecipeRecord::into_recipe);
                match recipe {
                    Ok(recipe) => Some(recipe),
                    Err(e) => {
                        warn!("Skipping unreadable stored recipe: {}", e);
                        None
                    }
                }
            })
            .collect()
    }

    pub async fn contains(&self, id: Uuid) -> bool {
        find(&self.records.lock().await, id).is_some()
    }

    /// Number of raw records, including unreadable ones
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Apply `change` to a copy, persist it, then publish it to the cache.
    /// On a failed write the medium is recreated and `change` reapplied to
    /// an empty record set.
    async fn commit<F>(&self, records: &mut Vec<Value>, change: F) -> bool
    where
        F: Fn(&mut Vec<Value>) -> bool,
    {
        let mut next = records.clone();
        let changed = change(&mut next);

        match self.medium.persist(&next).await {
            Ok(()) => {
                *records = next;
                return changed;
            }
            Err(e) => error!("Recipe store write failed, recreating store: {}", e),
        }

        if let Err(e) = self.medium.recreate().await {
            // Medium untouched as far as we know; the cache keeps mirroring it
            error!("Failed to recreate recipe store: {}", e);
            return false;
        }

        let mut fresh = Vec::new();
        let changed = change(&mut fresh);
        match self.medium.persist(&fresh).await {
            Ok(()) => {
                *records = fresh;
                changed
            }
            Err(e) => {
                // Recreated but still empty
                error!("Recipe store write failed after recreation: {}", e);
                records.clear();
                false
            }
        }
    }
}

fn find(records: &[Value], id: Uuid) -> Option<usize> {
    let id = id.to_string();
    records
        .iter()
        .position(|value| value.get("id").and_then(Value::as_str) == Some(id.as_str()))
}

fn invalid(e: serde_json::Error) -> crate::error::StoreError {
    crate::error::StoreError::InvalidRecord {
        details: e.to_string(),
    }
}
