use std::{
    fs::File,
    io::{self, Read},
    path::Path,
    sync::{
        RwLock,
        atomic::{AtomicI64, Ordering},
    },
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Item, NewPoint};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read item catalog: {0}")]
    Io(#[from] io::Error),
    #[error("invalid item catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("item catalog is empty")]
    EmptyCatalog,
    #[error("unknown item {0}")]
    UnknownItem(i64),
}

/// A collection point accepted by the service, as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub point: NewPoint,
}

/// Item catalog plus the collection points registered during this run.
///
/// The catalog is immutable after load; points live behind a lock so the
/// store can be shared across handlers as a plain `Arc`.
pub struct PointStore {
    items: Vec<Item>,
    points: RwLock<Vec<PointRecord>>,
    next_id: AtomicI64,
}

impl PointStore {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_reader(File::open(path)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, StoreError> {
        let items: Vec<Item> = serde_json::from_reader(reader)?;
        if items.is_empty() {
            return Err(StoreError::EmptyCatalog);
        }
        Ok(Self {
            items,
            points: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Registers a new collection point, rejecting references to items the
    /// catalog does not carry.
    pub fn create_point(&self, point: NewPoint) -> Result<PointRecord, StoreError> {
        if let Some(&unknown) = point
            .items
            .iter()
            .find(|id| !self.items.iter().any(|item| item.id == **id))
        {
            return Err(StoreError::UnknownItem(unknown));
        }

        let record = PointRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            created_at: Utc::now(),
            point,
        };

        let mut points = self.points.write().unwrap_or_else(|err| err.into_inner());
        points.push(record.clone());
        Ok(record)
    }

    #[cfg(test)]
    fn point_count(&self) -> usize {
        self.points
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }
}
