//! Key-value storage backends for the preferences cache.

use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::types::CacheError;

/// Named keys of the persisted layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrefKey {
    LocationName,
    Latitude,
    Longitude,
    TempC,
    TempF,
    MinTemp,
    MaxTemp,
    ConditionIcon,
    ConditionText,
    LastUpdated,
    LastUpdatedLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefKind {
    Text,
    Double,
    Long,
}

impl PrefKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Double => "double",
            Self::Long => "long",
        }
    }
}

impl PrefKey {
    pub const ALL: [PrefKey; 11] = [
        Self::LocationName,
        Self::Latitude,
        Self::Longitude,
        Self::TempC,
        Self::TempF,
        Self::MinTemp,
        Self::MaxTemp,
        Self::ConditionIcon,
        Self::ConditionText,
        Self::LastUpdated,
        Self::LastUpdatedLocation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocationName => "last_location_name",
            Self::Latitude => "last_latitude",
            Self::Longitude => "last_longitude",
            Self::TempC => "last_temp_c",
            Self::TempF => "last_temp_f",
            Self::MinTemp => "last_min_temp",
            Self::MaxTemp => "last_max_temp",
            Self::ConditionIcon => "last_condition_icon",
            Self::ConditionText => "last_condition_text",
            Self::LastUpdated => "last_updated",
            Self::LastUpdatedLocation => "last_updated_location",
        }
    }

    pub fn kind(&self) -> PrefKind {
        match self {
            Self::LocationName | Self::ConditionIcon | Self::ConditionText => PrefKind::Text,
            Self::LastUpdated | Self::LastUpdatedLocation => PrefKind::Long,
            _ => PrefKind::Double,
        }
    }

    fn mismatch(&self) -> CacheError {
        CacheError::TypeMismatch {
            key: self.as_str(),
            expected: self.kind().name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrefValue {
    Text(String),
    Double(f64),
    Long(i64),
}

impl PrefValue {
    fn kind(&self) -> PrefKind {
        match self {
            Self::Text(_) => PrefKind::Text,
            Self::Double(_) => PrefKind::Double,
            Self::Long(_) => PrefKind::Long,
        }
    }
}

/// A typed key-value store. Each `apply` call is atomic: either every entry
/// of the batch is written or none is.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: PrefKey) -> Result<Option<PrefValue>, CacheError>;

    fn apply(&self, batch: &[(PrefKey, PrefValue)]) -> Result<(), CacheError>;

    fn get_text(&self, key: PrefKey) -> Result<Option<String>, CacheError> {
        match self.get(key)? {
            None => Ok(None),
            Some(PrefValue::Text(s)) => Ok(Some(s)),
            Some(_) => Err(key.mismatch()),
        }
    }

    fn get_double(&self, key: PrefKey) -> Result<Option<f64>, CacheError> {
        match self.get(key)? {
            None => Ok(None),
            Some(PrefValue::Double(v)) => Ok(Some(v)),
            Some(_) => Err(key.mismatch()),
        }
    }

    fn get_long(&self, key: PrefKey) -> Result<Option<i64>, CacheError> {
        match self.get(key)? {
            None => Ok(None),
            Some(PrefValue::Long(v)) => Ok(Some(v)),
            Some(_) => Err(key.mismatch()),
        }
    }
}

fn check_batch(batch: &[(PrefKey, PrefValue)]) -> Result<(), CacheError> {
    for (key, value) in batch {
        if key.kind() != value.kind() {
            return Err(key.mismatch());
        }
    }
    Ok(())
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<PrefKey, PrefValue>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored entry.
    pub fn snapshot(&self) -> BTreeMap<PrefKey, PrefValue> {
        self.entries.lock().clone()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: PrefKey) -> Result<Option<PrefValue>, CacheError> {
        Ok(self.entries.lock().get(&key).cloned())
    }

    fn apply(&self, batch: &[(PrefKey, PrefValue)]) -> Result<(), CacheError> {
        check_batch(batch)?;
        let mut entries = self.entries.lock();
        for (key, value) in batch {
            entries.insert(*key, value.clone());
        }
        Ok(())
    }
}

/// SQLite-backed store: one row per key, one typed column per value kind.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    /// Open (or create) the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store.
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), CacheError> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                text_value TEXT,
                real_value REAL,
                int_value INTEGER
            );
            "#,
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: PrefKey) -> Result<Option<PrefValue>, CacheError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT text_value, real_value, int_value FROM preferences WHERE key = ?1",
                params![key.as_str()],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((text, real, int)) = row else {
            return Ok(None);
        };

        let value = match key.kind() {
            PrefKind::Text => text.map(PrefValue::Text),
            PrefKind::Double => real.map(PrefValue::Double),
            PrefKind::Long => int.map(PrefValue::Long),
        };
        value.map(Some).ok_or_else(|| key.mismatch())
    }

    fn apply(&self, batch: &[(PrefKey, PrefValue)]) -> Result<(), CacheError> {
        check_batch(batch)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for (key, value) in batch {
            let (text, real, int) = match value {
                PrefValue::Text(s) => (Some(s.as_str()), None, None),
                PrefValue::Double(v) => (None, Some(*v), None),
                PrefValue::Long(v) => (None, None, Some(*v)),
            };
            tx.execute(
                "INSERT OR REPLACE INTO preferences (key, text_value, real_value, int_value)
                 VALUES (?1, ?2, ?3, ?4)",
                params![key.as_str(), text, real, int],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
