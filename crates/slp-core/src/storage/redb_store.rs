//! # redb-backed Concept Storage
//!
//! A disk-backed concept store using the redb embedded database:
//! - ACID transactions (one write transaction per persisted concept)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are stored as postcard bytes keyed by concept id. A separate
//! sequence table remembers persist order so that `load_all` can break
//! timestamp ties deterministically.

use super::ConceptStore;
use crate::formats::ConceptRecord;
use crate::{Concept, ConceptId, SlpError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for concepts: ConceptId -> postcard-serialized ConceptRecord
const CONCEPTS: TableDefinition<&str, &[u8]> = TableDefinition::new("concepts");

/// Table for persist order: sequence number -> ConceptId
const SEQUENCE: TableDefinition<u64, &str> = TableDefinition::new("sequence");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

fn io_err(e: impl std::fmt::Display) -> SlpError {
    SlpError::IoError(e.to_string())
}

/// A disk-backed concept store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
    /// Next persist sequence number.
    next_sequence: u64,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("next_sequence", &self.next_sequence)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a concept database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SlpError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(CONCEPTS).map_err(io_err)?;
            let _ = write_txn.open_table(SEQUENCE).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        let next_sequence = {
            let read_txn = db.begin_read().map_err(io_err)?;
            let table = read_txn.open_table(METADATA).map_err(io_err)?;
            table
                .get("next_sequence")
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0)
        };

        Ok(Self { db, next_sequence })
    }

    /// Number of persisted concepts.
    pub fn count(&self) -> Result<usize, SlpError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(CONCEPTS).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    fn read_record(&self, id: &ConceptId) -> Result<Option<ConceptRecord>, SlpError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(CONCEPTS).map_err(io_err)?;
        let Some(data) = table.get(id.as_str()).map_err(io_err)? else {
            return Ok(None);
        };
        let record = postcard::from_bytes::<ConceptRecord>(data.value())
            .map_err(|e| SlpError::SerializationError(e.to_string()))?;
        Ok(Some(record))
    }
}

impl ConceptStore for RedbStore {
    fn load_all(&self) -> Result<Vec<ConceptRecord>, SlpError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let sequence = read_txn.open_table(SEQUENCE).map_err(io_err)?;
        let concepts = read_txn.open_table(CONCEPTS).map_err(io_err)?;

        let mut records = Vec::new();
        for entry in sequence.iter().map_err(io_err)? {
            let (_, id) = entry.map_err(io_err)?;
            let id = id.value();
            let data = concepts
                .get(id)
                .map_err(io_err)?
                .ok_or_else(|| {
                    SlpError::IoError(format!("sequence references missing concept {}", id))
                })?;
            let record = postcard::from_bytes::<ConceptRecord>(data.value())
                .map_err(|e| SlpError::SerializationError(e.to_string()))?;
            records.push(record);
        }

        // Stable: equal timestamps stay in persist order.
        records.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(records)
    }

    fn persist(&mut self, concept: &Concept, payload: Option<&str>) -> Result<(), SlpError> {
        let record = ConceptRecord::from_concept(concept, payload.map(str::to_string));
        let bytes = postcard::to_allocvec(&record)
            .map_err(|e| SlpError::SerializationError(e.to_string()))?;
        let id = concept.id().as_str();
        let mut next_sequence = self.next_sequence;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut concepts = write_txn.open_table(CONCEPTS).map_err(io_err)?;
            let mut sequence = write_txn.open_table(SEQUENCE).map_err(io_err)?;
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;

            let existed = concepts.get(id).map_err(io_err)?.is_some();
            concepts.insert(id, bytes.as_slice()).map_err(io_err)?;

            if !existed {
                sequence.insert(next_sequence, id).map_err(io_err)?;
                next_sequence = next_sequence.saturating_add(1);
                meta.insert("next_sequence", next_sequence).map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)?;

        // Update in-memory state only after successful commit.
        self.next_sequence = next_sequence;
        Ok(())
    }

    fn payload(&self, id: &ConceptId) -> Result<Option<String>, SlpError> {
        Ok(self.read_record(id)?.and_then(|r| r.payload))
    }
}

// =============================================================================
// TESTS
// =============================================================================
