//! # Durable Storage
//!
//! The core only needs two things from storage: load everything back in
//! replay order, and persist one newly admitted concept. `ConceptStore`
//! captures that contract; `RedbStore` is the disk-backed implementation.

mod redb_store;

pub use redb_store::RedbStore;

use crate::formats::ConceptRecord;
use crate::{Concept, ConceptId, SlpError};

/// Load-all / persist-one storage contract.
pub trait ConceptStore: Send + Sync {
    /// Every persisted record, by timestamp ascending.
    ///
    /// Equal timestamps keep their original persist order, so rehydration
    /// reproduces the session's insertion order.
    fn load_all(&self) -> Result<Vec<ConceptRecord>, SlpError>;

    /// Durably record one concept, with its raw payload when available.
    fn persist(&mut self, concept: &Concept, payload: Option<&str>) -> Result<(), SlpError>;

    /// The raw payload stored with a concept, if any.
    fn payload(&self, id: &ConceptId) -> Result<Option<String>, SlpError>;
}
