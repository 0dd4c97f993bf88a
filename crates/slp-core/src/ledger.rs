//! # Ledger Module
//!
//! A `Ledger` pairs the in-memory `CoreState` with a storage backend.
//!
//! ## Storage Backends
//!
//! - `InMemory`: state only (fast, volatile); raw payloads kept in a side map
//! - `Persistent`: any `ConceptStore`, e.g. `RedbStore` for disk-backed ACID storage
//!
//! ## Write Ordering
//!
//! Admission runs prepare -> persist -> insert. A concept reaches the
//! in-memory state only after storage acknowledged it, so a storage failure
//! leaves both sides unchanged.

use crate::embedding::Embedder;
use crate::formats::ConceptRecord;
use crate::lineage::lineage_chain;
use crate::pipeline::{CoreParams, IntegrateResult, embed_submission, prepare_concept};
use crate::storage::{ConceptStore, RedbStore};
use crate::{Concept, ConceptId, CoreState, SlpError, Submission};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Storage backend for a Ledger.
pub enum StorageBackend {
    /// No durable storage. Payloads are kept for display only.
    InMemory(BTreeMap<ConceptId, String>),
    /// Durable storage behind the load-all / persist-one contract.
    Persistent(Box<dyn ConceptStore>),
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory(payloads) => f
                .debug_struct("InMemory")
                .field("payloads", &payloads.len())
                .finish(),
            Self::Persistent(_) => f.debug_struct("Persistent").finish_non_exhaustive(),
        }
    }
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(BTreeMap::new())
    }
}

/// The state of an admitted-concept ledger plus where it is stored.
///
/// A Ledger is the single writer for its state: every admission goes
/// through `&mut self`.
#[derive(Debug, Default)]
pub struct Ledger {
    state: CoreState,
    backend: StorageBackend,
}

impl Ledger {
    /// Create a new empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory ledger around an existing state.
    #[must_use]
    pub fn with_state(state: CoreState) -> Self {
        Self {
            state,
            backend: StorageBackend::default(),
        }
    }

    /// Create a ledger over a store, rehydrating state from `load_all`.
    pub fn with_store(store: impl ConceptStore + 'static) -> Result<Self, SlpError> {
        let concepts = store
            .load_all()?
            .into_iter()
            .map(ConceptRecord::into_concept)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            state: CoreState::from_concepts(concepts),
            backend: StorageBackend::Persistent(Box::new(store)),
        })
    }

    /// Open or create a redb database at the given path and rehydrate from it.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, SlpError> {
        Self::with_store(RedbStore::open(path)?)
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Read access to the admitted concepts.
    #[must_use]
    pub fn state(&self) -> &CoreState {
        &self.state
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Lookup a concept by id.
    #[must_use]
    pub fn get(&self, id: &ConceptId) -> Option<&Concept> {
        self.state.get(id)
    }

    /// Lineage chain from `id` back to its root, newest first.
    #[must_use]
    pub fn lineage(&self, id: &ConceptId) -> Vec<&Concept> {
        lineage_chain(&self.state, id)
    }

    /// The raw payload a concept was admitted with, if it was kept.
    pub fn payload(&self, id: &ConceptId) -> Result<Option<String>, SlpError> {
        match &self.backend {
            StorageBackend::InMemory(payloads) => Ok(payloads.get(id).cloned()),
            StorageBackend::Persistent(store) => store.payload(id),
        }
    }

    // =========================================================================
    // ADMISSION
    // =========================================================================

    /// Run the whole pipeline for one submission.
    pub fn submit<E: Embedder + ?Sized>(
        &mut self,
        submission: &Submission,
        params: &CoreParams,
        embedder: &E,
    ) -> Result<IntegrateResult, SlpError> {
        let embedding = embed_submission(submission, params, embedder)?;
        self.admit(submission, embedding, params)
    }

    /// Admit a submission whose embedding was already produced.
    ///
    /// This is the part that must run under the writer lock.
    pub fn admit(
        &mut self,
        submission: &Submission,
        embedding: Vec<f64>,
        params: &CoreParams,
    ) -> Result<IntegrateResult, SlpError> {
        let result = prepare_concept(submission, embedding, &self.state, params)?;
        self.store(&result.concept, Some(submission.payload()))?;
        self.state.insert(result.concept.clone());
        Ok(result)
    }

    /// Import records (e.g. from a snapshot) in order.
    ///
    /// Records whose id is already admitted are skipped. The batch is checked
    /// in full before anything is stored: each embedding must honor the
    /// embedding contract, and its length must match the other concepts of
    /// its version, admitted or imported alongside it.
    /// Returns the number of records imported.
    pub fn import(&mut self, records: Vec<ConceptRecord>) -> Result<usize, SlpError> {
        let mut batch_dims: BTreeMap<String, usize> = BTreeMap::new();
        let mut seen: BTreeSet<ConceptId> = BTreeSet::new();
        let mut pending = Vec::new();

        for record in records {
            if self.state.contains(&record.id) || !seen.insert(record.id.clone()) {
                continue;
            }
            let payload = record.payload.clone();
            let concept = record.into_concept()?;

            let version = concept.embedding_version();
            let dim = concept.embedding().len();
            let expected = match self.state.dimensionality(version) {
                Some(existing) => existing,
                None => *batch_dims.entry(version.to_string()).or_insert(dim),
            };
            if dim != expected {
                return Err(SlpError::InvalidInput(format!(
                    "record {} has {} components but version {} uses {}",
                    concept.id(),
                    dim,
                    version,
                    expected
                )));
            }
            pending.push((concept, payload));
        }

        let imported = pending.len();
        for (concept, payload) in pending {
            self.store(&concept, payload.as_deref())?;
            self.state.insert(concept);
        }
        Ok(imported)
    }

    /// All concepts as records in insertion order, with payloads where kept.
    pub fn records(&self) -> Result<Vec<ConceptRecord>, SlpError> {
        self.state
            .iter()
            .map(|c| -> Result<ConceptRecord, SlpError> {
                Ok(ConceptRecord::from_concept(c, self.payload(c.id())?))
            })
            .collect()
    }

    fn store(&mut self, concept: &Concept, payload: Option<&str>) -> Result<(), SlpError> {
        match &mut self.backend {
            StorageBackend::InMemory(payloads) => {
                if let Some(text) = payload {
                    payloads.insert(concept.id().clone(), text.to_string());
                }
                Ok(())
            }
            StorageBackend::Persistent(store) => store.persist(concept, payload),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HashEmbedder;

    /// Store that refuses every write.
    struct ReadOnlyStore;

    impl ConceptStore for ReadOnlyStore {
        fn load_all(&self) -> Result<Vec<ConceptRecord>, SlpError> {
            Ok(Vec::new())
        }

        fn persist(&mut self, _concept: &Concept, _payload: Option<&str>) -> Result<(), SlpError> {
            Err(SlpError::IoError("read-only".to_string()))
        }

        fn payload(&self, _id: &ConceptId) -> Result<Option<String>, SlpError> {
            Ok(None)
        }
    }

    fn submission(payload: &str, timestamp: f64) -> Submission {
        Submission::new(payload, vec!["tester".to_string()], timestamp).expect("submission")
    }

    #[test]
    fn in_memory_submit_keeps_payload() {
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        let mut ledger = Ledger::new();

        let result = ledger
            .submit(&submission("hello", 1.0), &CoreParams::default(), &embedder)
            .expect("submit");

        assert!(!ledger.is_persistent());
        assert_eq!(ledger.len(), 1);
        assert_eq!(
            ledger.payload(result.concept.id()).expect("payload"),
            Some("hello".to_string())
        );
    }

    #[test]
    fn storage_failure_leaves_state_untouched() {
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        let mut ledger = Ledger::with_store(ReadOnlyStore).expect("ledger");

        let result = ledger.submit(&submission("hello", 1.0), &CoreParams::default(), &embedder);

        assert!(matches!(result, Err(SlpError::IoError(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn redb_rehydration_reproduces_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.redb");
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        let params = CoreParams::default();

        let before: Vec<Concept> = {
            let mut ledger = Ledger::with_redb(&path).expect("open");
            for (i, text) in ["alpha", "beta", "alpha"].iter().enumerate() {
                ledger
                    .submit(&submission(text, i as f64), &params, &embedder)
                    .expect("submit");
            }
            ledger.state().iter().cloned().collect()
        };

        let ledger = Ledger::with_redb(&path).expect("reopen");
        let after: Vec<Concept> = ledger.state().iter().cloned().collect();
        assert_eq!(before, after);
        assert!(ledger.is_persistent());

        let last = after.last().expect("last");
        assert!(last.is_near_duplicate());
        assert_eq!(
            ledger.payload(last.id()).expect("payload"),
            Some("alpha".to_string())
        );
    }

    /// A record admitted by a fresh in-memory ledger, for tampering.
    fn sample_record(payload: &str) -> ConceptRecord {
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        let mut source = Ledger::new();
        source
            .submit(&submission(payload, 1.0), &CoreParams::default(), &embedder)
            .expect("submit");
        source.records().expect("records").remove(0)
    }

    #[test]
    fn import_rejects_foreign_dimension_in_existing_partition() {
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        let params = CoreParams::default();
        let mut ledger = Ledger::new();
        ledger
            .submit(&submission("resident", 1.0), &params, &embedder)
            .expect("submit");

        let mut foreign = sample_record("foreign");
        foreign.embedding = vec![1.0, 0.0, 0.0];
        let result = ledger.import(vec![foreign]);

        assert!(matches!(result, Err(SlpError::InvalidInput(_))));
        assert_eq!(ledger.len(), 1);
        ledger
            .submit(&submission("still works", 2.0), &params, &embedder)
            .expect("partition stays usable");
    }

    #[test]
    fn import_rejects_mixed_dimensions_within_batch() {
        let good = sample_record("good");
        let mut short = sample_record("short");
        short.id = ConceptId::new("c-short");
        short.embedding = vec![0.0, 1.0];

        let mut ledger = Ledger::new();
        let result = ledger.import(vec![good, short]);

        assert!(matches!(result, Err(SlpError::InvalidInput(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn import_rejects_unnormalized_embedding() {
        let mut bad = sample_record("bad");
        bad.embedding = vec![5.0, 0.0, 0.0];

        let mut ledger = Ledger::new();
        let result = ledger.import(vec![bad]);

        assert!(matches!(result, Err(SlpError::SerializationError(_))));
        assert!(ledger.is_empty());
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        ledger
            .submit(&submission("hello", 1.0), &CoreParams::default(), &embedder)
            .expect("submit after rejected import");
    }

    #[test]
    fn import_skips_known_ids() {
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        let mut source = Ledger::new();
        source
            .submit(&submission("one", 1.0), &CoreParams::default(), &embedder)
            .expect("submit");
        source
            .submit(&submission("two", 2.0), &CoreParams::default(), &embedder)
            .expect("submit");
        let records = source.records().expect("records");

        let mut target = Ledger::new();
        assert_eq!(target.import(records.clone()).expect("import"), 2);
        assert_eq!(target.import(records).expect("import"), 0);
        assert_eq!(target.len(), 2);
    }
}
