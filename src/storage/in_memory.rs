use super::traits::UpsertSink;
use crate::error::Result;
use crate::types::{CanonicalRecord, RecordKey, UpsertOutcome};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// In-memory storage implementation for dry runs and testing
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<BTreeMap<RecordKey, CanonicalRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, BTreeMap<RecordKey, CanonicalRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stored records in natural-key order.
    pub fn records_snapshot(&self) -> Vec<CanonicalRecord> {
        self.records().values().cloned().collect()
    }
}

impl UpsertSink for InMemoryStore {
    fn upsert(&self, record: &CanonicalRecord) -> Result<UpsertOutcome> {
        let key = record.key();
        let mut records = self.records();

        let outcome = match records.get(&key) {
            None => {
                records.insert(key, record.clone());
                UpsertOutcome::Inserted
            }
            Some(existing) => {
                let merged = record.merged_onto(existing);
                if &merged == existing {
                    UpsertOutcome::Unchanged
                } else {
                    records.insert(key, merged);
                    UpsertOutcome::Updated
                }
            }
        };

        debug!(
            "{} {} {} {}",
            outcome.as_str(),
            record.source,
            record.countrycode,
            record.date
        );
        Ok(outcome)
    }

    fn get(&self, key: &RecordKey) -> Result<Option<CanonicalRecord>> {
        Ok(self.records().get(key).cloned())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bel_record(confirmed: Option<u64>, hospitalised: Option<u64>) -> CanonicalRecord {
        let mut r = CanonicalRecord::country_level(
            "BEL_LE",
            "2020-03-15".into(),
            "Belgium".into(),
            "BEL".into(),
            vec!["BEL".into()],
        );
        r.confirmed = confirmed;
        r.hospitalised = hospitalised;
        r
    }

    #[test]
    fn test_upsert_twice_is_idempotent() {
        let store = InMemoryStore::new();
        let record = bel_record(Some(50), Some(7));

        assert_eq!(store.upsert(&record).unwrap(), UpsertOutcome::Inserted);
        let once = store.records_snapshot();
        assert_eq!(store.upsert(&record).unwrap(), UpsertOutcome::Unchanged);

        assert_eq!(store.records_snapshot(), once);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_absent_counter_leaves_stored_value() {
        let store = InMemoryStore::new();
        store.upsert(&bel_record(Some(50), Some(7))).unwrap();

        let outcome = store.upsert(&bel_record(Some(55), None)).unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let stored = store.get(&bel_record(None, None).key()).unwrap().unwrap();
        assert_eq!(stored.confirmed, Some(55));
        assert_eq!(stored.hospitalised, Some(7));
        assert_eq!(store.count().unwrap(), 1);
    }
}
