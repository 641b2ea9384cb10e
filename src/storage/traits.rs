use crate::error::Result;
use crate::types::{CanonicalRecord, RecordKey, UpsertOutcome};

/// Insert-or-update sink for canonical records, keyed by the natural key
/// `(source, date, countrycode, adm_area_1, adm_area_2, adm_area_3)`.
///
/// Implementations must be idempotent and must treat absent counters as
/// "leave unset" when a record already exists at the key.
pub trait UpsertSink {
    fn upsert(&self, record: &CanonicalRecord) -> Result<UpsertOutcome>;

    fn get(&self, key: &RecordKey) -> Result<Option<CanonicalRecord>>;

    fn count(&self) -> Result<usize>;
}
