use serde::{Deserialize, Serialize};

/// Storage-ready observation for one (source, date, region).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub source: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub country: String,
    pub countrycode: String,
    pub adm_area_1: Option<String>,
    pub adm_area_2: Option<String>,
    pub adm_area_3: Option<String>,
    pub gid: Vec<String>,
    pub tested: Option<u64>,
    pub confirmed: Option<u64>,
    pub dead: Option<u64>,
    pub hospitalised: Option<u64>,
    pub hospitalised_icu: Option<u64>,
    pub recovered: Option<u64>,
}

/// Natural key of a canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub source: String,
    pub date: String,
    pub countrycode: String,
    pub adm_area_1: Option<String>,
    pub adm_area_2: Option<String>,
    pub adm_area_3: Option<String>,
}

impl CanonicalRecord {
    /// Country-level record with every counter absent.
    pub fn country_level(
        source: &str,
        date: String,
        country: String,
        countrycode: String,
        gid: Vec<String>,
    ) -> Self {
        Self {
            source: source.to_string(),
            date,
            country,
            countrycode,
            adm_area_1: None,
            adm_area_2: None,
            adm_area_3: None,
            gid,
            tested: None,
            confirmed: None,
            dead: None,
            hospitalised: None,
            hospitalised_icu: None,
            recovered: None,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            source: self.source.clone(),
            date: self.date.clone(),
            countrycode: self.countrycode.clone(),
            adm_area_1: self.adm_area_1.clone(),
            adm_area_2: self.adm_area_2.clone(),
            adm_area_3: self.adm_area_3.clone(),
        }
    }

    /// Merge `self` onto a stored record with the same key. Descriptive
    /// fields are replaced; counters are only replaced where `self` reports
    /// a value, so an absent counter never clears what is stored.
    pub fn merged_onto(&self, existing: &CanonicalRecord) -> CanonicalRecord {
        CanonicalRecord {
            source: self.source.clone(),
            date: self.date.clone(),
            country: self.country.clone(),
            countrycode: self.countrycode.clone(),
            adm_area_1: self.adm_area_1.clone(),
            adm_area_2: self.adm_area_2.clone(),
            adm_area_3: self.adm_area_3.clone(),
            gid: self.gid.clone(),
            tested: self.tested.or(existing.tested),
            confirmed: self.confirmed.or(existing.confirmed),
            dead: self.dead.or(existing.dead),
            hospitalised: self.hospitalised.or(existing.hospitalised),
            hospitalised_icu: self.hospitalised_icu.or(existing.hospitalised_icu),
            recovered: self.recovered.or(existing.recovered),
        }
    }
}

/// Result of handing a record to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Inserted => "inserted",
            UpsertOutcome::Updated => "updated",
            UpsertOutcome::Unchanged => "unchanged",
        }
    }
}

/// Administrative breakdown for a country code, as returned by a region
/// resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmDivision {
    pub country: String,
    pub adm_area_1: Option<String>,
    pub adm_area_2: Option<String>,
    pub adm_area_3: Option<String>,
    pub gid: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(confirmed: Option<u64>, dead: Option<u64>) -> CanonicalRecord {
        let mut r = CanonicalRecord::country_level(
            "WRD_ECDC",
            "2020-03-01".into(),
            "Italy".into(),
            "ITA".into(),
            vec!["ITA".into()],
        );
        r.confirmed = confirmed;
        r.dead = dead;
        r
    }

    #[test]
    fn test_merge_keeps_stored_values_for_absent_counters() {
        let stored = record(Some(10), Some(1));
        let incoming = record(Some(12), None);

        let merged = incoming.merged_onto(&stored);
        assert_eq!(merged.confirmed, Some(12));
        assert_eq!(merged.dead, Some(1));
    }

    #[test]
    fn test_key_ignores_counters() {
        assert_eq!(record(Some(1), None).key(), record(None, Some(5)).key());
    }
}
