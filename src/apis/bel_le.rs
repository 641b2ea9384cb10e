use crate::apis::base::EpidemiologyFetcher;
use crate::constants::{BEL_LE_SOURCE, BEL_LE_URL};
use crate::dates::feed_to_canonical;
use crate::error::Result;
use crate::feed::{RawRow, Table};
use crate::pipeline::RunContext;
use crate::types::CanonicalRecord;
use tracing::{debug, instrument};

const COUNTRY: &str = "Belgium";
const COUNTRYCODE: &str = "BEL";

/// Country-level cumulative series for Belgium, maintained on GitHub by
/// eschnou from Sciensano and federal government bulletins.
///
/// The feed writes `-1` (or any negative number) where a value is unknown.
/// That convention belongs to this feed only.
pub struct BelgiumFetcher;

impl Default for BelgiumFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Column positions, resolved once per table
struct Columns {
    date: usize,
    tested: usize,
    confirmed: usize,
    hospitalised: usize,
    icu: usize,
    dead: usize,
    recovered: usize,
}

impl Columns {
    fn locate(table: &Table) -> Result<Self> {
        let col = |name| table.column_index(BEL_LE_SOURCE, name);
        Ok(Self {
            date: col("date")?,
            tested: col("cumul_tests")?,
            confirmed: col("cumul_cases")?,
            hospitalised: col("hospitalized")?,
            icu: col("icu")?,
            dead: col("cumul_deceased")?,
            recovered: col("cumul_released")?,
        })
    }
}

impl BelgiumFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Negative counts mark missing data in this feed.
    fn count(row: &RawRow, index: usize, column: &str) -> Result<Option<u64>> {
        Ok(row.int(index, column)?.and_then(|v| u64::try_from(v).ok()))
    }

    fn normalize_row(&self, row: &RawRow, cols: &Columns) -> Result<CanonicalRecord> {
        let date = feed_to_canonical(row.text(cols.date), row.line)?;

        let mut record = CanonicalRecord::country_level(
            BEL_LE_SOURCE,
            date,
            COUNTRY.to_string(),
            COUNTRYCODE.to_string(),
            vec![COUNTRYCODE.to_string()],
        );
        record.tested = Self::count(row, cols.tested, "cumul_tests")?;
        record.confirmed = Self::count(row, cols.confirmed, "cumul_cases")?;
        record.hospitalised = Self::count(row, cols.hospitalised, "hospitalized")?;
        record.hospitalised_icu = Self::count(row, cols.icu, "icu")?;
        record.dead = Self::count(row, cols.dead, "cumul_deceased")?;
        record.recovered = Self::count(row, cols.recovered, "cumul_released")?;
        Ok(record)
    }
}

impl EpidemiologyFetcher for BelgiumFetcher {
    fn source(&self) -> &'static str {
        BEL_LE_SOURCE
    }

    fn default_url(&self) -> &'static str {
        BEL_LE_URL
    }

    #[instrument(skip_all, fields(source = BEL_LE_SOURCE))]
    fn normalize(&self, table: &Table, ctx: &mut RunContext<'_>) -> Result<()> {
        let cols = Columns::locate(table)?;
        for row in &table.rows {
            let record = self.normalize_row(row, &cols)?;
            ctx.emit(&record)?;
        }
        debug!("Normalized {} Belgian rows", table.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetcherError;
    use crate::region::InMemoryRegions;
    use crate::storage::{InMemoryStore, UpsertSink};

    const HEADER: &str = "date,cumul_tests,cumul_cases,hospitalized,icu,cumul_deceased,cumul_released\n";

    fn table(rows: &str) -> Table {
        Table::from_csv(format!("{HEADER}{rows}").as_bytes()).unwrap()
    }

    fn normalize(rows: &str) -> Result<Vec<CanonicalRecord>> {
        let store = InMemoryStore::new();
        let regions = InMemoryRegions::new();
        let mut ctx = RunContext::new(BEL_LE_SOURCE, &regions, &store);
        BelgiumFetcher::new().normalize(&table(rows), &mut ctx)?;
        Ok(store.records_snapshot())
    }

    #[test]
    fn test_single_row_example() {
        let records = normalize("15/03/2020,100,50,-1,5,2,10\n").unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.source, "BEL_LE");
        assert_eq!(r.date, "2020-03-15");
        assert_eq!(r.country, "Belgium");
        assert_eq!(r.countrycode, "BEL");
        assert_eq!(r.gid, vec!["BEL".to_string()]);
        assert_eq!(r.adm_area_1, None);
        assert_eq!(r.tested, Some(100));
        assert_eq!(r.confirmed, Some(50));
        assert_eq!(r.hospitalised, None);
        assert_eq!(r.hospitalised_icu, Some(5));
        assert_eq!(r.dead, Some(2));
        assert_eq!(r.recovered, Some(10));
    }

    #[test]
    fn test_every_negative_column_becomes_absent() {
        let records = normalize("16/03/2020,-1,-2,-3,-4,-5,-6\n").unwrap();
        let r = &records[0];
        let values = [
            r.tested,
            r.confirmed,
            r.hospitalised,
            r.hospitalised_icu,
            r.dead,
            r.recovered,
        ];
        for value in values {
            assert_eq!(value, None);
        }
    }

    #[test]
    fn test_zero_is_kept_and_blank_is_absent() {
        let records = normalize("17/03/2020,0,,0,,0,\n").unwrap();
        let r = &records[0];
        assert_eq!(r.tested, Some(0));
        assert_eq!(r.confirmed, None);
        assert_eq!(r.hospitalised, Some(0));
        assert_eq!(r.recovered, None);
    }

    #[test]
    fn test_bad_date_aborts_the_run() {
        let err = normalize("15/03/2020,1,1,1,1,1,1\n2020-03-16,1,1,1,1,1,1\n").unwrap_err();
        assert!(matches!(err, FetcherError::DateFormat { line: 2, .. }));
    }

    #[test]
    fn test_records_stream_to_the_sink_before_a_failure() {
        let store = InMemoryStore::new();
        let regions = InMemoryRegions::new();
        let mut ctx = RunContext::new(BEL_LE_SOURCE, &regions, &store);
        let t = table("15/03/2020,1,1,1,1,1,1\nbad,1,1,1,1,1,1\n");

        assert!(BelgiumFetcher::new().normalize(&t, &mut ctx).is_err());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let t = Table::from_csv("date,cumul_cases\n15/03/2020,5\n".as_bytes()).unwrap();
        let store = InMemoryStore::new();
        let regions = InMemoryRegions::new();
        let mut ctx = RunContext::new(BEL_LE_SOURCE, &regions, &store);

        let err = BelgiumFetcher::new().normalize(&t, &mut ctx).unwrap_err();
        assert!(matches!(err, FetcherError::MissingColumn { .. }));
    }
}
