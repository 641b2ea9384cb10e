use super::traits::UpsertSink;
use crate::error::{FetcherError, Result};
use crate::region::{InMemoryRegions, RegionResolver};
use crate::types::{AdmDivision, CanonicalRecord, RecordKey, UpsertOutcome};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

/// SQLite-backed record store. Also serves the administrative division
/// reference table used for region resolution.
///
/// Administrative areas are stored as empty text when absent so that the
/// natural key can be a plain primary key.
pub struct SqliteStore {
    conn: Connection,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS epidemiology (
        source            TEXT NOT NULL,
        date              TEXT NOT NULL,
        country           TEXT NOT NULL,
        countrycode       TEXT NOT NULL,
        adm_area_1        TEXT NOT NULL DEFAULT '',
        adm_area_2        TEXT NOT NULL DEFAULT '',
        adm_area_3        TEXT NOT NULL DEFAULT '',
        gid               TEXT NOT NULL,
        tested            INTEGER,
        confirmed         INTEGER,
        dead              INTEGER,
        hospitalised      INTEGER,
        hospitalised_icu  INTEGER,
        recovered         INTEGER,
        updated_at        TEXT NOT NULL,
        PRIMARY KEY (source, date, countrycode, adm_area_1, adm_area_2, adm_area_3)
    );
    CREATE TABLE IF NOT EXISTS administrative_division (
        countrycode  TEXT NOT NULL,
        country      TEXT NOT NULL,
        adm_area_1   TEXT NOT NULL DEFAULT '',
        adm_area_2   TEXT NOT NULL DEFAULT '',
        adm_area_3   TEXT NOT NULL DEFAULT '',
        gid          TEXT,
        PRIMARY KEY (countrycode, adm_area_1, adm_area_2, adm_area_3)
    );
"#;

const SELECT_RECORD: &str = "SELECT source, date, country, countrycode, adm_area_1, adm_area_2, adm_area_3,
            gid, tested, confirmed, dead, hospitalised, hospitalised_icu, recovered
     FROM epidemiology
     WHERE source = ?1 AND date = ?2 AND countrycode = ?3
       AND adm_area_1 = ?4 AND adm_area_2 = ?5 AND adm_area_3 = ?6";

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(SCHEMA)?;
        debug!("Opened record store at {}", db_path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Replace country-level division rows with the given reference.
    pub fn import_divisions(&self, regions: &InMemoryRegions) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut imported = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO administrative_division
                    (countrycode, country, adm_area_1, adm_area_2, adm_area_3, gid)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(countrycode, adm_area_1, adm_area_2, adm_area_3)
                 DO UPDATE SET country = excluded.country, gid = excluded.gid",
            )?;
            for (code, division) in regions.iter() {
                let gid = division.gid.as_ref().map(serde_json::to_string).transpose()?;
                stmt.execute(params![
                    code,
                    division.country,
                    key_text(&division.adm_area_1),
                    key_text(&division.adm_area_2),
                    key_text(&division.adm_area_3),
                    gid,
                ])?;
                imported += 1;
            }
        }
        tx.commit()?;
        info!("Imported {} administrative divisions", imported);
        Ok(imported)
    }

    fn read_record(row: &Row<'_>) -> rusqlite::Result<(CanonicalRecord, String)> {
        let gid_json: String = row.get(7)?;
        let record = CanonicalRecord {
            source: row.get(0)?,
            date: row.get(1)?,
            country: row.get(2)?,
            countrycode: row.get(3)?,
            adm_area_1: from_key_text(row.get(4)?),
            adm_area_2: from_key_text(row.get(5)?),
            adm_area_3: from_key_text(row.get(6)?),
            gid: Vec::new(),
            tested: from_count(row.get(8)?),
            confirmed: from_count(row.get(9)?),
            dead: from_count(row.get(10)?),
            hospitalised: from_count(row.get(11)?),
            hospitalised_icu: from_count(row.get(12)?),
            recovered: from_count(row.get(13)?),
        };
        Ok((record, gid_json))
    }

    fn write_record(&self, record: &CanonicalRecord) -> Result<()> {
        let gid = serde_json::to_string(&record.gid)?;
        let tested = to_count(record.tested, "tested")?;
        let confirmed = to_count(record.confirmed, "confirmed")?;
        let dead = to_count(record.dead, "dead")?;
        let hospitalised = to_count(record.hospitalised, "hospitalised")?;
        let hospitalised_icu = to_count(record.hospitalised_icu, "hospitalised_icu")?;
        let recovered = to_count(record.recovered, "recovered")?;
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO epidemiology
                (source, date, country, countrycode, adm_area_1, adm_area_2, adm_area_3, gid,
                 tested, confirmed, dead, hospitalised, hospitalised_icu, recovered, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(source, date, countrycode, adm_area_1, adm_area_2, adm_area_3)
             DO UPDATE SET country = excluded.country, gid = excluded.gid,
                tested = excluded.tested, confirmed = excluded.confirmed, dead = excluded.dead,
                hospitalised = excluded.hospitalised, hospitalised_icu = excluded.hospitalised_icu,
                recovered = excluded.recovered, updated_at = excluded.updated_at",
            params![
                record.source,
                record.date,
                record.country,
                record.countrycode,
                key_text(&record.adm_area_1),
                key_text(&record.adm_area_2),
                key_text(&record.adm_area_3),
                gid,
                tested,
                confirmed,
                dead,
                hospitalised,
                hospitalised_icu,
                recovered,
                updated_at,
            ],
        )?;
        Ok(())
    }
}

impl UpsertSink for SqliteStore {
    fn upsert(&self, record: &CanonicalRecord) -> Result<UpsertOutcome> {
        let outcome = match self.get(&record.key())? {
            None => {
                self.write_record(record)?;
                UpsertOutcome::Inserted
            }
            Some(existing) => {
                let merged = record.merged_onto(&existing);
                if merged == existing {
                    UpsertOutcome::Unchanged
                } else {
                    self.write_record(&merged)?;
                    UpsertOutcome::Updated
                }
            }
        };
        Ok(outcome)
    }

    fn get(&self, key: &RecordKey) -> Result<Option<CanonicalRecord>> {
        let mut stmt = self.conn.prepare(SELECT_RECORD)?;
        let found = stmt
            .query_row(
                params![
                    key.source,
                    key.date,
                    key.countrycode,
                    key_text(&key.adm_area_1),
                    key_text(&key.adm_area_2),
                    key_text(&key.adm_area_3),
                ],
                Self::read_record,
            )
            .optional()?;

        match found {
            Some((mut record, gid_json)) => {
                record.gid = serde_json::from_str(&gid_json)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM epidemiology", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl RegionResolver for SqliteStore {
    fn resolve(&self, countrycode: &str) -> Result<Option<AdmDivision>> {
        let mut stmt = self.conn.prepare(
            "SELECT country, gid FROM administrative_division
             WHERE countrycode = ?1 AND adm_area_1 = '' AND adm_area_2 = '' AND adm_area_3 = ''",
        )?;
        let found = stmt
            .query_row(params![countrycode], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .optional()?;

        let Some((country, gid_json)) = found else {
            return Ok(None);
        };
        let gid = gid_json
            .map(|g| serde_json::from_str::<Vec<String>>(&g))
            .transpose()?
            .filter(|g| !g.is_empty());
        Ok(Some(AdmDivision {
            country,
            adm_area_1: None,
            adm_area_2: None,
            adm_area_3: None,
            gid,
        }))
    }
}

fn key_text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn from_key_text(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// SQLite integers are signed; a count past `i64::MAX` cannot be stored.
fn to_count(value: Option<u64>, column: &'static str) -> Result<Option<i64>> {
    value
        .map(|v| i64::try_from(v).map_err(|_| FetcherError::CountOutOfRange { column, value: v }))
        .transpose()
}

fn from_count(value: Option<i64>) -> Option<u64> {
    value.and_then(|v| u64::try_from(v).ok())
}
