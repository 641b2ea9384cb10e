use crate::apis::base::EpidemiologyFetcher;
use crate::constants::{ECDC_COUNTRY_CODE_REMAP, WRD_ECDC_SOURCE, WRD_ECDC_URL};
use crate::dates::{parse_feed_date, to_canonical};
use crate::error::Result;
use crate::feed::Table;
use crate::pipeline::{CumulativeAccumulator, RunContext};
use crate::types::CanonicalRecord;
use chrono::NaiveDate;
use tracing::{debug, info, instrument};

/// Worldwide daily case and death counts from the ECDC case distribution
/// feed. The feed reports new cases per day, so cumulative totals are
/// rebuilt here.
pub struct WorldEcdcFetcher;

impl Default for WorldEcdcFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite legacy or non-ISO ECDC codes to the canonical code.
pub fn map_country_code(raw: &str) -> &str {
    ECDC_COUNTRY_CODE_REMAP
        .iter()
        .find(|(from, _)| *from == raw)
        .map(|(_, to)| *to)
        .unwrap_or(raw)
}

/// One parsed feed line with a usable country code
#[derive(Debug, Clone, PartialEq)]
struct DailyDelta {
    line: usize,
    countrycode: String,
    date: NaiveDate,
    cases: i64,
    deaths: i64,
}

impl WorldEcdcFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Parse every row, then order the usable ones by (code, date). Dates are
    /// validated before codes so schema drift is caught even on rows that
    /// would be skipped.
    fn daily_deltas(&self, table: &Table, ctx: &mut RunContext<'_>) -> Result<Vec<DailyDelta>> {
        let date_idx = table.column_index(WRD_ECDC_SOURCE, "dateRep")?;
        let cases_idx = table.column_index(WRD_ECDC_SOURCE, "cases")?;
        let deaths_idx = table.column_index(WRD_ECDC_SOURCE, "deaths")?;
        let code_idx = table.column_index(WRD_ECDC_SOURCE, "countryterritoryCode")?;

        let mut deltas = Vec::with_capacity(table.len());
        for row in &table.rows {
            let date = parse_feed_date(row.text(date_idx), row.line)?;
            let cases = row.int(cases_idx, "cases")?.unwrap_or(0);
            let deaths = row.int(deaths_idx, "deaths")?.unwrap_or(0);

            let Some(countrycode) = row.opt_text(code_idx).map(map_country_code) else {
                ctx.skip_row(row.line, "no countryterritoryCode");
                continue;
            };

            deltas.push(DailyDelta {
                line: row.line,
                countrycode: countrycode.to_string(),
                date,
                cases,
                deaths,
            });
        }

        deltas.sort_by(|a, b| (&a.countrycode, a.date).cmp(&(&b.countrycode, b.date)));
        Ok(deltas)
    }
}

impl EpidemiologyFetcher for WorldEcdcFetcher {
    fn source(&self) -> &'static str {
        WRD_ECDC_SOURCE
    }

    fn default_url(&self) -> &'static str {
        WRD_ECDC_URL
    }

    #[instrument(skip_all, fields(source = WRD_ECDC_SOURCE))]
    fn normalize(&self, table: &Table, ctx: &mut RunContext<'_>) -> Result<()> {
        let deltas = self.daily_deltas(table, ctx)?;
        let mut accumulator = CumulativeAccumulator::new();

        for delta in &deltas {
            let totals = accumulator.add(&delta.countrycode, delta.cases, delta.deaths)?;

            let division = ctx.resolve(&delta.countrycode)?;
            let degraded = division.as_ref().map_or(true, |d| d.gid.is_none());
            let country = division
                .map(|d| d.country)
                .unwrap_or_else(|| delta.countrycode.clone());

            let mut record = CanonicalRecord::country_level(
                WRD_ECDC_SOURCE,
                to_canonical(delta.date),
                country,
                delta.countrycode.clone(),
                vec![delta.countrycode.clone()],
            );
            // corrections can drive a total below zero; never store that
            record.confirmed = u64::try_from(totals.confirmed).ok();
            record.dead = u64::try_from(totals.dead).ok();

            if degraded {
                ctx.mark_degraded();
            }
            if record.confirmed.is_none() || record.dead.is_none() {
                debug!(line = delta.line, "Negative running total for {}", delta.countrycode);
            }
            ctx.emit(&record)?;
        }

        info!(
            "Rebuilt cumulative series for {} countries from {} rows",
            accumulator.countries(),
            deltas.len()
        );
        Ok(())
    }
}
