use crate::error::Result;
use crate::feed::Table;
use crate::types::AdmDivision;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Lookup from a country code to its canonical name, administrative
/// breakdown and geographic identifiers.
pub trait RegionResolver {
    fn resolve(&self, countrycode: &str) -> Result<Option<AdmDivision>>;
}

/// Country-level division reference held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegions {
    divisions: BTreeMap<String, AdmDivision>,
}

impl InMemoryRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, countrycode: &str, division: AdmDivision) {
        self.divisions.insert(countrycode.to_string(), division);
    }

    pub fn len(&self) -> usize {
        self.divisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.divisions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AdmDivision)> {
        self.divisions.iter()
    }

    /// Load a reference CSV with columns
    /// `countrycode,country,adm_area_1,adm_area_2,adm_area_3,gid`.
    /// `gid` holds `;`-separated identifiers; a blank cell means none.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        const SOURCE: &str = "division reference";
        let table = Table::from_csv(reader)?;
        let code_idx = table.column_index(SOURCE, "countrycode")?;
        let country_idx = table.column_index(SOURCE, "country")?;
        let adm1_idx = table.column_index(SOURCE, "adm_area_1")?;
        let adm2_idx = table.column_index(SOURCE, "adm_area_2")?;
        let adm3_idx = table.column_index(SOURCE, "adm_area_3")?;
        let gid_idx = table.column_index(SOURCE, "gid")?;

        let mut regions = Self::new();
        for row in &table.rows {
            let Some(code) = row.opt_text(code_idx) else {
                continue;
            };
            let gid = row.opt_text(gid_idx).map(|g| {
                g.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            });
            regions.insert(
                code,
                AdmDivision {
                    country: row.text(country_idx).to_string(),
                    adm_area_1: row.opt_text(adm1_idx).map(str::to_string),
                    adm_area_2: row.opt_text(adm2_idx).map(str::to_string),
                    adm_area_3: row.opt_text(adm3_idx).map(str::to_string),
                    gid: gid.filter(|g| !g.is_empty()),
                },
            );
        }
        Ok(regions)
    }

    pub fn load_csv(path: &Path) -> Result<Self> {
        let regions = Self::from_csv(File::open(path)?)?;
        info!("Loaded {} divisions from {}", regions.len(), path.display());
        Ok(regions)
    }
}

impl RegionResolver for InMemoryRegions {
    fn resolve(&self, countrycode: &str) -> Result<Option<AdmDivision>> {
        Ok(self.divisions.get(countrycode).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_csv() {
        let data = "countrycode,country,adm_area_1,adm_area_2,adm_area_3,gid\n\
                    TWN,Taiwan,,,,TWN\n\
                    XKO,Kosovo,,,,\n\
                    ITA,Italy,,,,ITA; ITA.1\n\
                    ,Nowhere,,,,\n";
        let regions = InMemoryRegions::from_csv(data.as_bytes()).unwrap();

        assert_eq!(regions.len(), 3);
        let twn = regions.resolve("TWN").unwrap().unwrap();
        assert_eq!(twn.country, "Taiwan");
        assert_eq!(twn.gid, Some(vec!["TWN".to_string()]));
        assert_eq!(regions.resolve("XKO").unwrap().unwrap().gid, None);
        assert_eq!(
            regions.resolve("ITA").unwrap().unwrap().gid,
            Some(vec!["ITA".to_string(), "ITA.1".to_string()])
        );
        assert!(regions.resolve("FRA").unwrap().is_none());
    }
}
