use crate::apis::base::EpidemiologyFetcher;
use crate::apis::bel_le::BelgiumFetcher;
use crate::apis::wrd_ecdc::WorldEcdcFetcher;
use crate::constants::*;

/// Factory function to create fetchers by source code
pub fn create_fetcher(source: &str) -> Option<Box<dyn EpidemiologyFetcher>> {
    match source {
        BEL_LE_SOURCE => Some(Box::new(BelgiumFetcher::new())),
        WRD_ECDC_SOURCE => Some(Box::new(WorldEcdcFetcher::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_supported_source_has_a_fetcher() {
        for source in get_supported_sources() {
            let fetcher = create_fetcher(source).expect("fetcher");
            assert_eq!(fetcher.source(), source);
        }
        assert!(create_fetcher("NOPE").is_none());
    }
}
