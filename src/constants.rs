//! Source codes and endpoints for the built-in fetchers.

// Source codes (stored in every record's `source` column)
pub const BEL_LE_SOURCE: &str = "BEL_LE";
pub const WRD_ECDC_SOURCE: &str = "WRD_ECDC";

// Default feed endpoints
pub const BEL_LE_URL: &str =
    "https://raw.githubusercontent.com/eschnou/covid19-be/master/covid19-belgium.csv";
pub const WRD_ECDC_URL: &str = "https://opendata.ecdc.europa.eu/covid19/casedistribution/csv";

// Whether a source runs when none are named explicitly
pub const BEL_LE_ENABLED_BY_DEFAULT: bool = false;
pub const WRD_ECDC_ENABLED_BY_DEFAULT: bool = true;

/// Raw ECDC country codes that differ from the canonical ISO alpha-3 code.
/// `XKO` is a reserved non-ISO code for Kosovo.
pub const ECDC_COUNTRY_CODE_REMAP: &[(&str, &str)] = &[
    ("CNG1925", "TWN"),
    ("MSF", "MSR"),
    ("XKX", "XKO"),
];

/// Get all supported source codes
pub fn get_supported_sources() -> Vec<&'static str> {
    vec![BEL_LE_SOURCE, WRD_ECDC_SOURCE]
}

/// Whether a source is loaded when the configuration does not say otherwise
pub fn enabled_by_default(source: &str) -> bool {
    match source {
        BEL_LE_SOURCE => BEL_LE_ENABLED_BY_DEFAULT,
        WRD_ECDC_SOURCE => WRD_ECDC_ENABLED_BY_DEFAULT,
        _ => false,
    }
}

pub const DEFAULT_DB_PATH: &str = "data/epidemiology.db";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "epi_fetcher.log";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_USER_AGENT: &str = concat!("epi_fetcher/", env!("CARGO_PKG_VERSION"));
