pub mod base;
pub mod factory;

// Source-specific fetchers
pub mod bel_le;
pub mod wrd_ecdc;

pub use base::EpidemiologyFetcher;
pub use factory::create_fetcher;
