pub mod apis;
pub mod config;
pub mod constants;
pub mod dates;
pub mod error;
pub mod feed;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod region;
pub mod storage;
pub mod types;
