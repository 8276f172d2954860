pub mod config;
pub mod jobs;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::{EventAggregator, PoiFinder, ZoneMatcher};
