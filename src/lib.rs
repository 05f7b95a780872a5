pub mod accumulator;
pub mod config;
pub mod export;
pub mod extract;
pub mod models;
pub mod scrapers;
pub mod session;
