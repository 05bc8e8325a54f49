pub mod adapters;
pub mod bot;
pub mod config;
pub mod error;
