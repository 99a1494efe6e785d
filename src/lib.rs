pub mod binance;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod server;
pub mod service;
pub mod signals;
pub mod source;
pub mod tracker;
