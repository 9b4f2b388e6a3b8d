pub mod config;
pub mod device;
pub mod error;
pub mod geo;
pub mod store;
pub mod visit;
