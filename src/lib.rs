//! Pallet load planning for window deliveries.
//!
//! Windows of a delivery are assigned to pallets so that the loading depth and
//! the pallet length (plus overhang) are respected. Around the packer sit a
//! catalog store, a delivery service and an HTTP API.

pub mod api;
pub mod config;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod optimizer;
pub mod service;
pub mod store;
pub mod types;
