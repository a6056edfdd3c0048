pub mod analysis;
pub mod api;
pub mod collector;
pub mod config;
pub mod fixtures;
pub mod form;
pub mod odds;
pub mod store;
