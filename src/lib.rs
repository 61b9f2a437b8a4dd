pub mod api_router;
pub mod config;
pub mod datacube;
pub mod engagement;
pub mod main_module;
pub mod practice_test;
pub mod questions;
pub mod quiz;
pub mod security;
pub mod shared;
pub mod statistics;
pub mod store;
pub mod taxonomy;
