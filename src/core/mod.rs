pub mod app;
pub mod config;
pub mod constants;
pub mod controller;
pub mod exchange;
pub mod message;
pub mod session;
pub mod store;
