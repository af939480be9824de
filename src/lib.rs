pub mod app;
pub mod cli;
pub mod config;
pub mod controllers;
pub mod debounce;
pub mod error;
pub mod identity;
pub mod models;
pub mod router;
pub mod transport;
pub mod ui;

#[cfg(test)]
mod testing;

