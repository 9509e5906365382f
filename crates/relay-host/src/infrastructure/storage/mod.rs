//! Persistence for host configuration.

pub mod config;
