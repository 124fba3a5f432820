//! Command handlers

pub mod config;
pub mod page;
pub mod serve;
pub mod status;
