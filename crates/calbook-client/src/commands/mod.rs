//! Command handlers.

pub mod auth;
pub mod calendar;
pub mod config;
