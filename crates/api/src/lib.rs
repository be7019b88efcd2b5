//! `gangway-api` — the HTTP surface of the onboarding pipeline.

pub mod app;
pub mod config;
