//! Tests that run the service end to end against a scripted caption source

pub mod e2e;
pub mod fixtures;
