//! Runs stored pipelines of HTTP calls, threading values extracted from each
//! response into the templated requests of the next step.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod models;
pub mod repository;
pub mod services;
