//! Playbook: a pickup-line sharing backend
//!
//! Items, tags and users live in a relational store ([`state`]) and are mirrored into a
//! search projection ([`search`]) that serves ranked, personalized queries. Writes go through
//! [`services`], which order the two stores and compensate failed creates.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod search;
pub mod services;
pub mod state;

pub use error::{AppError, Result};
