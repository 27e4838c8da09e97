//! Newsdeck - a personalized news-reading service
//!
//! Users register, log in, browse categorized headlines fetched from an
//! external news search API, bookmark articles, and build up a reading
//! history. This service owns no storage of its own: user records live in
//! an external resource store, and news content comes from an external
//! search API.

pub mod config;
pub mod models;
pub mod news;
pub mod routes;
pub mod session;
pub mod store;
