// src/lib.rs
//! Half-hour availability polls.
//!
//! An organizer picks a date range and a daily window in a base time zone.
//! Participants submit the 30-minute slots they can make as canonical slot
//! keys, and anyone can read back a heat-map of overlap in their own zone.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod grid;
pub mod handlers;
pub mod models;
pub mod poll;
pub mod routes;
pub mod services;
pub mod slot;
pub mod store;
