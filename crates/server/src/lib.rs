//! Promowell server - discount analytics ingestion and dashboard API.
//!
//! This crate hosts the data-normalization and metrics-aggregation pipeline
//! behind the Promowell merchant dashboard:
//!
//! - Webhook receivers for order and discount events
//! - Historical sync drivers that page through the Admin GraphQL API
//! - A normalizer that collapses REST- and GraphQL-shaped payloads into one
//!   canonical record shape per entity
//! - A cross-reference linker that attaches stored discount IDs to order
//!   discount applications
//! - A metrics aggregator for period totals and period-over-period deltas
//!
//! # Architecture
//!
//! - Axum web framework
//! - `PostgreSQL` (sqlx) for the relational store
//! - Shopify Admin GraphQL API via a raw-document reqwest client

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod routes;
pub mod shopify;
pub mod state;
pub mod sync;
