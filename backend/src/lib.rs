//! # Rail Topology Backend
//!
//! Consistency engine for railway sector-topology reference data.
//!
//! Stations and blocks are grouped into ordered train sectors, which belong to
//! dispatch (DNC) or electrification (ECD) sectors. Sectors are related by
//! symmetric adjacency and by DNC/ECD nearest-neighbor pairs. The engine keeps
//! these relations consistent: pairs are normalized and unique, membership
//! lists are reconciled deterministically, and deleting a sector cascades
//! through everything that references it in a single transaction.
//!
//! ## Architecture
//!
//! - [`models`]: entity types, ids and normalized pairs
//! - [`db`]: repository pattern with Postgres (Diesel) and in-memory backends
//! - [`services`]: the consistency engine operations
//! - [`api`]: consolidated public types
//! - [`http`]: Axum-based REST API (feature `http-server`)

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod db;
pub mod models;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
