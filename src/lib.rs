//! qrcompiler - backend-agnostic compiler for Qr query documents
//!
//! This crate turns declarative query documents into backend-native query artifacts:
//! - Qr DSL parsing (criteria trees, pager, sorter, projection)
//! - Field and alias resolution across joined tables
//! - Dialect-aware identifier escaping
//! - Compilation to SQL fragments or typed condition trees
//! - Single-flight caching of compiled sessions

pub mod config;
pub mod join_catalog;
pub mod qr_parser;
pub mod query_generator;
pub mod session;
