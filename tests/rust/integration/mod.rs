//! Integration tests - Tests that load catalogs and compile whole documents
//!
//! These tests verify that parsing, registration, join resolution and the backends work
//! together, without any database.

mod compile_tests;
mod condition_tests;
mod session_cache_tests;
