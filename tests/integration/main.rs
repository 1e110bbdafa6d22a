//! Integration tests for the ingestion pipeline
//!
//! These tests use wiremock to stand in for the listing site and run the
//! stages end-to-end against an in-memory database.

mod common;
mod pagination_tests;
mod pipeline_tests;
