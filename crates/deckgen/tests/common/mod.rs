//! Shared test utilities for deckgen integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs over a temp output directory and an in-memory database
//! - Builder patterns for capabilities and config documents

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{wait_for, wait_until_settled, TestHarness};
