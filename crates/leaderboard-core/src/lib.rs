//! Core types, engines and trait definitions for the leaderboard pipeline.
//!
//! This crate has no database or filesystem dependencies.
//! The badge and aggregation engines are pure functions over domain types;
//! persistence goes through the [`store::LeaderboardStore`] trait.

pub mod activity;
pub mod aggregate;
pub mod badge;
pub mod catalog;
pub mod contributor;
pub mod error;
pub mod merge;
pub mod store;

pub use error::{Error, Result};
