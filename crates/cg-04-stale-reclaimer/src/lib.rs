//! # Stale Request Reclaimer (cg-04)
//!
//! Scheduled sweep that moves permissions stuck in a non-terminal status to
//! `TimedOut`. Safe to run concurrently with itself: the reclaiming commit is
//! conditional on the status the scan saw.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod reclaimer;

pub use config::ReclaimerConfig;
pub use reclaimer::{StaleRequestReclaimer, SweepReport};
