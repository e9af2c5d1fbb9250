//! # Consent-Grid Test Suite
//!
//! End-to-end flows through a running [`cg_runtime::ConsentGrid`], driven by
//! the simulation connector and a manual clock.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs           # harness, fixtures, polling helpers
//!     ├── permission_flow.rs   # create → accept → revoke, status messages
//!     ├── document_flow.rs     # readings → envelopes → consumers
//!     ├── reclamation.rs       # stale permissions time out exactly once
//!     ├── retransmission.rs    # routing and validation outcomes
//!     └── recovery.rs          # file ledger survives a restart
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cg-tests
//! cargo test -p cg-tests integration::document_flow
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
