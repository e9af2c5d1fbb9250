//! # Retransmission (cg-06)
//!
//! Routing of retransmission requests to the connector that owns the
//! permission, plus the validation connectors share before they forward a
//! request to their administrator.
//!
//! ```text
//!  caller ──► RetransmissionRouter ──► RegionConnectorRetransmissionService
//!                                              │
//!                                              └── RetransmissionValidation
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod router;
pub mod validation;

pub use config::RetransmissionConfig;
pub use router::RetransmissionRouter;
pub use validation::RetransmissionValidation;
