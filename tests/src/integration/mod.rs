//! Cross-component flows.

pub mod support;

mod document_flow;
mod permission_flow;
mod reclamation;
mod recovery;
mod retransmission;
