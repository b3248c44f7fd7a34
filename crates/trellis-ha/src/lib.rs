//! ---
//! trellis_section: "07-resilience-fault-tolerance"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Master election and failover for management nodes."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Master election and failover supervisor for Trellis management nodes.
//!
//! Exactly one registered node is master at a time; every other node runs as
//! a hot standby and rebinds read-only until it is promoted.

mod node;
mod supervisor;

pub use node::{HeartbeatStatus, NodeContext, NodeRuntimeState};
pub use supervisor::{FailoverEvent, FailoverReason, HaSupervisor};
