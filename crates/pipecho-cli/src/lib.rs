//! pipecho CLI library: the coordinator that wires console input to the
//! echo client and server.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod coordinator;

pub use coordinator::{Coordinator, ShutdownReport, UnitStatus, wait_bounded};
