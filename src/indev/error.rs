//! Input subsystem errors
//!
//! Every failure is recovered locally by the caller; none of these are fatal
//! to the process.

use std::collections::TryReserveError;

use thiserror::Error;

use super::capability::Capability;

#[derive(Debug, Error)]
pub enum IndevError {
    /// A record with the same device node is already registered
    #[error("input device {0} is already connected")]
    DuplicateDevice(String),

    /// The node is not an evdev device node (not an error worth reporting)
    #[error("unsupported input device {0}")]
    UnsupportedNode(String),

    /// The input backend could not open or query the node
    #[error("input backend failed to open {0}")]
    BackendOpenFailed(String),

    /// None of the device's capabilities are in the allowed set
    #[error("input device {node} ({capability}) has no allowed capabilities")]
    NoAllowedCapability { node: String, capability: Capability },

    #[error("registry index {index} out of range (count {count})")]
    InvalidIndex { index: usize, count: usize },

    /// Registry storage could not grow
    #[error("could not grow input device registry to {requested} slots: {source}")]
    AllocationFailed {
        requested: usize,
        #[source]
        source: TryReserveError,
    },

    /// Bus context, subscription or readiness descriptor could not be acquired
    #[error("device monitor unavailable ({stage}): {source}")]
    MonitorUnavailable {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl IndevError {
    pub fn monitor(stage: &'static str, source: std::io::Error) -> Self {
        Self::MonitorUnavailable { stage, source }
    }
}
