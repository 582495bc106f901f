//! Closed error taxonomy surfaced by the core (spec §7).
//!
//! The geometry kernel and voxel map never produce these — they return
//! `Option`/`bool`. Everything above (netlist, library, search, router,
//! placement, assembly) maps its own typed error into one of these
//! variants or propagates a more specific error that implements `Into`.

use thiserror::Error;

use crate::netlist::{InstanceId, NetworkId};

/// Reason a single-network route failed (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NoPathReason {
    #[error("no sequence of moves reaches the sink")]
    Unreachable,
    #[error("every move was blocked by an occupied voxel or prior bus")]
    Blocked,
    #[error("search exceeded its explored-state budget before finding a path")]
    OverBudget,
}

/// Component whose search budget was exceeded (spec §5, §7 `OverBudget`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Component {
    #[error("A* router")]
    Router,
    #[error("simulated-annealing placement")]
    Placement,
}

/// The closed error set surfaced by `synthesize` and its sub-stages.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("bad netlist ({kind}): {details}")]
    BadNetlist { kind: &'static str, details: String },

    #[error("bad tile at {path}: missing or invalid field `{field}`")]
    BadTile { path: String, field: &'static str },

    #[error("placement engine could not seed a valid initial state for instance {0}")]
    Infeasible(InstanceId),

    #[error("no path for network {network}: {reason}")]
    NoPath {
        network: NetworkId,
        reason: NoPathReason,
    },

    #[error("network {0} could not be routed and on_unroutable=abort")]
    Unroutable(NetworkId),

    #[error("{component} exceeded its configured search budget")]
    OverBudget { component: Component },

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
