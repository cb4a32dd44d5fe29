use thiserror::Error;

use crate::{DeltaError, Tick};

/// Errors that can occur while reconciling an authoritative update.
///
/// Each is fatal to the message that caused it only: the receiver should
/// ask the authority for a full snapshot rather than tear the session down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A delta arrived for a tick other than the one that follows the last
    /// authoritative tick
    #[error("Out-of-order delta: expected authority tick {expected}, received {received}")]
    OutOfOrder { expected: Tick, received: Tick },

    /// The delta could not be applied onto the local base snapshot
    #[error("Delta rejected: {0}")]
    Delta(#[from] DeltaError),

    /// An update arrived before any initial state was installed
    #[error("No initial state installed, cannot apply update for authority tick {authority_tick}")]
    NotInitialized { authority_tick: Tick },
}
