use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Delta, EventSchedule, HostType, Model, Snapshot, Tick};

/// Errors that can occur while putting a Message on or taking it off the wire
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The message could not be encoded
    #[error("Failed to encode message: {0}")]
    Encode(String),

    /// The bytes received do not hold a valid message
    #[error("Failed to decode message: {0}")]
    Decode(String),
}

/// Everything an Authority and its Predictors say to each other
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub enum Message<M: Model> {
    /// Authority → Predictor, once, before anything else
    InitialState { snapshot: Snapshot<M>, seed_base: u64 },
    /// Either direction. One player's input for one tick.
    InputUpdate {
        player: M::Player,
        input: M::Input,
        client_tick: Tick,
    },
    /// Authority → Predictor. The whole schedule as of `tick`.
    EventNotice {
        tick: Tick,
        schedule: EventSchedule<M>,
    },
    /// Authority → Predictor
    FullStateUpdate {
        snapshot: Snapshot<M>,
        schedule: EventSchedule<M>,
        authority_tick: Tick,
    },
    /// Authority → Predictor. Built against the previous update's snapshot.
    DeltaStateUpdate {
        delta: Delta<M>,
        schedule: EventSchedule<M>,
        authority_tick: Tick,
    },
    /// Predictor → Authority
    FullStateRequest,
}

impl<M: Model> Message<M> {
    pub fn to_bytes(&self) -> Result<Vec<u8>, MessageError> {
        bincode::serialize(self).map_err(|error| MessageError::Encode(error.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MessageError> {
        bincode::deserialize(bytes).map_err(|error| MessageError::Decode(error.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Message::InitialState { .. } => "InitialState",
            Message::InputUpdate { .. } => "InputUpdate",
            Message::EventNotice { .. } => "EventNotice",
            Message::FullStateUpdate { .. } => "FullStateUpdate",
            Message::DeltaStateUpdate { .. } => "DeltaStateUpdate",
            Message::FullStateRequest => "FullStateRequest",
        }
    }

    /// Whether a host of type `host` may send this message
    pub fn sendable_by(&self, host: HostType) -> bool {
        match self {
            Message::InputUpdate { .. } => true,
            Message::FullStateRequest => host == HostType::Predictor,
            Message::InitialState { .. }
            | Message::EventNotice { .. }
            | Message::FullStateUpdate { .. }
            | Message::DeltaStateUpdate { .. } => host == HostType::Authority,
        }
    }
}
