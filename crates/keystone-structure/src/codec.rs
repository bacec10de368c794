//! Wire and durable encodings of structure state.
//!
//! # Replicated-state message
//!
//! Sent from the authoritative world to observers. Fields, in order:
//!
//! | Field | Encoding | Present |
//! |-------|----------|---------|
//! | `state` | bincode enum tag | always |
//! | `template_index` | `i8` | only when `state` is `Valid` |
//! | `position_in_template` | three `i32` | only when `state` is `Valid` |
//! | delegate bytes | raw remainder | always (may be empty) |
//!
//! # Durable snapshot
//!
//! Persisted with the node as a JSON object: `master` (bool), `pattern`
//! (`i8`, `-1` for none), and `functional` (the delegate's own value).

use keystone_types::{GridCoordinate, StructureState};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CodecError;

/// Template assignment as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WirePlacement {
    /// Template index; receivers clamp it into their catalog's range.
    pub template_index: i8,
    /// Offset of the node inside the template.
    pub position_in_template: GridCoordinate,
}

/// One node's replicated state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaMessage {
    /// Validity state.
    pub state: StructureState,
    /// Template assignment; only encoded when `state` is `Valid`.
    pub placement: Option<WirePlacement>,
    /// Bytes produced by the functional delegate.
    pub functional: Vec<u8>,
}

impl ReplicaMessage {
    /// Encode the message.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MissingPlacement`] for a `Valid` message with
    /// no placement, or [`CodecError::Wire`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        bincode::serialize_into(&mut buffer, &self.state)?;
        if self.state == StructureState::Valid {
            let placement = self.placement.ok_or(CodecError::MissingPlacement)?;
            bincode::serialize_into(&mut buffer, &placement.template_index)?;
            bincode::serialize_into(&mut buffer, &placement.position_in_template)?;
        }
        buffer.extend_from_slice(&self.functional);
        Ok(buffer)
    }

    /// Decode a message. Everything after the structure fields belongs to
    /// the delegate.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Wire`] on an unknown state tag or a truncated
    /// buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = bytes;
        let state: StructureState = bincode::deserialize_from(&mut cursor)?;
        let placement = if state == StructureState::Valid {
            let template_index: i8 = bincode::deserialize_from(&mut cursor)?;
            let position_in_template: GridCoordinate = bincode::deserialize_from(&mut cursor)?;
            Some(WirePlacement {
                template_index,
                position_in_template,
            })
        } else {
            None
        };
        Ok(Self {
            state,
            placement,
            functional: cursor.to_vec(),
        })
    }
}

/// What a node persists about its structure membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurableSnapshot {
    /// Whether the node held the master role.
    #[serde(default)]
    pub master: bool,
    /// Template index, `-1` for none.
    #[serde(default = "no_pattern")]
    pub pattern: i8,
    /// The delegate's durable state.
    #[serde(default)]
    pub functional: Value,
}

const fn no_pattern() -> i8 {
    -1
}

impl Default for DurableSnapshot {
    fn default() -> Self {
        Self {
            master: false,
            pattern: no_pattern(),
            functional: Value::Null,
        }
    }
}

impl DurableSnapshot {
    /// Encode as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Durable`] if serialization fails.
    pub fn encode(&self) -> Result<Value, CodecError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Durable`] if the value has the wrong shape,
    /// including a `pattern` outside the `i8` range.
    pub fn decode(data: &Value) -> Result<Self, CodecError> {
        Ok(Self::deserialize(data)?)
    }
}
