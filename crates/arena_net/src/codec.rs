//! MessagePack codec helpers.
//!
//! Every payload on an arena subject is MessagePack, encoded through these
//! two functions so failures map onto [`NetError`].

use serde::{Deserialize, Serialize};

use crate::error::NetError;

/// Serialise `value` into a wire payload.
///
/// # Errors
///
/// Returns [`NetError::Encode`] if the value has no MessagePack form.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, NetError> {
    rmp_serde::to_vec(value).map_err(NetError::Encode)
}

/// Read a `T` back out of a wire payload, borrowing from `bytes` where the
/// type allows.
///
/// # Errors
///
/// Returns [`NetError::Decode`] for truncated or mistyped payloads.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, NetError> {
    rmp_serde::from_slice(bytes).map_err(NetError::Decode)
}

#[cfg(test)]
mod tests {
    use arena_input::ControlState;

    use super::*;
    use crate::messages::ReducerOutcome;

    #[test]
    fn test_control_state_survives_the_wire() {
        let state = ControlState {
            forward: true,
            sprint: true,
            sequence: 42,
            ..ControlState::default()
        };
        let bytes = encode(&state).unwrap();
        let restored: ControlState = decode(&bytes).unwrap();
        assert_eq!(state, restored);
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let result: Result<ReducerOutcome, _> = decode(&[0xFF, 0xFF]);
        assert!(matches!(result, Err(NetError::Decode(_))));
    }
}
