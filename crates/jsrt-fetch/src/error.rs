//! Fetch errors.
//!
//! Every failure carries the state-machine state it occurred in; the
//! promise rejection message on the JavaScript side mentions it.

use std::fmt;
use thiserror::Error;

/// States of one fetch, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    ParsingUrl,
    ResolvingDns,
    Connecting,
    Handshaking,
    Sending,
    Receiving,
    Settled,
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchState::ParsingUrl => "parsing URL",
            FetchState::ResolvingDns => "resolving DNS",
            FetchState::Connecting => "connecting",
            FetchState::Handshaking => "TLS handshaking",
            FetchState::Sending => "sending request",
            FetchState::Receiving => "receiving response",
            FetchState::Settled => "settled",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    /// Any failure inside the state machine, tagged with where it
    /// happened.
    #[error("fetch failed while {state}: {reason}")]
    State { state: FetchState, reason: String },

    /// `Response::json()` on a non-JSON body.
    #[error("invalid JSON in response body: {0}")]
    Json(String),
}

impl FetchError {
    pub fn at(state: FetchState, reason: impl fmt::Display) -> Self {
        FetchError::State {
            state,
            reason: reason.to_string(),
        }
    }

    /// The state this error occurred in, if it came from the machine.
    pub fn state(&self) -> Option<FetchState> {
        match self {
            FetchError::State { state, .. } => Some(*state),
            FetchError::Json(_) => None,
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mentions_state() {
        let err = FetchError::at(FetchState::Handshaking, "certificate expired");
        assert!(err.to_string().contains("TLS handshaking"));
        assert_eq!(err.state(), Some(FetchState::Handshaking));
    }
}
