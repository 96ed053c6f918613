//! Errors reported by the mixer to its immediate caller.

use thiserror::Error;

/// Error types that can occur while building or driving a mixer.
///
/// Configuration errors are fatal to construction. The per-call errors are
/// recoverable: the call that reports them leaves the mixer untouched.
/// Numeric trouble inside the network is never reported here, it is
/// contained by clipping (see `LstmMixer::clip_events`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixerError {
    /// The mixer could not be constructed with the requested parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The input vector does not have the width the mixer was built with.
    #[error("Invalid input: expected {expected} values, found {found}")]
    InvalidInput { expected: usize, found: usize },
    /// The input vector contains a NaN or an infinity at 'index'.
    #[error("Invalid input: value at index {index} is not finite")]
    NonFiniteInput { index: usize },
    /// The observed bit was neither 0 nor 1.
    #[error("Invalid target: expected 0 or 1, found {0}")]
    InvalidTarget(u8),
    /// 'learn' was called without a preceding 'predict'.
    #[error("No cached forward pass: call predict before learn")]
    NoCachedForwardPass,
}

pub type Result<T> = std::result::Result<T, MixerError>;

#[test]
fn test_error_messages() {
    let err = MixerError::InvalidInput {
        expected: 3,
        found: 2,
    };
    assert_eq!(err.to_string(), "Invalid input: expected 3 values, found 2");
    assert!(MixerError::InvalidTarget(7).to_string().contains('7'));
    assert!(MixerError::NoCachedForwardPass
        .to_string()
        .contains("predict"));

    let err: Box<dyn std::error::Error> =
        Box::new(MixerError::InvalidConfiguration(String::from("no cells")));
    assert_eq!(err.to_string(), "Invalid configuration: no cells");
}
