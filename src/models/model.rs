use crate::error::Result;

/// A trait that defines the interface for making bit predictions from an
/// externally supplied input vector.
pub trait Predictor {
    /// Return the probability that the next bit is a one, given 'inputs'.
    /// The probability is strictly inside (0, 1).
    fn predict(&mut self, inputs: &[f32]) -> Result<f32>;

    /// Train on the bit 'bit' that followed the last prediction.
    fn learn(&mut self, bit: u8) -> Result<()>;

    /// Forget the temporal context without forgetting what was learned.
    fn reset(&mut self);
}
