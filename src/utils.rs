//! A collection of utilities for squashing activations and handling
//! probabilities.

/// Activation functions and their derivatives, expressed in terms of the
/// activation value so that the backward pass can reuse the cached outputs.
pub mod activation {
    /// The logistic function, mapping the real line into (0, 1).
    pub fn sigmoid(x: f32) -> f32 {
        // exp(-x) overflows to infinity for very negative inputs, which
        // correctly yields zero, but saturate early to avoid the slow path.
        if x < -40. {
            return 0.;
        }
        if x > 40. {
            return 1.;
        }
        1. / (1. + (-x).exp())
    }

    /// The derivative of the logistic function, given its output 'y'.
    pub fn sigmoid_derivative(y: f32) -> f32 {
        y * (1. - y)
    }

    /// The derivative of tanh, given its output 'y'.
    pub fn tanh_derivative(y: f32) -> f32 {
        1. - y * y
    }

    /// Bound 'x' to the range [-limit, limit]. Returns the bounded value and
    /// true if the value had to be changed.
    pub fn clip(x: f32, limit: f32) -> (f32, bool) {
        debug_assert!(limit > 0.);
        if x > limit {
            return (limit, true);
        }
        if x < -limit {
            return (-limit, true);
        }
        (x, false)
    }
}

/// Helpers for bit probabilities consumed by entropy coders.
pub mod probability {
    /// The smallest probability the mixer ever emits. The largest is
    /// 1 - PROB_MIN. Both are exactly representable as f32.
    pub const PROB_MIN: f32 = 1. / 65536.;

    /// Clamp 'p' into [PROB_MIN, 1 - PROB_MIN].
    pub fn clamp(p: f32) -> f32 {
        if p.is_nan() {
            return 0.5;
        }
        p.clamp(PROB_MIN, 1. - PROB_MIN)
    }

    /// Convert the probability 'p' into the 16-bit range used by bitwise
    /// arithmetic coders. The result is never 0, so both symbols always keep
    /// a non-empty range.
    pub fn to_u16(p: f32) -> u16 {
        let scaled = (clamp(p) * 65536.) as u32;
        scaled.clamp(1, 65535) as u16
    }

    /// Return the ideal coding cost, in bits, of 'bit' when it was predicted
    /// to be a one with probability 'p'.
    pub fn cost_bits(p: f32, bit: u8) -> f64 {
        let p = clamp(p) as f64;
        if bit & 1 == 1 {
            -p.log2()
        } else {
            -(1. - p).log2()
        }
    }
}
