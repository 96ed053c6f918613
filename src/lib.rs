pub mod error;
pub mod models;
pub mod utils;

pub use error::{MixerError, Result};
pub use models::lstm::{LstmMixer, Parameters, Phase, RecurrentState};
pub use models::model::Predictor;

/// The default bound on each gradient component.
pub const DEFAULT_GRADIENT_CLIP: f32 = 1.0;
/// The default bound on the magnitude of the cell state.
pub const DEFAULT_CELL_CLIP: f32 = 16.0;
/// Weights are initialized uniformly in (-r, r) with
/// r = DEFAULT_INIT_SCALE / sqrt(num_inputs + num_cells) unless a range is
/// given explicitly.
pub const DEFAULT_INIT_SCALE: f32 = 4.0;
/// The default initial bias of the forget gate. A positive value makes the
/// cell remember by default.
pub const DEFAULT_FORGET_BIAS: f32 = 1.0;

/// Stores the parameters that a mixer is built with. The dimensions and the
/// learning rate are fixed for the lifetime of the mixer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MixerConfig {
    /// Specifies the width of the input vector.
    num_inputs: usize,
    /// Specifies the number of memory cells (and the hidden state width).
    num_cells: usize,
    /// Specifies the step size of every weight update.
    learning_rate: f32,
    /// Seeds the weight initialization.
    seed: u64,
    /// Weights are sampled uniformly from (-range, range). When missing the
    /// range is derived from DEFAULT_INIT_SCALE.
    init_range: Option<f32>,
    /// The initial bias of the forget gate.
    forget_bias: f32,
    /// The bound on each gradient component.
    gradient_clip: f32,
    /// The bound on the magnitude of each cell state value.
    cell_clip: f32,
    /// Report 'learn' without a preceding 'predict' as an error, instead of
    /// ignoring the call.
    strict: bool,
    /// After the weight update, re-evaluate the last step with the corrected
    /// weights and make the result the new recurrent state.
    refresh_state: bool,
}

impl MixerConfig {
    pub fn new(num_inputs: usize, num_cells: usize, learning_rate: f32) -> Self {
        Self {
            num_inputs,
            num_cells,
            learning_rate,
            seed: 0,
            init_range: None,
            forget_bias: DEFAULT_FORGET_BIAS,
            gradient_clip: DEFAULT_GRADIENT_CLIP,
            cell_clip: DEFAULT_CELL_CLIP,
            strict: true,
            refresh_state: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_init_range(mut self, range: f32) -> Self {
        self.init_range = Some(range);
        self
    }

    pub fn with_forget_bias(mut self, bias: f32) -> Self {
        self.forget_bias = bias;
        self
    }

    pub fn with_gradient_clip(mut self, limit: f32) -> Self {
        self.gradient_clip = limit;
        self
    }

    pub fn with_cell_clip(mut self, limit: f32) -> Self {
        self.cell_clip = limit;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_state_refresh(mut self, refresh: bool) -> Self {
        self.refresh_state = refresh;
        self
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn forget_bias(&self) -> f32 {
        self.forget_bias
    }

    pub fn gradient_clip(&self) -> f32 {
        self.gradient_clip
    }

    pub fn cell_clip(&self) -> f32 {
        self.cell_clip
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn refreshes_state(&self) -> bool {
        self.refresh_state
    }

    /// Return the range of the uniform weight initialization.
    pub fn init_range(&self) -> f32 {
        self.init_range.unwrap_or_else(|| {
            DEFAULT_INIT_SCALE / ((self.num_inputs + self.num_cells) as f32).sqrt()
        })
    }

    /// Check that a mixer can be built from this configuration.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, val: f32) -> Result<()> {
            if val.is_finite() && val > 0. {
                return Ok(());
            }
            Err(MixerError::InvalidConfiguration(format!(
                "{} must be positive and finite, got {}",
                name, val
            )))
        }

        if self.num_inputs == 0 {
            return Err(MixerError::InvalidConfiguration(String::from(
                "the number of inputs must be at least 1",
            )));
        }
        if self.num_cells == 0 {
            return Err(MixerError::InvalidConfiguration(String::from(
                "the number of cells must be at least 1",
            )));
        }
        positive("learning rate", self.learning_rate)?;
        positive("init range", self.init_range())?;
        positive("gradient clip", self.gradient_clip)?;
        positive("cell clip", self.cell_clip)?;
        if !self.forget_bias.is_finite() {
            return Err(MixerError::InvalidConfiguration(format!(
                "forget bias must be finite, got {}",
                self.forget_bias
            )));
        }
        Ok(())
    }
}

#[test]
fn test_config_validation() {
    assert!(MixerConfig::new(3, 16, 0.1).validate().is_ok());
    assert!(MixerConfig::new(0, 16, 0.1).validate().is_err());
    assert!(MixerConfig::new(3, 0, 0.1).validate().is_err());
    assert!(MixerConfig::new(3, 16, 0.).validate().is_err());
    assert!(MixerConfig::new(3, 16, -0.5).validate().is_err());
    assert!(MixerConfig::new(3, 16, f32::NAN).validate().is_err());
    let bad_clip = MixerConfig::new(3, 16, 0.1).with_gradient_clip(0.);
    assert!(bad_clip.validate().is_err());
    let bad_range = MixerConfig::new(3, 16, 0.1).with_init_range(-1.);
    assert!(bad_range.validate().is_err());

    let cfg = MixerConfig::new(9, 16, 0.1);
    assert_eq!(cfg.init_range(), 0.8);
    assert_eq!(cfg.with_init_range(0.5).init_range(), 0.5);
    assert_eq!(cfg.forget_bias(), DEFAULT_FORGET_BIAS);
    assert_eq!(cfg.gradient_clip(), DEFAULT_GRADIENT_CLIP);
    assert_eq!(cfg.cell_clip(), DEFAULT_CELL_CLIP);
    assert!(cfg.is_strict() && cfg.refreshes_state());
    let bad_bias = cfg.with_forget_bias(f32::INFINITY);
    assert!(bad_bias.validate().is_err());
}
