//! This module implements a recurrent mixer: a single LSTM layer followed by a
//! logistic output unit, trained online one bit at a time.
//!
//! For each step the mixer concatenates the caller's inputs with the previous
//! hidden state, z = [x ∥ h], and computes:
//!
//! - i = σ(W_i·z + b_i), f = σ(W_f·z + b_f), o = σ(W_o·z + b_o)
//! - g = tanh(W_g·z + b_g)
//! - c' = f ⊙ c + i ⊙ g, h' = o ⊙ tanh(c')
//! - p = σ(w·h' + b)
//!
//! Training follows the log-loss gradient back through a single step only.
//! The gradient with respect to the previous state is dropped, so every
//! update costs the same regardless of how long the stream has been running.

use super::gate::Gate;
use super::model::Predictor;
use crate::error::{MixerError, Result};
use crate::utils::activation::{clip, sigmoid, sigmoid_derivative, tanh_derivative};
use crate::utils::probability;
use crate::MixerConfig;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};

/// The learned weights of the mixer.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    input: Gate,
    forget: Gate,
    output: Gate,
    candidate: Gate,
    /// Projects the hidden state to the output logit.
    projection: Vec<f32>,
    projection_bias: f32,
}

impl Parameters {
    fn new(config: &MixerConfig) -> Self {
        let cells = config.num_cells();
        let width = config.num_inputs() + cells;
        let range = config.init_range();
        let dist = Uniform::new(-range, range);
        let mut rng = StdRng::seed_from_u64(config.seed());

        let input = Gate::new(cells, width, 0., &dist, &mut rng);
        let forget = Gate::new(cells, width, config.forget_bias(), &dist, &mut rng);
        let output = Gate::new(cells, width, 0., &dist, &mut rng);
        let candidate = Gate::new(cells, width, 0., &dist, &mut rng);
        let projection = (0..cells).map(|_| dist.sample(&mut rng)).collect();

        Self {
            input,
            forget,
            output,
            candidate,
            projection,
            projection_bias: 0.,
        }
    }

    pub fn input_gate(&self) -> &Gate {
        &self.input
    }

    pub fn forget_gate(&self) -> &Gate {
        &self.forget
    }

    pub fn output_gate(&self) -> &Gate {
        &self.output
    }

    pub fn candidate_gate(&self) -> &Gate {
        &self.candidate
    }

    pub fn projection(&self) -> &[f32] {
        &self.projection
    }

    pub fn projection_bias(&self) -> f32 {
        self.projection_bias
    }

    /// Evaluate one step over 'cache.z' and 'cache.cell_prev', and fill the
    /// rest of the cache. Returns the number of clipped cell values.
    fn forward(&self, cache: &mut ForwardCache, cell_clip: f32) -> u64 {
        self.input.forward(&cache.z, &mut cache.input, sigmoid);
        self.forget.forward(&cache.z, &mut cache.forget, sigmoid);
        self.output.forward(&cache.z, &mut cache.output, sigmoid);
        self.candidate.forward(&cache.z, &mut cache.candidate, f32::tanh);

        let mut clipped = 0;
        let mut logit = self.projection_bias;
        for j in 0..self.projection.len() {
            let c = cache.forget[j] * cache.cell_prev[j]
                + cache.input[j] * cache.candidate[j];
            let (c, hit) = clip(c, cell_clip);
            clipped += hit as u64;
            cache.cell[j] = c;
            cache.cell_tanh[j] = c.tanh();
            cache.hidden[j] = cache.output[j] * cache.cell_tanh[j];
            logit += self.projection[j] * cache.hidden[j];
        }

        cache.prob = probability::clamp(sigmoid(logit));
        clipped
    }

    /// Move every weight along the gradient of the log-likelihood of 'bit'
    /// for the step recorded in 'cache'. Returns the number of clipped
    /// gradient components.
    fn backward(
        &mut self,
        cache: &ForwardCache,
        bit: u8,
        deltas: &mut Deltas,
        rate: f32,
        limit: f32,
    ) -> u64 {
        // For a logistic output under log-loss the gradient of the logit is
        // just the residual.
        let err = bit as f32 - cache.prob;
        let mut clipped = 0;

        for j in 0..self.projection.len() {
            // The hidden gradient must use the weight before it is updated.
            let dh = err * self.projection[j];
            let i = cache.input[j];
            let f = cache.forget[j];
            let o = cache.output[j];
            let g = cache.candidate[j];
            let tc = cache.cell_tanh[j];

            deltas.output[j] = dh * tc * sigmoid_derivative(o);
            let dc = dh * o * tanh_derivative(tc);
            deltas.input[j] = dc * g * sigmoid_derivative(i);
            deltas.forget[j] = dc * cache.cell_prev[j] * sigmoid_derivative(f);
            deltas.candidate[j] = dc * i * tanh_derivative(g);

            let (grad, hit) = clip(err * cache.hidden[j], limit);
            clipped += hit as u64;
            self.projection[j] += rate * grad;
        }
        let (grad, hit) = clip(err, limit);
        clipped += hit as u64;
        self.projection_bias += rate * grad;

        let z = &cache.z;
        clipped += self.input.ascend(&deltas.input, z, rate, limit);
        clipped += self.forget.ascend(&deltas.forget, z, rate, limit);
        clipped += self.output.ascend(&deltas.output, z, rate, limit);
        clipped += self.candidate.ascend(&deltas.candidate, z, rate, limit);
        clipped
    }
}

/// The hidden and cell state vectors carried from one step to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrentState {
    hidden: Vec<f32>,
    cell: Vec<f32>,
}

impl RecurrentState {
    fn zeros(cells: usize) -> Self {
        Self {
            hidden: vec![0.; cells],
            cell: vec![0.; cells],
        }
    }

    pub fn hidden(&self) -> &[f32] {
        &self.hidden
    }

    pub fn cell(&self) -> &[f32] {
        &self.cell
    }

    fn clear(&mut self) {
        self.hidden.fill(0.);
        self.cell.fill(0.);
    }

    /// Adopt the state computed by the step in 'cache'.
    fn commit(&mut self, cache: &ForwardCache) {
        self.hidden.copy_from_slice(&cache.hidden);
        self.cell.copy_from_slice(&cache.cell);
    }
}

/// The activations of the last forward step, kept for the backward step.
/// The buffers are allocated once and overwritten by every prediction.
#[derive(Debug, Clone)]
struct ForwardCache {
    /// The concatenation [inputs ∥ previous hidden state].
    z: Vec<f32>,
    input: Vec<f32>,
    forget: Vec<f32>,
    output: Vec<f32>,
    candidate: Vec<f32>,
    cell_prev: Vec<f32>,
    cell: Vec<f32>,
    cell_tanh: Vec<f32>,
    hidden: Vec<f32>,
    prob: f32,
}

impl ForwardCache {
    fn new(inputs: usize, cells: usize) -> Self {
        Self {
            z: vec![0.; inputs + cells],
            input: vec![0.; cells],
            forget: vec![0.; cells],
            output: vec![0.; cells],
            candidate: vec![0.; cells],
            cell_prev: vec![0.; cells],
            cell: vec![0.; cells],
            cell_tanh: vec![0.; cells],
            hidden: vec![0.; cells],
            prob: 0.5,
        }
    }

    /// Record the inputs of a new step.
    fn load(&mut self, inputs: &[f32], state: &RecurrentState) {
        let (x, h) = self.z.split_at_mut(inputs.len());
        x.copy_from_slice(inputs);
        h.copy_from_slice(&state.hidden);
        self.cell_prev.copy_from_slice(&state.cell);
    }
}

/// Scratch space for the gradients of the gate pre-activations.
#[derive(Debug, Clone)]
struct Deltas {
    input: Vec<f32>,
    forget: Vec<f32>,
    output: Vec<f32>,
    candidate: Vec<f32>,
}

impl Deltas {
    fn new(cells: usize) -> Self {
        Self {
            input: vec![0.; cells],
            forget: vec![0.; cells],
            output: vec![0.; cells],
            candidate: vec![0.; cells],
        }
    }
}

/// Tracks whether the forward cache may be used by 'learn'.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No prediction is waiting for its bit.
    Idle,
    /// A prediction was made and the cache holds its activations.
    AwaitingFeedback,
}

/// An LSTM that mixes an input vector into a single bit probability.
#[derive(Debug, Clone)]
pub struct LstmMixer {
    config: MixerConfig,
    params: Parameters,
    state: RecurrentState,
    cache: ForwardCache,
    deltas: Deltas,
    phase: Phase,
    /// The number of values that were clipped to keep the network stable.
    clip_events: u64,
}

impl LstmMixer {
    /// Create a mixer with 'num_inputs' inputs, 'num_cells' memory cells and
    /// the learning rate 'learning_rate'. Other settings use the defaults of
    /// 'MixerConfig'.
    pub fn new(
        num_inputs: usize,
        num_cells: usize,
        learning_rate: f32,
    ) -> Result<Self> {
        Self::with_config(MixerConfig::new(
            num_inputs,
            num_cells,
            learning_rate,
        ))
    }

    pub fn with_config(config: MixerConfig) -> Result<Self> {
        config.validate()?;
        let inputs = config.num_inputs();
        let cells = config.num_cells();
        log::debug!(
            "Creating an LSTM mixer with {} inputs, {} cells and rate {}",
            inputs,
            cells,
            config.learning_rate()
        );

        Ok(Self {
            params: Parameters::new(&config),
            state: RecurrentState::zeros(cells),
            cache: ForwardCache::new(inputs, cells),
            deltas: Deltas::new(cells),
            phase: Phase::Idle,
            clip_events: 0,
            config,
        })
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    pub fn num_inputs(&self) -> usize {
        self.config.num_inputs()
    }

    pub fn num_cells(&self) -> usize {
        self.config.num_cells()
    }

    pub fn learning_rate(&self) -> f32 {
        self.config.learning_rate()
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Return the number of gradient components and cell values that had to
    /// be clipped since the mixer was created.
    pub fn clip_events(&self) -> u64 {
        self.clip_events
    }

    /// Make sure that 'inputs' can be fed into the network.
    fn check_inputs(&self, inputs: &[f32]) -> Result<()> {
        if inputs.len() != self.num_inputs() {
            return Err(MixerError::InvalidInput {
                expected: self.num_inputs(),
                found: inputs.len(),
            });
        }
        if let Some(index) = inputs.iter().position(|x| !x.is_finite()) {
            return Err(MixerError::NonFiniteInput { index });
        }
        Ok(())
    }

    /// Return the probability that the next bit is a one. The new recurrent
    /// state is committed immediately, so calling this twice in a row
    /// advances time twice. Use 'peek' to predict without advancing.
    pub fn predict(&mut self, inputs: &[f32]) -> Result<f32> {
        self.check_inputs(inputs)?;
        self.cache.load(inputs, &self.state);
        self.clip_events +=
            self.params.forward(&mut self.cache, self.config.cell_clip());
        self.state.commit(&self.cache);
        self.phase = Phase::AwaitingFeedback;
        Ok(self.cache.prob)
    }

    /// Return the prediction 'predict' would make for 'inputs', without
    /// changing the recurrent state or the pending forward pass. Values
    /// clipped by a peek are not counted.
    pub fn peek(&self, inputs: &[f32]) -> Result<f32> {
        self.check_inputs(inputs)?;
        let mut scratch = ForwardCache::new(self.num_inputs(), self.num_cells());
        scratch.load(inputs, &self.state);
        self.params.forward(&mut scratch, self.config.cell_clip());
        Ok(scratch.prob)
    }

    /// Train the network on the bit 'bit' that followed the last prediction.
    pub fn learn(&mut self, bit: u8) -> Result<()> {
        if bit > 1 {
            return Err(MixerError::InvalidTarget(bit));
        }
        if self.phase != Phase::AwaitingFeedback {
            if self.config.is_strict() {
                return Err(MixerError::NoCachedForwardPass);
            }
            return Ok(());
        }

        let mut clipped = self.params.backward(
            &self.cache,
            bit,
            &mut self.deltas,
            self.config.learning_rate(),
            self.config.gradient_clip(),
        );

        // Replay the step with the corrected weights. The observed bit only
        // reaches the recurrent state through this replay.
        if self.config.refreshes_state() {
            clipped += self.params.forward(&mut self.cache, self.config.cell_clip());
            self.state.commit(&self.cache);
        }

        if clipped > 0 {
            log::trace!("Clipped {} values while learning", clipped);
            self.clip_events += clipped;
        }
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Zero the recurrent state and drop the pending forward pass. The
    /// weights are kept.
    pub fn reset(&mut self) {
        self.state.clear();
        self.phase = Phase::Idle;
    }

    /// Return a copy of the recurrent state.
    pub fn snapshot(&self) -> RecurrentState {
        self.state.clone()
    }

    /// Replace the recurrent state with 'state', which must come from a mixer
    /// with the same number of cells. Drops the pending forward pass.
    pub fn restore(&mut self, state: &RecurrentState) -> Result<()> {
        let cells = self.num_cells();
        for len in [state.hidden.len(), state.cell.len()] {
            if len != cells {
                return Err(MixerError::InvalidInput {
                    expected: cells,
                    found: len,
                });
            }
        }
        self.state.clone_from(state);
        self.phase = Phase::Idle;
        Ok(())
    }
}

impl Predictor for LstmMixer {
    fn predict(&mut self, inputs: &[f32]) -> Result<f32> {
        LstmMixer::predict(self, inputs)
    }

    fn learn(&mut self, bit: u8) -> Result<()> {
        LstmMixer::learn(self, bit)
    }

    fn reset(&mut self) {
        LstmMixer::reset(self)
    }
}

#[test]
fn test_forward_matches_equations() {
    // A single cell over a single input, checked against a direct
    // evaluation of the cell equations.
    let mut mixer = LstmMixer::new(1, 1, 0.1).unwrap();
    let x = 0.75_f32;
    let p = mixer.predict(&[x]).unwrap();

    let params = mixer.parameters().clone();
    let pre = |gate: &Gate| gate.weights()[0] * x + gate.bias()[0];
    let i = sigmoid(pre(params.input_gate()));
    let f = sigmoid(pre(params.forget_gate()));
    let o = sigmoid(pre(params.output_gate()));
    let g = pre(params.candidate_gate()).tanh();
    let c = f * 0. + i * g;
    let h = o * c.tanh();
    let expected = sigmoid(params.projection()[0] * h);

    assert!((p - expected).abs() < 1e-6);
    assert!((mixer.snapshot().cell()[0] - c).abs() < 1e-6);
    assert!((mixer.snapshot().hidden()[0] - h).abs() < 1e-6);
}

#[test]
fn test_learn_moves_toward_the_bit() {
    // Without the replay the state is untouched by learning, so the effect
    // of a single update can be measured with 'peek'.
    let cfg = MixerConfig::new(2, 4, 0.5).with_state_refresh(false);
    let mut mixer = LstmMixer::with_config(cfg).unwrap();
    let x = [0.3, -0.2];
    let state = mixer.snapshot();
    let p = mixer.predict(&x).unwrap();
    mixer.learn(1).unwrap();
    mixer.restore(&state).unwrap();
    assert!(mixer.peek(&x).unwrap() > p);

    let p = mixer.predict(&x).unwrap();
    mixer.learn(0).unwrap();
    mixer.restore(&state).unwrap();
    assert!(mixer.peek(&x).unwrap() < p);
}

#[test]
fn test_phase_transitions() {
    let mut mixer = LstmMixer::new(1, 2, 0.1).unwrap();
    assert_eq!(mixer.phase(), Phase::Idle);
    mixer.predict(&[1.]).unwrap();
    assert_eq!(mixer.phase(), Phase::AwaitingFeedback);
    mixer.predict(&[1.]).unwrap();
    assert_eq!(mixer.phase(), Phase::AwaitingFeedback);
    mixer.learn(1).unwrap();
    assert_eq!(mixer.phase(), Phase::Idle);
    assert_eq!(mixer.learn(1), Err(MixerError::NoCachedForwardPass));
    mixer.predict(&[1.]).unwrap();
    mixer.reset();
    assert_eq!(mixer.phase(), Phase::Idle);
    assert_eq!(mixer.learn(0), Err(MixerError::NoCachedForwardPass));
}
