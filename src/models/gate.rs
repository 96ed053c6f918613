//! A single gate of the recurrent cell: a dense layer followed by a squashing
//! function.

use crate::utils::activation::clip;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// A dense layer that maps the concatenated vector [inputs ∥ hidden] of
/// length 'width' to 'rows' pre-activations. The weights are stored row-major:
/// row 'j' holds the weights of output 'j'.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    weights: Vec<f32>,
    bias: Vec<f32>,
    width: usize,
}

impl Gate {
    /// Create a gate with 'rows' outputs over 'width' inputs. The weights are
    /// sampled from 'dist' and every bias is set to 'bias'.
    pub fn new<R: Rng>(
        rows: usize,
        width: usize,
        bias: f32,
        dist: &Uniform<f32>,
        rng: &mut R,
    ) -> Self {
        let weights = (0..rows * width).map(|_| dist.sample(rng)).collect();
        Self {
            weights,
            bias: vec![bias; rows],
            width,
        }
    }

    pub fn rows(&self) -> usize {
        self.bias.len()
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn bias(&self) -> &[f32] {
        &self.bias
    }

    /// Compute squash(W · z + b) into 'out'.
    pub fn forward(&self, z: &[f32], out: &mut [f32], squash: fn(f32) -> f32) {
        debug_assert_eq!(z.len(), self.width);
        debug_assert_eq!(out.len(), self.rows());
        let rows = self.weights.chunks_exact(self.width);
        for ((o, row), b) in out.iter_mut().zip(rows).zip(&self.bias) {
            let dot: f32 = row.iter().zip(z).map(|(w, x)| w * x).sum();
            *o = squash(dot + b);
        }
    }

    /// Move the parameters along the gradient of the pre-activations
    /// 'delta' for the input 'z': W[j,k] += rate * delta[j] * z[k] and
    /// b[j] += rate * delta[j]. Every gradient component is bounded by
    /// 'limit'. Returns the number of components that were clipped.
    pub fn ascend(
        &mut self,
        delta: &[f32],
        z: &[f32],
        rate: f32,
        limit: f32,
    ) -> u64 {
        debug_assert_eq!(delta.len(), self.rows());
        debug_assert_eq!(z.len(), self.width);
        let mut clipped = 0;
        let rows = self.weights.chunks_exact_mut(self.width);
        for ((row, b), &d) in rows.zip(self.bias.iter_mut()).zip(delta) {
            // A zero delta leaves the whole row unchanged.
            if d == 0. {
                continue;
            }
            for (w, &x) in row.iter_mut().zip(z) {
                let (g, hit) = clip(d * x, limit);
                clipped += hit as u64;
                *w += rate * g;
            }
            let (g, hit) = clip(d, limit);
            clipped += hit as u64;
            *b += rate * g;
        }
        clipped
    }
}

#[test]
fn test_gate_forward_and_ascend() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let mut rng = StdRng::seed_from_u64(7);
    let dist = Uniform::new(-0.5_f32, 0.5);
    let mut gate = Gate::new(2, 3, 1.0, &dist, &mut rng);
    assert_eq!(gate.rows(), 2);
    assert_eq!(gate.weights().len(), 6);
    assert!(gate.weights().iter().all(|w| w.abs() <= 0.5));
    assert_eq!(gate.bias(), &[1.0, 1.0]);

    // With a zero input only the bias contributes.
    let mut out = [0.; 2];
    gate.forward(&[0., 0., 0.], &mut out, |x| x);
    assert_eq!(out, [1.0, 1.0]);

    // A positive delta on row 0 increases its response to the same input.
    let z = [1., 0.5, -1.];
    gate.forward(&z, &mut out, |x| x);
    let before = out;
    let clipped = gate.ascend(&[0.2, 0.], &z, 0.5, 10.);
    assert_eq!(clipped, 0);
    gate.forward(&z, &mut out, |x| x);
    assert!(out[0] > before[0]);
    assert_eq!(out[1], before[1]);

    // Oversized gradients are clipped and counted.
    let clipped = gate.ascend(&[100., 0.], &z, 0.1, 1.);
    assert_eq!(clipped, 4);
}
