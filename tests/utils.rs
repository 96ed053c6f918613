use lstm_mixer::utils::activation::{clip, sigmoid, sigmoid_derivative, tanh_derivative};
use lstm_mixer::utils::probability::{clamp, cost_bits, to_u16, PROB_MIN};

#[test]
fn test_sigmoid() {
    assert_eq!(sigmoid(0.), 0.5);
    assert!((sigmoid(2.) + sigmoid(-2.) - 1.).abs() < 1e-6);
    assert_eq!(sigmoid(-1000.), 0.);
    assert_eq!(sigmoid(1000.), 1.);
    assert!(sigmoid(f32::NEG_INFINITY) == 0.);

    // Check the derivative against a finite difference.
    for x in [-3., -0.5, 0., 0.7, 2.5_f32] {
        let eps = 1e-2;
        let numeric = (sigmoid(x + eps) - sigmoid(x - eps)) / (2. * eps);
        assert!((numeric - sigmoid_derivative(sigmoid(x))).abs() < 1e-3);
        let numeric = ((x + eps).tanh() - (x - eps).tanh()) / (2. * eps);
        assert!((numeric - tanh_derivative(x.tanh())).abs() < 1e-3);
    }
}

#[test]
fn test_clip() {
    assert_eq!(clip(0.5, 1.), (0.5, false));
    assert_eq!(clip(1., 1.), (1., false));
    assert_eq!(clip(3., 1.), (1., true));
    assert_eq!(clip(-3., 2.), (-2., true));
}

#[test]
fn test_probability() {
    assert_eq!(clamp(0.), PROB_MIN);
    assert_eq!(clamp(1.), 1. - PROB_MIN);
    assert!(clamp(1.) < 1.);
    assert_eq!(clamp(0.25), 0.25);
    assert_eq!(clamp(f32::NAN), 0.5);

    assert_eq!(to_u16(0.), 1);
    assert_eq!(to_u16(0.5), 32768);
    assert_eq!(to_u16(1.), 65535);
    // Rounding to 16 bits barely changes the cost of a bit.
    for p in [0.01, 0.3, 0.5, 0.97] {
        let coded = to_u16(p) as f32 / 65536.;
        assert!((cost_bits(coded, 1) - cost_bits(p, 1)).abs() < 0.01);
    }

    assert!((cost_bits(0.5, 1) - 1.).abs() < 1e-9);
    assert!((cost_bits(0.5, 0) - 1.).abs() < 1e-9);
    assert!((cost_bits(0.25, 0) - (4_f64 / 3.).log2()).abs() < 1e-9);
    assert!((cost_bits(0.25, 1) - 2.).abs() < 1e-9);
    // A confident miss is expensive but finite.
    let miss = cost_bits(1., 0);
    assert!(miss.is_finite() && miss > 15.);
}
