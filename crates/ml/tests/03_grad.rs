use std::collections::HashMap;

use ml::graph::Graph;
use ml::nn::Dense;
use ml::tape::Tape;
use ml::Tensor;

const EPS: f32 = 1e-3;
const TOL: f32 = 1e-3;

fn dense_tanh_loss(weights: &[f32], bias: &[f32], x: &[f32]) -> f32 {
    let layer = Dense::new(weights.to_vec(), bias.to_vec(), 3, 2);
    let mut g = Graph::new();
    let mut tensors = HashMap::new();
    let xt = Tensor::from_vec(vec![1, 3], x.to_vec());
    tensors.insert(xt.id, xt.clone());
    let y = layer
        .forward(&xt, &mut g, &mut tensors)
        .tanh(&mut g, &mut tensors);
    y.reduce_sum(&mut g, &mut tensors).data()[0]
}

#[test]
fn dense_tanh_backward_matches_finite_difference() {
    fastrand::seed(0);
    let mut layer = Dense::random(3, 2);
    layer.w.set_requires_grad();
    layer.b.set_requires_grad();

    let mut tape = Tape::new();
    let mut tensors = HashMap::new();
    tensors.insert(layer.w.id, layer.w.clone());
    tensors.insert(layer.b.id, layer.b.clone());
    let x = Tensor::from_vec(vec![1, 3], vec![0.9, -0.1, 0.3]);
    tensors.insert(x.id, x.clone());

    let y = layer
        .forward(&x, &mut tape, &mut tensors)
        .tanh(&mut tape, &mut tensors);
    let loss = y.reduce_sum(&mut tape, &mut tensors);
    tape.backward(&loss, &mut tensors).unwrap();

    let w_grad = tensors[&layer.w.id].grad.clone().unwrap();
    for i in 0..layer.w.data.len() {
        let mut plus = layer.w.data.clone();
        let mut minus = layer.w.data.clone();
        plus[i] += EPS;
        minus[i] -= EPS;
        let numerical = (dense_tanh_loss(&plus, &layer.b.data, x.data())
            - dense_tanh_loss(&minus, &layer.b.data, x.data()))
            / (2.0 * EPS);
        let diff = (numerical - w_grad[i]).abs();
        assert!(
            diff < TOL,
            "weight {i}: numerical {numerical}, analytical {}",
            w_grad[i]
        );
    }

    let b_grad = tensors[&layer.b.id].grad.clone().unwrap();
    for i in 0..layer.b.data.len() {
        let mut plus = layer.b.data.clone();
        let mut minus = layer.b.data.clone();
        plus[i] += EPS;
        minus[i] -= EPS;
        let numerical = (dense_tanh_loss(&layer.w.data, &plus, x.data())
            - dense_tanh_loss(&layer.w.data, &minus, x.data()))
            / (2.0 * EPS);
        let diff = (numerical - b_grad[i]).abs();
        assert!(
            diff < TOL,
            "bias {i}: numerical {numerical}, analytical {}",
            b_grad[i]
        );
    }
}

// The Gaussian log-density uses a learned per-dimension parameter broadcast
// over the batch through exp, mul_broadcast, and add_broadcast.
fn density_loss(log_std: &[f32], sq: &Tensor) -> f32 {
    let mut g = Graph::new();
    let mut tensors = HashMap::new();
    let ls = Tensor::from_vec(vec![2], log_std.to_vec());
    tensors.insert(ls.id, ls.clone());
    tensors.insert(sq.id, sq.clone());
    let inv_var = ls.mul_scalar(-2.0, &mut g, &mut tensors).exp(&mut g, &mut tensors);
    let quad = sq
        .mul_broadcast(&inv_var, &mut g, &mut tensors)
        .mul_scalar(-0.5, &mut g, &mut tensors);
    let neg_ls = ls.mul_scalar(-1.0, &mut g, &mut tensors);
    quad.add_broadcast(&neg_ls, &mut g, &mut tensors)
        .reduce_mean(&mut g, &mut tensors)
        .data()[0]
}

#[test]
fn broadcast_parameter_backward_matches_finite_difference() {
    let mut ls = Tensor::from_vec(vec![2], vec![0.2, -0.4]);
    ls.set_requires_grad();
    let sq = Tensor::from_vec(vec![3, 2], vec![0.1, 0.9, 0.4, 0.2, 1.3, 0.7]);

    let mut tape = Tape::new();
    let mut tensors = HashMap::new();
    tensors.insert(ls.id, ls.clone());
    tensors.insert(sq.id, sq.clone());

    let inv_var = ls
        .mul_scalar(-2.0, &mut tape, &mut tensors)
        .exp(&mut tape, &mut tensors);
    let quad = sq
        .mul_broadcast(&inv_var, &mut tape, &mut tensors)
        .mul_scalar(-0.5, &mut tape, &mut tensors);
    let neg_ls = ls.mul_scalar(-1.0, &mut tape, &mut tensors);
    let loss = quad
        .add_broadcast(&neg_ls, &mut tape, &mut tensors)
        .reduce_mean(&mut tape, &mut tensors);
    tape.backward(&loss, &mut tensors).unwrap();

    let grad = tensors[&ls.id].grad.clone().unwrap();
    for i in 0..ls.data.len() {
        let mut plus = ls.data.clone();
        let mut minus = ls.data.clone();
        plus[i] += EPS;
        minus[i] -= EPS;
        let numerical = (density_loss(&plus, &sq) - density_loss(&minus, &sq)) / (2.0 * EPS);
        let diff = (numerical - grad[i]).abs();
        assert!(
            diff < TOL,
            "log_std {i}: numerical {numerical}, analytical {}",
            grad[i]
        );
    }
}

#[test]
fn mse_gradient_is_two_times_error_over_n() {
    let mut pred = Tensor::from_vec(vec![4, 1], vec![1.0, -0.5, 2.0, 0.0]);
    pred.set_requires_grad();
    let target = Tensor::from_vec(vec![4, 1], vec![0.0, 0.0, 1.0, 1.0]);

    let mut tape = Tape::new();
    let mut tensors = HashMap::new();
    tensors.insert(pred.id, pred.clone());
    tensors.insert(target.id, target.clone());

    let loss = pred
        .sub(&target, &mut tape, &mut tensors)
        .pow(2.0, &mut tape, &mut tensors)
        .reduce_mean(&mut tape, &mut tensors);
    tape.backward(&loss, &mut tensors).unwrap();

    let grad = tensors[&pred.id].grad.clone().unwrap();
    let expected = [2.0 * 1.0 / 4.0, 2.0 * -0.5 / 4.0, 2.0 * 1.0 / 4.0, 2.0 * -1.0 / 4.0];
    for (g, e) in grad.iter().zip(expected.iter()) {
        assert!((g - e).abs() < 1e-6, "grad {g}, expected {e}");
    }
}

#[test]
fn relu_blocks_gradient_below_zero() {
    let mut x = Tensor::from_vec(vec![1, 4], vec![-2.0, -0.1, 0.1, 3.0]);
    x.set_requires_grad();

    let mut tape = Tape::new();
    let mut tensors = HashMap::new();
    tensors.insert(x.id, x.clone());

    let loss = x
        .relu(&mut tape, &mut tensors)
        .reduce_sum(&mut tape, &mut tensors);
    tape.backward(&loss, &mut tensors).unwrap();

    let grad = tensors[&x.id].grad.clone().unwrap();
    assert_eq!(grad, vec![0.0, 0.0, 1.0, 1.0]);
}
