use std::collections::HashMap;

use ml::graph::Graph;
use ml::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;

use vpg::experience::{Batch, Experience};
use vpg::trainer::{TrainError, Trainer};

fn fixed_experience(rows: usize, obs_dim: usize, ret: f32) -> Experience {
    let states: Vec<Vec<f32>> = (0..rows)
        .map(|i| (0..obs_dim).map(|d| ((i + d) as f32 * 0.37).sin()).collect())
        .collect();
    let actions: Vec<Vec<f32>> = (0..rows).map(|i| vec![(i as f32 * 0.11).cos()]).collect();
    let returns = vec![ret; rows];
    Experience::new(&states, &actions, &returns)
}

fn fixed_batch(rows: usize, obs_dim: usize) -> Batch {
    let exp = fixed_experience(rows, obs_dim, 0.0);
    let mut batch = Batch {
        states: Vec::new(),
        actions: Vec::new(),
        returns: Vec::new(),
        len: rows,
    };
    for i in 0..rows {
        let (s, a, r) = exp.get(i);
        batch.states.extend_from_slice(s);
        batch.actions.extend_from_slice(a);
        batch.returns.push(r);
    }
    batch
}

fn mean_log_prob(trainer: &Trainer, batch: &Batch, obs_dim: usize) -> f32 {
    let mut g = Graph::new();
    let mut tensors = HashMap::new();
    let states = Tensor::from_vec(vec![batch.len, obs_dim], batch.states.clone());
    tensors.insert(states.id, states.clone());
    let actions = Tensor::from_vec(vec![batch.len, 1], batch.actions.clone());
    tensors.insert(actions.id, actions.clone());
    trainer
        .policy
        .log_prob(&states, &actions, &mut g, &mut tensors)
        .reduce_mean(&mut g, &mut tensors)
        .data()[0]
}

#[test]
fn empty_episode_is_rejected() {
    fastrand::seed(9);
    let mut trainer = Trainer::new(3, 1);
    let mut rng = StdRng::seed_from_u64(9);
    let empty = Experience::new(&[], &[], &[]);
    assert!(matches!(
        trainer.train_episode(&empty, &mut rng),
        Err(TrainError::EmptyEpisode)
    ));
}

#[test]
fn non_finite_returns_abort_the_update() {
    fastrand::seed(10);
    let mut trainer = Trainer::new(2, 1);
    let mut rng = StdRng::seed_from_u64(10);
    let states = vec![vec![0.1, 0.2], vec![0.3, 0.4]];
    let actions = vec![vec![0.5], vec![-0.5]];
    let returns = vec![1.0, f32::NAN];
    let exp = Experience::new(&states, &actions, &returns);
    assert!(matches!(
        trainer.train_episode(&exp, &mut rng),
        Err(TrainError::InvalidStatistic("value"))
    ));
}

#[test]
fn policy_update_ignores_the_value_parameters() {
    fastrand::seed(11);
    let mut a = Trainer::new(2, 1);
    fastrand::seed(11);
    let mut b = Trainer::new(2, 1);

    // Same policy init, different value nets. With the advantage supplied as
    // data the policy update must not depend on the value parameters.
    for w in b.value.l1.w.data.iter_mut() {
        *w += 0.5;
    }
    let value_before = b.value.l1.w.data.clone();

    let batch = fixed_batch(8, 2);
    let advantage = vec![1.0, -0.5, 2.0, 0.0, -1.5, 0.3, 0.7, -0.2];
    a.policy_step(&batch, &advantage).unwrap();
    b.policy_step(&batch, &advantage).unwrap();

    assert_eq!(a.policy.l1.w.data, b.policy.l1.w.data);
    assert_eq!(a.policy.mean_head.w.data, b.policy.mean_head.w.data);
    assert_eq!(a.policy.log_std.data, b.policy.log_std.data);
    assert_eq!(b.value.l1.w.data, value_before);
}

#[test]
fn value_loss_decreases_on_fixed_targets() {
    fastrand::seed(12);
    let mut trainer = Trainer::new(3, 1);
    let mut rng = StdRng::seed_from_u64(12);
    let exp = fixed_experience(64, 3, 1.0);

    let first = trainer.train_episode(&exp, &mut rng).unwrap().value_loss;
    let mut last = first;
    for _ in 0..40 {
        last = trainer.train_episode(&exp, &mut rng).unwrap().value_loss;
    }
    assert!(
        last < first * 0.5,
        "value loss did not drop: first {first}, last {last}"
    );
}

#[test]
fn positive_advantage_raises_action_likelihood() {
    fastrand::seed(13);
    let mut trainer = Trainer::new(2, 1);
    let batch = fixed_batch(16, 2);
    let advantage = vec![1.0; 16];

    let before = mean_log_prob(&trainer, &batch, 2);
    for _ in 0..20 {
        trainer.policy_step(&batch, &advantage).unwrap();
    }
    let after = mean_log_prob(&trainer, &batch, 2);
    assert!(
        after > before,
        "log-likelihood did not rise: before {before}, after {after}"
    );
}
