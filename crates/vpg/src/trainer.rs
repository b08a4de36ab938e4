use std::collections::HashMap;

use ml::optim::Adam;
use ml::tape::Tape;
use ml::Tensor;
use rand::Rng;
use thiserror::Error;

use crate::experience::{Batch, Experience};
use crate::model::{PolicyNet, ValueNet};

pub const BATCH_SIZE: usize = 64;
const VALUE_LR: f32 = 3e-3;
const VALUE_WEIGHT_DECAY: f32 = 1e-2;
const POLICY_LR: f32 = 3e-4;

#[derive(Debug, Error)]
pub enum TrainError {
    /// The episode's experience partitioned into zero batches.
    #[error("episode produced no training batches")]
    EmptyEpisode,
    /// A loss went non-finite; the episode's remaining updates are aborted
    /// before the offending optimizer step.
    #[error("non-finite {0} loss")]
    InvalidStatistic(&'static str),
    #[error(transparent)]
    Backward(#[from] anyhow::Error),
}

/// Summary statistics for one episode of training. Value figures come from
/// the final batch; the return figures are per-batch values averaged over
/// the whole episode.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeStats {
    pub value_mean: f32,
    pub value_loss: f32,
    pub return_mean: f32,
    pub return_max: f32,
    pub return_min: f32,
}

/// Owns the policy, the value baseline, and their optimizers for the whole
/// run. Created once at startup; parameters are mutated in place on every
/// training batch and never reset.
pub struct Trainer {
    pub policy: PolicyNet,
    pub value: ValueNet,
    opt_policy: Adam,
    opt_value: Adam,
    obs_dim: usize,
    act_dim: usize,
}

impl Trainer {
    pub fn new(obs_dim: usize, act_dim: usize) -> Self {
        let mut policy = PolicyNet::new(obs_dim, act_dim);
        let mut value = ValueNet::new(obs_dim);
        let opt_policy = {
            let params = policy.params_mut();
            let refs: Vec<&Tensor> = params.iter().map(|p| &**p).collect();
            Adam::new(&refs, POLICY_LR)
        };
        let opt_value = {
            let params = value.params_mut();
            let refs: Vec<&Tensor> = params.iter().map(|p| &**p).collect();
            Adam::new(&refs, VALUE_LR).with_weight_decay(VALUE_WEIGHT_DECAY)
        };
        Self {
            policy,
            value,
            opt_policy,
            opt_value,
            obs_dim,
            act_dim,
        }
    }

    /// One full pass over the episode's experience in shuffled batches of
    /// [`BATCH_SIZE`], alternating a value update and a policy update per
    /// batch. Permanently mutates both models' parameters.
    pub fn train_episode(
        &mut self,
        experience: &Experience,
        rng: &mut impl Rng,
    ) -> Result<EpisodeStats, TrainError> {
        let batches = experience.batches(BATCH_SIZE, rng);
        if batches.is_empty() {
            return Err(TrainError::EmptyEpisode);
        }

        let mut return_mean = 0.0;
        let mut return_max = 0.0;
        let mut return_min = 0.0;
        let mut value_mean = 0.0;
        let mut value_loss = 0.0;

        for batch in &batches {
            let (estimates, loss) = self.value_step(batch)?;

            // The baseline leaves the graph here: advantages are plain data,
            // so the policy loss cannot propagate into the value model.
            let advantage: Vec<f32> = batch
                .returns
                .iter()
                .zip(&estimates)
                .map(|(r, v)| r - v)
                .collect();
            self.policy_step(batch, &advantage)?;

            let n = batch.returns.len() as f32;
            return_mean += batch.returns.iter().sum::<f32>() / n;
            return_max += batch.returns.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            return_min += batch.returns.iter().copied().fold(f32::INFINITY, f32::min);
            value_mean = estimates.iter().sum::<f32>() / estimates.len() as f32;
            value_loss = loss;
        }

        let batches_len = batches.len() as f32;
        Ok(EpisodeStats {
            value_mean,
            value_loss,
            return_mean: return_mean / batches_len,
            return_max: return_max / batches_len,
            return_min: return_min / batches_len,
        })
    }

    /// Regresses the value model toward the batch returns with one Adam
    /// step. Returns the (pre-update) estimates and the MSE loss.
    fn value_step(&mut self, batch: &Batch) -> Result<(Vec<f32>, f32), TrainError> {
        let mut tape = Tape::new();
        let mut tensors = HashMap::new();
        for p in self.value.params_mut() {
            p.set_requires_grad();
            tensors.insert(p.id, p.clone());
        }

        let states = Tensor::from_vec(vec![batch.len, self.obs_dim], batch.states.clone());
        tensors.insert(states.id, states.clone());
        let estimates = self.value.forward(&states, &mut tape, &mut tensors);
        let targets = Tensor::from_vec(vec![batch.len, 1], batch.returns.clone());
        tensors.insert(targets.id, targets.clone());

        let loss = estimates
            .sub(&targets, &mut tape, &mut tensors)
            .pow(2.0, &mut tape, &mut tensors)
            .reduce_mean(&mut tape, &mut tensors);
        let loss_value = loss.data()[0];
        if !loss_value.is_finite() {
            return Err(TrainError::InvalidStatistic("value"));
        }

        tape.backward(&loss, &mut tensors)?;
        let mut params = self.value.params_mut();
        for p in params.iter_mut() {
            p.grad = tensors.get(&p.id).and_then(|t| t.grad.clone());
        }
        self.opt_value.step(&mut params);

        Ok((estimates.data().to_vec(), loss_value))
    }

    /// Policy-gradient step with the baseline advantage supplied as plain
    /// data. The loss is `-mean(log_prob * advantage)`: negated because the
    /// optimizer descends while the policy gradient ascends on expected
    /// return. Value parameters are never touched.
    pub fn policy_step(&mut self, batch: &Batch, advantage: &[f32]) -> Result<f32, TrainError> {
        assert_eq!(advantage.len(), batch.len);
        let mut tape = Tape::new();
        let mut tensors = HashMap::new();
        for p in self.policy.params_mut() {
            p.set_requires_grad();
            tensors.insert(p.id, p.clone());
        }

        let states = Tensor::from_vec(vec![batch.len, self.obs_dim], batch.states.clone());
        tensors.insert(states.id, states.clone());
        let actions = Tensor::from_vec(vec![batch.len, self.act_dim], batch.actions.clone());
        tensors.insert(actions.id, actions.clone());

        let log_prob = self.policy.log_prob(&states, &actions, &mut tape, &mut tensors);
        let tiled: Vec<f32> = advantage
            .iter()
            .flat_map(|&a| std::iter::repeat(a).take(self.act_dim))
            .collect();
        let adv = Tensor::from_vec(vec![batch.len, self.act_dim], tiled);
        tensors.insert(adv.id, adv.clone());

        let loss = log_prob
            .mul(&adv, &mut tape, &mut tensors)
            .reduce_mean(&mut tape, &mut tensors)
            .mul_scalar(-1.0, &mut tape, &mut tensors);
        let loss_value = loss.data()[0];
        if !loss_value.is_finite() {
            return Err(TrainError::InvalidStatistic("policy"));
        }

        tape.backward(&loss, &mut tensors)?;
        let mut params = self.policy.params_mut();
        for p in params.iter_mut() {
            p.grad = tensors.get(&p.id).and_then(|t| t.grad.clone());
        }
        self.opt_policy.step(&mut params);

        Ok(loss_value)
    }
}
