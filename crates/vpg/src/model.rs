use std::collections::HashMap;
use std::f32::consts::PI;

use ml::graph::Graph;
use ml::nn::Dense;
use ml::recorder::Recorder;
use ml::Tensor;
use rand::Rng;
use rand_distr::StandardNormal;

const HIDDEN: usize = 64;

/// Diagonal-Gaussian policy: a tanh MLP mean head plus a learned,
/// state-independent log standard deviation per action dimension.
pub struct PolicyNet {
    pub l1: Dense,
    pub l2: Dense,
    pub mean_head: Dense,
    pub log_std: Tensor,
    obs_dim: usize,
}

impl PolicyNet {
    pub fn new(obs_dim: usize, act_dim: usize) -> Self {
        Self {
            l1: Dense::random(obs_dim, HIDDEN),
            l2: Dense::random(HIDDEN, HIDDEN),
            mean_head: Dense::random(HIDDEN, act_dim),
            log_std: Tensor::zeros(vec![act_dim]),
            obs_dim,
        }
    }

    pub fn params_mut(&mut self) -> Vec<&mut Tensor> {
        vec![
            &mut self.l1.w,
            &mut self.l1.b,
            &mut self.l2.w,
            &mut self.l2.b,
            &mut self.mean_head.w,
            &mut self.mean_head.b,
            &mut self.log_std,
        ]
    }

    /// Distribution mean for a batch of states `[batch, obs_dim]`.
    pub fn mean(
        &self,
        states: &Tensor,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let x = self.l1.forward(states, recorder, tensors).tanh(recorder, tensors);
        let x = self.l2.forward(&x, recorder, tensors).tanh(recorder, tensors);
        self.mean_head.forward(&x, recorder, tensors)
    }

    /// Draws one action for a single observation.
    ///
    /// Runs through the forward-only [`Graph`] path: no gradient information
    /// is recorded at decision time.
    pub fn sample(&self, obs: &[f32], rng: &mut impl Rng) -> Vec<f32> {
        assert_eq!(obs.len(), self.obs_dim);
        let mut graph = Graph::new();
        let mut tensors = HashMap::new();
        let s = Tensor::from_vec(vec![1, self.obs_dim], obs.to_vec());
        tensors.insert(s.id, s.clone());
        let mean = self.mean(&s, &mut graph, &mut tensors);
        mean.data()
            .iter()
            .zip(self.log_std.data())
            .map(|(&m, &ls)| {
                let z: f32 = rng.sample(StandardNormal);
                m + ls.exp() * z
            })
            .collect()
    }

    /// Per-dimension Normal log-density of `actions` under the current
    /// policy, `[batch, act_dim]`, recorded on the tape so gradients flow
    /// into both the mean path and `log_std`.
    pub fn log_prob(
        &self,
        states: &Tensor,
        actions: &Tensor,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let mean = self.mean(states, recorder, tensors);
        let sq = actions
            .sub(&mean, recorder, tensors)
            .pow(2.0, recorder, tensors);
        let inv_var = self
            .log_std
            .mul_scalar(-2.0, recorder, tensors)
            .exp(recorder, tensors);
        let quad = sq
            .mul_broadcast(&inv_var, recorder, tensors)
            .mul_scalar(-0.5, recorder, tensors);
        let neg_log_std = self.log_std.mul_scalar(-1.0, recorder, tensors);
        quad.add_broadcast(&neg_log_std, recorder, tensors)
            .add_scalar(-0.5 * (2.0 * PI).ln(), recorder, tensors)
    }
}

/// State-value estimator: relu MLP with a scalar output head.
pub struct ValueNet {
    pub l1: Dense,
    pub l2: Dense,
    pub head: Dense,
}

impl ValueNet {
    pub fn new(obs_dim: usize) -> Self {
        Self {
            l1: Dense::random(obs_dim, HIDDEN),
            l2: Dense::random(HIDDEN, HIDDEN),
            head: Dense::random(HIDDEN, 1),
        }
    }

    pub fn params_mut(&mut self) -> Vec<&mut Tensor> {
        vec![
            &mut self.l1.w,
            &mut self.l1.b,
            &mut self.l2.w,
            &mut self.l2.b,
            &mut self.head.w,
            &mut self.head.b,
        ]
    }

    /// Return estimates for a batch of states, `[batch, 1]`.
    pub fn forward(
        &self,
        states: &Tensor,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let x = self.l1.forward(states, recorder, tensors).relu(recorder, tensors);
        let x = self.l2.forward(&x, recorder, tensors).relu(recorder, tensors);
        self.head.forward(&x, recorder, tensors)
    }
}
