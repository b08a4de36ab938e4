//! Reinforcement learning environment interface.
//!
//! Inspired by classic frameworks like OpenAI Gym, this trait defines the
//! interface an environment must provide. Each call to [`step`] advances the
//! simulation by one action vector and returns the new observation, a reward
//! signal, and whether the episode has terminated.
//!
//! [`step`]: Env::step

use std::f32::consts::PI;

pub trait Env {
    /// Advance the environment by one action.
    ///
    /// Returns `(obs, reward, done)` where `obs` is the new observation
    /// vector, `reward` is the scalar reward, and `done` indicates episode
    /// termination.
    fn step(&mut self, action: &[f32]) -> (Vec<f32>, f32, bool);

    /// Reset the environment to a starting state and return the initial
    /// observation vector.
    fn reset(&mut self) -> Vec<f32>;

    /// Size of the observation vector.
    fn obs_size(&self) -> usize;

    /// Size of the action vector.
    fn action_size(&self) -> usize;

    /// Per-dimension magnitude used to rescale unit-range policy actions
    /// before they are applied.
    fn action_high(&self) -> Vec<f32>;
}

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const GRAVITY: f32 = 10.0;
const MASS: f32 = 1.0;
const LENGTH: f32 = 1.0;
const HORIZON: usize = 200;

/// Pendulum swing-up: apply torque at the pivot to swing a pendulum upright
/// and keep it there. Observation is `[cos θ, sin θ, θ̇]`; reward penalizes
/// angular distance from upright, angular velocity, and control effort.
/// Episodes run a fixed 200 steps.
pub struct PendulumEnv {
    theta: f32,
    theta_dot: f32,
    steps: usize,
}

impl PendulumEnv {
    pub fn new() -> Self {
        Self {
            theta: PI,
            theta_dot: 0.0,
            steps: 0,
        }
    }

    fn obs(&self) -> Vec<f32> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }
}

impl Default for PendulumEnv {
    fn default() -> Self {
        Self::new()
    }
}

fn angle_normalize(x: f32) -> f32 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

impl Env for PendulumEnv {
    fn step(&mut self, action: &[f32]) -> (Vec<f32>, f32, bool) {
        let u = action[0].clamp(-MAX_TORQUE, MAX_TORQUE);
        let cost = angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * u.powi(2);

        self.theta_dot += (3.0 * GRAVITY / (2.0 * LENGTH) * self.theta.sin()
            + 3.0 / (MASS * LENGTH.powi(2)) * u)
            * DT;
        self.theta_dot = self.theta_dot.clamp(-MAX_SPEED, MAX_SPEED);
        self.theta += self.theta_dot * DT;
        self.steps += 1;

        (self.obs(), -cost, self.steps >= HORIZON)
    }

    fn reset(&mut self) -> Vec<f32> {
        self.theta = fastrand::f32() * 2.0 * PI - PI;
        self.theta_dot = fastrand::f32() * 2.0 - 1.0;
        self.steps = 0;
        self.obs()
    }

    fn obs_size(&self) -> usize {
        3
    }

    fn action_size(&self) -> usize {
        1
    }

    fn action_high(&self) -> Vec<f32> {
        vec![MAX_TORQUE]
    }
}
