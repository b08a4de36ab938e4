use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::env::Env;
use crate::experience::Experience;
use crate::returns::discounted_returns;
use crate::stats::{normalize, RewardWindow};
use crate::trainer::{EpisodeStats, TrainError, Trainer};

pub const EPISODES: usize = 10_000;
const DISCOUNT: f32 = 0.99;
const TRACK_CAPACITY: usize = 10_000;
const REPORT_CAPACITY: usize = 20;
const REPORT_EVERY: usize = 5;

/// One episode's raw (state, action, reward) sequence. Owned by the runner
/// for the duration of the episode and discarded after conversion to
/// training data.
struct Trajectory {
    states: Vec<Vec<f32>>,
    actions: Vec<Vec<f32>>,
    rewards: Vec<f32>,
    total_reward: f32,
}

/// Drives the interaction loop: rollout, reward normalization, returns-to-go,
/// and one trainer invocation per episode. All mutable training state (both
/// models, both optimizers, both reward windows, the RNG) lives here for the
/// lifetime of the run; there are no process-wide globals.
pub struct EpisodeRunner<E: Env> {
    env: E,
    trainer: Trainer,
    track: RewardWindow,
    report: RewardWindow,
    rng: StdRng,
    episodes: usize,
}

impl<E: Env> EpisodeRunner<E> {
    pub fn new(env: E, seed: u64) -> Self {
        fastrand::seed(seed);
        let trainer = Trainer::new(env.obs_size(), env.action_size());
        Self {
            env,
            trainer,
            track: RewardWindow::with_capacity(TRACK_CAPACITY),
            report: RewardWindow::with_capacity(REPORT_CAPACITY),
            rng: StdRng::seed_from_u64(seed),
            episodes: EPISODES,
        }
    }

    pub fn with_episodes(mut self, episodes: usize) -> Self {
        self.episodes = episodes;
        self
    }

    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    pub fn report_window(&self) -> &RewardWindow {
        &self.report
    }

    /// Runs the fixed episode budget to completion. No early stopping.
    pub fn run(&mut self) {
        for episode in 0..self.episodes {
            self.episode(episode);
        }
    }

    fn episode(&mut self, episode: usize) {
        let trajectory = self.rollout();
        let outcome = self.learn(&trajectory);
        self.report.push(trajectory.total_reward);
        match outcome {
            Ok(stats) if episode % REPORT_EVERY == 0 => {
                self.report_line(trajectory.total_reward, &stats);
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("episode {episode}: skipping update: {err}");
            }
        }
    }

    /// Plays one episode to termination, sampling actions through the
    /// no-gradient path and feeding every raw reward into the long-horizon
    /// statistic.
    fn rollout(&mut self) -> Trajectory {
        let high = self.env.action_high();
        let mut state = self.env.reset();
        let mut trajectory = Trajectory {
            states: Vec::new(),
            actions: Vec::new(),
            rewards: Vec::new(),
            total_reward: 0.0,
        };
        loop {
            let action = self.trainer.policy.sample(&state, &mut self.rng);
            let scaled: Vec<f32> = action.iter().zip(&high).map(|(a, h)| a * h).collect();
            let (next_state, reward, done) = self.env.step(&scaled);

            trajectory.states.push(state);
            trajectory.actions.push(action);
            trajectory.rewards.push(reward);
            trajectory.total_reward += reward;
            self.track.push(reward);

            state = next_state;
            if done {
                break;
            }
        }
        trajectory
    }

    fn learn(&mut self, trajectory: &Trajectory) -> Result<EpisodeStats, TrainError> {
        let normalized = normalize(&trajectory.rewards, &self.track);
        let returns = discounted_returns(&normalized, DISCOUNT);
        let experience = Experience::new(&trajectory.states, &trajectory.actions, &returns);
        self.trainer.train_episode(&experience, &mut self.rng)
    }

    fn report_line(&self, episode_reward: f32, stats: &EpisodeStats) {
        tracing::info!(
            "MeanR: {:.1} R: {:.1} - MeanVal: {:.2} - ValLoss: {:.2} - Reward: {:.3} {:.3} {:.3}",
            self.report.mean(),
            episode_reward,
            stats.value_mean,
            stats.value_loss,
            stats.return_mean,
            stats.return_max,
            stats.return_min,
        );
    }
}
