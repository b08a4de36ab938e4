//! Vanilla policy gradient on the pendulum swing-up task.
//!
//! All hyperparameters are literal constants in the training crate; there is
//! no configuration file, no checkpointing, and no CLI surface. The only way
//! to stop early is to terminate the process.

use anyhow::Result;
use vpg::env::PendulumEnv;
use vpg::runner::EpisodeRunner;

const SEED: u64 = 0;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let env = PendulumEnv::new();
    let mut runner = EpisodeRunner::new(env, SEED);
    runner.run();
    Ok(())
}
