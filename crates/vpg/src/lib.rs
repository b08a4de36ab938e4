//! Vanilla policy gradient with a learned value baseline.
//!
//! One fixed experiment loop: roll out an episode against a continuous
//! control environment, normalize the rewards with a long-horizon running
//! statistic, turn them into discounted returns-to-go, and alternate value
//! and policy optimization steps over shuffled minibatches of the episode's
//! experience. Built on the [`ml`] crate's tape autodiff; action sampling
//! runs through the forward-only path so decision-time computation records
//! no gradients.

pub mod env;
pub mod experience;
pub mod model;
pub mod returns;
pub mod runner;
pub mod stats;
pub mod trainer;
