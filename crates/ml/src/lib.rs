//! Minimal CPU autodiff substrate for the policy-gradient experiment.
//!
//! The crate is built around an operation-recording design with two distinct
//! execution paths: [`graph::Graph`] records forward-only computation (used
//! when no gradients are wanted, e.g. sampling actions during environment
//! interaction), while [`tape::Tape`] records the same operations and can
//! replay them in reverse to produce gradients. Both implement the
//! [`recorder::Recorder`] seam, so model code is written once.

pub mod graph;
pub mod nn;
pub mod optim;
pub mod recorder;
pub mod tape;
pub mod tensor;

pub use tensor::Tensor;
