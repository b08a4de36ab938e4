use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::graph::{EOp, Node};
use crate::recorder::Recorder;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A CPU tensor of `f32` values with an identity in the recorded graph.
///
/// Ids are unique per construction; `Clone` preserves the id, so a clone
/// names the same graph vertex. Operation methods compute eagerly, record a
/// [`Node`] on the given recorder, and insert the output into the registry
/// the backward pass will later read values from. Inputs must already be in
/// the registry when the tape is differentiated.
#[derive(Clone)]
pub struct Tensor {
    pub id: usize,
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
    pub grad: Option<Vec<f32>>,
    pub requires_grad: bool,
}

impl Tensor {
    pub fn from_vec(shape: Vec<usize>, data: Vec<f32>) -> Self {
        assert_eq!(shape.iter().product::<usize>(), data.len());
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            data,
            shape,
            grad: None,
            requires_grad: false,
        }
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self::from_vec(shape, vec![0.0; len])
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn with_grad(mut self) -> Self {
        self.requires_grad = true;
        self
    }

    pub fn set_requires_grad(&mut self) {
        self.requires_grad = true;
    }

    fn emit(
        out: Tensor,
        op: EOp,
        a: usize,
        b: usize,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        recorder.record(Node { op, a, b, out: out.id });
        tensors.insert(out.id, out.clone());
        out
    }

    /// Registers a scalar constant so the backward pass can read it.
    fn constant(value: f32, tensors: &mut HashMap<usize, Tensor>) -> Tensor {
        let t = Tensor::from_vec(vec![1], vec![value]);
        tensors.insert(t.id, t.clone());
        t
    }

    pub fn add(
        &self,
        other: &Tensor,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        assert_eq!(self.shape, other.shape);
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a + b)
            .collect();
        let out = Tensor::from_vec(self.shape.clone(), data);
        Self::emit(out, EOp::Add, self.id, other.id, recorder, tensors)
    }

    pub fn sub(
        &self,
        other: &Tensor,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        assert_eq!(self.shape, other.shape);
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a - b)
            .collect();
        let out = Tensor::from_vec(self.shape.clone(), data);
        Self::emit(out, EOp::Sub, self.id, other.id, recorder, tensors)
    }

    pub fn mul(
        &self,
        other: &Tensor,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        assert_eq!(self.shape, other.shape);
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a * b)
            .collect();
        let out = Tensor::from_vec(self.shape.clone(), data);
        Self::emit(out, EOp::Mul, self.id, other.id, recorder, tensors)
    }

    /// Weight matrix `[out, in]` applied to a batch `[batch, in]`, producing
    /// `[batch, out]`.
    pub fn matmul(
        &self,
        x: &Tensor,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let out_dim = self.shape[0];
        let in_dim = self.shape[1];
        let batch = x.shape[0];
        assert_eq!(x.shape[1], in_dim);
        let mut data = vec![0.0; batch * out_dim];
        for k in 0..batch {
            for i in 0..out_dim {
                let mut sum = 0.0;
                for j in 0..in_dim {
                    sum += self.data[i * in_dim + j] * x.data[k * in_dim + j];
                }
                data[k * out_dim + i] = sum;
            }
        }
        let out = Tensor::from_vec(vec![batch, out_dim], data);
        Self::emit(out, EOp::MatMul, self.id, x.id, recorder, tensors)
    }

    /// Adds a `[d]` vector to every row of a `[batch, d]` tensor.
    pub fn add_broadcast(
        &self,
        other: &Tensor,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let dim = self.shape[1];
        assert_eq!(other.data.len(), dim);
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(i, a)| a + other.data[i % dim])
            .collect();
        let out = Tensor::from_vec(self.shape.clone(), data);
        Self::emit(out, EOp::AddBroadcast, self.id, other.id, recorder, tensors)
    }

    /// Multiplies every row of a `[batch, d]` tensor by a `[d]` vector.
    pub fn mul_broadcast(
        &self,
        other: &Tensor,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let dim = self.shape[1];
        assert_eq!(other.data.len(), dim);
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(i, a)| a * other.data[i % dim])
            .collect();
        let out = Tensor::from_vec(self.shape.clone(), data);
        Self::emit(out, EOp::MulBroadcast, self.id, other.id, recorder, tensors)
    }

    pub fn mul_scalar(
        &self,
        scalar: f32,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let s = Self::constant(scalar, tensors);
        let data = self.data.iter().map(|a| a * scalar).collect();
        let out = Tensor::from_vec(self.shape.clone(), data);
        Self::emit(out, EOp::MulScalar, self.id, s.id, recorder, tensors)
    }

    pub fn add_scalar(
        &self,
        scalar: f32,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let s = Self::constant(scalar, tensors);
        let data = self.data.iter().map(|a| a + scalar).collect();
        let out = Tensor::from_vec(self.shape.clone(), data);
        Self::emit(out, EOp::AddScalar, self.id, s.id, recorder, tensors)
    }

    pub fn pow(
        &self,
        exponent: f32,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let e = Self::constant(exponent, tensors);
        let data = self.data.iter().map(|a| a.powf(exponent)).collect();
        let out = Tensor::from_vec(self.shape.clone(), data);
        Self::emit(out, EOp::Pow, self.id, e.id, recorder, tensors)
    }

    pub fn exp(
        &self,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let data = self.data.iter().map(|a| a.exp()).collect();
        let out = Tensor::from_vec(self.shape.clone(), data);
        Self::emit(out, EOp::Exp, self.id, self.id, recorder, tensors)
    }

    pub fn tanh(
        &self,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let data = self.data.iter().map(|a| a.tanh()).collect();
        let out = Tensor::from_vec(self.shape.clone(), data);
        Self::emit(out, EOp::Tanh, self.id, self.id, recorder, tensors)
    }

    pub fn relu(
        &self,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let data = self.data.iter().map(|a| a.max(0.0)).collect();
        let out = Tensor::from_vec(self.shape.clone(), data);
        Self::emit(out, EOp::Relu, self.id, self.id, recorder, tensors)
    }

    pub fn reduce_sum(
        &self,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let sum: f32 = self.data.iter().sum();
        let out = Tensor::from_vec(vec![1], vec![sum]);
        Self::emit(out, EOp::ReduceSum, self.id, self.id, recorder, tensors)
    }

    pub fn reduce_mean(
        &self,
        recorder: &mut impl Recorder,
        tensors: &mut HashMap<usize, Tensor>,
    ) -> Tensor {
        let sum: f32 = self.data.iter().sum();
        let mean = sum / self.data.len() as f32;
        let out = Tensor::from_vec(vec![1], vec![mean]);
        Self::emit(out, EOp::ReduceMean, self.id, self.id, recorder, tensors)
    }
}
