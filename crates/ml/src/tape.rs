use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::graph::{EOp, Node};
use crate::recorder::Recorder;
use crate::Tensor;

fn fetch(tensors: &HashMap<usize, Tensor>, id: usize) -> Result<&Tensor> {
    tensors
        .get(&id)
        .ok_or_else(|| anyhow!("tensor {id} missing from registry"))
}

/// A tape that records operations for reverse-mode differentiation.
pub struct Tape {
    nodes: Vec<Node>,
}

impl Recorder for Tape {
    fn record(&mut self, node: Node) {
        self.nodes.push(node);
    }

    fn nodes(&self) -> &Vec<Node> {
        &self.nodes
    }
}

impl Tape {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Computes gradients of `loss` with respect to the tensors on the tape.
    ///
    /// Recorded nodes are traversed in reverse order; nodes whose output
    /// never received a gradient are skipped. Afterwards every registry
    /// tensor with `requires_grad` set carries its accumulated gradient.
    pub fn backward(&self, loss: &Tensor, tensors: &mut HashMap<usize, Tensor>) -> Result<()> {
        let mut grads: HashMap<usize, Vec<f32>> = HashMap::new();
        grads.insert(loss.id, vec![1.0; loss.data.len()]);

        for node in self.nodes.iter().rev() {
            let Some(out_grad) = grads.get(&node.out).cloned() else {
                continue;
            };

            match node.op {
                EOp::Add => {
                    let a = fetch(tensors, node.a)?;
                    let b_len = fetch(tensors, node.b)?.data.len();
                    {
                        let a_grad = grads
                            .entry(node.a)
                            .or_insert_with(|| vec![0.0; a.data.len()]);
                        for (g, og) in a_grad.iter_mut().zip(out_grad.iter()) {
                            *g += og;
                        }
                    }
                    {
                        let b_grad = grads.entry(node.b).or_insert_with(|| vec![0.0; b_len]);
                        for (g, og) in b_grad.iter_mut().zip(out_grad.iter()) {
                            *g += og;
                        }
                    }
                }
                EOp::Sub => {
                    let a_len = fetch(tensors, node.a)?.data.len();
                    let b_len = fetch(tensors, node.b)?.data.len();
                    {
                        let a_grad = grads.entry(node.a).or_insert_with(|| vec![0.0; a_len]);
                        for (g, og) in a_grad.iter_mut().zip(out_grad.iter()) {
                            *g += og;
                        }
                    }
                    {
                        let b_grad = grads.entry(node.b).or_insert_with(|| vec![0.0; b_len]);
                        for (g, og) in b_grad.iter_mut().zip(out_grad.iter()) {
                            *g -= og;
                        }
                    }
                }
                EOp::Mul => {
                    let a_data = fetch(tensors, node.a)?.data.clone();
                    let b_data = fetch(tensors, node.b)?.data.clone();
                    {
                        let a_grad = grads
                            .entry(node.a)
                            .or_insert_with(|| vec![0.0; a_data.len()]);
                        for (g, (d, og)) in a_grad.iter_mut().zip(b_data.iter().zip(out_grad.iter()))
                        {
                            *g += d * og;
                        }
                    }
                    {
                        let b_grad = grads
                            .entry(node.b)
                            .or_insert_with(|| vec![0.0; b_data.len()]);
                        for (g, (d, og)) in b_grad.iter_mut().zip(a_data.iter().zip(out_grad.iter()))
                        {
                            *g += d * og;
                        }
                    }
                }
                EOp::MatMul => {
                    let w = fetch(tensors, node.a)?.clone();
                    let x = fetch(tensors, node.b)?.clone();
                    let out_dim = w.shape[0];
                    let in_dim = w.shape[1];
                    let batch = x.shape[0];
                    {
                        let w_grad = grads
                            .entry(node.a)
                            .or_insert_with(|| vec![0.0; w.data.len()]);
                        for i in 0..out_dim {
                            for j in 0..in_dim {
                                for k in 0..batch {
                                    w_grad[i * in_dim + j] +=
                                        out_grad[k * out_dim + i] * x.data[k * in_dim + j];
                                }
                            }
                        }
                    }
                    {
                        let x_grad = grads
                            .entry(node.b)
                            .or_insert_with(|| vec![0.0; x.data.len()]);
                        for k in 0..batch {
                            for j in 0..in_dim {
                                for i in 0..out_dim {
                                    x_grad[k * in_dim + j] +=
                                        out_grad[k * out_dim + i] * w.data[i * in_dim + j];
                                }
                            }
                        }
                    }
                }
                EOp::AddBroadcast => {
                    let a = fetch(tensors, node.a)?.clone();
                    let batch = a.shape[0];
                    let dim = a.shape[1];
                    {
                        let a_grad = grads
                            .entry(node.a)
                            .or_insert_with(|| vec![0.0; a.data.len()]);
                        for (g, og) in a_grad.iter_mut().zip(out_grad.iter()) {
                            *g += og;
                        }
                    }
                    {
                        let b_grad = grads.entry(node.b).or_insert_with(|| vec![0.0; dim]);
                        for k in 0..batch {
                            for i in 0..dim {
                                b_grad[i] += out_grad[k * dim + i];
                            }
                        }
                    }
                }
                EOp::MulBroadcast => {
                    let a = fetch(tensors, node.a)?.clone();
                    let b = fetch(tensors, node.b)?.clone();
                    let batch = a.shape[0];
                    let dim = a.shape[1];
                    {
                        let a_grad = grads
                            .entry(node.a)
                            .or_insert_with(|| vec![0.0; a.data.len()]);
                        for k in 0..batch {
                            for i in 0..dim {
                                a_grad[k * dim + i] += b.data[i] * out_grad[k * dim + i];
                            }
                        }
                    }
                    {
                        let b_grad = grads.entry(node.b).or_insert_with(|| vec![0.0; dim]);
                        for k in 0..batch {
                            for i in 0..dim {
                                b_grad[i] += a.data[k * dim + i] * out_grad[k * dim + i];
                            }
                        }
                    }
                }
                EOp::MulScalar => {
                    let a_len = fetch(tensors, node.a)?.data.len();
                    let scalar = fetch(tensors, node.b)?.data[0];
                    let a_grad = grads.entry(node.a).or_insert_with(|| vec![0.0; a_len]);
                    for (g, og) in a_grad.iter_mut().zip(out_grad.iter()) {
                        *g += scalar * og;
                    }
                }
                EOp::AddScalar => {
                    let a_len = fetch(tensors, node.a)?.data.len();
                    let a_grad = grads.entry(node.a).or_insert_with(|| vec![0.0; a_len]);
                    for (g, og) in a_grad.iter_mut().zip(out_grad.iter()) {
                        *g += og;
                    }
                }
                EOp::Pow => {
                    let a_data = fetch(tensors, node.a)?.data.clone();
                    let exponent = fetch(tensors, node.b)?.data[0];
                    let a_grad = grads
                        .entry(node.a)
                        .or_insert_with(|| vec![0.0; a_data.len()]);
                    for (g, (d, og)) in a_grad.iter_mut().zip(a_data.iter().zip(out_grad.iter())) {
                        *g += exponent * d.powf(exponent - 1.0) * og;
                    }
                }
                EOp::Exp => {
                    let out_data = fetch(tensors, node.out)?.data.clone();
                    let a_len = fetch(tensors, node.a)?.data.len();
                    let a_grad = grads.entry(node.a).or_insert_with(|| vec![0.0; a_len]);
                    for (g, (d, og)) in a_grad.iter_mut().zip(out_data.iter().zip(out_grad.iter()))
                    {
                        *g += d * og;
                    }
                }
                EOp::Tanh => {
                    let out_data = fetch(tensors, node.out)?.data.clone();
                    let a_len = fetch(tensors, node.a)?.data.len();
                    let a_grad = grads.entry(node.a).or_insert_with(|| vec![0.0; a_len]);
                    for (g, (d, og)) in a_grad.iter_mut().zip(out_data.iter().zip(out_grad.iter()))
                    {
                        *g += (1.0 - d.powi(2)) * og;
                    }
                }
                EOp::Relu => {
                    let a_data = fetch(tensors, node.a)?.data.clone();
                    let a_grad = grads
                        .entry(node.a)
                        .or_insert_with(|| vec![0.0; a_data.len()]);
                    for (g, (d, og)) in a_grad.iter_mut().zip(a_data.iter().zip(out_grad.iter())) {
                        if *d > 0.0 {
                            *g += og;
                        }
                    }
                }
                EOp::ReduceSum => {
                    let a_len = fetch(tensors, node.a)?.data.len();
                    let a_grad = grads.entry(node.a).or_insert_with(|| vec![0.0; a_len]);
                    for g in a_grad.iter_mut() {
                        *g += out_grad[0];
                    }
                }
                EOp::ReduceMean => {
                    let a_len = fetch(tensors, node.a)?.data.len();
                    let a_grad = grads.entry(node.a).or_insert_with(|| vec![0.0; a_len]);
                    let n = a_len as f32;
                    for g in a_grad.iter_mut() {
                        *g += out_grad[0] / n;
                    }
                }
            }
        }

        for (id, grad) in grads {
            if let Some(tensor) = tensors.get_mut(&id) {
                if tensor.requires_grad {
                    tensor.grad = Some(grad);
                }
            }
        }

        Ok(())
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}
