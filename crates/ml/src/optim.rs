use crate::Tensor;

/// Adam optimizer with optional L2 weight decay folded into the gradient.
///
/// Moment buffers are allocated per parameter at construction and matched to
/// parameters by position, so `step` must always receive the parameter list
/// in the order `new` saw it.
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    weight_decay: f32,
    t: u32,
    m: Vec<Vec<f32>>,
    v: Vec<Vec<f32>>,
}

impl Adam {
    pub fn new(params: &[&Tensor], lr: f32) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
            t: 0,
            m: params.iter().map(|p| vec![0.0; p.data.len()]).collect(),
            v: params.iter().map(|p| vec![0.0; p.data.len()]).collect(),
        }
    }

    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Applies one bias-corrected update in place, consuming each
    /// parameter's `grad`. Parameters without a gradient are left untouched.
    pub fn step(&mut self, params: &mut [&mut Tensor]) {
        self.t += 1;
        let lr_t = self.lr * (1.0 - self.beta2.powi(self.t as i32)).sqrt()
            / (1.0 - self.beta1.powi(self.t as i32));

        for (i, p) in params.iter_mut().enumerate() {
            let Some(grad) = p.grad.take() else {
                continue;
            };
            for j in 0..p.data.len() {
                let g = grad[j] + self.weight_decay * p.data[j];
                self.m[i][j] = self.beta1 * self.m[i][j] + (1.0 - self.beta1) * g;
                self.v[i][j] = self.beta2 * self.v[i][j] + (1.0 - self.beta2) * g * g;
                p.data[j] -= lr_t * self.m[i][j] / (self.v[i][j].sqrt() + self.eps);
            }
        }
    }
}
