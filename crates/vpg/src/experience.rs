use rand::seq::SliceRandom;
use rand::Rng;

/// One episode's training data: parallel (state, action, return) rows,
/// stored flat in row-major order.
pub struct Experience {
    states: Vec<f32>,
    actions: Vec<f32>,
    returns: Vec<f32>,
    obs_dim: usize,
    act_dim: usize,
    len: usize,
}

/// A fixed-size random sample of experience rows.
pub struct Batch {
    pub states: Vec<f32>,
    pub actions: Vec<f32>,
    pub returns: Vec<f32>,
    pub len: usize,
}

impl Experience {
    pub fn new(states: &[Vec<f32>], actions: &[Vec<f32>], returns: &[f32]) -> Self {
        assert_eq!(states.len(), actions.len());
        assert_eq!(states.len(), returns.len());
        let obs_dim = states.first().map_or(0, Vec::len);
        let act_dim = actions.first().map_or(0, Vec::len);
        for s in states {
            assert_eq!(s.len(), obs_dim);
        }
        for a in actions {
            assert_eq!(a.len(), act_dim);
        }
        Self {
            states: states.iter().flatten().copied().collect(),
            actions: actions.iter().flatten().copied().collect(),
            returns: returns.to_vec(),
            obs_dim,
            act_dim,
            len: returns.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    pub fn act_dim(&self) -> usize {
        self.act_dim
    }

    /// The (state, action, return) triple at row `i`.
    pub fn get(&self, i: usize) -> (&[f32], &[f32], f32) {
        assert!(i < self.len);
        (
            &self.states[i * self.obs_dim..(i + 1) * self.obs_dim],
            &self.actions[i * self.act_dim..(i + 1) * self.act_dim],
            self.returns[i],
        )
    }

    /// One shuffled pass over the data in batches of `batch_size`.
    ///
    /// Every row appears in exactly one batch; the last batch may be shorter
    /// than `batch_size`. No padding, no dropping.
    pub fn batches(&self, batch_size: usize, rng: &mut impl Rng) -> Vec<Batch> {
        assert!(batch_size > 0);
        let mut indices: Vec<usize> = (0..self.len).collect();
        indices.shuffle(rng);
        indices
            .chunks(batch_size)
            .map(|chunk| {
                let mut batch = Batch {
                    states: Vec::with_capacity(chunk.len() * self.obs_dim),
                    actions: Vec::with_capacity(chunk.len() * self.act_dim),
                    returns: Vec::with_capacity(chunk.len()),
                    len: chunk.len(),
                };
                for &i in chunk {
                    let (s, a, r) = self.get(i);
                    batch.states.extend_from_slice(s);
                    batch.actions.extend_from_slice(a);
                    batch.returns.push(r);
                }
                batch
            })
            .collect()
    }
}
