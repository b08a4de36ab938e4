use crate::recorder::Recorder;

/// Elementary operations the backward pass knows how to differentiate.
#[derive(Clone, Copy, Debug)]
pub enum EOp {
    Add,
    Sub,
    Mul,
    MatMul,
    AddBroadcast,
    MulBroadcast,
    MulScalar,
    AddScalar,
    Pow,
    Exp,
    Tanh,
    Relu,
    ReduceSum,
    ReduceMean,
}

/// One recorded operation. `a` and `b` are input tensor ids, `out` the
/// output id. Unary operations carry their input id in both slots.
#[derive(Clone)]
pub struct Node {
    pub op: EOp,
    pub a: usize,
    pub b: usize,
    pub out: usize,
}

/// Forward-only recorder: collects nodes but offers no backward pass.
///
/// This is the no-gradient path. Action sampling during environment
/// interaction runs through a `Graph`, so decision-time computation never
/// produces gradient information.
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder for Graph {
    fn record(&mut self, node: Node) {
        self.nodes.push(node);
    }

    fn nodes(&self) -> &Vec<Node> {
        &self.nodes
    }
}
