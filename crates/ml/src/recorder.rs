use crate::graph::Node;

/// Seam between the forward-only and differentiable execution paths.
pub trait Recorder {
    fn record(&mut self, node: Node);
    fn nodes(&self) -> &Vec<Node>;
}
