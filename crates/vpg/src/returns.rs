/// Discounted returns-to-go for one episode's reward sequence.
///
/// `G[T-1] = r[T-1]` and `G[i] = r[i] + discount * G[i+1]`, computed
/// backward in one pass. Empty input yields empty output.
pub fn discounted_returns(rewards: &[f32], discount: f32) -> Vec<f32> {
    let mut returns = vec![0.0; rewards.len()];
    let mut acc = 0.0;
    for i in (0..rewards.len()).rev() {
        acc = rewards[i] + discount * acc;
        returns[i] = acc;
    }
    returns
}
