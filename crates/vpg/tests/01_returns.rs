use vpg::returns::discounted_returns;

#[test]
fn satisfies_the_backward_recurrence() {
    let rewards = vec![1.0, -2.0, 0.5, 3.0];
    let discount = 0.9;
    let returns = discounted_returns(&rewards, discount);
    assert_eq!(returns.len(), rewards.len());
    let last = returns.len() - 1;
    assert!((returns[last] - rewards[last]).abs() < 1e-6);
    for t in 0..last {
        let expected = rewards[t] + discount * returns[t + 1];
        assert!(
            (returns[t] - expected).abs() < 1e-5,
            "step {t}: {} vs {expected}",
            returns[t]
        );
    }
}

#[test]
fn zero_discount_returns_the_rewards() {
    let rewards = vec![4.0, -1.0, 2.5];
    assert_eq!(discounted_returns(&rewards, 0.0), rewards);
}

#[test]
fn known_values_for_unit_rewards() {
    let returns = discounted_returns(&[1.0, 1.0, 1.0], 0.99);
    let expected = [2.9701, 1.99, 1.0];
    for (r, e) in returns.iter().zip(expected.iter()) {
        assert!((r - e).abs() < 1e-4, "{r} vs {e}");
    }
}

#[test]
fn empty_input_yields_empty_output() {
    assert!(discounted_returns(&[], 0.99).is_empty());
}
