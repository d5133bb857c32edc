use lentil::common::*;
use lentil::diagnostics::posterior_mean_and_sd;
use lentil::selection::*;
use lentil::SoftmaxParams;
use mcmc_util::McmcChain;
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Class 0 depends strongly on feature 0; features 1 and 2 are noise
fn synthetic_history(num_samples: usize) -> anyhow::Result<McmcChain<SoftmaxParams>> {
    let mut rng = SmallRng::seed_from_u64(17);
    let mut chain = McmcChain::with_capacity(num_samples);
    for _ in 0..num_samples {
        let z = |rng: &mut SmallRng| -> f64 { StandardNormal.sample(rng) };
        let w = array![
            [10.0 + 0.1 * z(&mut rng), z(&mut rng), z(&mut rng)],
            [0.1 * z(&mut rng), z(&mut rng), z(&mut rng)]
        ];
        chain.push(SoftmaxParams::from_weights(vec![w])?)?;
    }
    Ok(chain)
}

#[test]
fn credible_intervals_pick_the_real_effect() -> anyhow::Result<()> {
    let chain = synthetic_history(500)?;
    let summary = posterior_mean_and_sd(&chain)?;
    assert_eq!(summary.mean.dim(), (2, 3));
    approx::assert_abs_diff_eq!(summary.mean[[0, 0]], 10.0, epsilon = 0.05);
    approx::assert_abs_diff_eq!(summary.sd[[0, 0]], 0.1, epsilon = 0.02);

    let kept = select_all_or_nothing(&summary, 2.0, 0.0)?;
    assert_eq!(kept, vec![0]);

    let top = select_features(&summary, 2.0, SelectionPolicy::Top { num_keep: 1 })?;
    assert_eq!(top.kept, vec![0]);
    let c_star = top.cutoff.unwrap_or(f64::NAN);
    approx::assert_abs_diff_eq!(c_star, 9.8, epsilon = 0.1);
    Ok(())
}

#[test]
fn top_selection_keeps_exactly_the_requested_number() -> anyhow::Result<()> {
    let chain = synthetic_history(200)?;
    let summary = posterior_mean_and_sd(&chain)?;
    for d in 1..=3 {
        let (kept, _) = select_top(&summary, 2.0, d)?;
        assert_eq!(kept.len(), d);
        assert!(kept.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(kept[0], 0);
    }
    Ok(())
}

#[test]
fn empty_history_is_an_error() {
    let chain: McmcChain<SoftmaxParams> = McmcChain::new();
    assert!(posterior_mean_and_sd(&chain).is_err());
}
