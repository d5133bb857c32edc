use lentil::common::*;
use lentil::diagnostics::{posterior_accuracy, posterior_mean_and_sd};
use lentil::sampler::SamplerState;
use lentil::*;
use mcmc_util::{StepSchedule, ThinArgs};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn toy_data() -> (Mat, Mat) {
    let x = array![[1.0, 0.0], [0.0, 1.0]];
    let y = array![[0.8, 0.2], [0.2, 0.8]];
    (x, y)
}

fn quiet(num_iter: usize) -> SamplerArgs {
    SamplerArgs {
        num_iter,
        report_interval: 0,
        ..Default::default()
    }
}

#[test]
fn sgld_records_every_iteration() -> anyhow::Result<()> {
    let (x, y) = toy_data();
    let model = SoftmaxModel::single_layer(2, 2, 1.0)?;
    let data = TrainingData::new(&model, &x, &y)?;
    let mut rng = SmallRng::seed_from_u64(1);

    let init = model.init_params(&mut rng);
    let mut sampler = SgldSampler::sgld(model, StepSchedule::default(), quiet(37), init)?;
    assert_eq!(sampler.state(), SamplerState::Initialized);

    let summary = sampler.run(&data, &mut rng)?;
    assert_eq!(sampler.history().n_samples(), 37);
    assert_eq!(summary.num_recorded, 37);
    assert_eq!(summary.acceptance_ratio, 1.0);
    assert_eq!(sampler.state(), SamplerState::Finished);

    // a finished chain is not resumed
    assert!(sampler.iterate(&data, &mut rng).is_err());
    assert_eq!(sampler.state(), SamplerState::Finished);
    assert_eq!(sampler.history().n_samples(), 37);
    Ok(())
}

#[test]
fn record_stride_bounds_the_history() -> anyhow::Result<()> {
    let (x, y) = toy_data();
    let model = SoftmaxModel::single_layer(2, 2, 1.0)?;
    let data = TrainingData::new(&model, &x, &y)?;
    let mut rng = SmallRng::seed_from_u64(2);

    let args = SamplerArgs {
        record_stride: 10,
        ..quiet(95)
    };
    let init = model.zero_params();
    let mut sampler = SgldSampler::sgld(model, StepSchedule::default(), args, init)?;
    sampler.run(&data, &mut rng)?;

    // iterations 0, 10, ..., 90
    assert_eq!(sampler.history().n_samples(), 10);
    Ok(())
}

#[test]
fn thinning_is_one_shot() -> anyhow::Result<()> {
    let (x, y) = toy_data();
    let model = SoftmaxModel::single_layer(2, 2, 1.0)?;
    let data = TrainingData::new(&model, &x, &y)?;
    let mut rng = SmallRng::seed_from_u64(3);

    let init = model.zero_params();
    let mut sampler = SgldSampler::sgld(model, StepSchedule::default(), quiet(50), init)?;
    sampler.run(&data, &mut rng)?;

    let identity = ThinArgs {
        burn_in: 0.0,
        thin_factor: 1,
    };
    assert_eq!(sampler.thin(&identity)?, 50);
    assert_eq!(sampler.history().n_samples(), 50);

    let err = sampler.thin(&identity).unwrap_err();
    assert!(err.to_string().contains("already thinned"));
    assert!(sampler.iterate(&data, &mut rng).is_err());
    assert_eq!(sampler.history().n_samples(), 50);
    Ok(())
}

#[test]
fn invalid_configuration_fails_before_sampling() -> anyhow::Result<()> {
    let model = SoftmaxModel::single_layer(2, 2, 1.0)?;

    assert!(StepSchedule::new(0.0, 1000.0, 0.8).is_err());
    let bad_schedule = StepSchedule {
        gamma: -1.0,
        ..Default::default()
    };
    assert!(SgldSampler::sgld(model.clone(), bad_schedule, quiet(10), model.zero_params()).is_err());

    let bad_args = SamplerArgs {
        record_stride: 0,
        ..quiet(10)
    };
    assert!(
        SgldSampler::sgld(model.clone(), StepSchedule::default(), bad_args, model.zero_params())
            .is_err()
    );

    let other = SoftmaxModel::single_layer(3, 2, 1.0)?;
    assert!(
        MalaSampler::mala(model, StepSchedule::default(), quiet(10), other.zero_params()).is_err()
    );

    assert!(SoftmaxModel::single_layer(2, 2, 0.0).is_err());
    assert!(SoftmaxModel::new(vec![2], 1.0).is_err());
    Ok(())
}

#[test]
fn sgld_potential_decreases_from_a_poor_start() -> anyhow::Result<()> {
    let (x, y) = toy_data();
    let model = SoftmaxModel::single_layer(2, 2, 100.0)?;
    let data = TrainingData::new(&model, &x, &y)?;
    let mut rng = SmallRng::seed_from_u64(42);

    // start with both points misclassified
    let mut init = model.zero_params();
    init.set(1, array![[-30.0, 30.0], [30.0, -30.0]])?;
    assert_eq!(model.accuracy(&x, &y, &init)?, 0.0);

    let mut sampler = SgldSampler::sgld(model.clone(), StepSchedule::default(), quiet(1000), init)?;
    sampler.run(&data, &mut rng)?;
    assert_eq!(sampler.history().n_samples(), 1000);

    sampler.thin(&ThinArgs {
        burn_in: 0.0,
        thin_factor: 10,
    })?;

    let u = sampler.history().potentials();
    assert_eq!(u.len(), 100);
    let half = u.len() / 2;
    let first = u[..half].iter().sum::<f64>() / half as f64;
    let second = u[half..].iter().sum::<f64>() / (u.len() - half) as f64;
    assert!(second <= first, "U trend {} -> {}", first, second);

    let summary = posterior_mean_and_sd(sampler.history())?;
    assert_eq!(summary.mean.dim(), (2, 2));
    assert!(summary.sd.iter().all(|&s| s >= 0.0));
    Ok(())
}

#[test]
fn sgld_posterior_predicts_the_majority_class() -> anyhow::Result<()> {
    let (x, y) = toy_data();
    let model = SoftmaxModel::single_layer(2, 2, 100.0)?;
    let data = TrainingData::new(&model, &x, &y)?;
    let mut rng = SmallRng::seed_from_u64(2024);

    let init = model.init_params(&mut rng);
    let mut sampler = SgldSampler::sgld(model.clone(), StepSchedule::default(), quiet(1000), init)?;
    sampler.run(&data, &mut rng)?;
    sampler.thin(&ThinArgs::default())?;
    assert_eq!(sampler.history().n_samples(), 60);

    let acc = posterior_accuracy(&model, sampler.history(), &x, &y)?;
    assert!(acc > 0.9, "posterior accuracy {}", acc);
    Ok(())
}

/// Two points, two classes, `σ = 100`, default initialisation and
/// annealing, 1000 iterations. The final state classifies both points
/// correctly for most seeds.
#[test]
fn sgld_two_point_scenario_classifies_in_sample() -> anyhow::Result<()> {
    let (x, y) = toy_data();
    let model = SoftmaxModel::single_layer(2, 2, 100.0)?;
    let data = TrainingData::new(&model, &x, &y)?;

    let num_seeds = 20;
    let mut num_correct = 0;

    for seed in 0..num_seeds {
        let mut rng = SmallRng::seed_from_u64(seed);
        let init = model.init_params(&mut rng);
        let mut sampler =
            SgldSampler::sgld(model.clone(), StepSchedule::default(), quiet(1000), init)?;
        let summary = sampler.run(&data, &mut rng)?;

        assert_eq!(summary.num_iter, 1000);
        assert_eq!(summary.num_recorded, 1000);
        assert!(summary.final_potential.is_finite());
        assert!((0.0..=1.0).contains(&summary.final_accuracy));

        if summary.final_accuracy > 0.9 {
            num_correct += 1;
        }
    }

    assert!(
        2 * num_correct >= num_seeds,
        "final accuracy > 90% in only {} / {} runs",
        num_correct,
        num_seeds
    );
    Ok(())
}

#[test]
fn mala_acceptance_is_a_probability() -> anyhow::Result<()> {
    let (x, y) = toy_data();
    let model = SoftmaxModel::single_layer(2, 2, 1.0)?;
    let data = TrainingData::new(&model, &x, &y)?;
    let mut rng = SmallRng::seed_from_u64(7);

    let args = SamplerArgs {
        step_scaling: 0.01,
        ..quiet(1000)
    };
    let init = model.init_params(&mut rng);
    let mut sampler = MalaSampler::mala(model, StepSchedule::default(), args, init)?;
    let summary = sampler.run(&data, &mut rng)?;

    assert!((0.5..=1.0).contains(&summary.acceptance_ratio));
    assert_eq!(sampler.history().n_samples(), 1000);
    assert!(summary.final_potential.is_finite());
    Ok(())
}

#[test]
fn mala_accepts_almost_everything_as_the_step_vanishes() -> anyhow::Result<()> {
    let (x, y) = toy_data();
    let model = SoftmaxModel::single_layer(2, 2, 1.0)?;
    let data = TrainingData::new(&model, &x, &y)?;
    let mut rng = SmallRng::seed_from_u64(11);

    let args = SamplerArgs {
        step_scaling: 1e-6,
        ..quiet(200)
    };
    let init = model.init_params(&mut rng);
    let mut sampler = MalaSampler::mala(model, StepSchedule::default(), args, init)?;
    let summary = sampler.run(&data, &mut rng)?;

    assert!(summary.acceptance_ratio > 0.99);
    Ok(())
}

#[test]
fn map_fit_seeds_a_sampler() -> anyhow::Result<()> {
    let (x, y) = toy_data();
    let model = SoftmaxModel::single_layer(2, 2, 10.0)?;
    let data = TrainingData::new(&model, &x, &y)?;
    let mut rng = SmallRng::seed_from_u64(5);

    let mut init = model.zero_params();
    fit::fit_map(&model, &data, &mut init, 0.5, 300)?;
    assert_eq!(model.accuracy(&x, &y, &init)?, 1.0);

    let args = SamplerArgs {
        step_scaling: 0.05,
        ..quiet(100)
    };
    let mut sampler = MalaSampler::mala(model, StepSchedule::default(), args, init)?;
    sampler.run(&data, &mut rng)?;
    assert_eq!(sampler.history().n_samples(), 100);
    Ok(())
}
