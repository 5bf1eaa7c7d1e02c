//! End-to-end tests of the training policies on a synthetic classifier

use ciclo::data::{blobs, BlobsConfig, DataBunch, DatasetType, ToHalf};
use ciclo::interpret::{ClassificationInterpretation, PlotOptions};
use ciclo::nn::{Model, Sequential};
use ciclo::policy::{
    BnFreeze, GradientClipping, LrFindConfig, MixedPrecision, MixedPrecisionConfig, MixupConfig, OneCycleConfig,
    ShowGraph, TrainingPolicies,
};
use ciclo::precision::Precision;
use ciclo::train::{Accuracy, Callback, Learner, LrSpec};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn learner(seed: u64) -> Learner {
    let cfg = BlobsConfig { n_classes: 3, n_per_class: 40, n_features: 2, radius: 4.0, noise: 0.6 };
    let (x, y) = blobs(&cfg, seed).unwrap();
    let data = DataBunch::from_arrays(x, y, 3, 0.25, 16, seed)
        .unwrap()
        .with_classes(vec!["a".into(), "b".into(), "c".into()]);
    let mut rng = StdRng::seed_from_u64(seed);
    let model = Sequential::mlp(&[2, 16, 3], true, &mut rng).unwrap().with_layer_groups(&[3]).unwrap();
    Learner::new(data, Box::new(model)).with_metrics(vec![Box::new(Accuracy)])
}

#[test]
fn one_cycle_learns_separable_blobs() {
    let mut learn = learner(0);
    let result = learn
        .fit_one_cycle(10, LrSpec::up_to(3e-2), &OneCycleConfig::default(), None, Vec::new())
        .unwrap();
    assert_eq!(result.epochs_run, 10);
    assert!(result.metrics[0] > 0.85, "accuracy {}", result.metrics[0]);

    let lrs = &learn.recorder.lrs;
    let peak = lrs.iter().cloned().fold(f32::MIN, f32::max);
    assert!((peak - 3e-2).abs() < 1e-6);
    assert!(lrs[0] < peak / 20.0);
    assert!(*lrs.last().unwrap() < lrs[0]);
}

#[test]
fn lr_find_leaves_learner_untouched() {
    let mut learn = learner(1);
    let before = learn.model.state_dict();
    let found = learn.lr_find(&LrFindConfig::default()).unwrap();
    assert!(!found.is_empty() && found.len() <= 100);
    assert!(found.lrs.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(learn.model.state_dict(), before);
    assert!(learn.callbacks.is_empty());
}

#[test]
fn full_policy_stack_trains() {
    let mut learn = learner(2);
    learn
        .to_fp16(&MixedPrecisionConfig { dynamic: true, ..Default::default() })
        .clip_grad(1.0)
        .mixup(&MixupConfig { seed: Some(5), ..Default::default() })
        .unwrap();
    learn.add_callback(Box::new(ShowGraph::default()));

    let result = learn
        .fit_one_cycle(8, 3e-2, &OneCycleConfig::default(), None, vec![Box::new(BnFreeze)])
        .unwrap();
    assert!(result.final_loss.is_finite());
    assert!(result.metrics[0] > 0.7, "accuracy {}", result.metrics[0]);
    assert_eq!(learn.callbacks.len(), 2);

    learn.to_fp32();
    assert_eq!(learn.model.precision(), Precision::Fp32);
    assert!(!learn.has_callback(MixedPrecision::NAME));
    assert!(!learn.data.train_dl.has_tfm(ToHalf::NAME));
    assert!(learn.has_callback("ShowGraph"));
}

#[test]
fn interpretation_after_training() {
    let mut learn = learner(3);
    learn.callback_fns.push(Box::new(|| Box::new(GradientClipping::new(1.0)) as Box<dyn Callback>));
    learn.fit(6, 1e-2, None, Vec::new()).unwrap();

    let interp = ClassificationInterpretation::from_learner(&mut learn, DatasetType::Valid).unwrap();
    let cm = interp.confusion_matrix();
    assert_eq!(cm.total(), learn.data.valid_dl.n_samples());
    for c in 0..3 {
        let support = interp.y_true.iter().filter(|&&t| t == c).count();
        assert_eq!(cm.support(c), support);
    }
    let confused = interp.most_confused(0);
    assert!(confused.iter().all(|(a, p, n)| a != p && *n > 0));
    assert!(confused.windows(2).all(|w| w[0].2 >= w[1].2));

    let text = interp.plot_confusion_matrix(&PlotOptions { normalize: true, ..Default::default() });
    assert!(text.starts_with("Confusion matrix"));
    assert!(text.contains('a') && text.contains("Predicted"));

    let top = interp.top_losses(3);
    assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
}
