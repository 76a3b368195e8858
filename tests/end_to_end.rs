//! End-to-end training on synthetic votes with known source accuracies.

use ndarray::{arr2, Array2};
use sprs::{CsMat, TriMat};

use weaklabel::synthetic::{generate_votes, SourceSpec};
use weaklabel::{LabelModel, LabelModelConfig, MultiTask};

fn csc_from_dense(rows: &[&[usize]]) -> CsMat<usize> {
    let n = rows.len();
    let m = rows[0].len();
    let mut tri = TriMat::new((n, m));
    for (r, row) in rows.iter().enumerate() {
        for (c, &v) in row.iter().enumerate() {
            if v != 0 {
                tri.add_triplet(r, c, v);
            }
        }
    }
    tri.to_csc()
}

// ---------------------------------------------------------------------------
// Optimizer sanity
// ---------------------------------------------------------------------------

#[test]
fn loss_is_non_increasing_with_plain_small_lr() {
    // Two opposite-polarity sources voting on disjoint points: a strong
    // corrected overlap the factorization has to move away from the init to
    // fit.
    let l = csc_from_dense(&[&[1, 0], &[1, 0], &[0, 2], &[0, 2]]);

    let mut config = LabelModelConfig::default();
    config.train.n_epochs = 200;
    config.train.optimizer.lr = 0.01;
    config.train.optimizer.momentum = 0.0;

    let mut model = LabelModel::new(Some(vec![vec![1, 2]]), config);
    let report = model.train(MultiTask::Single(l), None).unwrap();

    assert_eq!(report.loss_history.len(), 200);
    for pair in report.loss_history.windows(2) {
        assert!(
            pair[1] <= pair[0] + 1e-9,
            "loss increased: {} -> {}",
            pair[0],
            pair[1]
        );
    }
    assert!(report.final_loss <= report.loss_history[0]);
}

// ---------------------------------------------------------------------------
// Synthetic three-source scenario
// ---------------------------------------------------------------------------

#[test]
fn reliable_sources_beat_a_random_one() {
    let _ = env_logger::builder().is_test(true).try_init();

    // Sources 0 and 1 are reliable voters for class 1; source 2 is a coin
    // flip.
    let sources = vec![
        SourceSpec {
            polarity: 1,
            accuracy: 0.9,
            propensity: 1.0,
        },
        SourceSpec {
            polarity: 1,
            accuracy: 0.9,
            propensity: 1.0,
        },
        SourceSpec {
            polarity: 1,
            accuracy: 0.5,
            propensity: 1.0,
        },
    ];

    let mut config = LabelModelConfig::default();
    config.verbose = true;
    config.train.n_epochs = 500;
    let seed = config.seed;

    let (votes, _truth) = generate_votes(1000, 2, &sources, seed);
    let true_accs: Array2<f64> = arr2(&[[0.9, 0.9, 0.5]]);

    let mut model = LabelModel::new(Some(vec![vec![1, 2]]), config);
    model
        .train(MultiTask::Single(votes.clone()), Some(&true_accs))
        .unwrap();

    let accs = model.accs();
    assert!(accs[[0, 0]] > 0.8, "source 0 acc too low: {}", accs[[0, 0]]);
    assert!(accs[[0, 1]] > 0.8, "source 1 acc too low: {}", accs[[0, 1]]);
    assert!(accs[[0, 2]] < 0.7, "source 2 acc too high: {}", accs[[0, 2]]);
    assert!(accs[[0, 0]] - accs[[0, 2]] > 0.15);
    assert!(accs[[0, 1]] - accs[[0, 2]] > 0.15);

    // The fit must explain the truth better than the untrained gamma_init
    // baseline, whose accuracies are uniformly 0.9:
    // baseline score = (0.9 - 0.5)^2 / 3.
    let baseline = (0.9f64 - 0.5).powi(2) / 3.0;
    let score = model.get_accs_score(&true_accs);
    assert!(
        score < baseline / 2.0,
        "trained score {} not clearly below baseline {}",
        score,
        baseline
    );

    // Predicted posteriors should side with the reliable sources when they
    // vote and source 2 disagrees.
    let probe = csc_from_dense(&[&[1, 1, 0], &[0, 0, 1]]);
    let proba = model
        .predict_proba(MultiTask::Single(probe))
        .unwrap()
        .into_single();
    assert!(proba[[0, 0]] > 0.8, "two reliable votes for class 1");
    assert!(
        (proba[[1, 0]] - 0.5).abs() < 0.2,
        "a lone random vote should move the posterior only weakly"
    );
}

#[test]
fn regularization_holds_gamma_near_its_prior() {
    let sources = vec![
        SourceSpec {
            polarity: 1,
            accuracy: 0.95,
            propensity: 1.0,
        },
        SourceSpec {
            polarity: 2,
            accuracy: 0.95,
            propensity: 1.0,
        },
    ];
    let (votes, _) = generate_votes(500, 2, &sources, 9);

    let fit_gamma = |l2: f64| {
        let mut config = LabelModelConfig::default();
        config.train.n_epochs = 300;
        config.train.l2 = l2;
        let mut model = LabelModel::new(Some(vec![vec![1, 2]]), config);
        model.train(MultiTask::Single(votes.clone()), None).unwrap();
        model.gamma().unwrap().clone()
    };

    let free = fit_gamma(0.0);
    let pinned = fit_gamma(10.0);

    let gamma_init = LabelModelConfig::default().train.gamma_init;
    for (f, p) in free.iter().zip(pinned.iter()) {
        // A heavy prior keeps gamma closer to its init than the free fit.
        assert!((p - gamma_init).abs() <= (f - gamma_init).abs() + 1e-9);
    }
}
