use crate::{analyze_batch, Dataset, DecompositionMethod, Entity, Pca, PcaConfig, PcaError, PcaModel};
use approx::assert_abs_diff_eq;
use ndarray::{array, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const FRAC_1_SQRT_2: f64 = std::f64::consts::FRAC_1_SQRT_2;

fn generate_random_data(n_samples: usize, n_features: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    // Column j is stretched by (n_features - j) so the eigenvalues stay well separated.
    Array2::from_shape_fn((n_samples, n_features), |(_, j)| {
        rng.gen_range(-1.0..1.0) * (n_features - j) as f64
    })
}

fn diagonal_line() -> Dataset {
    Dataset::from_rows(
        vec!["x".into(), "y".into()],
        &[vec![0.0, 0.0], vec![2.0, 2.0], vec![4.0, 4.0]],
    )
    .unwrap()
}

fn fit(dataset: &Dataset, config: PcaConfig) -> PcaModel {
    Pca::new(config).fit(dataset).unwrap()
}

mod pca_tests {
    use super::*;

    #[test]
    fn test_points_on_a_line() {
        let model = fit(&diagonal_line(), PcaConfig::new(false));

        assert_eq!(model.n_components(), 2);
        assert_eq!(model.rank(), 1);
        let variances = model.explained_variance();
        assert_abs_diff_eq!(variances[0], 8.0, epsilon = 1e-10);
        assert_abs_diff_eq!(variances[1], 0.0, epsilon = 1e-10);

        let first = model.components()[0].loading();
        assert_abs_diff_eq!(first[0], FRAC_1_SQRT_2, epsilon = 1e-10);
        assert_abs_diff_eq!(first[1], FRAC_1_SQRT_2, epsilon = 1e-10);

        let scores = model.scores().values();
        let expected = [-2.0 * 2f64.sqrt(), 0.0, 2.0 * 2f64.sqrt()];
        for (i, e) in expected.iter().enumerate() {
            assert_abs_diff_eq!(scores[[i, 0]], *e, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_rank_deficiency_is_reported_not_fatal() {
        let model = fit(&diagonal_line(), PcaConfig::new(false));
        assert_eq!(
            model.check_full_rank().unwrap_err(),
            PcaError::RankDeficient { rank: 1, columns: 2 }
        );

        let full = fit(&Dataset::unnamed(generate_random_data(20, 3, 1)).unwrap(), PcaConfig::new(true));
        assert!(full.check_full_rank().is_ok());
    }

    #[test]
    fn test_drop_null_components() {
        let config = PcaConfig::new(false).with_drop_null_components(true);
        let model = fit(&diagonal_line(), config);
        assert_eq!(model.n_components(), 1);
        assert_eq!(model.scores().n_components(), 1);
        assert_eq!(model.loadings().dim(), (2, 1));
        assert!(matches!(
            model.project(&diagonal_line(), 2),
            Err(PcaError::InvalidComponentCount { requested: 2, available: 1 })
        ));
    }

    #[test]
    fn test_component_count_validation() {
        let data = diagonal_line();
        let model = fit(&data, PcaConfig::new(false));
        assert_eq!(
            model.project(&data, 0).unwrap_err(),
            PcaError::InvalidComponentCount { requested: 0, available: 2 }
        );
        assert_eq!(
            model.project(&data, 3).unwrap_err(),
            PcaError::InvalidComponentCount { requested: 3, available: 2 }
        );
        assert_eq!(model.project(&data, 1).unwrap().n_components(), 1);
    }

    #[test]
    fn test_constant_column_with_scaling() {
        let data = Dataset::from_rows(
            vec!["a".into(), "b".into()],
            &[vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0]],
        )
        .unwrap();
        assert_eq!(
            Pca::new(PcaConfig::new(true)).fit(&data).unwrap_err(),
            PcaError::DegenerateColumn { column: 1, variable: "b".to_string() }
        );

        // Without scaling the constant column is just a null direction.
        let model = fit(&data, PcaConfig::new(false));
        assert_eq!(model.rank(), 1);
        assert_abs_diff_eq!(model.components()[0].loading()[0], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_too_few_observations() {
        let data = Dataset::unnamed(array![[1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(
            Pca::new(PcaConfig::new(false)).fit(&data).unwrap_err(),
            PcaError::InsufficientObservations { found: 1 }
        );
    }

    #[test]
    fn test_projection_of_new_observations() {
        let training = Dataset::unnamed(generate_random_data(30, 3, 7)).unwrap();
        let model = fit(&training, PcaConfig::new(true));
        let fresh = array![[0.5, -1.0, 2.0], [0.0, 0.0, 0.0]];
        let scores = model.project_values(fresh.view(), 3).unwrap();

        let mean = model.centering().mean();
        let scale = model.centering().scale().unwrap();
        for (i, row) in fresh.rows().into_iter().enumerate() {
            let standardized = (&row - mean) / scale;
            for (j, component) in model.components().iter().enumerate() {
                assert_abs_diff_eq!(
                    scores.values()[[i, j]],
                    standardized.dot(&component.loading()),
                    epsilon = 1e-12
                );
            }
        }

        let narrow = array![[1.0, 2.0]];
        assert!(matches!(
            model.project_values(narrow.view(), 1),
            Err(PcaError::ShapeMismatch { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn test_project_checks_variable_names() {
        let model = fit(&diagonal_line(), PcaConfig::new(false));
        let swapped = Dataset::from_rows(vec!["y".into(), "x".into()], &[vec![1.0, 2.0]]).unwrap();
        assert_eq!(
            model.project(&swapped, 1).unwrap_err(),
            PcaError::VariableMismatch {
                index: 0,
                expected: "x".to_string(),
                found: "y".to_string()
            }
        );
        let wider = Dataset::unnamed(array![[1.0, 2.0, 3.0]]).unwrap();
        assert!(matches!(
            model.project(&wider, 1),
            Err(PcaError::ShapeMismatch { expected: 2, found: 3, .. })
        ));
        let same = Dataset::from_rows(vec!["x".into(), "y".into()], &[vec![1.0, 2.0]]).unwrap();
        assert_eq!(model.project(&same, 2).unwrap().n_observations(), 1);
    }

    #[test]
    fn test_inverse_transform_recovers_original_units() {
        let raw = generate_random_data(25, 4, 11);
        let data = Dataset::unnamed(raw.clone()).unwrap();
        for scale in [false, true] {
            let model = fit(&data, PcaConfig::new(scale));
            let scores = model.project(&data, 4).unwrap();
            let restored = model.inverse_transform(&scores, 4).unwrap();
            for (a, b) in restored.iter().zip(raw.iter()) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_explained_variance_ratios() {
        let data = Dataset::unnamed(generate_random_data(40, 5, 3)).unwrap();
        let model = fit(&data, PcaConfig::new(false));
        let ratio = model.explained_variance_ratio();
        assert_abs_diff_eq!(ratio.sum(), 1.0, epsilon = 1e-12);
        let cumulative = model.cumulative_explained_variance_ratio();
        assert_abs_diff_eq!(cumulative[4], 1.0, epsilon = 1e-12);
        for w in cumulative.windows(2) {
            assert!(w[1] >= w[0]);
        }
        assert_abs_diff_eq!(cumulative[0], ratio[0], epsilon = 1e-15);
    }

    #[test]
    fn test_scaled_total_variance_equals_variable_count() {
        let data = Dataset::unnamed(generate_random_data(50, 4, 5)).unwrap();
        let model = fit(&data, PcaConfig::new(true));
        assert_abs_diff_eq!(model.explained_variance().sum(), 4.0, epsilon = 1e-10);
    }

    #[test]
    fn test_methods_agree() {
        let data = Dataset::unnamed(generate_random_data(60, 4, 42)).unwrap();
        let reference = fit(&data, PcaConfig::new(false));
        for method in [DecompositionMethod::jacobi(), DecompositionMethod::Svd] {
            let other = fit(&data, PcaConfig::new(false).with_method(method));
            assert_eq!(other.method(), method);
            for (a, b) in reference.components().iter().zip(other.components()) {
                assert_abs_diff_eq!(a.explained_variance(), b.explained_variance(), epsilon = 1e-9);
                for (x, y) in a.loading().iter().zip(b.loading().iter()) {
                    assert_abs_diff_eq!(*x, *y, epsilon = 1e-8);
                }
            }
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = Dataset::unnamed(generate_random_data(20, 3, 9)).unwrap();
        let pca = Pca::new(PcaConfig::new(false));
        assert_eq!(pca.fit(&data).unwrap(), pca.fit(&data).unwrap());
    }

    #[test]
    fn test_quality_metrics_through_model() {
        let model = fit(&diagonal_line(), PcaConfig::new(false));
        assert_abs_diff_eq!(model.contribution(Entity::Variable(0), 0).unwrap(), 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(model.cosine_squared(Entity::Variable(1), 0).unwrap(), 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(model.contribution(Entity::Observation(2), 0).unwrap(), 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(model.cosine_squared(Entity::Observation(0), 0).unwrap(), 1.0, epsilon = 1e-9);
        // The centre point sits at the origin of component space.
        assert_eq!(model.cosine_squared(Entity::Observation(1), 0).unwrap(), 0.0);
        assert!(matches!(
            model.contribution(Entity::Observation(3), 0),
            Err(PcaError::IndexOutOfRange { what: "observation", .. })
        ));
    }

    #[test]
    fn test_analyze_batch_keeps_order_and_isolates_failures() {
        let datasets = vec![
            diagonal_line(),
            Dataset::unnamed(array![[1.0, 2.0]]).unwrap(),
            Dataset::unnamed(generate_random_data(10, 2, 2)).unwrap(),
        ];
        let results = analyze_batch(&datasets, &PcaConfig::new(false));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().rank(), 1);
        assert_eq!(
            results[1].as_ref().unwrap_err(),
            &PcaError::InsufficientObservations { found: 1 }
        );
        assert_eq!(results[2].as_ref().unwrap(), &fit(&datasets[2], PcaConfig::new(false)));
    }
}

mod model_persistence_tests {
    use super::*;

    fn standard() -> bincode::config::Configuration {
        bincode::config::standard()
    }

    #[test]
    fn test_bytes_round_trip() {
        let data = Dataset::unnamed(generate_random_data(15, 3, 21)).unwrap();
        let model = fit(&data, PcaConfig::new(true));
        let bytes = model.to_bytes().unwrap();
        let loaded = PcaModel::from_bytes(&bytes).unwrap();
        assert_eq!(loaded, model);
        assert_eq!(
            loaded.project(&data, 2).unwrap(),
            model.project(&data, 2).unwrap()
        );
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        assert!(matches!(
            PcaModel::from_bytes(&[0xff, 0x01, 0x02]),
            Err(PcaError::InvalidModel(_))
        ));
        let bytes = fit(&diagonal_line(), PcaConfig::new(false)).to_bytes().unwrap();
        assert!(matches!(
            PcaModel::from_bytes(&bytes[..bytes.len() / 2]),
            Err(PcaError::InvalidModel(_))
        ));
    }

    // A model is encoded as its fields in order, so a tuple with the same
    // layout decodes as a model.
    #[test]
    fn test_inconsistent_models_are_rejected() {
        let model = fit(&diagonal_line(), PcaConfig::new(false));

        let bad_rank = (
            model.variables().to_vec(),
            model.centering().clone(),
            model.components().to_vec(),
            model.scores().clone(),
            7usize,
            model.method(),
        );
        let bytes = bincode::serde::encode_to_vec(&bad_rank, standard()).unwrap();
        assert!(matches!(PcaModel::from_bytes(&bytes), Err(PcaError::InvalidModel(_))));

        let mut reversed = model.components().to_vec();
        reversed.reverse();
        let out_of_order = (
            model.variables().to_vec(),
            model.centering().clone(),
            reversed,
            model.scores().clone(),
            model.rank(),
            model.method(),
        );
        let bytes = bincode::serde::encode_to_vec(&out_of_order, standard()).unwrap();
        assert!(matches!(PcaModel::from_bytes(&bytes), Err(PcaError::InvalidModel(_))));

        let extra_name = (
            vec!["x".to_string(), "y".to_string(), "z".to_string()],
            model.centering().clone(),
            model.components().to_vec(),
            model.scores().clone(),
            model.rank(),
            model.method(),
        );
        let bytes = bincode::serde::encode_to_vec(&extra_name, standard()).unwrap();
        assert!(matches!(PcaModel::from_bytes(&bytes), Err(PcaError::InvalidModel(_))));
    }
}
