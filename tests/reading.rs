use ebsd::config::ReaderConfig;
use ebsd::weights::{Neighbourhood, WeightPolicy, Weighting};
use ebsd::{
    read_ebsd, read_points_file, EbsdError, EbsdReader, FeatureId, GlobalId, LocalId, PhaseId,
    Point, PointSet,
};
use rstest::{fixture, rstest};

#[fixture]
fn two_by_two() -> ebsd::Ebsd {
    read_ebsd("./data/ebsd/grains_2x2.txt").unwrap()
}

#[fixture]
fn four_by_four() -> ebsd::Ebsd {
    read_ebsd("./data/ebsd/grains_4x4.txt").unwrap()
}

#[rstest]
fn two_by_two_scan(two_by_two: ebsd::Ebsd) {
    assert_eq!(two_by_two.grain_num(), 2);
    assert_eq!(two_by_two.phase_num(), 2);
    assert_eq!(two_by_two.grain_num_in_phase(PhaseId(0)).unwrap(), 1);
    assert_eq!(two_by_two.grain_num_in_phase(PhaseId(1)).unwrap(), 1);

    assert_eq!(two_by_two.phase_name(PhaseId(1)), Some("Austenite"));
    assert_eq!(two_by_two.custom_column_names(), vec!["Stored energy"]);

    assert_eq!(two_by_two.avg_data(FeatureId(1)).unwrap().custom, vec![2.0]);
    assert_eq!(two_by_two.avg_data(FeatureId(2)).unwrap().custom, vec![6.0]);
    assert!(two_by_two.phase_conflicts().is_empty());
}

#[rstest]
fn phases_numbered_from_one(four_by_four: ebsd::Ebsd) {
    let ebsd = four_by_four;
    assert_eq!(ebsd.grain_num(), 3);
    assert_eq!(ebsd.phase_num(), 3);
    assert_eq!(ebsd.grain_num_in_phase(PhaseId(0)).unwrap(), 0);
    assert_eq!(ebsd.grain_num_in_phase(PhaseId(1)).unwrap(), 2);
    assert_eq!(ebsd.grain_num_in_phase(PhaseId(2)).unwrap(), 1);

    assert_eq!(ebsd.global_id_of(FeatureId(10)).unwrap(), GlobalId(0));
    assert_eq!(ebsd.global_id_of(FeatureId(20)).unwrap(), GlobalId(1));
    assert_eq!(ebsd.global_id_of(FeatureId(30)).unwrap(), GlobalId(2));
    assert_eq!(
        ebsd.feature_id(PhaseId(1), LocalId(1)).unwrap(),
        FeatureId(30)
    );
    assert_eq!(
        ebsd.phase_local_of(GlobalId(1)).unwrap(),
        (PhaseId(2), LocalId(0))
    );

    assert_eq!(ebsd.phase_name(PhaseId(2)), Some("Cementite"));
    assert_eq!(ebsd.phase_symmetry(PhaseId(2)), Some(32));
    assert_eq!(ebsd.phase_name(PhaseId(0)), None);
}

#[rstest]
fn grain_averages(four_by_four: ebsd::Ebsd) {
    let grain = four_by_four.avg_data(FeatureId(10)).unwrap();
    assert_eq!(grain.n, 8);
    assert!((grain.custom[0] - 2.0).abs() < 1e-12);
    assert!((grain.custom[1] - 0.8).abs() < 1e-12);
    assert!((grain.centroid.x - 0.5).abs() < 1e-12);
    assert!((grain.centroid.y - 1.0).abs() < 1e-12);

    // identical voxel orientations average to themselves
    let angles = four_by_four.euler_angles(FeatureId(20)).unwrap();
    assert!((angles.phi1 - 2.0f64.to_degrees()).abs() < 1e-6);
    assert!((angles.phi - 1.2f64.to_degrees()).abs() < 1e-6);
    assert!((angles.phi2 - 0.4f64.to_degrees()).abs() < 1e-6);
}

#[rstest]
fn records_are_stored_in_grid_order(four_by_four: ebsd::Ebsd) {
    // the file lists the top row first
    assert_eq!(four_by_four.data(0).unwrap().feature_id, FeatureId(10));
    assert_eq!(four_by_four.data(3).unwrap().feature_id, FeatureId(30));
    assert_eq!(four_by_four.data(15).unwrap().feature_id, FeatureId(20));
    assert!(four_by_four.data(16).unwrap_err().is_lookup());
}

#[rstest]
#[case(Point::new(0.1, 0.1, 0.0), 0)]
#[case(Point::new(1.9, 0.1, 0.0), 3)]
#[case(Point::new(2.0, 2.0, 0.0), 15)]
#[case(Point::new(-0.2, 1.1, 0.0), 8)]
fn spatial_lookup(four_by_four: ebsd::Ebsd, #[case] point: Point, #[case] index: usize) {
    assert_eq!(four_by_four.index_from_point(&point).unwrap(), index);
}

#[rstest]
fn far_outside_is_a_range_error(four_by_four: ebsd::Ebsd) {
    let error = four_by_four
        .index_from_point(&Point::new(3.0, 1.0, 0.0))
        .unwrap_err();
    assert!(error.is_range());
    assert!(four_by_four
        .data_at(&Point::new(1.0, -0.6, 0.0))
        .unwrap_err()
        .is_range());
}

#[rstest]
fn weights_for_points_file(two_by_two: ebsd::Ebsd) {
    let points = read_points_file("./data/points.txt").unwrap();
    let ids: Vec<u64> = points.nodes().iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![0, 1, 10, 11]);

    let weights = two_by_two
        .node_weights(&points, WeightPolicy::default())
        .unwrap();
    assert_eq!(weights.len(), 4);
    assert_eq!(weights.dense_phase(0).unwrap(), vec![0.5, 0.5]);
    assert_eq!(weights.dense_grain(1).unwrap(), vec![1.0, 0.0]);
    assert_eq!(weights.dense_grain(10).unwrap(), vec![0.0, 1.0]);
    assert_eq!(weights.dense_phase(11).unwrap(), vec![0.0, 1.0]);
}

#[rstest]
fn split_grains_within_one_phase(four_by_four: ebsd::Ebsd) {
    let points = PointSet::from_points(&[Point::new(1.0, 0.5, 0.0)]);
    let weights = four_by_four
        .node_weights(&points, WeightPolicy::default())
        .unwrap();
    assert_eq!(
        weights.grain_weights(0).unwrap(),
        &[(GlobalId(0), 0.5), (GlobalId(2), 0.5)]
    );
    assert_eq!(weights.dense_phase(0).unwrap(), vec![0.0, 1.0, 0.0]);
}

#[rstest]
fn weights_sum_to_one(four_by_four: ebsd::Ebsd) {
    let points: Vec<Point> = (0..=20)
        .flat_map(|i| (0..=20).map(move |j| Point::new(0.1 * i as f64, 0.1 * j as f64, 0.0)))
        .collect();
    let points = PointSet::from_points(&points);

    for policy in [
        WeightPolicy::default(),
        WeightPolicy {
            neighbourhood: Neighbourhood::Face,
            weighting: Weighting::InverseDistance,
        },
    ] {
        let weights = four_by_four.node_weights(&points, policy).unwrap();
        for (node, _) in points.nodes() {
            let grains: f64 = weights.dense_grain(*node).unwrap().iter().sum();
            let phases: f64 = weights.dense_phase(*node).unwrap().iter().sum();
            assert!((grains - 1.0).abs() < 1e-12);
            assert!((phases - 1.0).abs() < 1e-12);
        }
    }
}

#[test]
fn bad_record_count_fails_the_load() {
    let error = read_ebsd("./data/ebsd/bad_count.txt").unwrap_err();
    assert!(error.is_format());
    assert!(error.to_string().contains("expected 4 voxel records, found 3"));

    let reader = EbsdReader::new();
    assert!(reader.load("./data/ebsd/bad_count.txt").is_err());
    assert!(!reader.is_loaded());
    assert!(matches!(reader.grain_num(), Err(EbsdError::Unloaded)));
    assert!(matches!(
        reader.avg_data(FeatureId(1)),
        Err(EbsdError::Unloaded)
    ));
}

#[test]
fn missing_file() {
    let error = read_ebsd("./data/ebsd/missing.txt").unwrap_err();
    assert!(matches!(error, EbsdError::Io { .. }));
    assert!(error.is_fatal());
}

#[test]
fn reader_lifecycle() {
    let config = ReaderConfig::from_json_file("./data/config.json").unwrap();
    let reader = EbsdReader::with_config(config);

    reader.load("./data/ebsd/grains_2x2.txt").unwrap();
    assert_eq!(reader.grain_num().unwrap(), 2);

    // a bad reload leaves the committed scan in place
    assert!(reader.load("./data/ebsd/bad_count.txt").is_err());
    assert_eq!(reader.grain_num().unwrap(), 2);

    let points = read_points_file("./data/points.txt").unwrap();
    let weights = reader.node_weights(&points).unwrap();
    assert_eq!(weights.policy().weighting, Weighting::InverseDistance);
    assert_eq!(reader.grain_weights_version(), Some(points.version()));

    // a new scan drops the cached weights
    reader.load("./data/ebsd/grains_4x4.txt").unwrap();
    assert_eq!(reader.grain_num().unwrap(), 3);
    assert_eq!(reader.grain_weights_version(), None);
}
