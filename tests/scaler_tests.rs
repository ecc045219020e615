use price_forecast::scaler::Scaler;

fn temp_path(test_name: &str) -> std::path::PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("pf-{}-{}.json", test_name, ts))
}

/// Writing a scaled prediction into channel 0 of any template, inverting and
/// forward-transforming again must give back the prediction.
fn assert_primary_round_trip(scaler: &Scaler, template: &[f64]) {
    for &s in &[-0.5, 0.0, 0.123, 0.5, 1.0, 1.75] {
        let price = scaler.inverse_primary(s, template).unwrap();
        let mut raw = vec![price];
        raw.extend(
            scaler
                .inverse_transform(template)
                .unwrap()
                .into_iter()
                .skip(1),
        );
        let back = scaler.transform(&raw).unwrap();
        assert!((back[0] - s).abs() < 1e-9, "{} came back as {}", s, back[0]);
    }
}

#[test]
fn min_max_primary_inverse_round_trips() {
    let scaler = Scaler::from_json_str(
        r#"{"kind":"min_max","data_min":[1200.0,0.0,-3.5],"data_max":[1850.0,4.2e6,3.5],"feature_range":[0.0,1.0]}"#,
    )
    .expect("scaler fixture should parse");
    assert_primary_round_trip(&scaler, &[0.0, 0.0, 0.0]);
    assert_primary_round_trip(&scaler, &[0.4, 0.8, 0.1]);
}

#[test]
fn standard_primary_inverse_round_trips() {
    let scaler = Scaler::from_json_str(
        r#"{"kind":"standard","mean":[512.3,1.0e5],"scale":[48.7,2.5e4]}"#,
    )
    .expect("scaler fixture should parse");
    assert_primary_round_trip(&scaler, &[0.0, 0.0]);
    assert_primary_round_trip(&scaler, &[-1.2, 2.0]);
}

#[test]
fn custom_feature_range_is_respected() {
    let scaler = Scaler::from_json_str(
        r#"{"kind":"min_max","data_min":[0.0],"data_max":[50.0],"feature_range":[-1.0,1.0]}"#,
    )
    .expect("scaler fixture should parse");
    assert!((scaler.transform(&[0.0]).unwrap()[0] + 1.0).abs() < 1e-12);
    assert!((scaler.transform(&[50.0]).unwrap()[0] - 1.0).abs() < 1e-12);
    assert!((scaler.inverse_primary(0.0, &[0.0]).unwrap() - 25.0).abs() < 1e-12);
}

#[test]
fn transform_rows_builds_row_major_matrix() {
    let scaler = Scaler::from_json_str(
        r#"{"kind":"min_max","data_min":[0.0,0.0],"data_max":[10.0,100.0]}"#,
    )
    .expect("scaler fixture should parse");
    let rows = [vec![5.0, 50.0], vec![10.0, 0.0]];
    let m = scaler
        .transform_rows(rows.iter().map(|r| r.as_slice()))
        .unwrap();
    assert_eq!(m.dim(), (2, 2));
    assert!((m[[0, 0]] - 0.5).abs() < 1e-12);
    assert!((m[[0, 1]] - 0.5).abs() < 1e-12);
    assert!((m[[1, 0]] - 1.0).abs() < 1e-12);
    assert!(m[[1, 1]].abs() < 1e-12);
}

#[test]
fn empty_template_is_rejected() {
    let scaler = Scaler::from_affine(vec![1.0], vec![0.0]).expect("scaler fixture should build");
    assert!(scaler.inverse_primary(0.5, &[]).is_err());
}

#[test]
fn load_reads_exported_scaler_file() {
    let path = temp_path("scaler-load");
    std::fs::write(
        &path,
        r#"{"kind":"min_max","data_min":[10.0,0.0],"data_max":[20.0,1.0]}"#,
    )
    .expect("fixture should be writable");
    let scaler = Scaler::load(&path).unwrap();
    assert_eq!(scaler.arity(), 2);
    assert!((scaler.transform(&[15.0, 1.0]).unwrap()[0] - 0.5).abs() < 1e-12);
    std::fs::remove_file(&path).expect("temp file should be removable");
}

#[test]
fn load_reports_missing_file() {
    let err = Scaler::load(&temp_path("scaler-missing")).unwrap_err();
    assert!(format!("{:#}", err).contains("failed to read"));
}
