use chrono::{TimeZone, Utc};
use std::path::PathBuf;

use handover_pool::pipeline::{ExclusionKind, FixedClock, Pipeline, PipelineInput, RunOutput};
use handover_pool::tle::TleLoader;
use handover_pool::RunConfig;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

fn sample_config() -> RunConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/run.yaml");
    RunConfig::from_file(path).unwrap()
}

fn run_with(config: RunConfig) -> RunOutput {
    let sources = TleLoader::new(data_dir()).load_all().unwrap();
    Pipeline::new(config)
        .unwrap()
        .with_clock(FixedClock(Utc.with_ymd_and_hms(2024, 4, 10, 0, 0, 0).unwrap()))
        .run(&PipelineInput::new(sources))
        .unwrap()
}

#[test]
fn test_fixture_run_end_to_end() {
    let output = run_with(sample_config());

    assert_eq!(
        output.selections.keys().collect::<Vec<_>>(),
        vec!["oneweb", "starlink"]
    );

    let starlink = &output.selections["starlink"];
    assert_eq!(starlink.stage_counts.input, 10);
    assert_eq!(starlink.stage_counts.parsed, 9);
    assert!(starlink.stage_counts.is_monotonic());
    assert!(starlink.retained_count >= 1);

    for selection in output.selections.values() {
        for pair in selection.selected.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for candidate in &selection.selected {
            assert!((0.0..=1.0).contains(&candidate.score));
        }
        assert_eq!(
            selection.filtering_rate,
            1.0 - selection.retained_count as f64 / selection.input_count as f64
        );
        assert_eq!(selection.handover_order.len(), selection.retained_count);
    }

    let meta = &output.metadata;
    assert_eq!(
        meta.calculation_base_time,
        Some(Utc.with_ymd_and_hms(2024, 4, 9, 12, 0, 0).unwrap())
    );
    assert!(meta.stage_counts.is_monotonic());
    assert_eq!(
        meta.input_satellites,
        output.selections.values().map(|s| s.input_count).sum::<usize>()
    );

    let parse: Vec<_> = meta.exclusions_of(ExclusionKind::Parse).collect();
    assert_eq!(parse.len(), 1);
    assert!(parse[0].reason.contains("checksum"));
    assert!(meta
        .exclusions_of(ExclusionKind::NotVisible)
        .any(|e| e.norad_id == Some(44790)));
    assert!(meta.aborted.is_none());
    assert!((meta.max_tle_age_days.unwrap() - 0.5).abs() < 1e-9);
}

#[test]
fn test_worker_count_does_not_change_ranking() {
    let one = run_with(RunConfig {
        workers: Some(1),
        ..sample_config()
    });
    let many = run_with(RunConfig {
        workers: Some(4),
        ..sample_config()
    });
    assert_eq!(one.selections, many.selections);
}

#[test]
fn test_top_n_and_floor() {
    let mut config = sample_config();
    config.selection.top_n = Some(2);
    config.constellations.get_mut("oneweb").unwrap().top_n = Some(1);
    let output = run_with(config);

    assert!(output.selections["starlink"].retained_count <= 2);
    assert!(output.selections["oneweb"].retained_count <= 1);

    let mut config = sample_config();
    config.selection.score_floor = Some(1.0);
    let output = run_with(config);
    for selection in output.selections.values() {
        assert!(selection.selected.iter().all(|c| c.score >= 1.0));
        assert_eq!(selection.handover_ready, selection.retained_count);
    }
}

#[test]
fn test_json_sink_preserves_floats() {
    let output = run_with(sample_config());
    let json = serde_json::to_string(&output).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let first = &output.selections["starlink"].selected[0];
    let score = value["selections"]["starlink"]["selected"][0]["score"]
        .as_f64()
        .unwrap();
    assert_eq!(score, first.score);
    assert_eq!(
        value["selections"]["starlink"]["pool_quality"],
        serde_json::json!(output.selections["starlink"].pool_quality)
    );
}
