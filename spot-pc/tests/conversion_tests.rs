//! End-to-end prediction conversion on a scratch model directory

use serde_json::json;
use spot_common::config::TomlConfig;
use spot_common::store::{load_gz_json, load_json};
use spot_common::VideoEventSet;
use spot_pc::{run, Args};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

fn write_json(path: &Path, value: serde_json::Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec(&value).unwrap()).unwrap();
}

/// Data root with two classes and a one-video manifest, plus a model dir
fn setup(root: &Path) -> Args {
    let data_root = root.join("data");
    let model_dir = root.join("model");
    std::fs::create_dir_all(data_root.join("soccernetv2")).unwrap();
    std::fs::write(data_root.join("soccernetv2/class.txt"), "Goal\nCard\n").unwrap();
    write_json(
        &data_root.join("soccernetv2/test.json"),
        json!([{"video": "game1", "num_frames": 4, "fps": 5.0}]),
    );
    write_json(
        &model_dir.join("config.json"),
        json!({"modality": "rgb", "clip_len": 100, "crop_dim": 224}),
    );

    Args {
        model_dir,
        prefix: "pred-test.140".to_string(),
        dataset: "soccernetv2".to_string(),
        data_root,
        frame_dir: root.join("frames"),
        split: "test".to_string(),
        high_recall_threshold: None,
        config: None,
    }
}

#[test]
fn test_converts_and_writes_three_artifacts() {
    let dir = TempDir::new().unwrap();
    let args = setup(dir.path());
    // Frame 0 has no support and keeps its raw scores
    write_json(
        &args.model_dir.join("pred-test.140.frame.json"),
        json!({
            "game1": {
                "scores": [[0.2, 0.8, 0.0], [1.0, 0.5, 0.5], [0.5, 0.5, 3.0], [4.0, 0.0, 0.0]],
                "support": [0.0, 2.0, 4.0, 4.0]
            }
        }),
    );

    let summary = run(&args, &TomlConfig::default()).unwrap();

    assert_eq!(summary.to_string(), "Wrote JSON/GZ predictions for pred-test.140");
    assert_eq!(summary.videos, 1);

    let events: Vec<VideoEventSet> = load_json(&summary.outputs.events).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].video, "game1");
    assert_eq!(events[0].num_frames, 4);
    let spotted: Vec<(u64, &str)> = events[0]
        .events
        .iter()
        .map(|e| (e.frame, e.label.as_str()))
        .collect();
    assert_eq!(spotted, vec![(0, "Goal"), (2, "Card")]);
    assert!((events[0].events[0].score - 0.8).abs() < 1e-6);
    assert_eq!(events[0].events[1].score, 0.75);

    let recall: Vec<VideoEventSet> = load_gz_json(&summary.outputs.events_high_recall).unwrap();
    assert_eq!(recall[0].events.len(), 5);

    let scores: BTreeMap<String, Vec<Vec<f32>>> = load_gz_json(&summary.outputs.frame_scores).unwrap();
    assert_eq!(scores["game1"][1], vec![0.5, 0.25, 0.25]);
    assert_eq!(scores["game1"][3], vec![1.0, 0.0, 0.0]);

    assert!(!args.model_dir.join("pred-test.140.json.tmp").exists());
}

#[test]
fn test_unknown_video_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let args = setup(dir.path());
    write_json(
        &args.model_dir.join("pred-test.140.frame.json"),
        json!({"game9": {"scores": [[1.0, 0.0, 0.0]], "support": [1.0]}}),
    );

    let err = run(&args, &TomlConfig::default()).unwrap_err();

    assert!(format!("{:#}", err).contains("game9"));
    let outputs = args.output_files();
    assert!(!outputs.events.exists());
    assert!(!outputs.events_high_recall.exists());
    assert!(!outputs.frame_scores.exists());
}

#[test]
fn test_shape_mismatch_is_fatal() {
    let dir = TempDir::new().unwrap();
    let args = setup(dir.path());
    write_json(
        &args.model_dir.join("pred-test.140.frame.json"),
        json!({"game1": {"scores": [[1.0, 0.0, 0.0], [1.0, 0.0, 0.0]], "support": [1.0]}}),
    );

    let err = run(&args, &TomlConfig::default()).unwrap_err();

    assert!(format!("{:#}", err).contains("game1"));
    assert!(!args.output_files().events.exists());
}

#[test]
fn test_empty_class_list_is_fatal() {
    let dir = TempDir::new().unwrap();
    let args = setup(dir.path());
    std::fs::write(args.class_file(), "\n").unwrap();

    let err = run(&args, &TomlConfig::default()).unwrap_err();

    assert!(format!("{:#}", err).contains("class.txt"));
}

#[test]
fn test_missing_prediction_file() {
    let dir = TempDir::new().unwrap();
    let args = setup(dir.path());

    let err = run(&args, &TomlConfig::default()).unwrap_err();

    assert!(format!("{:#}", err).contains("pred-test.140.frame.json"));
}

#[test]
fn test_threshold_from_config_and_override() {
    let dir = TempDir::new().unwrap();
    let mut args = setup(dir.path());
    write_json(
        &args.model_dir.join("pred-test.140.frame.json"),
        json!({"game1": {"scores": [[0.6, 0.3, 0.1]], "support": [1.0]}}),
    );

    let mut config = TomlConfig::default();
    config.extraction.high_recall_threshold = 0.2;
    let summary = run(&args, &config).unwrap();
    assert_eq!(summary.events, 0);
    assert_eq!(summary.events_high_recall, 1);

    args.high_recall_threshold = Some(0.05);
    let summary = run(&args, &config).unwrap();
    assert_eq!(summary.events_high_recall, 2);

    args.high_recall_threshold = Some(2.0);
    assert!(run(&args, &config).is_err());
}

#[test]
fn test_unwritable_artifact_leaves_earlier_outputs_untouched() {
    let dir = TempDir::new().unwrap();
    let args = setup(dir.path());
    write_json(
        &args.model_dir.join("pred-test.140.frame.json"),
        json!({"game1": {"scores": [[0.2, 0.8, 0.0]], "support": [1.0]}}),
    );
    let outputs = args.output_files();
    std::fs::write(&outputs.events, "previous run").unwrap();
    std::fs::create_dir(&outputs.events_high_recall).unwrap();

    let err = run(&args, &TomlConfig::default()).unwrap_err();

    assert!(format!("{:#}", err).contains("pred-test.140.recall.json.gz"));
    assert_eq!(std::fs::read_to_string(&outputs.events).unwrap(), "previous run");
    assert!(!outputs.frame_scores.exists());
    let leftovers: Vec<_> = std::fs::read_dir(&args.model_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "staged files left behind: {:?}", leftovers);
}
