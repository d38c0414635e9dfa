use std::path::PathBuf;
use std::process::Command;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_posemark")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "posemark.exe"
            } else {
                "posemark"
            });
            p
        })
}

fn scratch_dir() -> PathBuf {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

const DOC: &str = r#"{
    "schema": "v1",
    "fps": 30,
    "skeletonPairs": [[0, 1]],
    "frames": [
        {"f": 0, "people": [{"id": "a", "keypoints": [
            {"x": 0.2, "y": 0.2, "c": 0.9}, {"x": 0.8, "y": 0.8, "c": 0.9}
        ]}], "focus": [
            {"label": "knee", "x": 0.4, "y": 0.4, "w": 0.2, "h": 0.2, "severity": "danger"}
        ]}
    ]
}"#;

#[test]
fn cli_frame_writes_png() {
    let dir = scratch_dir();
    let doc_path = dir.join("doc.json");
    let out_path = dir.join("frame.png");
    std::fs::write(&doc_path, DOC).unwrap();
    let _ = std::fs::remove_file(&out_path);

    let status = Command::new(exe())
        .args(["frame", "--overlay"])
        .arg(&doc_path)
        .args(["--time", "0", "--video-size", "128x72", "--size", "128x72"])
        .arg("--out")
        .arg(&out_path)
        .status()
        .unwrap();
    assert!(status.success());

    let img = image::open(&out_path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (128, 72));
    assert!(img.pixels().any(|p| p.0[3] > 0));
}

#[test]
fn cli_frame_with_missing_overlay_writes_transparent_png() {
    let dir = scratch_dir();
    let out_path = dir.join("empty.png");
    let _ = std::fs::remove_file(&out_path);

    let status = Command::new(exe())
        .args(["frame", "--overlay"])
        .arg(dir.join("no-such-overlay.json"))
        .args(["--time", "1.5", "--video-size", "64x64", "--out"])
        .arg(&out_path)
        .status()
        .unwrap();
    assert!(status.success());

    let img = image::open(&out_path).unwrap().to_rgba8();
    assert!(img.pixels().all(|p| p.0[3] == 0));
}

#[test]
fn cli_inspect_summarizes_document() {
    let dir = scratch_dir();
    let doc_path = dir.join("inspect.json");
    std::fs::write(&doc_path, DOC).unwrap();

    let out = Command::new(exe())
        .args(["inspect", "--overlay"])
        .arg(&doc_path)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("keys:           index"), "{stdout}");
    assert!(stdout.contains("frames:         1"), "{stdout}");
    assert!(stdout.contains("max focus:      1"), "{stdout}");
}

#[test]
fn cli_import_writes_loadable_document() {
    let dir = scratch_dir();
    let in_path = dir.join("annotations.json");
    let out_path = dir.join("imported.json");
    std::fs::write(
        &in_path,
        r#"{"fps": 10, "size": {"w": 100, "h": 50}, "frames": [
            {"index": 0, "detections": [{"track_id": 3, "bbox_xyxy": [10, 10, 30, 40],
              "score": 0.9, "class": "person", "keypoints": [{"x": 50, "y": 25, "c": 0.7}]}]},
            {"index": 1, "detections": []}
        ]}"#,
    )
    .unwrap();
    let _ = std::fs::remove_file(&out_path);

    let status = Command::new(exe())
        .args(["import", "--in"])
        .arg(&in_path)
        .arg("--out")
        .arg(&out_path)
        .arg("--bbox-focus")
        .status()
        .unwrap();
    assert!(status.success());

    let doc = posemark::OverlayDocument::from_json_slice(&std::fs::read(&out_path).unwrap())
        .unwrap();
    assert_eq!(doc.frames.len(), 2);
    assert_eq!(doc.frames[1].key, 0.1);
    assert_eq!(doc.frames[0].people[0].id, "3");
    assert_eq!(doc.frames[0].focus[0].label, "#3");
}

#[test]
fn cli_rejects_bad_size() {
    let status = Command::new(exe())
        .args(["frame", "--overlay", "x.json", "--time", "0", "--size", "wide", "--out"])
        .arg(scratch_dir().join("never.png"))
        .stderr(std::process::Stdio::null())
        .status()
        .unwrap();
    assert!(!status.success());
}
