//! Loading models from disk and through the background worker.

use std::fs;
use std::path::Path;

use pathview::scene::{load_scene, LoadRequest, LoadTracker, LoadWorker};
use pathview::Error;
use tempfile::TempDir;

const CUBE_FACE: &str = "\
mtllib face.mtl
v 0 0 0
v 1 0 0
v 1 0 1
v 0 0 1
usemtl glow
f 1 2 3 4
";

const FACE_MTL: &str = "\
newmtl glow
Kd 0.2 0.2 0.2
Ke 4 4 4
";

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_sibling_mtllib_is_loaded() {
    let dir = TempDir::new().unwrap();
    let obj = write(dir.path(), "face.obj", CUBE_FACE);
    write(dir.path(), "face.mtl", FACE_MTL);

    let scene = load_scene(&LoadRequest::new(&obj)).unwrap();
    assert_eq!(scene.model().triangles.len(), 2);
    assert_eq!(scene.materials().parsed().len(), 1);
    assert!(scene.materials().slot("glow").is_some());
    assert!(scene.materials().parsed()[0].is_emissive());
}

#[test]
fn test_explicit_materials_override_mtllib() {
    let dir = TempDir::new().unwrap();
    let obj = write(dir.path(), "face.obj", CUBE_FACE);
    write(dir.path(), "face.mtl", FACE_MTL);
    let other = write(dir.path(), "other.mtl", "newmtl glow\nKd 1 0 0\nnewmtl spare\n");

    let scene = load_scene(&LoadRequest::new(&obj).with_materials(&other)).unwrap();
    let parsed = scene.materials().parsed();
    assert_eq!(parsed.len(), 2);
    assert!(!parsed[0].is_emissive());
}

#[test]
fn test_missing_mtllib_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let obj = write(dir.path(), "face.obj", CUBE_FACE);

    let scene = load_scene(&LoadRequest::new(&obj)).unwrap();
    assert!(scene.materials().parsed().is_empty());
    assert_eq!(scene.materials().len(), 1);
    assert_eq!(scene.gpu_data().tri_count(), 2);
}

#[test]
fn test_two_vertex_face_rejected() {
    let dir = TempDir::new().unwrap();
    let obj = write(dir.path(), "bad.obj", "v 0 0 0\nv 1 0 0\nf 1 2\n");

    let err = load_scene(&LoadRequest::new(&obj)).unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(err, Error::InvalidFace { line: 3, count: 2 }));
}

#[test]
fn test_missing_geometry_file() {
    let dir = TempDir::new().unwrap();
    let err = load_scene(&LoadRequest::new(dir.path().join("nope.obj"))).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}

#[test]
fn test_missing_explicit_materials_file() {
    let dir = TempDir::new().unwrap();
    let obj = write(dir.path(), "face.obj", CUBE_FACE);
    let err = load_scene(&LoadRequest::new(&obj).with_materials(dir.path().join("gone.mtl"))).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}

#[test]
fn test_worker_reports_latest_ticket() {
    let dir = TempDir::new().unwrap();
    let good = write(dir.path(), "face.obj", CUBE_FACE);
    let bad = write(dir.path(), "bad.obj", "v 0 0 0\nf 1 1\n");

    let mut tracker = LoadTracker::default();
    let mut worker = LoadWorker::spawn();

    let first = tracker.begin();
    worker.request(LoadRequest::new(&bad), first).unwrap();
    let second = tracker.begin();
    worker.request(LoadRequest::new(&good), second).unwrap();

    // Results arrive in order; only the newest ticket is current.
    let mut latest = None;
    while latest.is_none() {
        let done = worker.recv().expect("worker alive");
        if tracker.is_current(done.ticket) {
            latest = Some(done);
        }
    }
    let done = latest.unwrap();
    assert_eq!(done.request.geometry, good);
    assert_eq!(done.result.unwrap().model().triangles.len(), 2);

    worker.stop();
}
