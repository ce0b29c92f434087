use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;

use ledscene::engine::source::SceneSource;
use ledscene::engine::watch::WatchConfig;

const POLL: WatchConfig = WatchConfig {
    poll_interval: Duration::from_millis(50),
};

fn scene_with(objects: usize) -> String {
    let mut doc = String::from("frame: { width: 8, height: 8 }\nobjects:\n");
    for i in 0..objects {
        doc.push_str(&format!(
            "  - {{ name: dot{i}, type: circle, properties: {{ x: {i}, y: 1, radius: 1 }} }}\n"
        ));
    }
    doc
}

/// Replace `path` atomically so the watcher never sees a half-written file.
fn replace(path: &Path, contents: &str) {
    let dir = path.parent().unwrap();
    let mut tmp = tempfile::NamedTempFile::new_in(dir).unwrap();
    tmp.write_all(contents.as_bytes()).unwrap();
    tmp.persist(path).unwrap();
}

#[test]
fn test_reload_delivers_new_scene() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.yml");
    replace(&path, &scene_with(1));

    let watcher = SceneSource::watch(&path, POLL).unwrap();
    assert_eq!(watcher.path(), path);
    assert!(watcher.try_next().is_none());

    // Let the poller take its baseline before changing the file.
    thread::sleep(Duration::from_millis(200));
    replace(&path, &scene_with(3));

    let scene = watcher
        .next_timeout(Duration::from_secs(5))
        .expect("no reload delivered");
    assert_eq!(scene.objects().len(), 3);
}

#[test]
fn test_broken_edit_keeps_waiting_for_valid_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.yml");
    replace(&path, &scene_with(1));

    let watcher = SceneSource::watch(&path, POLL).unwrap();
    thread::sleep(Duration::from_millis(200));
    replace(&path, "frame: [broken");
    thread::sleep(Duration::from_millis(300));
    assert!(watcher.try_next().is_none());

    replace(&path, &scene_with(2));
    let scene = watcher
        .next_timeout(Duration::from_secs(5))
        .expect("no reload delivered");
    assert_eq!(scene.objects().len(), 2);
}

#[test]
fn test_stop_with_pending_reload_returns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.yml");
    replace(&path, &scene_with(1));

    let watcher = SceneSource::watch(&path, POLL).unwrap();
    thread::sleep(Duration::from_millis(200));
    // Fill the slot and leave a second reload blocked behind it.
    replace(&path, &scene_with(2));
    thread::sleep(Duration::from_millis(300));
    replace(&path, &scene_with(3));
    thread::sleep(Duration::from_millis(300));

    watcher.stop();
}
