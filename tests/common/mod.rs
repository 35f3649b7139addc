use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use blobpilot::network::{FakeLedger, FakeStorage};
use blobpilot::{BlobPilot, Config, ProgressEvent, Subscription};
use tempfile::TempDir;

#[allow(dead_code)]
pub const TEST_KEY: &str = "9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";

#[allow(dead_code)]
pub const OTHER_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

#[allow(dead_code)]
pub struct TestEngine {
    pub pilot: BlobPilot,
    pub storage: Arc<FakeStorage>,
    pub ledger: Arc<FakeLedger>,
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestEngine {
    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("sessions.json")
    }
}

#[allow(dead_code)]
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.store.path = dir.path().join("sessions.json");
    config.batch.default_delay_ms = 0;
    config.deletion.cooldown_ms = 0;
    config
}

#[allow(dead_code)]
pub async fn create_engine() -> TestEngine {
    create_engine_with(|_| {}).await
}

/// Engine over fakes with `adjust` applied to the test configuration
#[allow(dead_code)]
pub async fn create_engine_with<F>(adjust: F) -> TestEngine
where
    F: FnOnce(&mut Config),
{
    let dir = TempDir::new().expect("failed to create tempdir");
    let storage = Arc::new(FakeStorage::new());
    let ledger = Arc::new(FakeLedger::new());
    let mut config = test_config(&dir);
    adjust(&mut config);
    let pilot = BlobPilot::new(config, storage.clone(), ledger.clone())
        .await
        .expect("failed to build engine");
    TestEngine {
        pilot,
        storage,
        ledger,
        dir,
    }
}

/// Collect events until `done`, failing the test if it takes too long
#[allow(dead_code)]
pub async fn collect_until_done(events: &mut Subscription) -> Vec<ProgressEvent> {
    let mut collected = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("timed out waiting for events")
            .expect("event stream closed before done");
        let terminal = event.is_terminal();
        collected.push(event);
        if terminal {
            return collected;
        }
    }
}

/// Wait for the next event matching `pred`, returning everything seen
#[allow(dead_code)]
pub async fn collect_until<F>(events: &mut Subscription, pred: F) -> Vec<ProgressEvent>
where
    F: Fn(&ProgressEvent) -> bool,
{
    let mut collected = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("timed out waiting for events")
            .expect("event stream closed");
        let matched = pred(&event);
        collected.push(event);
        if matched {
            return collected;
        }
    }
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
