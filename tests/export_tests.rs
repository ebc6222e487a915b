//! Integration tests for the CSV export service

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use parking_lot::Mutex;
use tempfile::TempDir;

use pintail::error::ExportError;
use pintail::export::{ExportRequest, ExportService, MailSender};
use pintail::storage::ReportStore;
use pintail::{Granularity, PinType, ReportKey};

const USER: &str = "mark";

/// Mail double that records every delivery
#[derive(Default)]
struct CapturingMailer {
    sent: Mutex<Vec<(String, String, PathBuf)>>,
}

impl MailSender for CapturingMailer {
    fn send(&self, to: &str, subject: &str, attachment: &Path) -> Result<(), ExportError> {
        self.sent
            .lock()
            .push((to.to_string(), subject.to_string(), attachment.to_path_buf()));
        Ok(())
    }
}

struct RejectingMailer;

impl MailSender for RejectingMailer {
    fn send(&self, _to: &str, _subject: &str, _attachment: &Path) -> Result<(), ExportError> {
        Err(ExportError::Mail("smtp down".to_string()))
    }
}

fn request(device_ids: Vec<u32>) -> ExportRequest {
    ExportRequest {
        user: USER.to_string(),
        dash_id: 1,
        dash_name: "Factory floor".to_string(),
        selector: device_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("-"),
        device_ids,
        pin_type: PinType::Virtual,
        pin: 4,
        granularity: Granularity::Minute,
        to: "mark@example.com".to_string(),
    }
}

fn minute_key(device_id: u32) -> ReportKey {
    ReportKey::new(USER, 1, device_id, PinType::Virtual, 4, Granularity::Minute)
}

fn read_csv(path: &Path) -> String {
    let file = std::fs::File::open(path).unwrap();
    let mut decoder = GzDecoder::new(file);
    let mut csv = String::new();
    decoder.read_to_string(&mut csv).unwrap();
    csv
}

#[test]
fn export_writes_value_timestamp_device_index_lines() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ReportStore::new(dir.path().join("data")).unwrap());
    store.append(&minute_key(0), 1.5, 1000).unwrap();
    store.append(&minute_key(0), 2.5, 2000).unwrap();

    let mailer = Arc::new(CapturingMailer::default());
    let service = ExportService::new(store, dir.path().join("exports"), mailer.clone());
    let artifact = service.export(&request(vec![0])).unwrap();

    assert_eq!(read_csv(&artifact), "1.5,1000,0\n2.5,2000,0\n");

    let sent = mailer.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "mark@example.com");
    assert!(sent[0].1.contains("Factory floor"));
    assert_eq!(sent[0].2, artifact);
}

#[test]
fn export_concatenates_devices_in_selector_order() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ReportStore::new(dir.path().join("data")).unwrap());
    store.append(&minute_key(7), 1.0, 100).unwrap();
    store.append(&minute_key(3), 2.0, 200).unwrap();
    store.append(&minute_key(3), 3.0, 300).unwrap();

    let service = ExportService::new(
        store,
        dir.path().join("exports"),
        Arc::new(CapturingMailer::default()),
    );
    // device 7 first: its rows come first and carry device index 0
    let artifact = service.export(&request(vec![7, 3])).unwrap();

    assert_eq!(read_csv(&artifact), "1,100,0\n2,200,1\n3,300,1\n");
}

#[test]
fn export_without_any_data_is_no_data() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ReportStore::new(dir.path().join("data")).unwrap());

    let mailer = Arc::new(CapturingMailer::default());
    let service = ExportService::new(store, dir.path().join("exports"), mailer.clone());

    let err = service.export(&request(vec![0, 1])).unwrap_err();
    assert!(matches!(err, ExportError::NoData));
    assert!(mailer.sent.lock().is_empty());
}

#[test]
fn export_artifact_name_carries_the_full_selector() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ReportStore::new(dir.path().join("data")).unwrap());
    store.append(&minute_key(0), 1.0, 1).unwrap();

    let service = ExportService::new(
        store,
        dir.path().join("exports"),
        Arc::new(CapturingMailer::default()),
    );
    let artifact = service.export(&request(vec![0])).unwrap();

    let name = artifact.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("mark_1_0_v4_"));
    assert!(name.ends_with(".csv.gz"));
}

#[test]
fn mail_failure_propagates() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ReportStore::new(dir.path().join("data")).unwrap());
    store.append(&minute_key(0), 1.0, 1).unwrap();

    let service = ExportService::new(store, dir.path().join("exports"), Arc::new(RejectingMailer));
    let err = service.export(&request(vec![0])).unwrap_err();
    assert!(matches!(err, ExportError::Mail(_)));
}
