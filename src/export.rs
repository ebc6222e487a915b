//! CSV export service
//!
//! Renders a pin's full history (optionally across several devices) as a
//! gzip-compressed CSV artifact and hands it to the external mail
//! collaborator. One line per record: `value,timestamp,deviceIndex`, no
//! header row. Multiple devices are concatenated device-by-device in
//! selector order, not interleaved by time.
//!
//! Artifact name: `{user}_{dash}_{selector}_{pin_type_char}{pin}_{ts}.csv.gz`

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::ExportError;
use crate::storage::ReportStore;
use crate::types::{Granularity, PinType, ReportKey};

/// External mail collaborator
pub trait MailSender: Send + Sync {
    /// Deliver the artifact at `attachment` to `to`
    fn send(&self, to: &str, subject: &str, attachment: &Path) -> Result<(), ExportError>;
}

/// One export request
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Owning user
    pub user: String,
    /// Dashboard id
    pub dash_id: u32,
    /// Dashboard name, used in the mail subject
    pub dash_name: String,
    /// Devices to export, in selector order
    pub device_ids: Vec<u32>,
    /// Device-selector token embedded in the artifact name (a device id or
    /// a composite such as `t100000` for a tag)
    pub selector: String,
    /// Pin type
    pub pin_type: PinType,
    /// Pin number
    pub pin: u8,
    /// Granularity file to export
    pub granularity: Granularity,
    /// Recipient address
    pub to: String,
}

/// Snapshot-and-mail export over the report store
pub struct ExportService {
    store: Arc<ReportStore>,
    export_dir: PathBuf,
    mailer: Arc<dyn MailSender>,
}

impl ExportService {
    /// Create a new export service writing artifacts under `export_dir`
    pub fn new(store: Arc<ReportStore>, export_dir: impl Into<PathBuf>, mailer: Arc<dyn MailSender>) -> Self {
        Self {
            store,
            export_dir: export_dir.into(),
            mailer,
        }
    }

    /// Export the request's pin history and mail the artifact
    ///
    /// Returns the artifact path. Fails with [`ExportError::NoData`] when no
    /// selected device has any record.
    pub fn export(&self, request: &ExportRequest) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.export_dir)?;

        let mut device_series = Vec::with_capacity(request.device_ids.len());
        for &device_id in &request.device_ids {
            let key = ReportKey::new(
                request.user.clone(),
                request.dash_id,
                device_id,
                request.pin_type,
                request.pin,
                request.granularity,
            );
            let path = self.store.report_path(&key)?;
            device_series.push(self.store.read_all_at(&path)?);
        }
        if device_series.iter().all(|s| s.is_empty()) {
            return Err(ExportError::NoData);
        }

        let path = self.export_dir.join(format!(
            "{}_{}_{}_{}{}_{}.csv.gz",
            request.user,
            request.dash_id,
            request.selector,
            request.pin_type.as_char(),
            request.pin,
            chrono::Utc::now().timestamp_millis(),
        ));

        let file = File::create(&path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        for (device_index, series) in device_series.iter().enumerate() {
            for point in series {
                writeln!(encoder, "{},{},{}", point.value, point.timestamp, device_index)?;
            }
        }
        encoder.finish()?.flush()?;

        let subject = format!("History graph data for dashboard {}", request.dash_name);
        self.mailer.send(&request.to, &subject, &path)?;

        tracing::debug!(
            user = %request.user,
            dash = request.dash_id,
            artifact = %path.display(),
            "Export delivered"
        );
        Ok(path)
    }
}
