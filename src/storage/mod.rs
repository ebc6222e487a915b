//! On-disk storage for binary pin reports
//!
//! - [`ReportStore`]: append/read/delete/truncate over flat record files
//! - [`filename`]: the filename codec that doubles as the store's only index

pub mod filename;
mod report_store;

pub use filename::{generate_filename, parse_filename, ParsedFilename};
pub use report_store::ReportStore;
