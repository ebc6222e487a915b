//! Background maintenance workers
//!
//! Two independent fixed-interval services keep the store bounded and
//! consistent with the widget configuration:
//!
//! - [`RetentionWorker`]: truncates files to their retained window, removes
//!   empty user directories and ages out export artifacts
//! - [`OrphanCollector`]: deletes pin files no widget references anymore

pub mod framework;
mod orphan;
mod retention;

pub use framework::{Service, ServiceError, ServiceManager, ServiceStatus};
pub use orphan::{OrphanCollector, OrphanStats};
pub use retention::{RetentionPolicy, RetentionStats, RetentionWorker};
