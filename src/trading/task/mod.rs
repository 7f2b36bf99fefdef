pub mod scan_job;

pub use scan_job::{ScanJob, ScanReport, ScanSettings};
