//! Input/output helpers.
//!
//! - batch admissibility checks (`validate`)
//! - batch ingest from disk (`ingest`)
//! - CSV exports (`export`)
//! - report JSON read/write (`report_file`)

pub mod export;
pub mod ingest;
pub mod report_file;
pub mod validate;

pub use export::*;
pub use ingest::*;
pub use report_file::*;
pub use validate::*;
