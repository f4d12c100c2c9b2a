// Scan pipeline — batch scheduling and run summaries.

pub mod scan;
pub mod summary;
