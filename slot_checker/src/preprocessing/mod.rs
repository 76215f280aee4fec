pub mod ingest;
pub mod interval;
pub mod row_time_map;

pub use ingest::{GridIngestor, IngestConfig, NormalizedGrid};
pub use interval::detect_interval;
pub use row_time_map::{map_rows, MappedRows, OperatingHours};
