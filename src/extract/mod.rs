/// Field pattern tables and numeric coercion
pub mod pattern;

/// Pattern-driven numeric field extraction
pub mod extractor;

pub use extractor::{ExtractedField, Extraction, FieldStatus, MetricExtractor};
pub use pattern::{add_alternative, Coercion, FieldPattern};
