pub mod enhancer;
pub mod formatter;

pub use enhancer::{summarize, SummaryClient};
pub use formatter::{detect_shape, format_records, RecordShape, ITEM_CAP};
