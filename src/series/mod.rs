pub mod aggregate;
pub mod normalize;

pub use aggregate::{aggregate_series, SeriesOutcome, SERIES_DISPLAY_MONTHS};
pub use normalize::{is_canonical, normalize, normalize_value};
