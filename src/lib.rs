//! Relay Assistant - natural-language business queries over a relay backend
//!
//! Free-form text is classified into a structured intent, approved through
//! a confirmation gate, executed against the relay with a multi-tier
//! fallback cascade, and rendered back as text or a monthly time series.

pub mod core;
pub mod exec;
pub mod intent;
pub mod relay;
pub mod series;
pub mod session;
pub mod summary;
