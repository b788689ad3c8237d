pub mod classifier;
pub mod extract;

pub use classifier::{classify, Intent};
