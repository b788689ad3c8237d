pub mod cascade;
pub mod executor;
pub mod gate;

pub use cascade::{CascadeDiary, TierFailure, TierOutcome};
pub use executor::CommandExecutor;
pub use gate::{AutoApproveGate, ConfirmGate, NoticeKind, Notifier, SerialGate, StdinGate, TracingNotifier};
