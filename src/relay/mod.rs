pub mod client;
pub mod protocol;
pub mod socket;

pub use client::{RelayClient, RelayTransport};
pub use protocol::{
    interpret_reply, is_capability_absent, EmployeeQuery, RelayConnectionState, RelayEvent,
    RelayReply, ReplyEnvelope, RpcPayload, StreamFrame,
};
pub use socket::RelaySocket;
