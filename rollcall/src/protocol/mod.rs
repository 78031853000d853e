//! The ring/attendance protocol: wire format and per-processor state machine.

mod attendance;
mod wire;

pub use attendance::AttendanceProcessor;
pub use wire::Payload;
