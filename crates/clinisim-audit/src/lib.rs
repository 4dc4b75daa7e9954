//! clinisim-audit
//!
//! Application-level audit events, emitted through `tracing` so they land in
//! the same structured log stream as request logs.

pub mod events;
