//! Shared vocabulary for the campus pickup-ordering platform
//!
//! Everything a client of the platform needs to speak the server's language:
//! - [`error`]: unified error codes, `AppError`, and the API response envelope
//! - [`types`]: order/report state machines, roles, and cancellation taxonomy
//! - [`events`]: realtime event payloads pushed over the WebSocket channels
//! - [`util`]: small time helpers

pub mod error;
pub mod events;
pub mod types;
pub mod util;
