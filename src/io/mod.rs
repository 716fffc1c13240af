//! I/O module
//!
//! Handles pass input files and the notification outbox.
//!
//! # Components
//!
//! - `input` - JSON record arrays read by imports and intake
//! - `outbox` - CSV serialization of the notifications a pass produced

pub mod input;
pub mod outbox;

pub use input::read_json_records;
pub use outbox::write_notifications_csv;
