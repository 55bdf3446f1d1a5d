//! Protocol Module
//!
//! Just enough of the key-value wire protocol to cut a byte stream into
//! complete top-level messages. Payloads are never interpreted.
//!
//! ## Message Format
//! ```text
//! ┌──────────┬──────────────────────────┬──────┐
//! │ Tag (1)  │ Line / length token      │ CRLF │  then payload or elements
//! └──────────┴──────────────────────────┴──────┘
//! ```
//!
//! ### Tags
//! - `+`: simple string
//! - `-`: error
//! - `:`: integer
//! - `$`: bulk string (length-prefixed payload)
//! - `*`: array (count-prefixed nested messages)

mod kind;
mod message;
mod framer;
pub mod scan;

pub use kind::MessageKind;
pub use message::Message;
pub use framer::{frame_all, Framer};
pub use scan::{scan, Scan};
