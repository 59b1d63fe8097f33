//! Aviary core: the result envelope and its domain codes, the per-request
//! context, and the records served by the built-in handler modules.

pub mod context;
pub mod envelope;
pub mod types;

pub use context::{Origin, RequestContext};
pub use envelope::{Envelope, EnvelopeError, ErrorKind, SUCCESS_CODE};
pub use types::{Bird, NewBird, Node, NodePosition};
