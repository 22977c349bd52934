//! Render request protocol.
//!
//! Turns the loosely typed query parameters sent by the web UI (or a script)
//! into canonical [`viz_common::PlotParameters`]:
//! - [`request`]: the raw request shape, every value optional and textual
//! - [`resolve`]: the parameter resolver and its defaults

pub mod request;
pub mod resolve;

pub use request::RawRenderRequest;
pub use resolve::{ParameterResolver, RenderPurpose, ResolverConfig};
