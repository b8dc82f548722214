//! Client library for the IRIDA data management REST API.
//!
//! The different submodules deal with the layers of talking to IRIDA:
//!
//! - authentication (OAuth2 password grant, transparent token renewal)
//! - link resolution over the HATEOAS `resource` envelopes
//! - the AMR-specific operations (enumerate completed results, download
//!   their output files)
//! - date-range filtering of the result set
//!

// Re-export these modules for a shorter import path.
//
pub use client::*;
pub use error::*;
pub use filter::*;
pub use link::*;
pub use model::*;
pub use session::*;

mod client;
mod error;
mod filter;
mod link;
mod model;
mod session;

/// The one analysis type this crate cares about.
pub const AMR_DETECTION: &str = "AMR_DETECTION";
