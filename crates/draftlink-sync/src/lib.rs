//! Registry layer: MARC XML parsing, retry policy, and the HTTP client that
//! ties them to the on-disk cache.

pub mod marc;
pub mod retry;

#[cfg(feature = "http")]
pub mod registry;

pub use marc::{MarcError, parse_marc_xml};
pub use retry::RetryPolicy;

#[cfg(feature = "http")]
pub use registry::{RegistryClient, RegistryConfig, RegistryError};
