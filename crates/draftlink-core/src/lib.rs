pub mod document;
pub mod registry;
pub mod symbol;

pub use document::{Document, DocumentKind, LinkMethod, LinkedProposal, PublishedDocument};
pub use registry::{RegistryRecord, RegistrySource};
pub use symbol::{Origin, normalize_symbol, symbol_to_filename};
