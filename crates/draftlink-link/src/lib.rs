//! Provenance resolution: registry, text-reference and fuzzy-title passes,
//! the audit trail they leave, and the annotation of the published schema.

mod annotate;
mod audit;
mod resolver;
pub mod similarity;

pub use annotate::annotate;
pub use audit::{FuzzyTitlePass, LinkAudit, RegistryPass, SkipReason, TextReferencePass};
pub use resolver::{LinkContext, LinkReport, LinkSummary, ResolverConfig};
pub use similarity::{normalize_title, similarity};
