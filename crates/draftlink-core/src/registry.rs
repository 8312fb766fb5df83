//! Registry cross-reference record and the lookup seam used by the resolver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::symbol;

/// Cross-references the bibliographic registry holds for one symbol.
///
/// This is also the on-disk cache entry; once written it is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub symbol: String,
    /// Every cross-referenced symbol, in registry order.
    pub related_symbols: Vec<String>,
    /// The subset of `related_symbols` with the draft proposal shape.
    pub draft_symbols: Vec<String>,
    /// First draft symbol, if any.
    pub base_proposal: Option<String>,
}

impl RegistryRecord {
    /// Build a record from the raw cross-reference list.
    pub fn from_related(symbol: impl Into<String>, related_symbols: Vec<String>) -> Self {
        let draft_symbols: Vec<String> = related_symbols
            .iter()
            .filter(|s| symbol::is_draft(s))
            .cloned()
            .collect();
        let base_proposal = draft_symbols.first().cloned();
        Self {
            symbol: symbol.into(),
            related_symbols,
            draft_symbols,
            base_proposal,
        }
    }

    /// Internal consistency check applied to entries read back from disk.
    pub fn is_consistent(&self) -> bool {
        self.draft_symbols
            .iter()
            .all(|d| symbol::is_draft(d) && self.related_symbols.contains(d))
            && self.base_proposal.as_ref() == self.draft_symbols.first()
    }
}

/// Source of registry cross-references.
///
/// Implementations must not fail: anything that goes wrong is reported as
/// `None` ("no registry data").
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn lookup(&self, symbol: &str) -> Option<RegistryRecord>;
}
