//! Per-resolution record of what each pass tried and found.

use draftlink_core::LinkMethod;
use serde::Serialize;

/// Why a pass did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Registry lookups switched off in configuration.
    Disabled,
    /// The resolution carried links from an earlier run.
    AlreadyLinked,
    /// An earlier pass in this run produced the link.
    LinkedEarlier,
    /// Nothing to compare (empty normalised title).
    NoTitle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistryPass {
    pub attempted: bool,
    pub skipped: Option<SkipReason>,
    /// The registry returned a record for the symbol.
    pub found: bool,
    pub draft_symbols: Vec<String>,
    /// Drafts the registry names that are not in the document set.
    pub expected_missing: Vec<String>,
    pub linked: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextReferencePass {
    pub attempted: bool,
    pub skipped: Option<SkipReason>,
    /// At least one cited symbol is a local proposal.
    pub found: bool,
    pub references: Vec<String>,
    pub linked: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FuzzyTitlePass {
    pub attempted: bool,
    pub skipped: Option<SkipReason>,
    /// The best candidate reached the threshold.
    pub found: bool,
    /// Candidates scored after claim and agenda filtering.
    pub candidates: usize,
    pub best_candidate: Option<String>,
    pub best_score: Option<u8>,
    pub linked: Option<String>,
}

/// Audit trail for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkAudit {
    pub registry: RegistryPass,
    pub text_reference: TextReferencePass,
    pub fuzzy_title: FuzzyTitlePass,
    pub final_method: Option<LinkMethod>,
    pub final_linked: Vec<String>,
    /// Link confidence scaled to `0..=100`. `None` when unlinked, or when a
    /// link carried over from an earlier run has no recorded confidence.
    pub confidence: Option<u8>,
}

impl LinkAudit {
    pub fn is_linked(&self) -> bool {
        !self.final_linked.is_empty()
    }

    pub(crate) fn finish(&mut self, method: Option<LinkMethod>, linked: &[String], confidence: Option<f32>) {
        self.final_method = method;
        self.final_linked = linked.to_vec();
        self.confidence = confidence
            .filter(|_| !linked.is_empty())
            .map(|c| (c.clamp(0.0, 1.0) * 100.0).round() as u8);
    }
}
