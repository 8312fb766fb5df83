//! Document records exchanged between ingestion, the resolver, and site generation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::symbol::{self, Origin};

/// Coarse document category derived from the symbol shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Resolution,
    /// A base draft proposal.
    Proposal,
    /// A revision, addendum or corrigendum of a draft. Takes part in linking
    /// but is never the canonical base draft.
    ExcludedDraftVariant,
    Other,
}

impl DocumentKind {
    /// Classify a symbol.
    pub fn of(symbol: &str) -> Self {
        if symbol::is_resolution(symbol) {
            Self::Resolution
        } else if symbol::is_draft(symbol) {
            if symbol::is_variant(symbol) {
                Self::ExcludedDraftVariant
            } else {
                Self::Proposal
            }
        } else {
            Self::Other
        }
    }

    /// Any draft, base or variant.
    pub fn is_proposal(&self) -> bool {
        matches!(self, Self::Proposal | Self::ExcludedDraftVariant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolution => "resolution",
            Self::Proposal => "proposal",
            Self::ExcludedDraftVariant => "excluded_draft_variant",
            Self::Other => "other",
        }
    }
}

/// Which evidence source produced a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMethod {
    Registry,
    TextReference,
    FuzzyTitle,
}

impl LinkMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::TextReference => "text_reference",
            Self::FuzzyTitle => "fuzzy_title",
        }
    }
}

/// A document as handed to the resolver.
///
/// The evidentiary fields (`symbol`, `kind`, `title`, `agenda_items`,
/// `text_references`) are set at ingestion. Linkage state is private and only
/// changes through [`claim_for`](Self::claim_for) and
/// [`link_to`](Self::link_to).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "DocumentRecord")]
pub struct Document {
    pub symbol: String,
    pub kind: DocumentKind,
    pub title: String,
    pub agenda_items: BTreeSet<String>,
    pub text_references: Vec<String>,
    pub link_method: Option<LinkMethod>,
    pub link_confidence: Option<f32>,
    /// Base draft named by the registry but absent from the document set.
    pub expected_draft: Option<String>,
    linked_resolution: Option<String>,
    linked_proposals: Vec<String>,
}

/// Wire form of [`Document`]. `kind` falls back to the symbol classifier and
/// link fields carry state from an earlier run.
#[derive(Deserialize)]
struct DocumentRecord {
    symbol: String,
    #[serde(default)]
    kind: Option<DocumentKind>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    agenda_items: BTreeSet<String>,
    #[serde(default)]
    text_references: Vec<String>,
    #[serde(default)]
    link_method: Option<LinkMethod>,
    #[serde(default)]
    link_confidence: Option<f32>,
    #[serde(default)]
    linked_resolution_symbol: Option<String>,
    #[serde(default)]
    linked_proposal_symbols: Vec<String>,
}

impl From<DocumentRecord> for Document {
    fn from(r: DocumentRecord) -> Self {
        let kind = r.kind.unwrap_or_else(|| DocumentKind::of(&r.symbol));
        Self {
            symbol: r.symbol,
            kind,
            title: r.title,
            agenda_items: r.agenda_items,
            text_references: dedup(r.text_references),
            link_method: r.link_method,
            link_confidence: r.link_confidence,
            expected_draft: None,
            linked_resolution: r.linked_resolution_symbol.filter(|s| !s.is_empty()),
            linked_proposals: dedup(r.linked_proposal_symbols),
        }
    }
}

impl Document {
    /// New document with its kind classified from the symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            kind: DocumentKind::of(&symbol),
            symbol,
            title: String::new(),
            agenda_items: BTreeSet::new(),
            text_references: Vec::new(),
            link_method: None,
            link_confidence: None,
            expected_draft: None,
            linked_resolution: None,
            linked_proposals: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_agenda_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.agenda_items = items.into_iter().map(Into::into).collect();
        self
    }

    /// Symbols cited in the body text, de-duplicated in first-seen order.
    pub fn with_text_references<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_references = dedup(refs.into_iter().map(Into::into).collect());
        self
    }

    /// Resolution this proposal was matched to.
    pub fn linked_resolution(&self) -> Option<&str> {
        self.linked_resolution.as_deref()
    }

    /// Proposals matched to this resolution, in link order.
    pub fn linked_proposals(&self) -> &[String] {
        &self.linked_proposals
    }

    pub fn is_linked(&self) -> bool {
        !self.linked_proposals.is_empty()
    }

    /// Record `resolution` as the adopter of this proposal.
    ///
    /// Write-once: returns `false` and leaves the existing claim untouched if
    /// the proposal is already claimed.
    pub fn claim_for(&mut self, resolution: &str) -> bool {
        if self.linked_resolution.is_some() {
            return false;
        }
        self.linked_resolution = Some(resolution.to_string());
        true
    }

    /// Attach proposals to this resolution along with the method and
    /// confidence of the pass that found them.
    pub fn link_to(&mut self, proposals: Vec<String>, method: LinkMethod, confidence: f32) {
        self.linked_proposals = dedup(proposals);
        self.link_method = Some(method);
        self.link_confidence = Some(confidence.clamp(0.0, 1.0));
    }

    /// Split into the parts the annotator needs, dropping linkage state.
    pub fn into_parts(self) -> (PublishedDocument, Option<String>, Vec<String>) {
        let published = PublishedDocument {
            session: symbol::session_of(&self.symbol),
            origin: Origin::Unknown,
            symbol: self.symbol,
            kind: self.kind,
            title: self.title,
            agenda_items: self.agenda_items,
            text_references: self.text_references,
            link_method: self.link_method,
            link_confidence: self.link_confidence,
            expected_draft: self.expected_draft,
            is_adopted_draft: false,
            adopted_by: None,
            linked_proposals: Vec::new(),
        };
        (published, self.linked_resolution, self.linked_proposals)
    }
}

/// Public reference from a resolution to one of its base drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedProposal {
    pub symbol: String,
    pub filename: String,
}

impl LinkedProposal {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            filename: symbol::page_filename(symbol),
        }
    }
}

/// A document after provenance annotation: the published schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedDocument {
    pub symbol: String,
    pub kind: DocumentKind,
    pub title: String,
    pub agenda_items: BTreeSet<String>,
    pub text_references: Vec<String>,
    pub session: Option<u32>,
    pub origin: Origin,
    pub link_method: Option<LinkMethod>,
    pub link_confidence: Option<f32>,
    pub expected_draft: Option<String>,
    pub is_adopted_draft: bool,
    pub adopted_by: Option<String>,
    pub linked_proposals: Vec<LinkedProposal>,
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
