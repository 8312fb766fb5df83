//! Three-pass linkage of resolutions to the proposals they were adopted from.
//!
//! Passes run in order over the whole document list, each sweeping the list
//! in input order:
//!
//! 0. **Registry**: drafts the bibliographic registry cross-references.
//! 1. **Text reference**: draft symbols cited in the resolution body.
//! 2. **Fuzzy title**: the best title match at or above the threshold among
//!    agenda-compatible, unclaimed proposals.
//!
//! A resolution drops out as soon as it is linked. A proposal's claim is
//! write-once: the first resolution to link it keeps it, so iteration order
//! decides contested claims and fuzzy ties.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use draftlink_core::{Document, DocumentKind, LinkMethod, RegistrySource, normalize_symbol};
use serde::Serialize;
use tracing::{debug, info};

use crate::audit::{LinkAudit, SkipReason};
use crate::similarity::{normalize_title, similarity};

pub const DEFAULT_FUZZY_THRESHOLD: u8 = 85;
pub const DEFAULT_AGENDA_BONUS: f32 = 0.05;

/// Resolver tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Run the registry pass. Off means no network at all.
    pub use_registry: bool,
    /// Minimum title similarity (0..=100) for a fuzzy link.
    pub fuzzy_threshold: u8,
    /// Added to fuzzy confidence when both agenda sets are non-empty and overlap.
    pub agenda_bonus: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            use_registry: true,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            agenda_bonus: DEFAULT_AGENDA_BONUS,
        }
    }
}

/// Counts over the resolutions of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    pub resolutions: usize,
    pub previously_linked: usize,
    pub registry: usize,
    pub text_reference: usize,
    pub fuzzy_title: usize,
    pub unlinked: usize,
    /// Resolutions whose registry drafts are all missing locally.
    pub expected_missing: usize,
}

/// Result of a resolver run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkReport {
    /// One entry per resolution, keyed by symbol.
    pub audit: BTreeMap<String, LinkAudit>,
    pub summary: LinkSummary,
}

/// Proposals of the document set, in input order, addressable by normalised
/// symbol.
struct ProposalIndex {
    order: Vec<usize>,
    by_symbol: HashMap<String, usize>,
}

impl ProposalIndex {
    fn build(docs: &[Document]) -> Self {
        let mut order = Vec::new();
        let mut by_symbol = HashMap::new();
        for (i, doc) in docs.iter().enumerate() {
            if !doc.kind.is_proposal() {
                continue;
            }
            order.push(i);
            by_symbol.entry(normalize_symbol(&doc.symbol)).or_insert(i);
        }
        Self { order, by_symbol }
    }

    fn get(&self, symbol: &str) -> Option<usize> {
        self.by_symbol.get(&normalize_symbol(symbol)).copied()
    }

    /// Split `symbols` into local proposal indices (de-duplicated, in order)
    /// and symbols not present locally.
    fn partition<'s>(&self, symbols: impl IntoIterator<Item = &'s String>) -> (Vec<usize>, Vec<String>) {
        let mut hits = Vec::new();
        let mut missing = Vec::new();
        for symbol in symbols {
            match self.get(symbol) {
                Some(i) if !hits.contains(&i) => hits.push(i),
                Some(_) => {}
                None => missing.push(symbol.clone()),
            }
        }
        (hits, missing)
    }
}

/// Resolver state for one run: the registry handle, configuration, and the
/// audit map being filled in.
pub struct LinkContext<'a> {
    registry: Option<&'a dyn RegistrySource>,
    config: ResolverConfig,
    audit: BTreeMap<String, LinkAudit>,
}

impl<'a> LinkContext<'a> {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            registry: None,
            config,
            audit: BTreeMap::new(),
        }
    }

    pub fn with_registry(mut self, registry: &'a dyn RegistrySource) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Link every resolution in `docs`.
    ///
    /// Only linkage state and `expected_draft` are written. Never fails:
    /// every resolution gets an audit entry whether or not it was linked.
    pub async fn resolve(mut self, docs: &mut [Document]) -> LinkReport {
        let proposals = ProposalIndex::build(docs);
        let resolutions: Vec<usize> = docs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.kind == DocumentKind::Resolution)
            .map(|(i, _)| i)
            .collect();
        let prior: Vec<bool> = resolutions.iter().map(|&i| docs[i].is_linked()).collect();

        info!(
            resolutions = resolutions.len(),
            proposals = proposals.order.len(),
            registry = self.registry_enabled(),
            "resolving document provenance"
        );

        for (&i, &prior) in resolutions.iter().zip(&prior) {
            self.registry_pass(docs, i, prior, &proposals).await;
        }
        for (&i, &prior) in resolutions.iter().zip(&prior) {
            self.text_reference_pass(docs, i, prior, &proposals);
        }
        let titles: Vec<String> = proposals
            .order
            .iter()
            .map(|&j| normalize_title(&docs[j].title))
            .collect();
        for (&i, &prior) in resolutions.iter().zip(&prior) {
            self.fuzzy_title_pass(docs, i, prior, &proposals, &titles);
        }

        let mut summary = LinkSummary {
            resolutions: resolutions.len(),
            ..LinkSummary::default()
        };
        for (&i, &prior) in resolutions.iter().zip(&prior) {
            let doc = &docs[i];
            let audit = self.audit.entry(doc.symbol.clone()).or_default();
            audit.finish(doc.link_method, doc.linked_proposals(), doc.link_confidence);

            if !audit.registry.expected_missing.is_empty() && doc.expected_draft.is_some() {
                summary.expected_missing += 1;
            }
            if prior {
                summary.previously_linked += 1;
                continue;
            }
            match doc.is_linked().then_some(doc.link_method).flatten() {
                Some(LinkMethod::Registry) => summary.registry += 1,
                Some(LinkMethod::TextReference) => summary.text_reference += 1,
                Some(LinkMethod::FuzzyTitle) => summary.fuzzy_title += 1,
                None => summary.unlinked += 1,
            }
        }

        info!(
            linked_registry = summary.registry,
            linked_text_reference = summary.text_reference,
            linked_fuzzy_title = summary.fuzzy_title,
            previously_linked = summary.previously_linked,
            unlinked = summary.unlinked,
            "provenance resolved"
        );

        LinkReport {
            audit: self.audit,
            summary,
        }
    }

    fn registry_enabled(&self) -> bool {
        self.config.use_registry && self.registry.is_some()
    }

    async fn registry_pass(&mut self, docs: &mut [Document], i: usize, prior: bool, proposals: &ProposalIndex) {
        let symbol = docs[i].symbol.clone();
        let registry = self.registry.filter(|_| self.config.use_registry);
        let audit = self.audit.entry(symbol.clone()).or_default();

        if prior {
            audit.registry.skipped = Some(SkipReason::AlreadyLinked);
            return;
        }
        let Some(registry) = registry else {
            audit.registry.skipped = Some(SkipReason::Disabled);
            return;
        };

        audit.registry.attempted = true;
        let Some(record) = registry.lookup(&symbol).await else {
            debug!(symbol, "no registry data");
            return;
        };
        audit.registry.found = true;
        audit.registry.draft_symbols = record.draft_symbols.clone();

        let (hits, missing) = proposals.partition(&record.draft_symbols);
        audit.registry.expected_missing = missing;
        if hits.is_empty() {
            if let Some(base) = record.base_proposal {
                debug!(symbol, expected = %base, "registry draft not in document set");
                docs[i].expected_draft = Some(base);
            }
            return;
        }

        let linked = link(docs, i, &hits, LinkMethod::Registry, 1.0);
        audit.registry.linked = linked;
    }

    fn text_reference_pass(&mut self, docs: &mut [Document], i: usize, prior: bool, proposals: &ProposalIndex) {
        let audit = self.audit.entry(docs[i].symbol.clone()).or_default();
        let pass = &mut audit.text_reference;

        if prior {
            pass.skipped = Some(SkipReason::AlreadyLinked);
            return;
        }
        if docs[i].is_linked() {
            pass.skipped = Some(SkipReason::LinkedEarlier);
            return;
        }

        pass.attempted = true;
        pass.references = docs[i].text_references.clone();
        let (hits, _) = proposals.partition(&docs[i].text_references);
        if hits.is_empty() {
            return;
        }
        pass.found = true;
        pass.linked = link(docs, i, &hits, LinkMethod::TextReference, 1.0);
    }

    fn fuzzy_title_pass(
        &mut self,
        docs: &mut [Document],
        i: usize,
        prior: bool,
        proposals: &ProposalIndex,
        titles: &[String],
    ) {
        let threshold = self.config.fuzzy_threshold;
        let bonus = self.config.agenda_bonus;
        let audit = self.audit.entry(docs[i].symbol.clone()).or_default();
        let pass = &mut audit.fuzzy_title;

        if prior {
            pass.skipped = Some(SkipReason::AlreadyLinked);
            return;
        }
        if docs[i].is_linked() {
            pass.skipped = Some(SkipReason::LinkedEarlier);
            return;
        }
        let title = normalize_title(&docs[i].title);
        if title.is_empty() {
            pass.skipped = Some(SkipReason::NoTitle);
            return;
        }
        pass.attempted = true;

        let resolution = &docs[i];
        let mut best: Option<(usize, u8)> = None;
        for (&j, proposal_title) in proposals.order.iter().zip(titles) {
            let proposal = &docs[j];
            if proposal
                .linked_resolution()
                .is_some_and(|owner| owner != resolution.symbol)
            {
                continue;
            }
            if proposal_title.is_empty()
                || !agenda_compatible(&resolution.agenda_items, &proposal.agenda_items)
            {
                continue;
            }
            pass.candidates += 1;
            let score = similarity(&title, proposal_title);
            // Strictly greater: ties keep the first candidate seen.
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((j, score));
            }
        }

        let Some((j, score)) = best else {
            return;
        };
        pass.best_candidate = Some(docs[j].symbol.clone());
        pass.best_score = Some(score);
        if score < threshold {
            debug!(symbol = %docs[i].symbol, best = %docs[j].symbol, score, "no title match above threshold");
            return;
        }
        pass.found = true;

        let mut confidence = f32::from(score) / 100.0;
        let (ra, pa) = (&docs[i].agenda_items, &docs[j].agenda_items);
        if !ra.is_empty() && !pa.is_empty() && !ra.is_disjoint(pa) {
            confidence += bonus;
        }
        let linked = link(docs, i, &[j], LinkMethod::FuzzyTitle, confidence.min(1.0));
        pass.linked = linked.into_iter().next();
    }
}

/// Link resolution `i` to proposals `hits` and claim each unclaimed one.
fn link(docs: &mut [Document], i: usize, hits: &[usize], method: LinkMethod, confidence: f32) -> Vec<String> {
    let resolution = docs[i].symbol.clone();
    let symbols: Vec<String> = hits.iter().map(|&j| docs[j].symbol.clone()).collect();

    for &j in hits {
        if !docs[j].claim_for(&resolution) {
            debug!(
                proposal = %docs[j].symbol,
                claimed_by = docs[j].linked_resolution().unwrap_or_default(),
                resolution = %resolution,
                "proposal already claimed"
            );
        }
    }
    docs[i].link_to(symbols.clone(), method, confidence);
    debug!(resolution = %resolution, method = method.as_str(), linked = ?symbols, confidence, "linked");
    symbols
}

fn agenda_compatible(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.is_empty() || b.is_empty() || !a.is_disjoint(b)
}
