//! Turn resolved documents into the published schema.

use std::collections::HashSet;

use draftlink_core::{Document, DocumentKind, LinkedProposal, Origin, PublishedDocument};
use tracing::debug;

/// Derive the public provenance fields and drop working linkage state.
///
/// Adoption marks and `linked_proposals` only ever refer to base proposals;
/// draft variants take part in linking but are never published as the draft
/// a resolution came from.
pub fn annotate(docs: Vec<Document>) -> Vec<PublishedDocument> {
    let base: HashSet<String> = docs
        .iter()
        .filter(|d| d.kind == DocumentKind::Proposal)
        .map(|d| d.symbol.clone())
        .collect();

    let mut adopted = 0usize;
    let published: Vec<PublishedDocument> = docs
        .into_iter()
        .map(|doc| {
            let (mut out, claimed_by, linked) = doc.into_parts();
            match out.kind {
                DocumentKind::Proposal => {
                    out.origin = Origin::from_symbol(&out.symbol);
                    if let Some(resolution) = claimed_by {
                        out.is_adopted_draft = true;
                        out.adopted_by = Some(resolution);
                        adopted += 1;
                    }
                }
                DocumentKind::ExcludedDraftVariant => {
                    out.origin = Origin::from_symbol(&out.symbol);
                }
                DocumentKind::Resolution => {
                    out.origin = linked
                        .first()
                        .map(|s| Origin::from_symbol(s))
                        .unwrap_or(Origin::Unknown);
                    out.linked_proposals = linked
                        .iter()
                        .filter(|s| base.contains(*s))
                        .map(|s| LinkedProposal::new(s))
                        .collect();
                }
                DocumentKind::Other => {}
            }
            out
        })
        .collect();

    debug!(documents = published.len(), adopted, "annotated");
    published
}
