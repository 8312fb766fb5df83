//! The `link` command: read documents, resolve, annotate, write.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use draftlink_core::Document;
use draftlink_link::{LinkAudit, LinkContext, LinkSummary, ResolverConfig, annotate};
use draftlink_store::CacheStats;
use draftlink_sync::{RegistryClient, RegistryConfig};
use serde::Serialize;

pub struct Paths<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub audit: Option<&'a Path>,
}

pub struct Outcome {
    pub documents: usize,
    pub summary: LinkSummary,
    pub cache: Option<CacheStats>,
}

#[derive(Serialize)]
struct AuditFile<'a> {
    generated_at: DateTime<Utc>,
    summary: &'a LinkSummary,
    cache: Option<&'a CacheStats>,
    resolutions: &'a BTreeMap<String, LinkAudit>,
}

/// Run the whole pipeline. `registry` is `None` when the registry pass is off.
pub async fn run(
    paths: Paths<'_>,
    config: ResolverConfig,
    registry: Option<RegistryConfig>,
) -> anyhow::Result<Outcome> {
    let mut docs = read_documents(paths.input)?;
    tracing::info!(documents = docs.len(), path = %paths.input.display(), "loaded documents");

    let client = registry
        .map(RegistryClient::new)
        .transpose()
        .context("building registry client")?;

    let mut ctx = LinkContext::new(config);
    if let Some(client) = &client {
        ctx = ctx.with_registry(client);
    }
    let report = ctx.resolve(&mut docs).await;
    let cache = client.as_ref().map(RegistryClient::cache_stats);

    let published = annotate(docs);
    write_json(paths.output, &published)?;
    tracing::info!(path = %paths.output.display(), "wrote annotated documents");

    if let Some(path) = paths.audit {
        let audit = AuditFile {
            generated_at: Utc::now(),
            summary: &report.summary,
            cache: cache.as_ref(),
            resolutions: &report.audit,
        };
        write_json(path, &audit)?;
        tracing::info!(path = %path.display(), resolutions = report.audit.len(), "wrote audit");
    }

    Ok(Outcome {
        documents: published.len(),
        summary: report.summary,
        cache,
    })
}

fn read_documents(path: &Path) -> anyhow::Result<Vec<Document>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing documents from {}", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("writing {}", path.display()))?;
    writer.flush().with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}
