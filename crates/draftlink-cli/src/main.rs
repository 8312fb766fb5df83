use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use draftlink_link::ResolverConfig;
use draftlink_link::similarity;
use draftlink_store::RegistryCache;
use draftlink_sync::RegistryConfig;
use draftlink_sync::registry::{DEFAULT_BASE_URL, DEFAULT_CACHE_DIR};

mod pipeline;

#[derive(Parser)]
#[command(name = "draftlink", version)]
#[command(about = "Link adopted resolutions to the draft proposals they came from")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve provenance for a document set and write the published schema
    Link(LinkArgs),

    /// Show registry cache size
    CacheStats {
        #[arg(long, env = "DRAFTLINK_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
        cache_dir: PathBuf,
    },

    /// Score two titles the way the fuzzy pass does
    Similarity { a: String, b: String },
}

#[derive(Args)]
struct LinkArgs {
    /// JSON array of documents
    #[arg(short, long, env = "DRAFTLINK_INPUT")]
    input: PathBuf,

    /// Where to write the annotated documents
    #[arg(short, long, env = "DRAFTLINK_OUTPUT")]
    output: PathBuf,

    /// Where to write the per-resolution audit trail
    #[arg(long, env = "DRAFTLINK_AUDIT")]
    audit: Option<PathBuf>,

    /// Skip the registry pass (no network)
    #[arg(long, env = "DRAFTLINK_NO_REGISTRY")]
    no_registry: bool,

    #[arg(long, env = "DRAFTLINK_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    #[arg(long, env = "DRAFTLINK_REGISTRY_URL", default_value = DEFAULT_BASE_URL)]
    registry_url: String,

    /// Minimum title similarity (0-100) for a fuzzy link
    #[arg(long, env = "DRAFTLINK_THRESHOLD", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(0..=100))]
    threshold: u8,

    /// Confidence bonus for overlapping agenda items
    #[arg(long, env = "DRAFTLINK_AGENDA_BONUS", default_value_t = 0.05)]
    agenda_bonus: f32,

    /// Pause after each registry request, in milliseconds
    #[arg(long, env = "DRAFTLINK_DELAY_MS", default_value_t = 1000)]
    delay_ms: u64,
}

impl LinkArgs {
    fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            use_registry: !self.no_registry,
            fuzzy_threshold: self.threshold,
            agenda_bonus: self.agenda_bonus,
        }
    }

    fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            base_url: self.registry_url.clone(),
            cache_dir: self.cache_dir.clone(),
            politeness_delay: Duration::from_millis(self.delay_ms),
            ..RegistryConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Link(args) => {
            tracing::info!("draftlink v{}", env!("CARGO_PKG_VERSION"));
            let paths = pipeline::Paths {
                input: &args.input,
                output: &args.output,
                audit: args.audit.as_deref(),
            };
            let registry = (!args.no_registry).then(|| args.registry_config());
            let outcome = pipeline::run(paths, args.resolver_config(), registry).await?;

            let s = outcome.summary;
            println!("{} documents, {} resolutions", outcome.documents, s.resolutions);
            println!(
                "  linked: registry {}, text reference {}, fuzzy title {}, earlier run {}",
                s.registry, s.text_reference, s.fuzzy_title, s.previously_linked
            );
            println!(
                "  unlinked: {} ({} with drafts missing locally)",
                s.unlinked, s.expected_missing
            );
            if let Some(stats) = outcome.cache {
                println!("  cache: {} entries, {} bytes", stats.entries, stats.total_bytes);
            }
        }
        Command::CacheStats { cache_dir } => {
            let stats = RegistryCache::new(&cache_dir).stats();
            println!("{}: {} entries, {} bytes", cache_dir.display(), stats.entries, stats.total_bytes);
        }
        Command::Similarity { a, b } => {
            println!("{}", similarity::title_similarity(&a, &b));
        }
    }
    Ok(())
}
