use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use swhid_context::swhid::parse_lines;
use swhid_context::{
    get_swhids_info, resolve_swhid, BrowseContext, ContextConfig, ContextError, ContextRequest,
    ContextSelector, ExtraContext, GitArchive, MemoryArchive, MemoryCache, ObjectId, Result,
    SnapshotContent, SnapshotContextBuilder, Swhid, SwhidObject,
};

#[derive(Parser)]
#[command(name = "swhid-context-cli")]
#[command(about = "Resolve snapshot browsing contexts and qualified SWHIDs")]
struct Cli {
    /// JSON archive fixture to read objects from
    #[arg(long, conflicts_with = "git", required_unless_present = "git")]
    fixture: Option<PathBuf>,

    /// Local git repository to read objects from
    #[arg(long)]
    git: Option<PathBuf>,

    #[command(flatten)]
    config: ContextConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the snapshot context of a snapshot or origin visit
    Context {
        #[command(flatten)]
        selector: SelectorArgs,

        #[command(flatten)]
        browse: BrowseArgs,
    },
    /// List the classified branches and releases of a snapshot
    Branches {
        #[command(flatten)]
        selector: SelectorArgs,
    },
    /// Compute core and qualified SWHIDs of archived objects
    Swhids {
        /// Core SWHIDs of the objects
        #[arg(required = true)]
        objects: Vec<String>,

        #[command(flatten)]
        selector: SelectorArgs,

        #[command(flatten)]
        browse: BrowseArgs,

        /// Root directory the objects are browsed from
        #[arg(long)]
        root_directory: Option<ObjectId>,

        /// Name of a content object inside --path
        #[arg(long)]
        filename: Option<String>,

        /// Highlighted lines of a content object, as START[-END]
        #[arg(long)]
        lines: Option<String>,
    },
    /// Compute the browse URL of a SWHID
    Resolve {
        swhid: String,
    },
}

#[derive(Args)]
struct SelectorArgs {
    /// Snapshot identifier (hex)
    #[arg(long)]
    snapshot: Option<String>,

    /// Origin URL; with --git, defaults to the repository's origin
    #[arg(long)]
    origin_url: Option<String>,

    /// Visit date (ISO 8601 or seconds since the epoch)
    #[arg(long)]
    timestamp: Option<String>,

    #[arg(long)]
    visit_id: Option<u64>,
}

impl SelectorArgs {
    fn selector(&self, default_origin: Option<&str>) -> Result<Option<ContextSelector>> {
        let origin_url = self
            .origin_url
            .as_deref()
            .or(if self.snapshot.is_none() { default_origin } else { None });
        if self.snapshot.is_none() && origin_url.is_none() {
            return Ok(None);
        }
        ContextSelector::from_parts(
            self.snapshot.as_deref(),
            origin_url,
            self.timestamp.as_deref(),
            self.visit_id,
        )
        .map(Some)
    }
}

#[derive(Args)]
struct BrowseArgs {
    #[arg(long, value_enum, default_value_t = BrowseContext::Directory)]
    browse_context: BrowseContext,

    #[arg(long)]
    branch: Option<String>,

    #[arg(long)]
    release: Option<String>,

    #[arg(long)]
    revision: Option<ObjectId>,

    #[arg(long)]
    path: Option<String>,
}

impl BrowseArgs {
    fn request(&self, selector: ContextSelector) -> ContextRequest {
        let mut request = ContextRequest::new(selector).with_browse_context(self.browse_context);
        request.branch_name = self.branch.clone();
        request.release_name = self.release.clone();
        request.revision_id = self.revision;
        request.path = self.path.clone();
        request
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn missing_selector() -> ContextError {
    ContextError::bad_input("A snapshot or origin must be provided to get a snapshot context")
}

fn run(cli: Cli) -> Result<()> {
    let (archive, default_origin) = match (&cli.fixture, &cli.git) {
        (Some(fixture), _) => (MemoryArchive::load(fixture)?, None),
        (None, Some(repo)) => {
            let git = GitArchive::open(repo)?;
            let origin = git.origin_url().to_string();
            (git.into_archive(), Some(origin))
        }
        (None, None) => return Err(ContextError::bad_input("No archive source given")),
    };
    let default_origin = default_origin.as_deref();

    let cache: Arc<MemoryCache<ObjectId, SnapshotContent>> =
        Arc::new(MemoryCache::new(cli.config.cache_capacity));
    let builder = SnapshotContextBuilder::new(&archive)
        .with_cache(cache)
        .with_config(cli.config.clone());

    match &cli.command {
        Command::Context { selector, browse } => {
            let selector = selector.selector(default_origin)?.ok_or_else(missing_selector)?;
            let context = builder.build(&browse.request(selector))?;
            print_json(&context)
        }
        Command::Branches { selector } => {
            let selector = selector.selector(default_origin)?.ok_or_else(missing_selector)?;
            let context = builder.build(&ContextRequest::new(selector))?;
            print_json(&builder.snapshot_content(&context.snapshot_id)?)
        }
        Command::Swhids {
            objects,
            selector,
            browse,
            root_directory,
            filename,
            lines,
        } => {
            let objects = objects
                .iter()
                .map(|swhid| -> Result<SwhidObject> {
                    let swhid = Swhid::from_string(swhid)?;
                    Ok(SwhidObject::new(swhid.object_type(), *swhid.object_id()))
                })
                .collect::<Result<Vec<_>>>()?;
            let context = match selector.selector(default_origin)? {
                Some(selector) => Some(builder.build(&browse.request(selector))?),
                None => None,
            };
            let extra = ExtraContext {
                revision: browse.revision,
                root_directory: *root_directory,
                path: browse.path.clone(),
                filename: filename.clone(),
                lines: lines.as_deref().map(parse_lines).transpose().map_err(ContextError::from)?,
            };
            print_json(&get_swhids_info(&objects, context.as_ref(), Some(&extra)))
        }
        Command::Resolve { swhid } => {
            let resolved = resolve_swhid(&archive, swhid, None)?;
            let mut output = BTreeMap::new();
            output.insert("swhid", resolved.swhid_parsed.to_string());
            output.insert("browse_url", resolved.browse_url);
            print_json(&output)
        }
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        log::debug!("request failed: {:?}", err);
        eprintln!("error {}: {}", err.kind().http_status(), err);
        std::process::exit(1);
    }

    Ok(())
}
