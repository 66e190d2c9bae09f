pub mod error;
pub mod id;
pub mod swhid;
pub mod hash;
pub mod model;
pub mod page;
pub mod archive;
pub mod memory;
pub mod git;
pub mod alias;
pub mod classify;
pub mod cache;
pub mod config;
pub mod time;
pub mod urls;
pub mod context;
pub mod identifiers;

pub use error::{ContextError, ErrorKind, Result, SwhidError};
pub use id::ObjectId;
pub use swhid::{ObjectType, QualifiedSwhid, Swhid};
pub use model::{
    BranchTarget, OriginInfo, OriginVisit, Release, Revision, Snapshot, SnapshotBranch,
    SnapshotSizes, TargetType,
};
pub use page::Page;
pub use archive::{Archive, BranchQuery, VisitSelector};
pub use memory::{ArchiveFixture, MemoryArchive};
pub use git::GitArchive;
pub use alias::{resolve_alias, resolve_alias_chain};
pub use classify::{classify, SnapshotBranchInfo, SnapshotContent, SnapshotReleaseInfo};
pub use cache::{CachePort, MemoryCache, NoCache};
pub use config::ContextConfig;
pub use urls::BrowseContext;
pub use context::{
    ContextRequest, ContextSelector, RevisionInfo, SnapshotContext, SnapshotContextBuilder,
    VisitInfo,
};
pub use identifiers::{get_swhids_info, resolve_swhid, ExtraContext, ResolvedSwhid, SwhidInfo, SwhidObject};
