use std::time::Duration;

/// Limits and caching of the snapshot context builder.
#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
#[command(next_help_heading = "Snapshot context")]
pub struct ContextConfig {
    /// Maximum number of branches fetched per snapshot; larger snapshots are truncated
    #[arg(id = "max-branches", long, env = "SWH_MAX_BRANCHES", default_value_t = ContextConfig::DEFAULT_MAX_BRANCHES)]
    pub max_branches: usize,

    /// Branches whose name starts with this prefix are not listed (empty to list all)
    #[arg(
        id = "branch-exclude-prefix",
        long,
        env = "SWH_BRANCH_EXCLUDE_PREFIX",
        default_value = ContextConfig::DEFAULT_EXCLUDE_PREFIX
    )]
    pub branch_exclude_prefix: String,

    /// Lifetime of cached snapshot branch listings
    #[arg(id = "cache-ttl", long, env = "SWH_CACHE_TTL", default_value = "5m")]
    pub cache_ttl: humantime::Duration,

    /// Number of snapshots whose branch listing is kept in cache
    #[arg(id = "cache-capacity", long, env = "SWH_CACHE_CAPACITY", default_value_t = 256)]
    pub cache_capacity: usize,
}

impl ContextConfig {
    pub const DEFAULT_MAX_BRANCHES: usize = 1000;
    pub const DEFAULT_EXCLUDE_PREFIX: &'static str = "refs/pull/";

    pub fn exclude_prefix(&self) -> Option<&str> {
        if self.branch_exclude_prefix.is_empty() {
            None
        } else {
            Some(&self.branch_exclude_prefix)
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        *self.cache_ttl
    }

    pub fn with_max_branches(mut self, max_branches: usize) -> Self {
        self.max_branches = max_branches;
        self
    }

    pub fn with_exclude_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.branch_exclude_prefix = prefix.into();
        self
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_branches: Self::DEFAULT_MAX_BRANCHES,
            branch_exclude_prefix: Self::DEFAULT_EXCLUDE_PREFIX.to_string(),
            cache_ttl: Duration::from_secs(300).into(),
            cache_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        config: ContextConfig,
    }

    #[test]
    fn test_cli_defaults_match_default() {
        let cli = Cli::parse_from(["test"]);
        assert_eq!(cli.config, ContextConfig::default());
        assert_eq!(cli.config.exclude_prefix(), Some("refs/pull/"));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "test",
            "--max-branches",
            "10",
            "--cache-ttl",
            "30s",
            "--branch-exclude-prefix",
            "",
        ]);
        assert_eq!(cli.config.max_branches, 10);
        assert_eq!(cli.config.cache_ttl(), Duration::from_secs(30));
        assert_eq!(cli.config.exclude_prefix(), None);
    }
}
