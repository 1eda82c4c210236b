use anyhow::Result;
use clap::Parser;
use fpm_index::config::{DEFAULT_GITHUB_API_URL, DEFAULT_GITLAB_API_URL, Options};
use fpm_index::indexer::build_index;
use fpm_index::pipeline::Strictness;
use std::path::PathBuf;
use std::time::Duration;

/// fpm-index - build the fpm package index
///
/// For each entry in registry.toml: check that the entry is valid, fetch the
/// corresponding fpm.toml from the git repository, check that the fpm.toml is
/// valid, and if so add it to index.json.
///
/// Package errors are reported as warnings by default; use the check flags to
/// exit with a non-zero status instead.
#[derive(Parser, Debug)]
#[command(author, version = env!("FPM_INDEX_VERSION"), about)]
struct Cli {
    /// Registry of packages to index
    #[arg(long, value_name = "PATH", default_value = "registry.toml")]
    registry: PathBuf,

    /// Index file to update
    #[arg(long, value_name = "PATH", default_value = "index.json")]
    index: PathBuf,

    /// Credentials file, used when not running in CI
    #[arg(long, value_name = "PATH", default_value = "account.toml")]
    account: PathBuf,

    /// Directory for shallow clones of repositories not served by an API
    #[arg(
        long,
        value_name = "PATH",
        env = "FPM_INDEX_CACHE_DIR",
        default_value = "repos"
    )]
    cache_dir: PathBuf,

    /// GitHub API URL
    #[arg(long, value_name = "URL", default_value = DEFAULT_GITHUB_API_URL)]
    github_api_url: String,

    /// GitLab API URL
    #[arg(long, value_name = "URL", default_value = DEFAULT_GITLAB_API_URL)]
    gitlab_api_url: String,

    /// HTTP request timeout in seconds (0 disables the timeout)
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    timeout: u64,

    /// Fail if an unindexed package is parsed incorrectly
    #[arg(long)]
    check_new: bool,

    /// Fail if an indexed package is parsed incorrectly
    #[arg(long)]
    check_existing: bool,

    /// Fail if any package is parsed incorrectly
    #[arg(long)]
    check_all: bool,
}

impl Cli {
    fn into_options(self) -> Options {
        Options {
            registry: self.registry,
            index: self.index,
            account: self.account,
            cache_dir: self.cache_dir,
            github_api_url: self.github_api_url,
            gitlab_api_url: self.gitlab_api_url,
            timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
            strictness: Strictness::new(self.check_new, self.check_existing, self.check_all),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("fpm_index=info"),
    )
    .init();
    let cli = Cli::parse();
    let runtime = fpm_index::runtime::RealRuntime;

    build_index(runtime, cli.into_options()).await?;
    Ok(())
}
