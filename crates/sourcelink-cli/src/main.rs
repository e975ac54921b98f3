mod commands;

use clap::{Parser, Subcommand};
use sourcelink_core::model::MappingStrategy;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sourcelink",
    about = "Link source control changesets to issue tracker state",
    version
)]
struct Cli {
    /// Data store root (defaults to searching upward from the working directory)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new sourcelink data store
    Init,

    /// Manage repositories
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },

    /// Manage branch-to-version mappings
    Mapping {
        #[command(subcommand)]
        action: MappingAction,
    },

    /// Manage VCS username associations
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Show the issue ids a commit message references and fixes
    Parse {
        /// Commit message text
        message: String,

        /// Resolution config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Load a changeset batch (JSON) into the store without processing it
    Import {
        /// Changeset batch file
        file: PathBuf,

        /// Repository the changesets belong to
        #[arg(long)]
        repo: String,
    },

    /// Run the resolution pipeline over a changeset batch (JSON)
    Process {
        /// Changeset batch file
        file: PathBuf,

        /// Repository the changesets belong to
        #[arg(long)]
        repo: String,

        /// Resolution config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum RepoAction {
    /// Register a repository
    Add {
        /// Display name
        name: String,

        /// VCS type tag (e.g. git, svn, hg)
        #[arg(long = "type")]
        vcs_type: String,

        /// Clone/browse URL
        #[arg(long, default_value = "")]
        url: String,
    },
    /// List repositories
    List,
    /// Show one repository with its branches and mappings
    Show {
        name: String,
    },
    /// Delete a repository and all of its changesets
    Rm {
        name: String,
    },
}

#[derive(Subcommand)]
enum MappingAction {
    /// Create or replace the mapping for a branch
    Set {
        /// Repository name
        repo: String,

        /// Branch name
        branch: String,

        /// explicit, nearest, farthest, first or last
        #[arg(long)]
        strategy: MappingStrategy,

        /// Version label (explicit strategy)
        #[arg(long, default_value = "")]
        version: String,

        /// Product version id (explicit strategy, product-matrix mode)
        #[arg(long, default_value_t = 0)]
        pvm_version_id: i64,

        /// Only version labels matching this pattern qualify
        #[arg(long)]
        pattern: Option<String>,
    },
    /// List a repository's mappings
    List {
        repo: String,
    },
    /// Delete a branch mapping
    Rm {
        repo: String,
        branch: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Associate a VCS username with a tracker user id
    Set {
        user_id: i64,
        username: String,
    },
    /// Remove a user's association
    Rm {
        user_id: i64,
    },
    /// List associations
    List,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = cli.dir;

    let result = match cli.command {
        Commands::Init => commands::init::run(dir),
        Commands::Repo { action } => match action {
            RepoAction::Add { name, vcs_type, url } => commands::repo::add(dir, name, vcs_type, url),
            RepoAction::List => commands::repo::list(dir),
            RepoAction::Show { name } => commands::repo::show(dir, name),
            RepoAction::Rm { name } => commands::repo::rm(dir, name),
        },
        Commands::Mapping { action } => match action {
            MappingAction::Set {
                repo,
                branch,
                strategy,
                version,
                pvm_version_id,
                pattern,
            } => commands::mapping::set(dir, repo, branch, strategy, version, pvm_version_id, pattern),
            MappingAction::List { repo } => commands::mapping::list(dir, repo),
            MappingAction::Rm { repo, branch } => commands::mapping::rm(dir, repo, branch),
        },
        Commands::User { action } => match action {
            UserAction::Set { user_id, username } => commands::user::set(dir, user_id, username),
            UserAction::Rm { user_id } => commands::user::rm(dir, user_id),
            UserAction::List => commands::user::list(dir),
        },
        Commands::Parse { message, config } => commands::parse::run(message, config),
        Commands::Import { file, repo } => commands::import::run(dir, file, repo),
        Commands::Process { file, repo, config } => commands::process::run(dir, file, repo, config),
    };

    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
