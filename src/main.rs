//! gh-org-sync CLI
//!
//! Command line tool for keeping an organization's GitHub repositories in order

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gh_org_sync::{
    config::{
        default_standard_labels, parse_repository, resolve_access_token, resolve_standard_labels,
        DEFAULT_API_URL, DEFAULT_LABEL_COLOR, DEFAULT_OWNER,
    },
    git::{self, CloneProtocol, RepoUpdate},
    github::LabelEdit,
    issues,
    sync::{BatchResult, NonStandardReport, SyncOperation, SyncResult},
    ClientConfig, Error, GitHubClient, LabelSyncer, RepoRef, Result,
};

/// gh-org-sync CLI
#[derive(Parser)]
#[command(
    name = "gh-org-sync",
    version,
    about = "Keep an organization's GitHub repositories, issues and labels in order",
    long_about = "Mirrors repositories locally, counts open issues across an organization \
    and enforces a standard label set (names and colors) on every repository."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GitHub access token (falls back to GITHUB_TOKEN, then GITHUB_SOT_OAUTH)
    #[arg(short = 't', long, global = true)]
    access_token: Option<String>,

    /// Owner of repositories given by bare name
    #[arg(short = 'o', long, global = true, env = "GITHUB_OWNER", default_value = DEFAULT_OWNER)]
    owner: String,

    /// GitHub REST API base URL
    #[arg(long, global = true, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Standard label file (JSON/YAML)
    #[arg(short = 'l', long, global = true)]
    labels: Option<PathBuf>,

    /// Dry run mode (don't make actual changes)
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List repositories of a user, an organization, or the token owner
    Repos {
        /// User whose repositories to list
        #[arg(long, conflicts_with = "org")]
        user: Option<String>,

        /// Organization whose repositories to list
        #[arg(long)]
        org: Option<String>,
    },

    /// Count open issues per repository
    Issues {
        /// Repositories (`repo` or `owner/repo`); all owner repositories if empty
        repos: Vec<String>,

        /// Print every issue, not only the counts
        #[arg(long)]
        list: bool,
    },

    /// Inspect and standardize labels
    Labels {
        #[command(subcommand)]
        command: LabelCommands,
    },

    /// Clone or pull repositories into sibling directories
    Clone {
        /// User whose repositories to mirror (token owner if omitted)
        #[arg(long)]
        user: Option<String>,

        /// Only mirror repositories with this visibility
        #[arg(long)]
        private: Option<bool>,

        /// Clone over HTTPS instead of SSH
        #[arg(long)]
        https: bool,

        /// Mirror local bare repositories matching this glob instead
        #[arg(long)]
        local: Option<String>,

        /// Directory holding the working copies
        #[arg(short = 'w', long, default_value = ".")]
        workdir: PathBuf,
    },

    /// Output the built-in standard label set
    Init {
        /// Output format
        #[arg(long, default_value = "json", value_parser = ["json", "yaml"])]
        format: String,

        /// Output file path
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum LabelCommands {
    /// Display the labels of a repository
    List {
        repo: String,

        /// Output format
        #[arg(long, default_value = "table", value_parser = ["table", "json", "yaml"])]
        format: String,
    },

    /// Report labels that are not in the standard set
    Nonstandard {
        /// Repositories; all owner repositories if empty
        repos: Vec<String>,
    },

    /// Rename legacy labels and create missing standard labels
    Sync {
        /// Repositories to synchronize
        repos: Vec<String>,

        /// Synchronize every repository of the owner
        #[arg(long, conflicts_with = "repos")]
        all: bool,

        /// Continue with the next repository after a failure
        #[arg(long)]
        keep_going: bool,
    },

    /// Rename or recolor one label (reports it when nothing is requested)
    Update {
        repo: String,
        name: String,

        /// New label name
        #[arg(long)]
        new_name: Option<String>,

        /// New label color (6-digit hex)
        #[arg(long)]
        color: Option<String>,
    },

    /// Create one label
    Create {
        repo: String,
        name: String,

        /// Label color (6-digit hex)
        #[arg(long, default_value = DEFAULT_LABEL_COLOR)]
        color: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match run(cli).await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e.to_string().red());
            std::process::exit(1);
        }
    }
}

/// Install the tracing subscriber on stderr
///
/// `RUST_LOG` overrides the default level; `LOG_FORMAT=json` emits JSON lines.
fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("gh_org_sync={}", level)))?;

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if use_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

/// Execute the selected command; `Ok(false)` means partial failure
async fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Init { ref format, ref output } => {
            run_init(format, output.as_deref())?;
            Ok(true)
        }

        Commands::Clone {
            local: Some(ref pattern),
            ref workdir,
            ..
        } => {
            let updated = git::update_local_repos(pattern, workdir).await?;
            display_updates(&updated);
            Ok(true)
        }

        Commands::Clone {
            ref user,
            private,
            https,
            ref workdir,
            ..
        } => {
            let client = build_client(&cli)?;
            let protocol = if https {
                CloneProtocol::Https
            } else {
                CloneProtocol::Ssh
            };
            let updated =
                git::update_github_repos(&client, user.as_deref(), private, protocol, workdir)
                    .await?;
            display_updates(&updated);
            Ok(true)
        }

        Commands::Repos { ref user, ref org } => {
            let client = build_client(&cli)?;
            let repos = match org {
                Some(org) => client.list_org_repos(org).await?,
                None => client.list_user_repos(user.as_deref()).await?,
            };
            for repo in repos {
                let visibility = if repo.private { "private" } else { "public" };
                println!("{:<40} {}", repo.name.cyan(), visibility.dimmed());
            }
            Ok(true)
        }

        Commands::Issues { ref repos, list } => {
            let client = build_client(&cli)?;
            let repos = parse_repo_args(repos, &cli.owner)?;
            if list {
                for issue in issues::org_issues(&client, &cli.owner, repos).await? {
                    println!("#{:<6} {}", issue.number, issue.title);
                }
            } else {
                let summary = issues::count_org_issues(&client, &cli.owner, repos).await?;
                for count in &summary.counts {
                    println!("{:<40} {}", count.repository, count.count);
                }
                println!("{:<40} {}", "Total".bold(), summary.total.to_string().bold());
            }
            Ok(true)
        }

        Commands::Labels { ref command } => run_labels(&cli, command).await,
    }
}

/// Execute a label subcommand
async fn run_labels(cli: &Cli, command: &LabelCommands) -> Result<bool> {
    let client = build_client(cli)?;

    match command {
        LabelCommands::List { repo, format } => {
            let repo = parse_repo_arg(repo, &cli.owner)?;
            let labels = client.list_labels(&repo).await?;
            match format.as_str() {
                "table" => {
                    println!("{:<30} {:<8}", "Name".cyan(), "Color".cyan());
                    println!("{}", "─".repeat(40));
                    for label in labels {
                        println!("{:<30} #{}", label.name, label.color);
                    }
                }
                "json" => println!("{}", serde_json::to_string_pretty(&labels)?),
                "yaml" => println!("{}", serde_yaml::to_string(&labels)?),
                _ => return Err(Error::config_validation("Unsupported format")),
            }
            Ok(true)
        }

        LabelCommands::Nonstandard { repos } => {
            let standard = load_standard_labels(cli)?;
            let repos = match parse_repo_args(repos, &cli.owner)? {
                Some(repos) => repos,
                None => owner_repos(&client, &cli.owner).await?,
            };
            let reports = LabelSyncer::new(&client, &standard)
                .nonstandard_labels(&repos)
                .await?;
            display_nonstandard(&reports);
            Ok(true)
        }

        LabelCommands::Sync {
            repos,
            all,
            keep_going,
        } => {
            let standard = load_standard_labels(cli)?;
            let repos = if *all {
                owner_repos(&client, &cli.owner).await?
            } else {
                require_repos(parse_repo_args(repos, &cli.owner)?)?
            };

            if cli.dry_run {
                println!("{} Running in dry-run mode (no changes will be made)", "!".yellow());
            }

            let batch = LabelSyncer::new(&client, &standard)
                .dry_run(cli.dry_run)
                .synchronize_many(&repos, *keep_going)
                .await?;
            display_batch(&batch, cli.verbose);
            Ok(batch.is_success())
        }

        LabelCommands::Update {
            repo,
            name,
            new_name,
            color,
        } => {
            let repo = parse_repo_arg(repo, &cli.owner)?;
            let color = color
                .as_deref()
                .map(|c| gh_org_sync::StandardLabel::new(name.as_str(), c).map(|l| l.color))
                .transpose()?;

            if cli.dry_run {
                let label = client.get_label(&repo, name).await?;
                println!(
                    "{} Would update {} (#{}) in {}",
                    "!".yellow(),
                    label.name.cyan(),
                    label.color,
                    repo
                );
                return Ok(true);
            }

            match client
                .update_label(&repo, name, new_name.as_deref(), color.as_deref())
                .await?
            {
                LabelEdit::Unchanged(label) => {
                    println!("label name:{} repo:{} color:{}", label.name, repo, label.color);
                }
                LabelEdit::Patched { previous, current } => {
                    println!(
                        "{} Updated {} label {} (#{}) -> {} (#{})",
                        "✓".green(),
                        repo,
                        previous.name.cyan(),
                        previous.color,
                        current.name.cyan(),
                        current.color
                    );
                }
            }
            Ok(true)
        }

        LabelCommands::Create { repo, name, color } => {
            let repo = parse_repo_arg(repo, &cli.owner)?;
            let label = gh_org_sync::StandardLabel::new(name.as_str(), color)?;

            if cli.dry_run {
                println!("{} Would create {} (#{}) in {}", "!".yellow(), label.name.cyan(), label.color, repo);
                return Ok(true);
            }

            let created = client.create_label(&repo, &label.name, &label.color).await?;
            println!(
                "{} Created {} label {} (#{})",
                "✓".green(),
                repo,
                created.name.cyan(),
                created.color
            );
            Ok(true)
        }
    }
}

/// Execute init command
fn run_init(format: &str, output: Option<&Path>) -> Result<()> {
    let labels = default_standard_labels();

    let content = match format {
        "json" => serde_json::to_string_pretty(&labels)?,
        "yaml" => serde_yaml::to_string(&labels)?,
        _ => return Err(Error::config_validation("Unsupported format")),
    };

    if let Some(output_path) = output {
        std::fs::write(output_path, content)?;
        println!(
            "{} Standard label set written to: {}",
            "✓".green(),
            output_path.display().to_string().cyan()
        );
    } else {
        println!("{}", content);
    }

    Ok(())
}

/// Build the API client from the global flags
fn build_client(cli: &Cli) -> Result<GitHubClient> {
    let token = resolve_access_token(cli.access_token.clone())?;
    let config = ClientConfig::new(token, cli.owner.clone()).with_api_url(cli.api_url.clone());
    GitHubClient::new(&config)
}

/// Standard label set from `--labels`, a convention file, or the built-in set
fn load_standard_labels(cli: &Cli) -> Result<gh_org_sync::StandardLabels> {
    let cwd = std::env::current_dir()?;
    resolve_standard_labels(cli.labels.as_deref(), &cwd)
}

/// Every repository of `owner`, qualified with the owner
async fn owner_repos(client: &GitHubClient, owner: &str) -> Result<Vec<RepoRef>> {
    Ok(client
        .list_owner_repos(owner)
        .await?
        .iter()
        .map(|repo| RepoRef::qualified(owner, repo.name.clone()))
        .collect())
}

fn parse_repo_arg(repo: &str, default_owner: &str) -> Result<RepoRef> {
    let (owner, name) = parse_repository(repo, default_owner)?;
    Ok(RepoRef::qualified(owner, name))
}

/// Parse repository arguments; `None` when no repository was given
fn parse_repo_args(repos: &[String], default_owner: &str) -> Result<Option<Vec<RepoRef>>> {
    if repos.is_empty() {
        return Ok(None);
    }
    repos
        .iter()
        .map(|repo| parse_repo_arg(repo, default_owner))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Require at least one repository argument
fn require_repos(repos: Option<Vec<RepoRef>>) -> Result<Vec<RepoRef>> {
    repos.ok_or_else(|| Error::config_validation("Give at least one repository, or use --all"))
}

fn display_updates(updated: &[(String, RepoUpdate)]) {
    for (name, outcome) in updated {
        let verb = match outcome {
            RepoUpdate::Cloned => "Cloned".green(),
            RepoUpdate::Pulled => "Updated".blue(),
        };
        println!("{} {}", verb, name.cyan());
    }
}

fn display_nonstandard(reports: &[NonStandardReport]) {
    for report in reports {
        let labels: Vec<String> = report
            .labels
            .iter()
            .map(|label| format!("{} (#{})", label.name, label.color))
            .collect();
        println!("{}: [{}]", report.repository.cyan(), labels.join(", "));
    }
}

/// Display synchronization results
fn display_sync_result(result: &SyncResult, verbose: bool) {
    if result.dry_run && result.has_changes() {
        println!("\n{} {} sync preview (dry-run mode):", "•".blue(), result.repository.cyan());
    } else if result.has_changes() {
        println!("\n{} {} synchronized:", "✓".green(), result.repository.cyan());
    } else {
        println!("\n{} {} already standard", "✓".green(), result.repository.cyan());
        return;
    }

    println!("  Renamed: {}", result.renamed.to_string().blue());
    println!("  Created: {}", result.created.to_string().green());

    if verbose {
        for (i, operation) in result.operations.iter().enumerate() {
            let prefix = format!("  {}.", i + 1);
            match operation {
                SyncOperation::Rename {
                    current_name,
                    new_name,
                    color,
                } => println!(
                    "{} Rename label: {} -> {} (#{})",
                    prefix,
                    current_name.cyan(),
                    new_name.cyan(),
                    color
                ),
                SyncOperation::Create { name, color } => {
                    println!("{} Create label: {} (#{})", prefix, name.cyan(), color)
                }
            }
        }
    }
}

fn display_batch(batch: &BatchResult, verbose: bool) {
    for result in &batch.results {
        display_sync_result(result, verbose);
    }

    if !batch.failures.is_empty() {
        eprintln!("\n{} Errors occurred:", "✗".red());
        for (repo, error) in &batch.failures {
            eprintln!("  {}: {}", repo, error.to_string().red());
        }
    }
}
