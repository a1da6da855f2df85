//! repotui - Entry Point

use clap::{Args as ClapArgs, Parser, Subcommand};
use repotui::config::{apply_cli_overrides, apply_env_overrides, load_config_with_precedence, merge_config};
use repotui::content::DiffKind;
use repotui::model::{AppError, ArtifactType, BranchSort};
use repotui::repo::{BranchFilter, HistoryQuery, Repository, SharedRepository, SnapshotRepository};
use repotui::view::{self, BlameOptions, ColorConfig, Context, Palette, View};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// repotui - terminal browser for repository history
#[derive(Parser, Debug)]
#[command(name = "repotui")]
#[command(version)]
#[command(about = "Browse a repository's timeline, diffs, trees, blame and branches")]
pub struct Args {
    /// Repository snapshot file (JSON)
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colors
    #[arg(long, global = true)]
    pub no_color: bool,

    /// View to open (default: timeline)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// The view opened at startup.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Commit history, newest first
    Timeline(TimelineArgs),
    /// Diff of a commit, two commits, two blobs or the local checkout
    Diff(DiffArgs),
    /// Directory tree of a commit
    Tree(TreeArgs),
    /// Line-by-line attribution of a file
    Blame(BlameArgs),
    /// Branch list
    Branch(BranchArgs),
}

/// `timeline` options.
#[derive(ClapArgs, Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineArgs {
    /// Start from this commit
    #[arg(short = 'c', long)]
    pub commit: Option<String>,

    /// Only checkins on this branch
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Only events by this user
    #[arg(short, long)]
    pub user: Option<String>,

    /// Only events of this type (ci, w, t, e, g, f)
    #[arg(short = 't', long = "type", value_parser = parse_type)]
    pub kind: Option<ArtifactType>,

    /// Only checkins touching this path
    pub path: Option<String>,
}

/// `diff` options.
#[derive(ClapArgs, Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffArgs {
    /// Commit (or blob with --blobs) to diff; defaults to the tip
    pub from: Option<String>,

    /// Second commit or blob; diff FROM against it
    pub to: Option<String>,

    /// Diff the local checkout against its base
    #[arg(long, conflicts_with_all = ["from", "to", "blobs"])]
    pub local: bool,

    /// Treat FROM and TO as file contents
    #[arg(long, requires = "to")]
    pub blobs: bool,
}

/// `tree` options.
#[derive(ClapArgs, Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeArgs {
    /// Commit to show; defaults to the tip
    #[arg(short = 'c', long)]
    pub commit: Option<String>,

    /// Directory to open
    pub path: Option<String>,
}

/// `blame` options.
#[derive(ClapArgs, Debug, Clone, Default, PartialEq, Eq)]
pub struct BlameArgs {
    /// Version to blame; defaults to the tip
    #[arg(short = 'c', long, conflicts_with = "root")]
    pub commit: Option<String>,

    /// Stop after this many versions
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Stop after this many seconds
    #[arg(long)]
    pub budget: Option<u64>,

    /// Reverse blame: find where each line of ROOT was next changed
    #[arg(short = 'r', long)]
    pub root: Option<String>,

    /// File to blame
    pub path: String,
}

/// `branch` options.
#[derive(ClapArgs, Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchArgs {
    /// Only open branches
    #[arg(long, conflicts_with = "closed")]
    pub open: bool,

    /// Only closed branches
    #[arg(long)]
    pub closed: bool,

    /// Sort order: name, mru or state
    #[arg(short, long, value_parser = parse_sort)]
    pub sort: Option<BranchSort>,
}

fn parse_type(raw: &str) -> Result<ArtifactType, String> {
    ArtifactType::parse(raw).ok_or_else(|| format!("unknown artifact type '{raw}'"))
}

fn parse_sort(raw: &str) -> Result<BranchSort, String> {
    BranchSort::parse(raw).ok_or_else(|| format!("unknown sort order '{raw}'"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let command = args
        .command
        .clone()
        .unwrap_or_else(|| Command::Timeline(TimelineArgs::default()));

    // Defaults → Config File → Env Vars → CLI Args
    let config = {
        let config_file = load_config_with_precedence(args.config.clone())?;
        let merged = merge_config(config_file);
        let with_env = apply_env_overrides(merged);

        let (sort_override, limit_override) = match &command {
            Command::Branch(b) => (b.sort, None),
            Command::Blame(b) => (None, b.limit),
            _ => (None, None),
        };
        apply_cli_overrides(with_env, args.repo.clone(), sort_override, limit_override)
    };

    repotui::logging::init(&config.log_file_path)?;

    info!(config = ?config, ?command, "configuration loaded and resolved");

    let repo: SharedRepository = Arc::new(SnapshotRepository::open(&config.repository)?);
    let mut ctx = Context::new(repo, config);
    ctx.palette = Palette::new(ColorConfig::from_env_and_args(args.no_color));

    let view = open_initial(&ctx, &command)?;
    view::run(view, ctx)?;

    Ok(())
}

/// Resolve the command's names against the repository and open its view.
fn open_initial(ctx: &Context, command: &Command) -> Result<View, AppError> {
    let repo = ctx.repo.as_ref();
    let resolve_or_tip = |name: &Option<String>| repo.resolve(name.as_deref().unwrap_or("tip"));
    match command {
        Command::Timeline(t) => {
            let query = HistoryQuery {
                start: t.commit.as_deref().map(|c| repo.resolve(c)).transpose()?,
                path: t.path.clone(),
                branch: t.branch.clone(),
                user: t.user.clone(),
                kind: t.kind,
                ..HistoryQuery::default()
            };
            Ok(view::open_timeline(ctx, query))
        }
        Command::Diff(d) => {
            let kind = diff_kind(repo, d)?;
            view::open_diff(ctx, kind)
        }
        Command::Tree(t) => {
            let commit = resolve_or_tip(&t.commit)?;
            view::open_tree(ctx, &commit, t.path.as_deref())
        }
        Command::Blame(b) => {
            let mut options = BlameOptions::from_config(&ctx.config);
            options.budget = b.budget.map(Duration::from_secs);
            let commit = match &b.root {
                Some(root) => {
                    options.reverse = true;
                    repo.resolve(root)?
                }
                None => resolve_or_tip(&b.commit)?,
            };
            view::open_blame(ctx, &b.path, &commit, options)
        }
        Command::Branch(b) => {
            let filter = BranchFilter {
                open: match (b.open, b.closed) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                ..BranchFilter::default()
            };
            view::open_branch(ctx, filter)
        }
    }
}

fn diff_kind(repo: &dyn Repository, args: &DiffArgs) -> Result<DiffKind, AppError> {
    if args.local {
        return Ok(DiffKind::Local);
    }
    let from = repo.resolve(args.from.as_deref().unwrap_or("tip"))?;
    let Some(to) = args.to.as_deref() else {
        return Ok(DiffKind::for_artifact(repo, &from)?);
    };
    let to = repo.resolve(to)?;
    Ok(if args.blobs {
        DiffKind::Blobs { from, to }
    } else {
        DiffKind::Checkin {
            from: Some(from),
            to,
        }
    })
}
