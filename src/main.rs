use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use histgraph::{Commit, CommitGraph, Config, History, Parent};
use tracing::Level;

#[derive(Parser)]
#[command(name = "histgraph")]
#[command(about = "Parse git history into a graph of commits and developers")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more detail to stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count commits, authors and committers in a repository
    Summary {
        /// Path to the repository
        repo: PathBuf,
    },

    /// List authors with the number of commits each authored
    Authors {
        /// Path to the repository
        repo: PathBuf,
    },

    /// List the commits of the author with the given name
    Author {
        /// Path to the repository
        repo: PathBuf,

        /// Exact author name
        name: String,
    },

    /// Show a single commit
    Show {
        /// Path to the repository
        repo: PathBuf,

        /// Full commit hash
        hash: String,
    },

    /// Parse a saved `git log --pretty=raw` dump (`-` for stdin)
    Parse {
        /// Path to the dump
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Summary { repo } => {
            let history = open(&repo, &config)?;
            print_summary(history.graph());
        }
        Command::Authors { repo } => {
            let history = open(&repo, &config)?;
            for author in history.authors() {
                println!("{:>6}  {}", author.commits().len(), author);
            }
        }
        Command::Author { repo, name } => {
            let history = open(&repo, &config)?;
            let Some(author) = history.author_with_name(&name) else {
                bail!("no author named '{name}'");
            };
            for commit in history.graph().commits_by(author) {
                println!("{}  {}", commit.hash(), commit.subject());
            }
        }
        Command::Show { repo, hash } => {
            let history = open(&repo, &config)?;
            let Some(commit) = history.commit(&hash) else {
                bail!("no commit {hash} in {}", history.path().display());
            };
            print_commit(history.graph(), commit);
        }
        Command::Parse { file } => {
            let text = read_dump(&file)?;
            let history = History::from_text(&file, &text)?;
            print_summary(history.graph());
        }
    }

    Ok(())
}

fn open(repo: &Path, config: &Config) -> anyhow::Result<History> {
    History::open(repo, config)
        .with_context(|| format!("failed to load history of {}", repo.display()))
}

fn read_dump(file: &Path) -> anyhow::Result<String> {
    if file == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))
    }
}

fn print_summary(graph: &CommitGraph) {
    println!("commits:          {}", graph.len());
    println!("authors:          {}", graph.author_count());
    println!("committers:       {}", graph.committer_count());
    println!("root commits:     {}", graph.roots().count());
    println!("external parents: {}", graph.external_parent_count());
}

fn print_commit(graph: &CommitGraph, commit: &Commit) {
    println!("commit    {}", commit.hash());
    if let Some(tree) = &commit.tree {
        println!("tree      {tree}");
    }
    for (hash, parent) in commit.parents() {
        match parent {
            Parent::Resolved(_) => println!("parent    {hash}"),
            Parent::Unresolved(_) => println!("parent    {hash} (not in history)"),
        }
    }
    for child in graph.children_of(commit.hash()) {
        println!("child     {}", child.hash());
    }
    if let Some(author) = graph.author_of(commit) {
        match &commit.author_time {
            Some(time) => println!("author    {author}  {time}"),
            None => println!("author    {author}"),
        }
    }
    if let Some(committer) = graph.committer_of(commit) {
        match &commit.committer_time {
            Some(time) => println!("committer {committer}  {time}"),
            None => println!("committer {committer}"),
        }
    }
    if !commit.message.is_empty() {
        println!();
        for line in commit.message.lines() {
            println!("    {line}");
        }
    }
}
