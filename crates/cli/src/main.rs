//! Trove command-line tool.
//!
//! Thin dispatch over the core library: argument parsing, one-line
//! diagnostics for every user-facing error, and the plain-text log/status
//! formatting. By convention every diagnostic is printed to stdout and the
//! process exits 0; only unexpected failures (store corruption, raw I/O)
//! exit nonzero.

use std::process::ExitCode;

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trove_core::errors::{CoreError, GraphError, RefError, WorktreeError};
use trove_core::repository::LogEntry;
use trove_core::{MergeOutcome, ModificationKind, Repository, StatusReport};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Trove: a single-user local version-control tool.
#[derive(Parser, Debug)]
#[command(name = "trove", version, about = "Track, branch and merge snapshots of a directory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new repository in the current directory.
    Init,

    /// Stage a file for the next commit.
    Add {
        path: String,
    },

    /// Stage a file for removal and delete it from the working tree.
    Rm {
        path: String,
    },

    /// Record the staged changes as a new commit.
    Commit {
        message: Option<String>,
    },

    /// Show first-parent history of the current branch.
    Log,

    /// Show every commit ever made.
    GlobalLog,

    /// Print the ids of all commits with the given message.
    Find {
        message: String,
    },

    /// Show branches, staged changes and untracked files.
    Status,

    /// Switch branches, or restore a file: `checkout <branch>`,
    /// `checkout -- <path>`, `checkout <commit> -- <path>`.
    Checkout {
        target: Option<String>,

        #[arg(last = true)]
        path: Option<String>,
    },

    /// Create a new branch at the current commit.
    Branch {
        name: String,
    },

    /// Delete a branch pointer.
    RmBranch {
        name: String,
    },

    /// Check out an arbitrary commit and repoint the current branch.
    Reset {
        commit: String,
    },

    /// Merge the given branch into the current branch.
    Merge {
        branch: String,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

/// A command that stopped early.
enum Failure {
    /// User-facing condition: print one line, exit 0.
    Diagnostic(String),
    /// Unexpected condition: print to stderr, exit nonzero.
    Fatal(anyhow::Error),
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        Failure::Fatal(err)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = err.print();
                    ExitCode::SUCCESS
                }
                ErrorKind::InvalidSubcommand => {
                    println!("No command with that name exists.");
                    ExitCode::SUCCESS
                }
                ErrorKind::MissingSubcommand
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                    println!("Please enter a command.");
                    ExitCode::SUCCESS
                }
                _ => {
                    println!("Incorrect operands.");
                    ExitCode::SUCCESS
                }
            };
        }
    };

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Diagnostic(msg)) => {
            println!("{msg}");
            ExitCode::SUCCESS
        }
        Err(Failure::Fatal(err)) => {
            eprintln!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

fn dispatch(command: Commands) -> Result<(), Failure> {
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;

    if let Commands::Init = command {
        return match Repository::init(&cwd) {
            Ok(_) => Ok(()),
            Err(CoreError::AlreadyInitialized(_)) => Err(Failure::Diagnostic(
                "A Trove version-control system already exists in the current directory."
                    .to_string(),
            )),
            Err(err) => Err(fatal(err)),
        };
    }

    let repo = match Repository::open(&cwd) {
        Ok(repo) => repo,
        Err(CoreError::NotInitialized(_)) => {
            return Err(Failure::Diagnostic(
                "Not in an initialized Trove directory.".to_string(),
            ));
        }
        Err(err) => return Err(fatal(err)),
    };

    match command {
        Commands::Init => unreachable!("handled above"),

        Commands::Add { path } => repo.add(&path).map_err(|err| match err {
            CoreError::Worktree(WorktreeError::FileNotFound(_)) => {
                diagnostic("File does not exist.")
            }
            other => map_common(other, MISSING_BRANCH),
        }),

        Commands::Rm { path } => repo.remove(&path).map_err(|err| match err {
            CoreError::NoReasonToRemove(_) => diagnostic("No reason to remove the file."),
            other => map_common(other, MISSING_BRANCH),
        }),

        Commands::Commit { message } => {
            match repo.commit(message.as_deref().unwrap_or_default()) {
                Ok(_) => Ok(()),
                Err(CoreError::EmptyMessage) => {
                    Err(diagnostic("Please enter a commit message."))
                }
                Err(CoreError::NothingToCommit) => {
                    Err(diagnostic("No changes added to the commit."))
                }
                Err(other) => Err(map_common(other, MISSING_BRANCH)),
            }
        }

        Commands::Log => {
            let abbrev = repo.config().display.abbrev;
            for entry in repo.log().map_err(|e| map_common(e, MISSING_BRANCH))? {
                print_log_entry(&entry, abbrev);
            }
            Ok(())
        }

        Commands::GlobalLog => {
            let abbrev = repo.config().display.abbrev;
            for entry in repo
                .global_log()
                .map_err(|e| map_common(e, MISSING_BRANCH))?
            {
                print_log_entry(&entry, abbrev);
            }
            Ok(())
        }

        Commands::Find { message } => match repo.find(&message) {
            Ok(ids) => {
                for id in ids {
                    println!("{id}");
                }
                Ok(())
            }
            Err(CoreError::NoSuchCommitMessage(_)) => {
                Err(diagnostic("Found no commit with that message."))
            }
            Err(other) => Err(map_common(other, MISSING_BRANCH)),
        },

        Commands::Status => {
            let report = repo.status().map_err(|e| map_common(e, MISSING_BRANCH))?;
            print_status(&report);
            Ok(())
        }

        Commands::Checkout { target, path } => match (target, path) {
            (Some(commit), Some(path)) => repo
                .restore_file_from(&commit, &path)
                .map_err(|e| map_common(e, MISSING_BRANCH)),
            (None, Some(path)) => repo
                .restore_file(&path)
                .map_err(|e| map_common(e, MISSING_BRANCH)),
            (Some(branch), None) => repo.checkout_branch(&branch).map_err(|err| match err {
                CoreError::Ref(RefError::NoSuchBranch(_)) => {
                    diagnostic("No such branch exists.")
                }
                CoreError::AlreadyCurrent(_) => {
                    diagnostic("No need to checkout the current branch.")
                }
                other => map_common(other, MISSING_BRANCH),
            }),
            (None, None) => Err(diagnostic("Incorrect operands.")),
        },

        Commands::Branch { name } => repo.create_branch(&name).map_err(|err| match err {
            CoreError::Ref(RefError::BranchExists(_)) => {
                diagnostic("A branch with that name already exists.")
            }
            other => map_common(other, MISSING_BRANCH),
        }),

        Commands::RmBranch { name } => repo.remove_branch(&name).map_err(|err| match err {
            CoreError::Ref(RefError::CurrentBranch(_)) => {
                diagnostic("Cannot remove the current branch.")
            }
            other => map_common(other, MISSING_BRANCH),
        }),

        Commands::Reset { commit } => {
            repo.reset(&commit).map_err(|e| map_common(e, MISSING_BRANCH))
        }

        Commands::Merge { branch } => match repo.merge(&branch) {
            Ok(MergeOutcome::AlreadyAncestor) => {
                println!("Given branch is an ancestor of the current branch.");
                Ok(())
            }
            Ok(MergeOutcome::FastForwarded) => {
                println!("Current branch fast-forwarded.");
                Ok(())
            }
            Ok(MergeOutcome::Merged { conflicted, .. }) => {
                if conflicted {
                    println!("Encountered a merge conflict.");
                }
                Ok(())
            }
            Err(CoreError::UncommittedChanges) => {
                Err(diagnostic("You have uncommitted changes."))
            }
            Err(CoreError::SelfMerge(_)) => {
                Err(diagnostic("Cannot merge a branch with itself."))
            }
            Err(other) => Err(map_common(other, MISSING_BRANCH)),
        },
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

const MISSING_BRANCH: &str = "A branch with that name does not exist.";

fn diagnostic(msg: &str) -> Failure {
    Failure::Diagnostic(msg.to_string())
}

fn fatal(err: CoreError) -> Failure {
    Failure::Fatal(anyhow::Error::new(err))
}

/// Map the error conditions shared by several commands; anything outside
/// the user-facing taxonomy (corruption, raw I/O) becomes fatal.
fn map_common(err: CoreError, missing_branch: &str) -> Failure {
    match err {
        CoreError::Graph(GraphError::CommitNotFound(_)) => {
            diagnostic("No commit with that id exists.")
        }
        CoreError::PathNotInCommit(_) => diagnostic("File does not exist in that commit."),
        CoreError::Ref(RefError::NoSuchBranch(_)) => diagnostic(missing_branch),
        CoreError::UntrackedObstruction(_) => diagnostic(
            "There is an untracked file in the way; delete it, or add and commit it first.",
        ),
        other => fatal(other),
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn format_date(timestamp: i64) -> String {
    let utc = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_default();
    utc.with_timezone(&Local)
        .format("%a %b %-d %H:%M:%S %Y %z")
        .to_string()
}

fn print_log_entry(entry: &LogEntry, abbrev: usize) {
    println!("===");
    println!("commit {}", entry.id);
    if let Some((first, second)) = &entry.merge_parents {
        println!("Merge: {} {}", first.short(abbrev), second.short(abbrev));
    }
    println!("Date: {}", format_date(entry.timestamp));
    println!("{}", entry.message);
    println!();
}

fn print_status(report: &StatusReport) {
    println!("=== Branches ===");
    for branch in &report.branches {
        if *branch == report.current_branch {
            println!("*{branch}");
        } else {
            println!("{branch}");
        }
    }
    println!();

    println!("=== Staged Files ===");
    for path in &report.staged {
        println!("{path}");
    }
    println!();

    println!("=== Removed Files ===");
    for path in &report.removed {
        println!("{path}");
    }
    println!();

    println!("=== Modifications Not Staged For Commit ===");
    for (path, kind) in &report.modified {
        match kind {
            ModificationKind::Modified => println!("{path} (modified)"),
            ModificationKind::Deleted => println!("{path} (deleted)"),
        }
    }
    println!();

    println!("=== Untracked Files ===");
    for path in &report.untracked {
        println!("{path}");
    }
    println!();
}
