//! Command-line front end for a versioned working-tree backend.
//!
//! Every subcommand maps onto one [`FileSystemBackend`] call. Listings and
//! attributes print as JSON; mutations print the new revision id.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use vost_backend::{
    Attributes, BackendConfig, BackendRegistry, Error, FileSystemBackend, WriteOptions,
    DEFAULT_COMMITTER, DEFAULT_EXCLUDED,
};

#[derive(Parser, Debug)]
#[command(name = "vost-backend", version, about = "Versioned working-tree file backend")]
struct Cli {
    /// Repository root (a git working tree)
    #[arg(long, env = "VOST_ROOT")]
    root: PathBuf,

    /// Commit author, "Name <email>"
    #[arg(long, env = "VOST_COMMITTER", default_value = DEFAULT_COMMITTER)]
    committer: String,

    /// Space-separated name patterns hidden from listings
    #[arg(long, env = "VOST_EXCLUDED", default_value = DEFAULT_EXCLUDED)]
    excluded: String,

    /// Backend type
    #[arg(long, default_value = "git")]
    backend: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a file's content
    Read { path: String },

    /// Write a file from --data or stdin
    Write {
        path: String,
        #[arg(long)]
        data: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Rename a file (and its profiles) within its directory
    Rename {
        path: String,
        new_name: String,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Delete a file and its profiles
    Rm {
        path: String,
        #[arg(long)]
        reason: Option<String>,
    },

    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Create a directory (not committed)
    Mkdir { path: String },

    /// Remove an empty directory (not committed)
    Rmdir { path: String },

    /// Rename a directory (not committed)
    Mvdir { path: String, new_name: String },

    /// Size and modification time of a file or directory
    Stat { path: String },

    /// Per-file profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// List the profiles of a file
    Ls { path: String },
    /// Print a profile's content
    Read { path: String, name: String },
    /// Write a profile from --data or stdin
    Write {
        path: String,
        name: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// Delete a profile
    Rm { path: String, name: String },
    /// Size and modification time of a profile
    Stat { path: String, name: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(err: &Error) -> u8 {
    match err {
        Error::NotFound(_) => 2,
        Error::OutsideRoot(_) | Error::InvalidPath(_) => 3,
        Error::AlreadyExists(_) | Error::NotEmpty(_) | Error::NotADirectory(_) => 4,
        Error::Repository(_) => 5,
        _ => 1,
    }
}

fn run(cli: Cli) -> vost_backend::Result<()> {
    let config = BackendConfig::new(cli.root)
        .committer(cli.committer)
        .excluded(cli.excluded);
    let backend = BackendRegistry::with_builtins().create(&cli.backend, &config)?;

    match cli.command {
        Command::Read { path } => emit_bytes(&backend.read(&path)?),
        Command::Write { path, data, reason } => {
            let content = input(data)?;
            let opts = WriteOptions {
                reason,
                ..Default::default()
            };
            println!("{}", backend.write(&path, &content, opts)?);
            Ok(())
        }
        Command::Rename {
            path,
            new_name,
            reason,
        } => {
            println!("{}", backend.rename(&path, &new_name, reason.as_deref())?);
            Ok(())
        }
        Command::Rm { path, reason } => {
            println!("{}", backend.unlink(&path, reason.as_deref())?);
            Ok(())
        }
        Command::Ls { path } => emit_json(&json!(backend.getdir(&path)?)),
        Command::Mkdir { path } => backend.mkdir(&path),
        Command::Rmdir { path } => backend.rmdir(&path),
        Command::Mvdir { path, new_name } => backend.renamedir(&path, &new_name),
        Command::Stat { path } => {
            let attrs = backend.attributes(&path)?;
            let kind = if backend.isdir(&path)? { "directory" } else { "file" };
            emit_json(&stat_json(&path, kind, attrs))
        }
        Command::Profile { action } => run_profile(&*backend, action),
    }
}

fn run_profile(backend: &dyn FileSystemBackend, action: ProfileCommand) -> vost_backend::Result<()> {
    match action {
        ProfileCommand::Ls { path } => emit_json(&json!(backend.get_profiles(&path)?)),
        ProfileCommand::Read { path, name } => emit_bytes(&backend.read_profile(&path, &name)?),
        ProfileCommand::Write { path, name, data } => {
            let content = input(data)?;
            println!("{}", backend.write_profile(&path, &name, &content)?);
            Ok(())
        }
        ProfileCommand::Rm { path, name } => {
            println!("{}", backend.unlink_profile(&path, &name)?);
            Ok(())
        }
        ProfileCommand::Stat { path, name } => {
            let attrs = backend.profile_attributes(&path, &name)?;
            emit_json(&stat_json(&format!("{}#{}", path, name), "profile", attrs))
        }
    }
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn input(data: Option<String>) -> vost_backend::Result<Vec<u8>> {
    match data {
        Some(s) => Ok(s.into_bytes()),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn emit_bytes(content: &[u8]) -> vost_backend::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(content)?;
    out.flush()?;
    Ok(())
}

fn emit_json(value: &serde_json::Value) -> vost_backend::Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    println!("{}", text);
    Ok(())
}

fn stat_json(path: &str, kind: &str, attrs: Attributes) -> serde_json::Value {
    let modified = chrono::DateTime::from_timestamp(attrs.mtime, 0).map(|t| t.to_rfc3339());
    json!({
        "path": path,
        "type": kind,
        "size": attrs.size,
        "mtime": attrs.mtime,
        "modified": modified,
    })
}
