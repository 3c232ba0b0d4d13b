use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::info;

use enchat::credentials::{hash_secret, legacy_digest};
use enchat::storage::models::{LastSeen, Message, PresenceRecord, UserRecord};
use enchat::storage::{DurableLog, RedbLog};

#[derive(Parser, Debug)]
#[command(name = "enchat-admin")]
#[command(author, version, about = "Manage users, presence and messages in the durable store", long_about = None)]
struct Args {
    /// Directory of the durable store
    #[arg(long, env = "DURABLE_STORE_PATH")]
    durable_store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or replace a user. The password is read from the first line of stdin.
    AddUser {
        username: String,
        /// Store an unsalted SHA-256 digest instead of Argon2id
        #[arg(long)]
        legacy_digest: bool,
    },
    /// Delete a user and their presence record
    RemoveUser { username: String },
    /// List registered usernames
    ListUsers,
    /// Set a user's last-seen value: `online`, another status, or a timestamp
    SetPresence { username: String, last_seen: String },
    /// Append a message to the log
    PostMessage {
        username: String,
        content: String,
        /// Message timestamp; defaults to the current unix time in seconds
        #[arg(long)]
        timestamp: Option<i64>,
    },
    /// Print the message log in insertion order
    ListMessages,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args = Args::parse();
    let log = RedbLog::open(&args.durable_store).with_context(|| {
        format!("failed to open durable store at {}", args.durable_store.display())
    })?;

    run(&log, args.command, &mut std::io::stdin().lock())
}

fn read_password(input: &mut dyn BufRead) -> Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(password.to_string())
}

fn run(log: &dyn DurableLog, command: Command, input: &mut dyn BufRead) -> Result<()> {
    match command {
        Command::AddUser {
            username,
            legacy_digest: legacy,
        } => {
            if username.trim().is_empty() {
                bail!("username must not be empty");
            }
            let password = read_password(input)?;
            let password_digest = if legacy {
                legacy_digest(&password)
            } else {
                hash_secret(&password)?
            };
            log.put_user(&UserRecord {
                password_digest,
                username: username.clone(),
            })?;
            info!(username = %username, legacy, "User stored");
            println!("added {username}");
        }
        Command::RemoveUser { username } => {
            if log.remove_user(&username)? {
                println!("removed {username}");
            } else {
                bail!("no such user: {username}");
            }
        }
        Command::ListUsers => {
            for user in log.list_users()? {
                println!("{}", user.username);
            }
        }
        Command::SetPresence {
            username,
            last_seen,
        } => {
            let last_seen: LastSeen = last_seen.parse()?;
            log.set_presence(&PresenceRecord {
                last_seen: last_seen.clone(),
                username: username.clone(),
            })?;
            println!("{username} last seen {last_seen}");
        }
        Command::PostMessage {
            username,
            content,
            timestamp,
        } => {
            let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());
            let sequence = log.append_message(&Message {
                timestamp,
                content,
                username,
            })?;
            println!("appended message #{sequence} at {timestamp}");
        }
        Command::ListMessages => {
            for message in log.messages()? {
                println!("{}\t{}\t{}", message.timestamp, message.username, message.content);
            }
        }
    }
    Ok(())
}
