//! Command-line definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "langate-console", version, about = "LAN gate administration console")]
pub struct Cli {
    /// Log as JSON instead of plain text
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open a session
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Close the session
    Logout,
    /// Show the connected user
    Me,
    /// Log out if the session is older than the configured age
    CheckSession,
    /// Create an account
    Register {
        username: String,
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        password_validation: String,
    },
    /// Manage network devices
    #[command(subcommand)]
    Devices(DeviceCommand),
    /// Manage marks
    #[command(subcommand)]
    Marks(MarkCommand),
    /// Manage users
    #[command(subcommand)]
    Users(UserCommand),
}

#[derive(Debug, Clone, Copy, Args)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = langate_console::models::DEFAULT_PAGE_SIZE)]
    pub page_size: u32,
}

/// Paging, fuzzy filter and ordering for device listings
#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub page: PageArgs,
    #[arg(long)]
    pub filter: Option<String>,
    /// Column, prefixed with `-` for descending order
    #[arg(long, allow_hyphen_values = true)]
    pub order: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum DeviceCommand {
    /// List every device
    List(PageArgs),
    /// Show one device
    Get { id: i64 },
    /// Register a device
    Create {
        mac: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        whitelisted: bool,
        #[arg(long)]
        mark: Option<u32>,
    },
    /// Register devices listed in a JSON file
    Import { file: PathBuf },
    /// Edit a device
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        mac: Option<String>,
        #[arg(long)]
        mark: Option<u32>,
        #[arg(long)]
        whitelisted: Option<bool>,
        #[arg(long)]
        bypass: Option<bool>,
        /// Go through the user-device endpoint
        #[arg(long)]
        user_device: bool,
    },
    /// Delete a device
    Delete { id: i64 },
    /// List whitelisted devices
    Whitelist(ListArgs),
    /// List user devices
    UserDevices(ListArgs),
    /// Assign marks, as `DEVICE_ID=MARK` pairs
    AssignMarks {
        #[arg(required = true)]
        assignments: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum MarkCommand {
    /// List marks
    List,
    /// Replace the mark list with the JSON file's content
    Set { file: PathBuf },
    /// Move devices from one mark to another
    Move { old: u32, new: u32 },
    /// Spread the devices of a mark over the others
    Spread { old: u32 },
    /// Show the per-game mark tables
    Games,
    /// Replace the per-game mark tables with the JSON file's content
    SetGames { file: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List users
    List(PageArgs),
    /// Show one user
    Get { id: i64 },
    /// Edit a user
    Edit {
        id: i64,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        max_devices: Option<u32>,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        tournament: Option<String>,
        #[arg(long)]
        team: Option<String>,
    },
    /// Delete a user
    Delete { id: i64 },
    /// Set a user's password
    Password { id: i64, password: String },
}

/// Parse `12=100` into (device id, mark)
pub fn parse_assignment(raw: &str) -> Result<(i64, u32), String> {
    let (id, mark) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected DEVICE_ID=MARK, got {}", raw))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid device id in {}", raw))?;
    let mark = mark
        .trim()
        .parse()
        .map_err(|_| format!("invalid mark in {}", raw))?;
    Ok((id, mark))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("12=100"), Ok((12, 100)));
        assert_eq!(parse_assignment(" 3 = 7 "), Ok((3, 7)));
        assert!(parse_assignment("12").is_err());
        assert!(parse_assignment("a=1").is_err());
        assert!(parse_assignment("1=-1").is_err());
    }

    #[test]
    fn test_parse_user_devices() {
        let cli = Cli::try_parse_from([
            "langate-console",
            "devices",
            "user-devices",
            "--order",
            "-ip",
            "--page-size",
            "50",
        ])
        .unwrap();
        match cli.command {
            Command::Devices(DeviceCommand::UserDevices(args)) => {
                assert_eq!(args.order.as_deref(), Some("-ip"));
                assert_eq!(args.page.page_size, 50);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
