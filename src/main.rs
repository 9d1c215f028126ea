//! LAN gate console - Entry Point
//!
//! Every invocation restores the persisted session, checks its age, runs
//! one command and saves the session back.

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{
    parse_assignment, Cli, Command, DeviceCommand, ListArgs, MarkCommand, PageArgs, UserCommand,
};
use langate_console::guard::{guard, ManagementPage, Navigation, Route};
use langate_console::models::{
    dangling_game_marks, DeviceOrder, DeviceQuery, DeviceUpdate, EditableMark, GameMarks,
    NewDevice, PageRequest, RegisterRequest, UserPatch, UserRole,
};
use langate_console::{
    ApiClient, Config, DeviceStore, MarkStore, NotificationQueue, Notifier, SessionStore, UserStore,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    let config = Config::from_env()?;
    let session_file = config.session_file.clone();
    let client = ApiClient::new(config)?;

    let queue = Arc::new(NotificationQueue::new());
    let notifier: Arc<dyn Notifier> = queue.clone();

    let mut session = SessionStore::load(client.clone(), Arc::clone(&notifier), &session_file)
        .await
        .with_context(|| format!("loading session from {}", session_file.display()))?;

    if session.handle_session_cookie_expiration().await {
        warn!("Session expired, logged out");
    }

    let outcome = run(cli.command, &mut session, &client, notifier).await;

    session
        .save(&session_file)
        .await
        .with_context(|| format!("saving session to {}", session_file.display()))?;

    if let Some(route) = session.take_redirect() {
        info!("Next page: {}", route);
    }

    for notification in queue.drain() {
        eprintln!("{}", notification);
    }

    if !outcome? {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(json: bool) -> anyhow::Result<()> {
    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "error" => Level::ERROR,
            _ => Level::WARN,
        })
        .unwrap_or(Level::WARN);

    // stdout carries command output, logs go to stderr
    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Run one command. `Ok(false)` means the store reported a failure.
async fn run(
    command: Command,
    session: &mut SessionStore,
    client: &ApiClient,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<bool> {
    let devices = DeviceStore::new(client.clone(), Arc::clone(&notifier));
    let marks = MarkStore::new(client.clone(), Arc::clone(&notifier));
    let users = UserStore::new(client.clone(), Arc::clone(&notifier));

    match command {
        Command::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let ok = session.login(&username, &password).await;
            if let Some(user) = session.user() {
                print_json(user)?;
            }
            Ok(ok)
        }
        Command::Logout => Ok(session.logout().await),
        Command::Me => {
            if !enter(&Route::Home, session) {
                return Ok(false);
            }
            print_opt(session.refresh_me().await)
        }
        Command::CheckSession => {
            // Expiry already ran in main
            print_json(&serde_json::json!({
                "connected": session.is_connected(),
                "since": session.connection_timestamp(),
                "role": session.role(),
            }))?;
            Ok(true)
        }
        Command::Register {
            username,
            email,
            password,
            password_validation,
        } => {
            let request = RegisterRequest {
                username,
                email,
                password,
                password_validation,
            };
            Ok(session.register(&request).await)
        }
        Command::Devices(cmd) => {
            let page = match &cmd {
                DeviceCommand::Whitelist(_) => ManagementPage::Whitelist,
                _ => ManagementPage::Devices,
            };
            if !enter(&Route::Management(page), session) {
                return Ok(false);
            }
            run_devices(cmd, &devices).await
        }
        Command::Marks(cmd) => {
            if !enter(&Route::Management(ManagementPage::Marks), session) {
                return Ok(false);
            }
            run_marks(cmd, &marks).await
        }
        Command::Users(cmd) => {
            if !enter(&Route::Management(ManagementPage::Users), session) {
                return Ok(false);
            }
            run_users(cmd, &users).await
        }
    }
}

async fn run_devices(cmd: DeviceCommand, devices: &DeviceStore) -> anyhow::Result<bool> {
    match cmd {
        DeviceCommand::List(page) => print_opt(devices.fetch_devices(page_request(page)).await),
        DeviceCommand::Get { id } => print_opt(devices.fetch_device(id).await),
        DeviceCommand::Create {
            mac,
            name,
            whitelisted,
            mark,
        } => {
            let device = NewDevice {
                name,
                mac,
                whitelisted,
                mark,
            };
            Ok(devices.create_device(&device).await)
        }
        DeviceCommand::Import { file } => {
            let list: Vec<NewDevice> = read_json(&file).await?;
            Ok(devices.create_devices_from_list(&list).await)
        }
        DeviceCommand::Edit {
            id,
            name,
            mac,
            mark,
            whitelisted,
            bypass,
            user_device,
        } => {
            let update = DeviceUpdate {
                name,
                mac,
                mark,
                whitelisted,
                bypass,
            };
            if user_device {
                Ok(devices.edit_user_device(id, &update).await)
            } else {
                Ok(devices.edit_device(id, &update).await)
            }
        }
        DeviceCommand::Delete { id } => Ok(devices.delete_device(id).await),
        DeviceCommand::Whitelist(args) => print_opt(devices.fetch_whitelist(&device_query(args)?).await),
        DeviceCommand::UserDevices(args) => {
            print_opt(devices.fetch_user_devices(&device_query(args)?).await)
        }
        DeviceCommand::AssignMarks { assignments } => {
            let assignments = assignments
                .iter()
                .map(|raw| parse_assignment(raw))
                .collect::<Result<BTreeMap<i64, u32>, String>>()
                .map_err(anyhow::Error::msg)?;
            Ok(devices.change_userdevice_marks(&assignments).await)
        }
    }
}

async fn run_marks(cmd: MarkCommand, marks: &MarkStore) -> anyhow::Result<bool> {
    match cmd {
        MarkCommand::List => print_opt(marks.fetch_marks().await),
        MarkCommand::Set { file } => {
            let list: Vec<EditableMark> = read_json(&file).await?;
            print_opt(marks.patch_marks(&list).await)
        }
        MarkCommand::Move { old, new } => Ok(marks.move_mark(old, new).await),
        MarkCommand::Spread { old } => Ok(marks.spread_mark(old).await),
        MarkCommand::Games => {
            let Some(games) = marks.fetch_game_marks().await else {
                return Ok(false);
            };
            if let Some(known) = marks.fetch_marks().await {
                for (game, value) in dangling_game_marks(&games, &known) {
                    warn!("Game {} references unknown mark {}", game, value);
                }
            }
            print_json(&games)?;
            Ok(true)
        }
        MarkCommand::SetGames { file } => {
            let games: GameMarks = read_json(&file).await?;
            Ok(marks.patch_game_marks(&games).await)
        }
    }
}

async fn run_users(cmd: UserCommand, users: &UserStore) -> anyhow::Result<bool> {
    match cmd {
        UserCommand::List(page) => print_opt(users.fetch_users(page_request(page)).await),
        UserCommand::Get { id } => print_opt(users.fetch_user(id).await),
        UserCommand::Edit {
            id,
            role,
            max_devices,
            active,
            tournament,
            team,
        } => {
            let role = role
                .map(|r| r.parse::<UserRole>())
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let patch = UserPatch {
                username: None,
                role,
                is_active: active,
                max_device_nb: max_devices,
                tournament,
                team,
            };
            print_opt(users.edit_user(id, &patch).await)
        }
        UserCommand::Delete { id } => Ok(users.delete_user(id).await),
        UserCommand::Password { id, password } => Ok(users.change_password(id, &password).await),
    }
}

/// Apply the route guard for a command
fn enter(route: &Route, session: &SessionStore) -> bool {
    match guard(route, session) {
        Navigation::Proceed => true,
        Navigation::Redirect(to) => {
            eprintln!("Access to {} refused, go to {}", route, to);
            if to == Route::Login {
                eprintln!("Run `langate-console login <username>` first");
            }
            false
        }
    }
}

fn page_request(args: PageArgs) -> PageRequest {
    PageRequest::new(args.page, args.page_size)
}

fn device_query(args: ListArgs) -> anyhow::Result<DeviceQuery> {
    let order = args
        .order
        .map(|o| o.parse::<DeviceOrder>())
        .transpose()
        .map_err(anyhow::Error::msg)?;
    Ok(DeviceQuery {
        page: page_request(args.page),
        filter: args.filter,
        order,
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a store read; None means the store already reported the failure
fn print_opt<T: Serialize>(value: Option<T>) -> anyhow::Result<bool> {
    match value {
        Some(value) => {
            print_json(&value)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
