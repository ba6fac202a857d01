//! services/notifier/src/bin/notifier.rs

use notifier_lib::{
    adapters::{LocalSink, RestSyncAdapter},
    client::{ClientState, Connector, Dispatcher, NotificationPanel},
    config::Config,
    error::ClientError,
};
use notification_core::{NotificationCategory, NotificationFilter, SettingsPatch};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
commands:
  list                      show the panel
  filter <all|unread|important|category>
  open <id>                 mark read and show the action link
  click <id>                click a desktop popup
  read <id> | read-all
  delete <id> | clear
  sound on|off | volume <0-1> | desktop on|off
  category <name> on|off
  settings | reconnect | quit";

/// One line typed at the prompt.
enum Command {
    List,
    Filter(NotificationFilter),
    Open(String),
    Click(String),
    Read(String),
    ReadAll,
    Delete(String),
    Clear,
    Settings(SettingsPatch),
    ShowSettings,
    Reconnect,
    Quit,
    Help,
}

fn parse_switch(word: Option<&str>) -> Result<bool, String> {
    match word {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => Err("expected 'on' or 'off'".to_string()),
    }
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Command::List);
    };
    let arg = words.next();
    let id = |arg: Option<&str>| arg.map(str::to_string).ok_or("missing notification id");

    match head {
        "list" | "ls" => Ok(Command::List),
        "filter" => arg
            .unwrap_or("all")
            .parse()
            .map(Command::Filter)
            .map_err(|e| e.to_string()),
        "open" => Ok(Command::Open(id(arg)?)),
        "click" => Ok(Command::Click(id(arg)?)),
        "read" => Ok(Command::Read(id(arg)?)),
        "read-all" => Ok(Command::ReadAll),
        "delete" | "rm" => Ok(Command::Delete(id(arg)?)),
        "clear" => Ok(Command::Clear),
        "sound" => parse_switch(arg).map(|on| Command::Settings(SettingsPatch::sound(on))),
        "desktop" => parse_switch(arg).map(|on| Command::Settings(SettingsPatch::desktop(on))),
        "volume" => arg
            .and_then(|v| v.parse::<f32>().ok())
            .map(|v| Command::Settings(SettingsPatch::volume(v)))
            .ok_or_else(|| "expected a volume between 0 and 1".to_string()),
        "category" => {
            let category = arg
                .unwrap_or_default()
                .parse::<NotificationCategory>()
                .map_err(|e| e.to_string())?;
            let on = parse_switch(words.next())?;
            Ok(Command::Settings(SettingsPatch::category(category, on)))
        }
        "settings" => Ok(Command::ShowSettings),
        "reconnect" => Ok(Command::Reconnect),
        "quit" | "exit" => Ok(Command::Quit),
        "help" | "?" => Ok(Command::Help),
        other => Err(format!("unknown command '{}', try 'help'", other)),
    }
}

/// Runs one command. Returns `false` when the user asked to quit.
async fn run_command(panel: &mut NotificationPanel, connector: &Connector, command: Command) -> bool {
    match command {
        Command::List => {
            panel.open();
            print!("{}", panel.render().await);
        }
        Command::Filter(filter) => {
            panel.set_filter(filter);
            print!("{}", panel.render().await);
        }
        Command::Open(id) => match panel.select(&id).await {
            Some(url) => println!("-> {}", url),
            None => println!("(no link)"),
        },
        Command::Click(id) => {
            let url = panel.handle_desktop_click(&id).await;
            print!("{}", panel.render().await);
            if let Some(url) = url {
                println!("-> {}", url);
            }
        }
        Command::Read(id) => {
            panel.mark_read(&id).await;
        }
        Command::ReadAll => {
            panel.mark_all_read().await;
        }
        Command::Delete(id) => {
            panel.delete(&id).await;
        }
        Command::Clear => {
            panel.clear_all().await;
        }
        Command::Settings(patch) => {
            let settings = panel.update_settings(patch).await;
            println!("{:?}", settings);
        }
        Command::ShowSettings => println!("{:?}", panel.settings().await),
        Command::Reconnect => {
            if !connector.reconnect() {
                println!("(already connected or connecting)");
            }
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => return false,
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Starting notification client...");

    // --- 2. Initialize Adapters ---
    let sink = Arc::new(LocalSink::new(
        config.settings_path.clone(),
        config.desktop_permission,
    ));
    let remote = Arc::new(RestSyncAdapter::new(
        reqwest::Client::new(),
        config.api_base_url.clone(),
        config.auth_token.clone(),
    ));

    // --- 3. Build the Shared State & Connect ---
    let state = Arc::new(ClientState::new(sink, remote));
    let push_url = config.push_url()?;
    info!("Connecting to {}", push_url);
    let connector = Connector::spawn(state.clone(), push_url, config.backlog_limit);
    let dispatcher = Dispatcher::new(state.clone(), connector.link());
    let mut panel = NotificationPanel::new(state.clone(), dispatcher);

    // --- 4. Command Loop ---
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut revision = state.subscribe();
    let mut link = connector.link();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = revision.changed() => {
                if changed.is_err() {
                    break;
                }
                let badge = panel.badge().await.unwrap_or_else(|| "-".to_string());
                println!("[bell {}]", badge);
            }
            Some(status) = link.changed() => info!("Push connection is now {:?}", status),
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(command) => {
                        if !run_command(&mut panel, &connector, command).await {
                            break;
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    // --- 5. Teardown ---
    info!("Shutting down notification client.");
    connector.shutdown().await;
    Ok(())
}
