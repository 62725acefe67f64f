use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use taskpush::adapters::{FileStore, HttpBackend, TokioTimeProvider};
use taskpush::auth::{self, OAuthRedirect, Provider, Session};
use taskpush::config::{AppConfig, ConfigError, Settings};
use taskpush::PushError;
use taskpush::ports::TimeProvider;
use taskpush::push::sync::BackendSync;
use taskpush::push::worker::render_push;
use taskpush::tasks::TaskBoard;
use taskpush::types::task::{NewTask, Priority, to_utc_due_date};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

pub(crate) enum RunOutcome {
    Exit(i32),
}

pub(crate) async fn run() -> RunOutcome {
    let cli = Cli::parse();
    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    let result = match cli.command {
        Command::DecodeKey { key } => run_decode_key(&config, key),
        Command::Authorize { provider } => run_authorize(&config, provider),
        Command::Login { provider, listen } => run_login(&config, provider, listen).await,
        Command::Redirect { url } => run_redirect(&config, &url),
        Command::Logout { endpoint } => run_logout(&config, endpoint).await,
        Command::Whoami => run_whoami(&config).await,
        Command::Tasks(args) => run_tasks(&config, args.command).await,
        Command::CheckSubscription { endpoint } => run_check_subscription(&config, &endpoint).await,
        Command::RenderPush { payload } => run_render_push(&config, payload.as_deref()),
    };

    match result {
        Ok(code) => RunOutcome::Exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "taskpush",
    version,
    about = "Task tracker client with browser push notifications"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    #[arg(long, global = true, env = "TASKPUSH_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, global = true, env = "TASKPUSH_API_URL")]
    api_url: Option<String>,
    #[arg(long, global = true, env = "TASKPUSH_APP_URL")]
    app_url: Option<String>,
    #[arg(long, global = true, env = "TASKPUSH_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, global = true, env = "TASKPUSH_STORE")]
    store: Option<PathBuf>,
    #[arg(long, global = true)]
    http_timeout: Option<String>,
    #[arg(long, global = true)]
    highlight: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode the VAPID public key into the bytes handed to the push service.
    DecodeKey { key: Option<String> },
    /// Print the URL that starts an OAuth login.
    Authorize { provider: Provider },
    /// Log in through the browser and catch the redirect locally.
    Login {
        provider: Provider,
        #[arg(long, default_value = "127.0.0.1:3000")]
        listen: SocketAddr,
    },
    /// Store the token from an `/oauth2/redirect` URL.
    Redirect { url: String },
    Logout {
        /// Also remove this push endpoint from the backend.
        #[arg(long)]
        endpoint: Option<String>,
    },
    Whoami,
    Tasks(TasksArgs),
    /// Ask the backend whether an endpoint belongs to the signed-in user.
    CheckSubscription {
        #[arg(long)]
        endpoint: String,
    },
    /// Show the notification the worker would display for a push payload.
    RenderPush { payload: Option<String> },
}

#[derive(Args, Debug)]
struct TasksArgs {
    #[command(subcommand)]
    command: Option<TasksCommand>,
}

#[derive(Subcommand, Debug)]
enum TasksCommand {
    List,
    Add {
        title: String,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// RFC 3339 timestamp, stored as UTC.
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        notify: bool,
    },
    Done { id: i64 },
    Delete { id: i64 },
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let file = match cli.config.as_deref() {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    let flags = Settings {
        api_url: cli.api_url.clone(),
        app_url: cli.app_url.clone(),
        vapid_public_key: cli.vapid_public_key.clone(),
        store: cli.store.clone(),
        http_timeout: cli.http_timeout.clone(),
        highlight: cli.highlight.clone(),
        notification_title: None,
        notification_body: None,
    };
    AppConfig::resolve(file.overlay(flags))
}

fn session(config: &AppConfig) -> Session<FileStore> {
    Session::new(Arc::new(FileStore::new(&config.store_path)))
}

fn backend(config: &AppConfig) -> Result<HttpBackend, String> {
    HttpBackend::new(config.api_base_url.clone(), config.http_timeout).map_err(|err| err.to_string())
}

fn run_decode_key(config: &AppConfig, key: Option<String>) -> Result<i32, String> {
    let key = key
        .or_else(|| config.vapid_public_key.clone())
        .ok_or("no key given and no VAPID public key configured")?;
    let bytes = taskpush::decode_server_key(&key).map_err(|err| describe_push_error(&err))?;
    let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
    println!("{} bytes", bytes.len());
    println!("{hex}");
    Ok(0)
}

fn describe_push_error(err: &PushError) -> String {
    format!("{} ({err})", err.user_message())
}

fn run_authorize(config: &AppConfig, provider: Provider) -> Result<i32, String> {
    let url = auth::authorization_url(&config.api_base_url, provider).map_err(|err| err.to_string())?;
    println!("{url}");
    Ok(0)
}

async fn run_login(config: &AppConfig, provider: Provider, listen: SocketAddr) -> Result<i32, String> {
    let url = auth::authorization_url(&config.api_base_url, provider).map_err(|err| err.to_string())?;
    println!("Open this URL in your browser to sign in:");
    println!("{url}");
    let session = session(config);
    auth::redirect::listen_for_redirect(listen, &session)
        .await
        .map_err(|err| err.to_string())?;
    println!("Signed in.");
    Ok(0)
}

fn run_redirect(config: &AppConfig, raw: &str) -> Result<i32, String> {
    let url = Url::parse(raw.trim()).map_err(|err| format!("invalid redirect url: {err}"))?;
    let redirect = auth::parse_oauth_redirect(&url);
    let signed_in = matches!(redirect, OAuthRedirect::Token(_));
    session(config)
        .accept_redirect(redirect)
        .map_err(|err| err.to_string())?;
    if signed_in {
        println!("Signed in.");
    }
    Ok(0)
}

async fn run_logout(config: &AppConfig, endpoint: Option<String>) -> Result<i32, String> {
    let session = session(config);
    if let Some(endpoint) = endpoint
        && let Some(token) = session.token().map_err(|err| err.to_string())?
    {
        let sync = BackendSync::new(backend(config)?);
        if !sync.forget(&endpoint, &token).await {
            eprintln!("warning: backend still lists {endpoint}");
        }
    }
    session.clear().map_err(|err| err.to_string())?;
    println!("Signed out.");
    Ok(0)
}

async fn run_whoami(config: &AppConfig) -> Result<i32, String> {
    let profile = session(config)
        .current_user(&backend(config)?)
        .await
        .map_err(|err| err.to_string())?;
    println!("{}", profile.display_name());
    Ok(0)
}

async fn run_tasks(config: &AppConfig, command: Option<TasksCommand>) -> Result<i32, String> {
    let board = TaskBoard::new(Arc::new(backend(config)?), session(config));
    match command.unwrap_or(TasksCommand::List) {
        TasksCommand::List => {
            board.refresh().await.map_err(|err| err.to_string())?;
            for task in board.tasks() {
                println!("{}", format_task_line(&task));
            }
        }
        TasksCommand::Add {
            title,
            priority,
            due,
            notify,
        } => {
            let mut task = NewTask::titled(title);
            task.priority = priority;
            task.notifications_enabled = notify;
            task.due_date = due.as_deref().map(parse_due).transpose()?;
            let created = board.add(task).await.map_err(|err| err.to_string())?;
            println!("{}", format_task_line(&created));
        }
        TasksCommand::Done { id } => {
            board.refresh().await.map_err(|err| err.to_string())?;
            match board.toggle(id).await.map_err(|err| err.to_string())? {
                Some(task) => println!("{}", format_task_line(&task)),
                None => {
                    eprintln!("error: no task with id {id}");
                    return Ok(1);
                }
            }
        }
        TasksCommand::Delete { id } => {
            board.remove(id).await.map_err(|err| err.to_string())?;
            println!("Deleted task {id}.");
        }
    }
    Ok(0)
}

fn parse_due(raw: &str) -> Result<time::PrimitiveDateTime, String> {
    let at = OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .map_err(|err| format!("invalid due date '{raw}': {err}"))?;
    Ok(to_utc_due_date(at))
}

fn format_task_line(task: &taskpush::types::task::Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let priority = match task.priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    };
    let mut line = format!("[{mark}] {:>4}  {:<6}  {}", task.id, priority, task.title);
    if let Some(due) = task.due_at() {
        line.push_str(&format!("  (due {due})"));
    }
    line
}

async fn run_check_subscription(config: &AppConfig, endpoint: &str) -> Result<i32, String> {
    let token = session(config).require_token().map_err(|err| err.to_string())?;
    let sync = BackendSync::new(backend(config)?);
    if sync.check_ownership(endpoint, &token).await {
        println!("owned");
        Ok(0)
    } else {
        println!("not owned");
        Ok(1)
    }
}

fn run_render_push(config: &AppConfig, payload: Option<&str>) -> Result<i32, String> {
    let now = TokioTimeProvider.now_millis();
    let notification = render_push(payload.map(str::as_bytes), &config.worker_config(), now);
    let rendered = serde_json::to_string_pretty(&notification).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(0)
}
