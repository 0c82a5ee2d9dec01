//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::dispatch::{DEFAULT_BANNER_HOOKS, DEFAULT_SWEEP_HOOK};
use crate::application::safe_mode::DEFAULT_SAFE_MODE_PARAM;
use crate::cache::DEFAULT_TTL_SECS;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "sniphook";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_STORE_PATH: &str = "snippets.json";
pub(crate) const DEFAULT_INTERPRETER: &str = "php";
const DEFAULT_HOST_CONTENT: &str = "<p>Welcome.</p>";

/// Command-line arguments for the sniphook binary.
#[derive(Debug, Parser)]
#[command(name = "sniphook", version, about = "Snippet dispatch host")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SNIPHOOK_CONFIG_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP host.
    Serve(Box<ServeArgs>),
    /// Assemble one page offline and print it to stdout.
    Render(RenderArgs),
    /// Print the dispatch decision of every published snippet.
    Plan(PlanArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverride {
    /// Override the snippet archive path.
    #[arg(long = "store-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub store_path: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub store: StoreOverride,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the active-snippet cache TTL.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Enable or disable the active-snippet cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the interpreter used for code snippets.
    #[arg(long = "executor-interpreter", value_name = "PATH")]
    pub executor_interpreter: Option<PathBuf>,

    /// Override the admin token that grants privileged access.
    #[arg(long = "admin-token", env = "SNIPHOOK_ADMIN_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub store: StoreOverride,

    /// Assemble the admin page instead of the public one.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub admin: bool,

    /// Render as if the safe-mode parameter were set.
    #[arg(long = "safe-mode", action = clap::ArgAction::SetTrue)]
    pub safe_mode: bool,

    /// Render for a privileged viewer.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub privileged: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub store: StoreOverride,

    /// Emit JSON instead of a table.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub cache: CacheSettings,
    pub dispatch: DispatchSettings,
    pub executor: ExecutorSettings,
    pub privilege: PrivilegeSettings,
    pub host: HostSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub sweep_hook: String,
    pub banner_hooks: Vec<String>,
    pub safe_mode_param: String,
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub interpreter: PathBuf,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PrivilegeSettings {
    /// No token means no request is ever privileged.
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HostSettings {
    pub content: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("SNIPHOOK")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("dispatch.banner_hooks")
            .with_list_parse_key("executor.args")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => raw.apply_store_override(&args.store),
        Some(Command::Plan(args)) => raw.apply_store_override(&args.store),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    cache: RawCacheSettings,
    dispatch: RawDispatchSettings,
    executor: RawExecutorSettings,
    privilege: RawPrivilegeSettings,
    host: RawHostSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        self.apply_store_override(&overrides.store);

        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(interpreter) = overrides.executor_interpreter.as_ref() {
            self.executor.interpreter = Some(interpreter.clone());
        }
        if let Some(token) = overrides.admin_token.as_ref() {
            self.privilege.admin_token = Some(token.clone());
        }
    }

    fn apply_store_override(&mut self, overrides: &StoreOverride) {
        if let Some(path) = overrides.store_path.as_ref() {
            self.store.path = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            store,
            cache,
            dispatch,
            executor,
            privilege,
            host,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            store: StoreSettings {
                path: store
                    .path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
            },
            cache: build_cache_settings(cache),
            dispatch: build_dispatch_settings(dispatch)?,
            executor: build_executor_settings(executor)?,
            privilege: PrivilegeSettings {
                admin_token: non_blank(privilege.admin_token),
            },
            host: HostSettings {
                content: host
                    .content
                    .unwrap_or_else(|| DEFAULT_HOST_CONTENT.to_string()),
            },
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        ttl: Duration::from_secs(cache.ttl_seconds.unwrap_or(DEFAULT_TTL_SECS)),
    }
}

fn build_dispatch_settings(dispatch: RawDispatchSettings) -> Result<DispatchSettings, LoadError> {
    let sweep_hook = dispatch
        .sweep_hook
        .unwrap_or_else(|| DEFAULT_SWEEP_HOOK.to_string());
    if sweep_hook.trim().is_empty() {
        return Err(LoadError::invalid(
            "dispatch.sweep_hook",
            "hook name must not be empty",
        ));
    }

    let banner_hooks = dispatch
        .banner_hooks
        .unwrap_or_else(|| DEFAULT_BANNER_HOOKS.iter().map(|h| h.to_string()).collect());
    if banner_hooks.iter().any(|hook| hook.trim().is_empty()) {
        return Err(LoadError::invalid(
            "dispatch.banner_hooks",
            "hook names must not be empty",
        ));
    }

    let safe_mode_param = dispatch
        .safe_mode_param
        .unwrap_or_else(|| DEFAULT_SAFE_MODE_PARAM.to_string());
    if safe_mode_param.trim().is_empty() {
        return Err(LoadError::invalid(
            "dispatch.safe_mode_param",
            "parameter name must not be empty",
        ));
    }

    Ok(DispatchSettings {
        sweep_hook,
        banner_hooks,
        safe_mode_param,
    })
}

fn build_executor_settings(executor: RawExecutorSettings) -> Result<ExecutorSettings, LoadError> {
    let interpreter = executor
        .interpreter
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INTERPRETER));
    if interpreter.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "executor.interpreter",
            "interpreter path must not be empty",
        ));
    }

    Ok(ExecutorSettings {
        interpreter,
        args: executor.args.unwrap_or_default(),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDispatchSettings {
    sweep_hook: Option<String>,
    banner_hooks: Option<Vec<String>>,
    safe_mode_param: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawExecutorSettings {
    interpreter: Option<PathBuf>,
    args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPrivilegeSettings {
    admin_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHostSettings {
    content: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("failed to parse `{candidate}`: {err}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
