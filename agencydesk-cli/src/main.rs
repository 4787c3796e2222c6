//! AgencyDesk CLI - sign in to the agency backend and browse records
//!
//! Sessions are persisted in the configured data directory, so a login here
//! survives across invocations the same way it survives a page reload.

use agencydesk_api::resources::{
    Client, Contract, Employee, MarketingDocument, Meeting, Quotation, Task,
};
use agencydesk_api::{
    class_config, create_http_client, Authenticator, Credentials, HttpAuthApi, ListQuery,
    Resource, ResourceClient, VerifyOutcome,
};
use agencydesk_auth::{
    AuthContext, Authorize, ComponentGate, FileKeyValueStore, GuardRequirement, GuardRoutes,
    GuardView, MatchMode, Navigator, RouteGuard, UserClass,
};
use agencydesk_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, AgencyConfig,
    LoggingConfig,
};
use agencydesk_table::{Column, ListTable, RowAction, TableRow};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "agencydesk")]
#[command(about = "Agency dashboard client: sessions, access checks and record lists")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        /// User class: staff (employee) or admin
        #[arg(long, default_value = "admin")]
        class: UserClass,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Drop the stored session
    Logout {
        #[arg(long, default_value = "admin")]
        class: UserClass,
    },

    /// Show the signed-in user
    Whoami {
        #[arg(long, default_value = "admin")]
        class: UserClass,

        /// Print the user profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate an access requirement against the stored session
    Check {
        #[arg(long, default_value = "admin")]
        class: UserClass,

        /// Acceptable role (repeatable; any one is enough)
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Required permission (repeatable)
        #[arg(long = "permission")]
        permissions: Vec<String>,

        /// Require every permission instead of any
        #[arg(long)]
        all: bool,

        /// Redirect target for role/permission failures
        #[arg(long)]
        redirect_to: Option<String>,
    },

    /// List records of a resource
    List {
        resource: ResourceKind,

        #[arg(long, default_value = "admin")]
        class: UserClass,

        /// Case-insensitive search over every field
        #[arg(short, long)]
        search: Option<String>,

        /// Page to show (1-based)
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Rows per page (defaults to table.page_size)
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResourceKind {
    Clients,
    Contracts,
    Quotations,
    Employees,
    Tasks,
    Meetings,
    MarketingDocuments,
}

/// Prints redirects instead of navigating
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect(&self, target: &str) {
        println!("→ redirect to {}", target);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging_config = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    init_logging(&logging_config).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting AgencyDesk CLI v{}", env!("CARGO_PKG_VERSION"));

    if let Commands::Config {
        show,
        init,
        validate,
    } = cli.command
    {
        return handle_config(cli.config.as_ref(), show, init, validate);
    }

    let config = load_config(cli.config.as_ref())?;
    config.validate()?;

    let context = open_context(&config)?;
    let api = Arc::new(HttpAuthApi::from_config(&config)?);
    let authenticator =
        Authenticator::new(api, context).with_demo_login(config.auth.demo_login.clone());

    if config.auth.verify_on_restore && !matches!(cli.command, Commands::Login { .. }) {
        verify_sessions(&authenticator).await;
    }

    match cli.command {
        Commands::Login {
            class,
            email,
            password,
        } => handle_login(&authenticator, class, email, password).await,
        Commands::Logout { class } => handle_logout(&authenticator, class).await,
        Commands::Whoami { class, json } => handle_whoami(&authenticator, class, json),
        Commands::Check {
            class,
            roles,
            permissions,
            all,
            redirect_to,
        } => handle_check(&authenticator, &config, class, roles, permissions, all, redirect_to),
        Commands::List {
            resource,
            class,
            search,
            page,
            page_size,
        } => {
            let page_size = page_size.unwrap_or(config.table.page_size);
            let view = ListView {
                search: search.unwrap_or_default(),
                page,
                page_size,
            };
            let client = resource_client(&authenticator, &config, class)?;
            match resource {
                ResourceKind::Clients => list_resource::<Client>(&client, &view).await,
                ResourceKind::Contracts => list_resource::<Contract>(&client, &view).await,
                ResourceKind::Quotations => list_resource::<Quotation>(&client, &view).await,
                ResourceKind::Employees => list_resource::<Employee>(&client, &view).await,
                ResourceKind::Tasks => list_resource::<Task>(&client, &view).await,
                ResourceKind::Meetings => list_resource::<Meeting>(&client, &view).await,
                ResourceKind::MarketingDocuments => {
                    list_resource::<MarketingDocument>(&client, &view).await
                }
            }
        }
        Commands::Config { .. } => Ok(()),
    }
}

fn load_config(config_path: Option<&PathBuf>) -> Result<AgencyConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return Ok(AgencyConfig::from_file(path)?);
    }

    let default_paths = [
        dirs::config_dir().map(|d| d.join("agencydesk").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".agencydesk").join("config.toml")),
        Some(PathBuf::from("agencydesk.toml")),
    ];

    for path in default_paths.iter().flatten() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return Ok(AgencyConfig::from_file(path)?);
        }
    }

    info!("No configuration file found, using defaults");
    Ok(AgencyConfig::default())
}

fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
        .map(|d| d.join("agencydesk").join("config.toml"))
        .ok_or_else(|| anyhow!("Could not determine a configuration directory"))
}

fn open_context(config: &AgencyConfig) -> Result<AuthContext> {
    let data_dir = config
        .storage
        .resolved_data_dir(dirs::home_dir().as_deref());
    let storage = FileKeyValueStore::new(&data_dir)
        .with_context(|| format!("Failed to open session storage in {}", data_dir.display()))?;

    let context = AuthContext::new(Arc::new(storage));
    for (class, outcome) in context.restore_all() {
        debug!(class = %class, ?outcome, "Session restore");
    }
    Ok(context)
}

async fn verify_sessions(authenticator: &Authenticator) {
    for class in UserClass::ALL {
        match authenticator.verify(class).await {
            Ok(VerifyOutcome::Rejected) => {
                println!("Stored {} session has expired; please sign in again.", class)
            }
            Ok(outcome) => debug!(class = %class, ?outcome, "Session verification"),
            Err(e) => warn!(class = %class, error = %e, "Session verification failed"),
        }
    }
}

async fn handle_login(
    authenticator: &Authenticator,
    class: UserClass,
    email: String,
    password: String,
) -> Result<()> {
    log_operation_start!("login", class = %class);

    match authenticator
        .login(class, Credentials::new(email, password))
        .await
    {
        Ok(session) => {
            log_operation_success!("login", class = %class);
            println!(
                "Signed in as {} ({})",
                session.user.display_string(),
                class
            );
            Ok(())
        }
        Err(e) => {
            log_operation_error!("login", e, class = %class);
            bail!("{} ({})", e.user_message(), e)
        }
    }
}

async fn handle_logout(authenticator: &Authenticator, class: UserClass) -> Result<()> {
    let was_signed_in = authenticator.context().store(class).is_authenticated();
    let notification = authenticator.logout(class)?;

    if let Some(handle) = notification {
        if tokio::time::timeout(Duration::from_secs(3), handle)
            .await
            .is_err()
        {
            warn!(class = %class, "Backend did not acknowledge logout in time");
        }
    }

    if was_signed_in {
        println!("Signed out of {}", class);
    } else {
        println!("No {} session was stored", class);
    }
    Ok(())
}

fn handle_whoami(authenticator: &Authenticator, class: UserClass, json: bool) -> Result<()> {
    let snapshot = authenticator.context().store(class).snapshot();
    let Some(session) = snapshot.session() else {
        println!("Not signed in as {}", class);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&session.user)?);
        return Ok(());
    }

    let join = |items: Vec<&str>| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };

    println!("{} ({})", session.user.display_string(), class);
    println!(
        "  roles:       {}",
        join(session.role_set().iter().map(|r| r.as_str()).collect())
    );
    println!(
        "  permissions: {}",
        join(session.permission_set().iter().map(|p| p.as_str()).collect())
    );
    Ok(())
}

fn handle_check(
    authenticator: &Authenticator,
    config: &AgencyConfig,
    class: UserClass,
    roles: Vec<String>,
    permissions: Vec<String>,
    all: bool,
    redirect_to: Option<String>,
) -> Result<()> {
    let mut requirement = GuardRequirement::new()
        .roles(roles)
        .permissions(permissions)
        .match_mode(if all { MatchMode::All } else { MatchMode::Any });
    if let Some(target) = redirect_to {
        requirement = requirement.redirect_to(target);
    }

    let routes = GuardRoutes::new(
        class_config(&config.auth, class).login_route.clone(),
        config.auth.forbidden_route.clone(),
    );
    let mut guard = RouteGuard::new(requirement, routes, TerminalNavigator);

    let view = guard.evaluate(&authenticator.context().store(class).snapshot());
    match view {
        GuardView::Children => println!("authorized"),
        GuardView::Fallback => println!("denied: {:?}", guard.last_decision()),
        GuardView::Placeholder => println!("loading"),
    }
    Ok(())
}

fn resource_client(
    authenticator: &Authenticator,
    config: &AgencyConfig,
    class: UserClass,
) -> Result<ResourceClient> {
    let store = authenticator.context().store(class);
    if !store.is_authenticated() {
        bail!(
            "Not signed in as {}; run `agencydesk login --class {}` first",
            class,
            class
        );
    }

    Ok(ResourceClient::new(
        create_http_client(&config.api)?,
        config.api.base_url.clone(),
        store.clone(),
        class_config(&config.auth, class).login_route.clone(),
    ))
}

struct ListView {
    search: String,
    page: usize,
    page_size: usize,
}

async fn list_resource<T: Resource>(client: &ResourceClient, view: &ListView) -> Result<()> {
    log_operation_start!("list", resource = T::NAME);

    let page = client
        .list::<T>(&ListQuery::default().per_page(100))
        .await
        .map_err(|e| {
            log_operation_error!("list", e, resource = T::NAME);
            e
        })
        .with_context(|| format!("Failed to list {}", T::NAME))?;

    if let Some(meta) = page.meta {
        if meta.last_page > 1 {
            println!(
                "Showing the first {} of {} {} from the server",
                page.items.len(),
                meta.total,
                T::NAME
            );
        }
    }

    let snapshot = client.store().snapshot();
    let manage = ComponentGate::permissions(
        [format!("edit_{}", T::NAME), format!("delete_{}", T::NAME)],
        MatchMode::Any,
    );

    let actions = manage
        .render_or_nothing(&snapshot, || {
            vec![
                RowAction::new("Edit", |row: &T| debug!(id = %row.row_id(), "edit requested")),
                RowAction::new("Delete", |row: &T| {
                    debug!(id = %row.row_id(), "delete requested")
                }),
            ]
        })
        .unwrap_or_default();

    let mut columns = T::columns();
    if !actions.is_empty() {
        columns.push(Column::actions("Actions"));
    }

    let mut table = ListTable::new(page.items, columns).with_page_size(view.page_size);
    for action in actions {
        table = table.with_action(action);
    }
    table.set_query(view.search.clone());
    table.set_page(view.page);

    println!("{}", table.render());
    log_operation_success!("list", resource = T::NAME, rows = table.filtered().len());
    Ok(())
}

fn handle_config(
    config_path: Option<&PathBuf>,
    show: bool,
    init: bool,
    validate: bool,
) -> Result<()> {
    if init {
        let path = match config_path {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        if path.exists() {
            bail!("Configuration already exists at {:?}", path);
        }
        AgencyConfig::default().save_to_file(&path)?;
        println!("Configuration initialized at: {:?}", path);
    }

    if show {
        let config = load_config(config_path)?;
        println!("{}", toml::to_string_pretty(&config)?);
    }

    if validate {
        let config = load_config(config_path)?;
        match config.validate() {
            Ok(()) => println!("Configuration is valid"),
            Err(e) => {
                println!("Configuration validation failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
