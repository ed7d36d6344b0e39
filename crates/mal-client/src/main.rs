//! MAL client CLI application.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use mal_client::{
    AnimeEntry, Authenticator, AuthorizeSettings, ChromeLauncher, ClientSettings,
    CredentialOverrides, Fields, MalClient, TokenEndpoint,
};
use serde::Serialize;
use shared::Config;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in through the browser and save the issued tokens
    Login(LoginArgs),

    /// Refresh the saved tokens
    Refresh,

    #[command(flatten)]
    Query(QueryCommand),
}

/// Commands that read from the API with the saved tokens
#[derive(Subcommand, Debug)]
enum QueryCommand {
    /// Search anime by title
    Search {
        query: String,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show details for one anime
    Details {
        id: u64,
        #[arg(long)]
        fields: Vec<String>,
    },

    /// Show a user's anime list
    List {
        user: String,
        /// watching, completed, on_hold, dropped or plan_to_watch
        #[arg(long)]
        status: Option<String>,
        /// list_score, list_updated_at, anime_title or anime_start_date
        #[arg(long, default_value = "list_score")]
        sort: String,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show anime suggested for the logged-in user
    Suggestions {
        #[arg(long)]
        sort: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Collect every anime related to the given one
    Related {
        id: u64,
        #[arg(long)]
        fields: Vec<String>,
    },
}

#[derive(ClapArgs, Debug)]
struct LoginArgs {
    /// Overrides CLIENT_ID
    #[arg(long)]
    client_id: Option<String>,
    /// Overrides CLIENT_SECRET
    #[arg(long)]
    client_secret: Option<String>,
    /// Overrides MAL_USERNAME
    #[arg(long)]
    username: Option<String>,
    /// Overrides MAL_PASSWORD
    #[arg(long)]
    password: Option<String>,
    /// Overrides MAL_REDIRECT_URI and the configured redirect URI
    #[arg(long)]
    redirect_uri: Option<String>,
    /// Run the browser without a window
    #[arg(long)]
    headless: bool,
}

#[derive(ClapArgs, Debug)]
struct PageArgs {
    /// Fields to request, repeat or comma-separate
    #[arg(long)]
    fields: Vec<String>,
    #[arg(long, default_value_t = 10)]
    limit: u32,
    #[arg(long, default_value_t = 0)]
    offset: u32,
}

fn fields_arg(fields: Vec<String>) -> Option<Fields> {
    if fields.is_empty() {
        None
    } else {
        Some(Fields::from(fields))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn token_endpoint(config: &Config, settings: &ClientSettings) -> Result<TokenEndpoint> {
    let http = settings
        .http_client()
        .context("Failed to build HTTP client")?;
    Ok(TokenEndpoint::new(http, config.oauth.token_url.clone()))
}

async fn login(config: &Config, settings: &ClientSettings, args: LoginArgs) -> Result<()> {
    let launcher = ChromeLauncher::new(
        config.browser.webdriver_url.clone(),
        args.headless || config.browser.headless,
    );
    let overrides = CredentialOverrides {
        client_id: args.client_id,
        client_secret: args.client_secret,
        username: args.username,
        password: args.password,
        redirect_uri: args.redirect_uri.or_else(|| config.oauth.redirect_uri.clone()),
    };
    let authorize = AuthorizeSettings::from_config(&config.oauth, &config.browser);

    let authenticator = Authenticator::from_credentials(
        overrides,
        &authorize,
        &launcher,
        token_endpoint(config, settings)?,
    )
    .await
    .context("Login failed")?;

    let path = config.tokens_path();
    authenticator
        .save_tokens(&path)
        .with_context(|| format!("Failed to save tokens to {}", path.display()))?;
    info!(path = %path.display(), "Login complete, tokens saved");
    Ok(())
}

async fn refresh(config: &Config, settings: &ClientSettings) -> Result<()> {
    let path = config.tokens_path();
    let mut authenticator =
        Authenticator::from_tokens_file(&path, token_endpoint(config, settings)?)
            .with_context(|| format!("Failed to load tokens from {}", path.display()))?;

    authenticator
        .refresh_tokens()
        .await
        .context("Token refresh failed")?;
    authenticator
        .save_tokens(&path)
        .with_context(|| format!("Failed to save tokens to {}", path.display()))?;
    info!(path = %path.display(), "Tokens refreshed and saved");
    Ok(())
}

async fn run_query(config: &Config, settings: &ClientSettings, command: QueryCommand) -> Result<()> {
    let tokens_path = config.tokens_path();
    let client = MalClient::with_fallback(
        settings,
        None,
        Some(&tokens_path),
        token_endpoint(config, settings)?,
    )
    .context("Failed to create MAL client")?;

    match command {
        QueryCommand::Search { query, page } => {
            let fields = fields_arg(page.fields);
            let entries = client
                .find_anime(&query, fields.as_ref(), page.limit, page.offset)
                .await
                .with_context(|| format!("Search for \"{}\" failed", query))?;
            print_json(&entries)
        }
        QueryCommand::Details { id, fields } => {
            let fields = fields_arg(fields);
            let entry = client
                .get_anime_details(id, fields.as_ref(), 1, 0)
                .await
                .with_context(|| format!("Failed to fetch anime {}", id))?;
            print_json(&entry)
        }
        QueryCommand::List {
            user,
            status,
            sort,
            page,
        } => {
            let fields = fields_arg(page.fields);
            let list = client
                .get_user_anime_list(
                    &user,
                    status.as_deref(),
                    fields.as_ref(),
                    Some(sort.as_str()),
                    page.limit,
                    page.offset,
                )
                .await
                .with_context(|| format!("Failed to fetch anime list of {}", user))?;
            print_json(&list)
        }
        QueryCommand::Suggestions { sort, page } => {
            let fields = fields_arg(page.fields);
            let suggestions = client
                .get_suggested_anime(fields.as_ref(), sort.as_deref(), page.limit, page.offset)
                .await
                .context("Failed to fetch suggestions")?;
            print_json(&suggestions)
        }
        QueryCommand::Related { id, fields } => {
            let fields = fields_arg(fields);
            let root = AnimeEntry::from_id(id);
            let related = client
                .get_all_related_anime(&root, fields.as_ref())
                .await
                .with_context(|| format!("Failed to collect anime related to {}", id))?;
            print_json(&related)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Credentials may live in .env
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config.log_level()
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "mal-client".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!(config_file = %args.config.display(), "MAL client starting");

    let settings = ClientSettings::from_config(&config.api);

    match args.command {
        Command::Login(login_args) => login(&config, &settings, login_args).await,
        Command::Refresh => refresh(&config, &settings).await,
        Command::Query(command) => run_query(&config, &settings, command).await,
    }
}
