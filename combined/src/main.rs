//! Command-line front end - tokens, registration, login, profiles and store
//! checks.

use std::process::ExitCode;

use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth_service_lib::config::AuthServiceConfig;
use auth_service_lib::service::TokenService;
use auth_service_lib::{build_authenticator, AuthService};
use common::{AppError, AppResult, StoreBackend};
use data_service_lib::{DataServiceConfig, DocumentStore, MemoryStore, MongoStore, Persistence};
use domain::{CreateCustomer, UserRole};

#[derive(Parser)]
#[command(name = "loading-bean")]
#[command(about = "The Loading Bean order-management backend")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Document store backend (overrides STORE_BACKEND)
    #[arg(long, global = true)]
    store: Option<StoreBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue or inspect tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Register a customer, or an administrator with --admin
    Register(RegisterArgs),
    /// Log in and print a token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show a stored customer profile
    Profile {
        /// Token of the caller
        #[arg(long)]
        token: String,
        /// Customer to show (defaults to the token's subject)
        #[arg(long)]
        id: Option<String>,
    },
    /// Validate configuration and ping the store
    Check,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a token without touching the store
    Issue {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "Customer")]
        role: UserRole,
        /// Validity window (defaults to JWT_EXPIRATION_MINUTES)
        #[arg(long)]
        minutes: Option<i64>,
    },
    /// Validate a token and print its claims
    Verify { token: String },
}

#[derive(Args)]
struct RegisterArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    address: String,
    /// Register an administrator; requires an admin token
    #[arg(long)]
    admin: bool,
    /// Token of the administrator performing the registration
    #[arg(long)]
    token: Option<String>,
}

impl RegisterArgs {
    fn request(&self) -> CreateCustomer {
        CreateCustomer {
            email: self.email.clone(),
            password: self.password.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.code(), "command failed");
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> AppResult<()> {
    let auth_config = AuthServiceConfig::from_env()?;

    // Token commands never need a store
    let command = match cli.command {
        Commands::Token { action } => return run_token(&auth_config, action),
        other => other,
    };

    let mut data_config = DataServiceConfig::from_env()?;
    if let Some(backend) = cli.store {
        data_config = data_config.with_backend(backend);
    }

    match data_config.database.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store; data is discarded on exit");
            dispatch(command, Persistence::new(MemoryStore::new()), &auth_config).await
        }
        StoreBackend::Mongo => {
            let store = MongoStore::connect(&data_config.database).await?;
            dispatch(command, Persistence::new(store), &auth_config).await
        }
    }
}

fn run_token(config: &AuthServiceConfig, action: TokenAction) -> AppResult<()> {
    let tokens = TokenService::new(&config.jwt)?;

    match action {
        TokenAction::Issue {
            user_id,
            email,
            role,
            minutes,
        } => {
            let response = match minutes {
                Some(minutes) => {
                    let validity = Duration::try_minutes(minutes)
                        .ok_or_else(|| AppError::validation("--minutes is out of range"))?;
                    tokens.issue_token_valid_for(&user_id, &email, role, validity)?
                }
                None => tokens.issue_token(&user_id, &email, role)?,
            };
            print_json(&response)
        }
        TokenAction::Verify { token } => {
            let claims = tokens.validate_token(&token)?;
            print_json(&claims)
        }
    }
}

async fn dispatch<S: DocumentStore>(
    command: Commands,
    persistence: Persistence<S>,
    auth_config: &AuthServiceConfig,
) -> AppResult<()> {
    match command {
        Commands::Check => {
            info!(jwt = ?auth_config.jwt, "Configuration loaded");
            persistence.ping().await?;
            println!("ok");
            Ok(())
        }
        Commands::Register(args) => {
            let auth = build_authenticator(auth_config, persistence).await?;
            let response = match (&args.token, args.admin) {
                (Some(token), true) => {
                    let caller = auth.verify_token(token)?;
                    auth.register_admin(&caller, args.request()).await?
                }
                (None, true) => return Err(AppError::Unauthorized),
                (_, false) => auth.register(args.request()).await?,
            };
            print_json(&response)
        }
        Commands::Login { email, password } => {
            let auth = build_authenticator(auth_config, persistence).await?;
            let response = auth.login(&email, &password).await?;
            print_json(&response)
        }
        Commands::Profile { token, id } => {
            let auth = build_authenticator(auth_config, persistence).await?;
            let caller = auth.verify_token(&token)?;
            let customer_id = id.unwrap_or_else(|| caller.sub.clone());
            let profile = auth.profile(&caller, &customer_id).await?;
            print_json(&profile)
        }
        Commands::Token { .. } => Err(AppError::internal("token commands run without a store")),
    }
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::internal(format!("JSON encoding failed: {}", e)))?;
    println!("{}", json);
    Ok(())
}
