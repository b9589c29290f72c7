use anyhow::Result;
use clap::{Parser, Subcommand};
use postboard_backend::accounts::{create_account, AccountInput};
use postboard_backend::auth::Role;
use postboard_backend::config::PostboardConfig;
use postboard_backend::{api, bootstrap, telemetry, utils};

#[derive(Parser)]
#[command(author, version, about = "Postboard content-sharing backend")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
    /// Create an ADMIN account, e.g. to manage categories on a fresh install
    CreateAdmin {
        #[arg(long)]
        login: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::print_banner();
    telemetry::init_tracing();

    let args = Args::parse();
    let config = PostboardConfig::from_env()?;
    let resources = bootstrap::initialize(&config)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => api::serve_http(config, resources.database).await,
        Command::CreateAdmin {
            login,
            email,
            full_name,
            password,
        } => {
            let user = create_account(
                &resources.database,
                AccountInput {
                    login,
                    email,
                    full_name,
                    password_confirmation: password.clone(),
                    password,
                },
                Role::Admin,
            )?;
            println!("created admin {} (id {})", user.login, user.id);
            Ok(())
        }
    }
}
