use anyhow::Context;
use bloom_backend::{
    config::Config, database::store::connect, models::user::UserRole,
    services::email_service::mailer_from_config, AppState,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(name = "bloom-admin")]
#[clap(about = "Administrative tasks for the Bloom Buddies interview backend")]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the first dashboard administrator
    SetupAdmin {
        #[clap(long)]
        email: String,
        #[clap(long, default_value = "Administrator")]
        name: String,
        #[clap(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Set a dashboard user's password without the current one
    ResetPassword {
        #[clap(long)]
        email: String,
        #[clap(long, env = "NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print the signed self-scheduling link for a candidate
    SchedulingLink {
        #[clap(long)]
        candidate_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let args = Args::parse();

    let config = Config::from_env().context("loading configuration")?;
    let stores = connect(&config.store, config.admission_lock_timeout)
        .await
        .context("connecting to the store")?;
    let mailer = mailer_from_config(&config.email)?;
    let state = AppState::new(config, stores, mailer)?;

    match args.command {
        Command::SetupAdmin {
            email,
            name,
            password,
        } => {
            let user = state
                .auth_service
                .create_user(&email, &name, UserRole::Admin, &password)
                .await
                .context("creating admin user")?;
            println!("Created admin {} ({})", user.email, user.id);
        }
        Command::ResetPassword { email, password } => {
            let user = state
                .auth_service
                .set_password(&email, &password)
                .await
                .context("resetting password")?;
            println!("Password updated for {}", user.email);
        }
        Command::SchedulingLink { candidate_id } => {
            let record = state
                .candidate_service
                .get(&candidate_id)
                .await
                .context("loading candidate")?;
            println!("{}", state.scheduling_service.scheduling_link(&record)?);
        }
    }

    Ok(())
}
