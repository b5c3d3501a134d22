mod args;

use std::sync::Arc;

pub use args::{Args, Commands, CreateUserArgs, TopupArgs};
use clap::Parser;
use common::{Database, Ledger, Topup, User};

/// Runs the CLI command parser and executes the selected command.
/// Returns true if a CLI command was handled, false otherwise.
pub async fn run_cli() -> bool {
    let args = Args::parse();
    match &args.command {
        Some(Commands::CreateSuperuser(user_args)) => {
            if let Err(e) = create_user(
                &user_args.email,
                &user_args.full_name,
                &user_args.password,
                true,
            )
            .await
            {
                eprintln!("Failed to create superuser: {e}");
            }
            true
        }
        Some(Commands::CreateUser(user_args)) => {
            if let Err(e) = create_user(
                &user_args.email,
                &user_args.full_name,
                &user_args.password,
                false,
            )
            .await
            {
                eprintln!("Failed to create user: {e}");
            }
            true
        }
        Some(Commands::Topup(topup_args)) => {
            match topup_wallet(&topup_args.email, topup_args.amount).await {
                Ok(new_balance) => println!(
                    "Wallet for '{}' credited. New balance: {} kobo.",
                    topup_args.email, new_balance
                ),
                Err(e) => eprintln!("Failed to credit wallet: {e}"),
            }
            true
        }
        None => {
            println!("No CLI command provided. Use --help to see available commands.");
            false
        }
    }
}

/// Creates an account: validates input, hashes the password, checks for
/// duplicates, and saves to DB.
async fn create_user(
    email: &str,
    full_name: &str,
    password: &str,
    is_superuser: bool,
) -> anyhow::Result<()> {
    // Validate and hash
    let user = User::new(email, full_name, password, is_superuser)
        .map_err(|e| anyhow::anyhow!("Validation error: {e}"))?;

    let db = connect_db().await?;

    // Check if the email is taken
    if db.get_user_by_email(email).await?.is_some() {
        return Err(anyhow::anyhow!(
            "A user with email '{}' already exists.",
            email
        ));
    }

    db.save_user(&user)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {e}"))?;

    let role = if is_superuser { "Superuser" } else { "User" };
    println!("{role} '{email}' created successfully.");
    Ok(())
}

/// Records a settled topup row and credits the wallet. Returns the new balance.
async fn topup_wallet(email: &str, amount: i64) -> anyhow::Result<i64> {
    if amount <= 0 {
        return Err(anyhow::anyhow!("Amount must be positive."));
    }

    let db = Arc::new(connect_db().await?);
    let user = db
        .get_user_by_email(email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No user with email '{}'.", email))?;

    let topup = Topup::new(user.id, amount, "success", "cli_topup");
    db.insert_topup(&topup)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {e}"))?;

    let ledger = Ledger::new(db);
    ledger
        .credit(user.id, amount)
        .await
        .map_err(|e| anyhow::anyhow!("Ledger error: {e}"))?;

    let balance = ledger
        .balance(user.id)
        .await
        .map_err(|e| anyhow::anyhow!("Ledger error: {e}"))?;
    Ok(balance)
}

/// Helper to open the database from DATABASE_URL.
async fn connect_db() -> anyhow::Result<Database> {
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL not set"))?;
    Database::new(&database_url).await
}
