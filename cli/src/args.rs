use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "VTU Hub CLI - manage accounts and wallet funding")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a superuser (admin) account
    CreateSuperuser(CreateUserArgs),

    /// Create a regular user account
    CreateUser(CreateUserArgs),

    /// Credit a user's wallet and record the topup
    ///
    /// This command settles immediately: the topup row is written as
    /// successful and the wallet balance goes up by the given amount.
    Topup(TopupArgs),
}

#[derive(ClapArgs, Debug)]
pub struct CreateUserArgs {
    /// Email address for the account
    #[arg(short, long, help = "Email address for the account")]
    pub email: String,

    /// Display name for the account
    #[arg(short, long, help = "Display name for the account")]
    pub full_name: String,

    /// Password for the account
    #[arg(short, long, help = "Password for the account")]
    pub password: String,
}

#[derive(ClapArgs, Debug)]
pub struct TopupArgs {
    /// Email of the user whose wallet to credit
    #[arg(short, long, help = "Email of the user whose wallet to credit")]
    pub email: String,

    /// Amount in minor currency units (kobo)
    #[arg(short, long, help = "Amount in minor currency units (kobo)")]
    pub amount: i64,
}
