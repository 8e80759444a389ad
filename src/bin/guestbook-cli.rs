use clap::{Parser, Subcommand};
use guestbook_sdk::{GuestbookClient, SdkError};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "guestbook-cli")]
#[command(about = "Command-line client for the Stacks Guestbook service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Service status and node health
    Status,
    /// List messages, newest first
    Messages {
        /// Re-read the chain before listing
        #[arg(long)]
        refresh: bool,
    },
    /// Post a message
    Post { content: String },
    /// Like a message
    Like { id: u64 },
    /// Show tips for a message
    Tips { id: u64 },
    /// Tip the author of a message (amount in micro-STX)
    Tip { id: u64, amount: u64 },
    /// Pending transactions
    Pending {
        /// Poll the node for status first
        #[arg(long)]
        check: bool,
    },
    /// Wallet session
    Session {
        #[command(subcommand)]
        action: Option<SessionAction>,
    },
    /// Account balance and tip totals
    Account { address: String },
    /// Recent transactions of an account
    Transactions {
        address: String,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Recent guestbook contract events
    Events {
        #[arg(short, long)]
        limit: Option<u32>,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Connect the wallet
    Connect,
    /// Sign out
    Disconnect,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = GuestbookClient::new(&cli.url);

    let result = match cli.command {
        Commands::Status => print(client.status().await),
        Commands::Messages { refresh } => print(client.messages(refresh).await),
        Commands::Post { content } => print(client.post_message(&content).await),
        Commands::Like { id } => print(client.like_message(id).await),
        Commands::Tips { id } => print(client.tips(id).await),
        Commands::Tip { id, amount } => print(client.send_tip(id, amount).await),
        Commands::Pending { check } => print(client.pending(check).await),
        Commands::Session { action } => match action {
            None => print(client.session().await),
            Some(SessionAction::Connect) => print(client.connect().await),
            Some(SessionAction::Disconnect) => print(client.disconnect().await),
        },
        Commands::Account { address } => print(client.account(&address).await),
        Commands::Transactions { address, limit } => {
            print(client.account_transactions(&address, limit).await)
        }
        Commands::Events { limit } => print(client.events(limit).await),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn print<T: Serialize>(result: Result<T, SdkError>) -> Result<(), Box<dyn std::error::Error>> {
    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
