use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pubsync::{
   Result,
   cmd::{self, settings::SettingsUpdate},
   config,
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the pubsync application
#[derive(Parser)]
#[command(name = "pubsync")]
#[command(about = "Sync published articles into a hosted search index")]
#[command(version)]
struct Cli {
   #[arg(long, env = "PUBSYNC_CONFIG", help = "Extra TOML config layered over the global one")]
   config: Option<PathBuf>,

   #[command(subcommand)]
   command: Cmd,
}

/// Available subcommands for pubsync
#[derive(Subcommand)]
enum Cmd {
   #[command(about = "Clear the index and re-index every published article")]
   Rebuild {
      #[arg(long, help = "Only rebuild this journal")]
      journal: Option<u64>,

      #[arg(short = 'n', long, help = "Show what would be indexed without changing anything")]
      dry_run: bool,
   },

   #[command(about = "Push pending changes to the index")]
   Push {
      #[arg(short = 'b', long, help = "Maximum publications to push (default: max_batch_size)")]
      batch_size: Option<usize>,

      #[arg(long, help = "Only push this journal, replacing its entries")]
      journal: Option<u64>,
   },

   #[command(about = "Flag a publication for the next push")]
   Mark {
      #[arg(help = "Publication id")]
      publication: u64,
   },

   #[command(about = "Remove a submission's published versions from the index")]
   Delete {
      #[arg(help = "Submission id")]
      submission: u64,
   },

   #[command(about = "Show configuration and pending changes")]
   Status {
      #[arg(long, help = "JSON output")]
      json: bool,
   },

   #[command(about = "Show or update search service credentials")]
   Settings {
      #[arg(long)]
      app_id: Option<String>,

      #[arg(long)]
      admin_key: Option<String>,

      #[arg(long)]
      search_only_key: Option<String>,

      #[arg(long)]
      index: Option<String>,
   },

   #[command(about = "List indexes visible to the configured credentials")]
   Indexes,
}

#[tokio::main]
async fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
      .init();

   let cli = Cli::parse();
   if let Err(err) = run(cli).await {
      eprintln!("{err}");
      std::process::exit(err.exit_code());
   }
}

async fn run(cli: Cli) -> Result<()> {
   config::init_with_file(cli.config.as_deref());

   match cli.command {
      Cmd::Rebuild { journal, dry_run } => cmd::rebuild::execute(journal, dry_run).await,
      Cmd::Push { batch_size, journal } => cmd::push::execute(batch_size, journal).await,
      Cmd::Mark { publication } => cmd::mark::execute(publication),
      Cmd::Delete { submission } => cmd::delete::execute(submission).await,
      Cmd::Status { json } => cmd::status::execute(json),
      Cmd::Settings { app_id, admin_key, search_only_key, index } => {
         cmd::settings::execute(SettingsUpdate { app_id, admin_key, search_only_key, index })
      },
      Cmd::Indexes => cmd::indexes::execute().await,
   }
}
