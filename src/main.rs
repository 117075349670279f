mod api;
mod app;
mod cache;
mod campaign;
mod config;
mod event;
mod logging;
mod query;
mod routes;
mod session;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::time::Duration;

use app::{App, PageOptions, PointsAction};
use routes::Page;
use ui::views::users::UserFilter;

#[derive(Parser, Debug)]
#[command(name = "adminctl")]
#[command(about = "Terminal client for the admin dashboard API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/adminctl/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Mirror logs to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Ignore cached data for the page and fetch it again
  #[arg(short, long, global = true)]
  refresh: bool,

  /// Re-fetch the page every SECS seconds until Ctrl-C
  #[arg(short, long, global = true, value_name = "SECS")]
  watch: Option<u64>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Open a page by path or alias, e.g. /users/42
  Open { path: String },
  /// Weekly summary (default)
  Dashboard,
  /// List users
  Users {
    #[arg(short, long, value_enum, default_value_t)]
    filter: UserFilter,
    /// Match name or email, ignoring case
    #[arg(short, long, default_value = "")]
    search: String,
  },
  /// Show one user's profile
  User { id: u64 },
  /// Suspend or unsuspend a user
  Block { id: u64 },
  /// Delete a user
  DeleteUser { id: u64 },
  /// Weekly AI performance
  AiPerformance,
  /// Subscription dashboard
  Subscriptions,
  /// Point adjustments
  SixPoints {
    #[command(subcommand)]
    action: Option<PointsCommand>,
  },
  /// Weekly email campaign
  Email {
    /// Send the campaign now
    #[arg(long, conflicts_with = "auto_send")]
    send: bool,
    /// Switch the Monday 09:00 send on or off
    #[arg(long, value_name = "BOOL")]
    auto_send: Option<bool>,
  },
  /// Sign in as an admin
  Login {
    #[arg(short, long)]
    email: String,
    /// Password (default: $ADMINCTL_PASSWORD)
    #[arg(short, long)]
    password: Option<String>,
  },
  /// Forget the stored session
  Logout,
  /// Show the signed-in admin
  Whoami,
  /// List pages
  Routes,
  /// Manage cached data
  Cache {
    #[command(subcommand)]
    action: CacheCommand,
  },
}

#[derive(Subcommand, Debug)]
enum PointsCommand {
  /// List point adjustments
  List,
  /// Create a point adjustment from a JSON object
  Create {
    #[arg(short, long)]
    data: String,
  },
  /// Update a point adjustment from a JSON object
  Update {
    id: u64,
    #[arg(short, long)]
    data: String,
  },
  /// Delete a point adjustment
  Delete { id: u64 },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
  /// Drop cached lists and reports
  Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log, args.verbose)?;

  let app = App::new(config);
  let mut options = PageOptions {
    refresh: args.refresh,
    watch: args.watch.filter(|s| *s > 0).map(Duration::from_secs),
    ..PageOptions::default()
  };

  let message = match args.command.unwrap_or(Command::Dashboard) {
    Command::Open { path } => return app.open_path(&path, &options).await,
    Command::Dashboard => return app.open(Page::Dashboard, &options).await,
    Command::Users { filter, search } => {
      options.filter = filter;
      options.search = search;
      return app.open(Page::Users, &options).await;
    }
    Command::User { id } => return app.open(Page::UserDetail(id), &options).await,
    Command::AiPerformance => return app.open(Page::AiPerformance, &options).await,
    Command::Subscriptions => return app.open(Page::Subscriptions, &options).await,
    Command::SixPoints { action } => match action {
      None | Some(PointsCommand::List) => return app.open(Page::SixPoints, &options).await,
      Some(PointsCommand::Create { data }) => app.points(PointsAction::Create { data }).await?,
      Some(PointsCommand::Update { id, data }) => {
        app.points(PointsAction::Update { id, data }).await?
      }
      Some(PointsCommand::Delete { id }) => app.points(PointsAction::Delete { id }).await?,
    },
    Command::Email { send: true, .. } => app.send_weekly_email().await?,
    Command::Email {
      send: false,
      auto_send: Some(enabled),
    } => app.set_email_auto_send(enabled)?,
    Command::Email {
      send: false,
      auto_send: None,
    } => return app.open(Page::Email, &options).await,
    Command::Block { id } => app.toggle_block(id).await?,
    Command::DeleteUser { id } => app.delete_user(id).await?,
    Command::Login { email, password } => {
      let password = match password {
        Some(p) => p,
        None => config::Config::get_password()?,
      };
      app.login(&email, &password).await?
    }
    Command::Logout => app.logout(),
    Command::Whoami => app.whoami()?,
    Command::Routes => app.list_routes(),
    Command::Cache {
      action: CacheCommand::Clear,
    } => app.clear_cache(),
  };

  println!("{}", message.trim_end());
  Ok(())
}
