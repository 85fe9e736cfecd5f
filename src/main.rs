mod app;
mod cache;
mod config;
mod db;
mod http;
mod links;
mod logging;
mod theme;
mod worker;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use std::path::PathBuf;

use crate::app::App;
use crate::http::Request;
use crate::worker::sync::SYNC_TAG;
use crate::worker::WorkerMessage;

#[derive(Parser, Debug)]
#[command(name = "linkmaster")]
#[command(about = "Bookmark short links and keep the site usable offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/linkmaster/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Database file (default: $XDG_DATA_HOME/linkmaster/linkmaster.db)
  #[arg(long)]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Shorten a URL and save the result
  Shorten {
    url: String,
    /// Skip the artificial delay
    #[arg(long)]
    no_delay: bool,
  },
  /// Save a link under an existing short URL
  Save { long_url: String, short_url: String },
  /// List saved links, newest first
  Links {
    #[arg(long)]
    json: bool,
  },
  /// Show link totals
  Stats {
    #[arg(long)]
    json: bool,
  },
  /// Show or toggle the theme preference
  Theme {
    #[arg(long)]
    toggle: bool,
  },
  /// Drive the offline cache worker
  #[command(subcommand)]
  Worker(WorkerCommand),
}

#[derive(Subcommand, Debug)]
enum WorkerCommand {
  /// Pre-cache the static manifest
  Install,
  /// Install, then activate and purge old cache generations
  Start,
  /// Send one request through the fetch handler
  Fetch {
    /// Absolute URL or path relative to the worker origin
    url: String,
    #[arg(long, default_value = "GET")]
    method: String,
    /// Accept header to send
    #[arg(long)]
    accept: Option<String>,
  },
  /// Deliver a JSON message, e.g. '{"type":"GET_VERSION"}'
  Message { json: String },
  /// Flush data queued while offline
  Sync {
    #[arg(long, default_value = SYNC_TAG)]
    tag: String,
  },
  /// Refresh every cached manifest asset
  Update,
  /// List cache buckets
  Buckets,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Command::Shorten { no_delay: true, .. } = args.command {
    config.shorten_delay_ms = 0;
  }

  let db_path = match args.db.or_else(|| config.database.clone()) {
    Some(path) => path,
    None => db::default_path()?,
  };
  let _log_guard = logging::init_or_warn(&logging::log_dir(&db_path));

  let mut app = App::new(&config, &db_path)?;
  run(&mut app, args.command).await
}

async fn run(app: &mut App, command: Command) -> Result<()> {
  match command {
    Command::Shorten { url, .. } => {
      let link = app.shorten(&url).await?;
      println!("{}", link.short_url);
    }
    Command::Save {
      long_url,
      short_url,
    } => {
      let link = app.save(&long_url, &short_url)?;
      println!("Saved {} -> {}", link.short_url, link.long_url);
    }
    Command::Links { json } => {
      if json {
        println!("{}", serde_json::to_string_pretty(app.links())?);
      } else {
        for link in app.links() {
          println!(
            "{}  {}  {} ({} clicks, {})",
            link.short_url, link.title, link.long_url, link.clicks, link.created_at
          );
        }
      }
    }
    Command::Stats { json } => {
      let stats = app.stats();
      if json {
        println!("{}", serde_json::to_string(&stats)?);
      } else {
        println!("Links:  {}", stats.total_links);
        println!("Clicks: {}", stats.total_clicks);
      }
    }
    Command::Theme { toggle } => {
      let theme = if toggle {
        app.toggle_theme()?
      } else {
        app.theme()?
      };
      println!("{}", theme);
    }
    Command::Worker(command) => run_worker(app, command).await?,
  }
  Ok(())
}

async fn run_worker(app: &mut App, command: WorkerCommand) -> Result<()> {
  match command {
    WorkerCommand::Install => {
      let worker = app.worker_mut();
      let count = worker.install().await?;
      println!("Cached {} assets in {}", count, worker.cache_name());
    }
    WorkerCommand::Start => {
      let worker = app.worker_mut();
      let deleted = worker.start().await?;
      for name in &deleted {
        println!("Deleted old cache {}", name);
      }
      println!(
        "Worker {} (cache {}, controlling pages: {})",
        worker.state(),
        worker.cache_name(),
        worker.controls_clients()
      );
    }
    WorkerCommand::Fetch {
      url,
      method,
      accept,
    } => {
      let worker = app.worker();
      let mut request = Request::get(worker.resolve(&url)?).with_method(&method);
      if let Some(accept) = accept {
        request = request.with_accept(accept);
      }

      match worker.handle_fetch(&request).await? {
        Some(result) => {
          let response = &result.response;
          eprintln!(
            "{} {} ({}, {}, {})",
            response.status,
            request.url,
            result.source.as_str(),
            response.response_type,
            response.header("content-type").unwrap_or("no content type"),
          );
          std::io::stdout().write_all(&response.body)?;
        }
        None => eprintln!("{} {} bypassed by worker", request.method, request.url),
      }
    }
    WorkerCommand::Message { json } => {
      let message: WorkerMessage =
        serde_json::from_str(&json).map_err(|e| eyre!("Unrecognized message {}: {}", json, e))?;
      if let Some(reply) = app.worker_mut().handle_message(message).await? {
        println!("{}", serde_json::to_string(&reply)?);
      }
    }
    WorkerCommand::Sync { tag } => {
      let synced = app.worker().handle_sync(&tag, app.local_storage()).await;
      println!("Synced {} items", synced);
    }
    WorkerCommand::Update => {
      let updated = app
        .worker()
        .handle_periodic_sync(worker::sync::CONTENT_UPDATE_TAG)
        .await;
      println!("Updated {} assets", updated);
    }
    WorkerCommand::Buckets => {
      for name in app.worker().bucket_names()? {
        println!("{}", name);
      }
    }
  }
  Ok(())
}
