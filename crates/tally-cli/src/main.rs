//! `tally` — command-line client for the tally scan-state server.
//!
//! # Usage
//!
//! ```
//! tally summary
//! tally progress
//! tally scan GMT-0042 IN_PROGRESS --source line-3 --wo WO-118
//! ```

mod client;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, StageList};
use serde_json::json;
use tally_core::stage::Stage;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tally", about = "Command-line client for the tally server")]
struct Args {
  /// Base URL of the tally server.
  #[arg(long, env = "TALLY_URL", default_value = "http://localhost:4000")]
  url: String,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Per-stage garment counts.
  Summary,
  /// List garments waiting to start.
  Waiting,
  /// List garments in progress.
  Progress,
  /// List finished garments.
  Done,
  /// Submit a scan event.
  Scan {
    tag_id: String,
    /// WAITING, IN_PROGRESS, or DONE.
    stage:  String,
    /// Reader or location identifier.
    #[arg(long)]
    source: Option<String>,
    /// Work order number, sent inline so the server skips the lookup.
    #[arg(long)]
    wo:     Option<String>,
    #[arg(long)]
    style:  Option<String>,
    #[arg(long)]
    buyer:  Option<String>,
    #[arg(long)]
    item:   Option<String>,
    #[arg(long)]
    color:  Option<String>,
    #[arg(long)]
    size:   Option<String>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let client = ApiClient::new(args.url)?;

  match args.command {
    Command::Summary => {
      let summary = client.summary().await?;
      println!("waiting:  {}", summary.waiting);
      println!("progress: {}", summary.progress);
      println!("done:     {}", summary.done);
      if summary.stale {
        println!("(stale: storage outage in effect)");
      }
    }

    Command::Waiting => print_stage(client.stage_list("waiting").await?),
    Command::Progress => print_stage(client.stage_list("progress").await?),
    Command::Done => print_stage(client.stage_list("done").await?),

    Command::Scan {
      tag_id,
      stage,
      source,
      wo,
      style,
      buyer,
      item,
      color,
      size,
    } => {
      let stage = Stage::parse(&stage.to_uppercase())
        .context("stage must be WAITING, IN_PROGRESS, or DONE")?;

      let has_attrs = [&wo, &style, &buyer, &item, &color, &size]
        .iter()
        .any(|o| o.is_some());
      let attributes = has_attrs.then(|| {
        json!({
          "wo": wo, "style": style, "buyer": buyer,
          "item": item, "color": color, "size": size,
        })
      });

      let report = client
        .scan(json!({
          "tag_id": tag_id,
          "stage": stage,
          "source": source,
          "attributes": attributes,
        }))
        .await?;
      println!("{}", serde_json::to_string_pretty(&report)?);
    }
  }

  Ok(())
}

fn print_stage(list: StageList) {
  for item in &list.data {
    println!(
      "{:<16} {:<10} {:<10} {:<8} {}",
      item.tag_id,
      item.wo.as_deref().unwrap_or("-"),
      item.style.as_deref().unwrap_or("-"),
      item.color.as_deref().unwrap_or("-"),
      item.stage_entered_at.format("%Y-%m-%d %H:%M:%S"),
    );
  }
  println!("total: {}", list.count);
  if list.stale {
    println!("(stale: storage outage in effect)");
  }
}
