// ============================================================================
// warden-db — CLI database inspection tool for Gatewarden
// ============================================================================
// Usage:
//   warden-db stats                         Show database statistics
//   warden-db list-members                  List registered members
//   warden-db list-staff                    List staff records
//   warden-db list-guests                   List guest passes
//   warden-db pending                       List outstanding approval requests
//   warden-db log [--limit 10]              Show the access log tail
//   warden-db export --format json          Export full database as JSON
//   warden-db truncate-log                  Clear the access log
// ============================================================================

use std::path::Path;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use warden_core::GateStore;

/// Gatewarden database inspection tool
#[derive(Parser)]
#[command(name = "warden-db", version, about = "Inspect and manage the Gatewarden database")]
struct Cli {
    /// Path to the database file (default: ~/.gatewarden/warden.redb)
    #[arg(long, global = true)]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show database statistics (identity counts, pending, log size)
    Stats,

    /// List registered members
    ListMembers,

    /// List staff records
    ListStaff,

    /// List guest passes
    ListGuests,

    /// List outstanding approval requests
    Pending,

    /// Show the most recent access log entries
    Log {
        /// Number of entries to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Export full database contents as JSON
    Export {
        /// Output format (currently only json is supported)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Clear the access log
    TruncateLog,
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("(invalid: {})", ts))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let store = GateStore::open(cli.db_path.as_deref().map(Path::new))?;

    match cli.command {
        Commands::Stats => cmd_stats(&store),
        Commands::ListMembers => cmd_list_members(&store),
        Commands::ListStaff => cmd_list_staff(&store),
        Commands::ListGuests => cmd_list_guests(&store),
        Commands::Pending => cmd_pending(&store),
        Commands::Log { limit } => cmd_log(&store, limit),
        Commands::Export { format } => cmd_export(&store, &format),
        Commands::TruncateLog => cmd_truncate_log(&store),
    }
}

fn cmd_stats(store: &GateStore) -> Result<()> {
    let stats = store.stats()?;

    println!("=== Gatewarden Database Stats ===");
    println!("Database: {}", store.path().display());
    println!();
    println!("Members:     {}", stats.members);
    println!("Staff:       {}", stats.staff);
    println!("Guests:      {}", stats.guests);
    println!("Pending:     {}", stats.pending);
    println!("Log entries: {}", stats.log_entries);
    println!("Bulletins:   {}", stats.bulletins);

    Ok(())
}

fn cmd_list_members(store: &GateStore) -> Result<()> {
    let members = store.list_members()?;

    if members.is_empty() {
        println!("No members found.");
        return Ok(());
    }

    println!(
        "{:<12}  {:<12}  {:<8}  {:<10}  {}",
        "CHANNEL", "TOKEN", "ACTIVE", "VEHICLE", "FULL NAME"
    );
    println!("{}", "-".repeat(70));

    for member in &members {
        println!(
            "{:<12}  {:<12}  {:<8}  {:<10}  {}",
            member.channel_id,
            member.token_id,
            member.is_active,
            member.vehicle.as_deref().unwrap_or("-"),
            member.full_name
        );
    }

    println!("\nTotal: {} members", members.len());
    Ok(())
}

fn cmd_list_staff(store: &GateStore) -> Result<()> {
    let staff = store.list_staff()?;

    if staff.is_empty() {
        println!("No staff found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<8}  {:<14}  {}",
        "ID", "ACTIVE", "POSITION", "FULL NAME"
    );
    println!("{}", "-".repeat(80));

    for record in &staff {
        println!(
            "{:<36}  {:<8}  {:<14}  {}",
            record.id, record.is_active, record.position, record.full_name
        );
    }

    println!("\nTotal: {} staff", staff.len());
    Ok(())
}

fn cmd_list_guests(store: &GateStore) -> Result<()> {
    let guests = store.list_guests()?;

    if guests.is_empty() {
        println!("No guest passes found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<12}  {:<8}  {}",
        "ID", "TOKEN", "ACTIVE", "EXPIRES"
    );
    println!("{}", "-".repeat(84));

    for guest in &guests {
        println!(
            "{:<36}  {:<12}  {:<8}  {}",
            guest.id,
            guest.token_id,
            guest.is_active,
            format_timestamp(guest.expires_at)
        );
    }

    println!("\nTotal: {} guest passes", guests.len());
    Ok(())
}

fn cmd_pending(store: &GateStore) -> Result<()> {
    let pending = store.list_pending()?;

    if pending.is_empty() {
        println!("No pending requests.");
        return Ok(());
    }

    println!(
        "{:<12}  {:<12}  {:<8}  {}",
        "TOKEN", "REQUESTER", "KIND", "CREATED"
    );
    println!("{}", "-".repeat(60));

    for request in &pending {
        println!(
            "{:<12}  {:<12}  {:<8}  {}",
            request.token_id,
            request.requester,
            request.variant.as_str(),
            format_timestamp(request.created_at)
        );
    }

    println!("\nTotal: {} pending requests", pending.len());
    Ok(())
}

fn cmd_log(store: &GateStore, limit: usize) -> Result<()> {
    let entries = store.recent_logs(limit)?;

    if entries.is_empty() {
        println!("Access log is empty.");
        return Ok(());
    }

    println!(
        "{:<8}  {:<8}  {:<12}  {:<9}  {}",
        "SEQ", "KIND", "IDENTITY", "OUTCOME", "TIME"
    );
    println!("{}", "-".repeat(66));

    for entry in &entries {
        println!(
            "{:<8}  {:<8}  {:<12}  {:<9}  {}",
            entry.seq,
            entry.variant.as_str(),
            entry.identity_ref,
            entry.outcome.as_str(),
            format_timestamp(entry.timestamp)
        );
    }

    Ok(())
}

fn cmd_export(store: &GateStore, format: &str) -> Result<()> {
    if format != "json" {
        anyhow::bail!("Unsupported format '{}'. Only 'json' is supported.", format);
    }

    let export = serde_json::json!({
        "exported_at": Utc::now().to_rfc3339(),
        "stats": store.stats()?,
        "members": store.list_members()?,
        "staff": store.list_staff()?,
        "guests": store.list_guests()?,
        "pending": store.list_pending()?,
        "access_log": store.recent_logs(usize::MAX)?,
        "bulletins": store.list_bulletins()?,
    });

    println!("{}", serde_json::to_string_pretty(&export)?);
    Ok(())
}

fn cmd_truncate_log(store: &GateStore) -> Result<()> {
    let before = store.count_logs()?;
    store.truncate_log()?;
    println!("Cleared {} access log entries", before);
    Ok(())
}
