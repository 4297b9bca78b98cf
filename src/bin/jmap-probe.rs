#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for probing a JMAP mail server

use clap::{Parser, Subcommand};
use jmap_probe::{
    AuditLog, AuditRecord, CancellationToken, Comparator, EmailFilter, Error, JmapClient,
    JmapConfig, Mailbox, Outcome,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Conventional exit status for a run stopped by SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "jmap-probe", version)]
#[command(about = "Diagnostic client for JMAP mail servers")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Server host name or base URL (overrides JMAP_HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server port (overrides JMAP_PORT)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Authentication method (overrides JMAP_AUTH_METHOD)
    #[arg(long, global = true, value_parser = ["auto", "basic", "bearer"])]
    auth_method: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    /// Append a JSON-lines audit record per run to this file
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Discover the session and summarize the server
    Connect,

    /// Check that the configured credentials are accepted
    Auth,

    /// List mailboxes of the primary mail account
    Mailboxes,

    /// Query email ids
    Query {
        /// Only emails in this mailbox id
        #[arg(long)]
        mailbox: Option<String>,

        /// Maximum number of ids to return
        #[arg(long, default_value = "20")]
        limit: u64,

        /// List oldest emails first instead of newest
        #[arg(long)]
        oldest_first: bool,
    },
}

impl Command {
    const fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Auth => "auth",
            Self::Mailboxes => "mailboxes",
            Self::Query { .. } => "query",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_cancelled(&e) => {
            eprintln!("Interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn is_cancelled(e: &anyhow::Error) -> bool {
    e.downcast_ref::<Error>().is_some_and(Error::is_cancelled)
}

fn load_config(args: &Args) -> anyhow::Result<JmapConfig> {
    let mut config = JmapConfig::from_env_with_host(args.host.clone())?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(method) = &args.auth_method {
        config.auth_method = method.parse()?;
    }
    config.insecure |= args.insecure;
    Ok(config)
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let mut client = JmapClient::new(config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let started = Instant::now();
    let result = match &args.command {
        Command::Connect => cmd_connect(&mut client, args, &cancel).await,
        Command::Auth => cmd_auth(&mut client, args, &cancel).await,
        Command::Mailboxes => cmd_mailboxes(&mut client, args, &cancel).await,
        Command::Query {
            mailbox,
            limit,
            oldest_first,
        } => {
            let sort = if *oldest_first {
                Comparator::ascending("receivedAt")
            } else {
                Comparator::newest_first()
            };
            cmd_query(&mut client, args, mailbox.as_deref(), sort, *limit, &cancel).await
        }
    };

    if let Some(path) = &args.audit_log {
        let outcome = match &result {
            Ok(()) => Outcome::Success,
            Err(e) if is_cancelled(e) => Outcome::Cancelled,
            Err(_) => Outcome::Failure,
        };
        let mut record = AuditRecord::new(
            args.command.name(),
            &client.config().host,
            client.auth_scheme(),
            &client.config().username,
            outcome,
            started.elapsed(),
        );
        if let Err(e) = &result {
            record = record.with_detail(format!("{e:#}"));
        }
        if let Err(e) = AuditLog::new(path).append(&record) {
            warn!("Could not write audit log {}: {}", path.display(), e);
        }
    }

    result
}

#[derive(Serialize)]
struct SessionSummary<'a> {
    discovery_url: String,
    username: &'a str,
    api_url: &'a str,
    state: &'a str,
    accounts: usize,
    primary_mail_account: Option<&'a str>,
    mail: bool,
    submission: bool,
    capabilities: Vec<String>,
}

async fn cmd_connect(
    client: &mut JmapClient,
    args: &Args,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let discovery_url = client.discovery_url();
    let session = client.discover(cancel).await?;

    let summary = SessionSummary {
        discovery_url,
        username: &session.username,
        api_url: &session.api_url,
        state: &session.state,
        accounts: session.account_count(),
        primary_mail_account: session.primary_mail_account_id(),
        mail: session.has_mail_capability(),
        submission: session.has_submission_capability(),
        capabilities: session.capability_names(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_session_summary(&summary);
    }

    Ok(())
}

#[derive(Serialize)]
struct AuthSummary<'a> {
    authenticated: bool,
    scheme: &'a str,
    username: &'a str,
}

async fn cmd_auth(
    client: &mut JmapClient,
    args: &Args,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let scheme = client.auth_scheme();

    let session = match client.discover(cancel).await {
        Ok(session) => session,
        Err(e @ Error::HttpStatus { status: 401 | 403, .. }) => {
            anyhow::bail!("Authentication failed using {scheme}: {e}");
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        let summary = AuthSummary {
            authenticated: true,
            scheme: scheme.as_str(),
            username: &session.username,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Authenticated as {} using {scheme}", session.username);
    }

    Ok(())
}

async fn cmd_mailboxes(
    client: &mut JmapClient,
    args: &Args,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut mailboxes = match client.list_mailboxes(cancel).await {
        Ok(mailboxes) => mailboxes,
        Err(Error::NoPrimaryAccount) => {
            eprintln!("No mailbox data available: server advertises no primary mail account");
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };
    mailboxes.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mailboxes)?);
    } else {
        print_mailbox_table(&mailboxes);
    }

    Ok(())
}

async fn cmd_query(
    client: &mut JmapClient,
    args: &Args,
    mailbox: Option<&str>,
    sort: Comparator,
    limit: u64,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let filter = mailbox.map(EmailFilter::in_mailbox);
    let result = client
        .query_emails(filter, vec![sort], Some(limit), cancel)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if let Some(total) = result.total {
            println!("Total:   {total}");
        }
        println!("Showing: {}", result.ids.len());
        for id in &result.ids {
            println!("  {id}");
        }
    }

    Ok(())
}

fn print_session_summary(summary: &SessionSummary<'_>) {
    println!("Connected to {}", summary.discovery_url);
    println!("Username:     {}", summary.username);
    println!("API URL:      {}", summary.api_url);
    println!("State:        {}", summary.state);
    println!("Accounts:     {}", summary.accounts);
    println!(
        "Primary mail: {}",
        summary.primary_mail_account.unwrap_or("-")
    );
    println!("Mail:         {}", yes_no(summary.mail));
    println!("Submission:   {}", yes_no(summary.submission));
    println!("Capabilities:");
    for capability in &summary.capabilities {
        println!("  {capability}");
    }
}

fn print_mailbox_table(mailboxes: &[Mailbox]) {
    if mailboxes.is_empty() {
        println!("No mailboxes found.");
        return;
    }

    let header = format!(
        "{:<30} {:<12} {:>8} {:>8}",
        "Name", "Role", "Total", "Unread"
    );
    println!("{header}");
    println!("{}", "-".repeat(61));

    for mailbox in mailboxes {
        println!(
            "{:<30} {:<12} {:>8} {:>8}",
            truncate(&mailbox.name, 28),
            mailbox.role.as_deref().unwrap_or("-"),
            mailbox.total_emails,
            mailbox.unread_emails,
        );
    }

    println!("\n{} mailbox(es)", mailboxes.len());
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
