//! Sift CLI - Transaction triage for parsed bank messages
//!
//! Usage:
//!   sift init                 Initialize database
//!   sift triage               Review the pending queue
//!   sift training             Label unparsed messages
//!   sift serve --port 3000    Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            static_dir,
            cors_origins,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                cli.no_encrypt,
                static_dir.as_deref(),
                cors_origins,
            )
            .await
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Triage { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_triage_list(&db, 20, None, None),
                Some(TriageAction::List {
                    limit,
                    search,
                    source,
                }) => commands::cmd_triage_list(&db, limit, search.as_deref(), source.as_deref()),
                Some(TriageAction::Approve {
                    id,
                    account,
                    category,
                    transfer,
                    to_account,
                    exclude,
                }) => commands::cmd_triage_approve(
                    &db,
                    id,
                    &account,
                    &category,
                    transfer,
                    to_account.as_deref(),
                    exclude,
                ),
                Some(TriageAction::Reject { id, ignore_rule }) => {
                    commands::cmd_triage_reject(&db, id, ignore_rule)
                }
                Some(TriageAction::BulkReject { ids, ignore_rules }) => {
                    commands::cmd_triage_bulk_reject(&db, &ids, ignore_rules)
                }
            }
        }
        Commands::Training { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_training_list(&db, 20, None),
                Some(TrainingAction::List { limit, search }) => {
                    commands::cmd_training_list(&db, limit, search.as_deref())
                }
                Some(TrainingAction::Show { id }) => commands::cmd_training_show(&db, id),
                Some(TrainingAction::Label {
                    id,
                    amount,
                    date,
                    recipient,
                    description,
                    category,
                    credit,
                    exclude,
                    pattern,
                }) => {
                    commands::cmd_training_label(
                        db,
                        id,
                        amount,
                        &date,
                        &recipient,
                        &description,
                        &category,
                        credit,
                        exclude,
                        pattern,
                    )
                    .await
                }
                Some(TrainingAction::Dismiss { ids, ignore_rules }) => {
                    commands::cmd_training_dismiss(db, &ids, ignore_rules).await
                }
            }
        }
        Commands::Rules { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_rules_list(&db),
                Some(RulesAction::Add {
                    name,
                    category,
                    keywords,
                    exclude,
                    ignore,
                }) => commands::cmd_rules_add(&db, &name, &category, keywords, exclude, ignore),
                Some(RulesAction::Delete { id }) => commands::cmd_rules_delete(&db, id),
                Some(RulesAction::Apply { id }) => commands::cmd_rules_apply(&db, id),
            }
        }
        Commands::Rename {
            old_name,
            new_name,
            sync_parser,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_rename(&db, &old_name, &new_name, sync_parser)
        }
    }
}
