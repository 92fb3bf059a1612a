use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

mod cli;
mod client;
mod config;
mod engine;
mod errors;
mod export;
mod models;
mod poll;
mod session;

use cli::{Cli, Commands};
use client::{ApiClient, CollectionSource, PageRequest};
use config::Config;
use models::{Entity, FilterCriteria, FilteredView, ViewState};
use poll::PollingCoordinator;
use session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "eduadmin=info");
    }

    // Initialize logging to both console and file
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let file_appender = tracing_appender::rolling::never(".", "eduadmin.log");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.validate()?;
    let sessions = SessionStore::new(&config.token_dir);
    let client = ApiClient::new(&config, sessions.clone())?;

    match &cli.command {
        Commands::Login {
            realm,
            username,
            password,
        } => {
            let outcome = async {
                let realm = Commands::parse_realm(realm)?;
                if sessions.is_authenticated(realm) {
                    info!("Replacing the stored {} token", realm.as_str());
                }
                client.login(realm, username, password).await?;
                Ok::<_, anyhow::Error>(())
            }
            .await;
            match outcome {
                Ok(()) => info!("Login successful"),
                Err(e) => fail("Login failed", e),
            }
        }

        Commands::Logout { realm } => {
            let outcome = async {
                let realm = Commands::parse_realm(realm)?;
                client.logout(realm)?;
                Ok::<_, anyhow::Error>(realm)
            }
            .await;
            match outcome {
                Ok(realm) => info!("Logged out of the {} realm", realm.as_str()),
                Err(e) => fail("Logout failed", e),
            }
        }

        Commands::List {
            entity,
            search,
            filters,
            page,
            page_size,
            export,
            output,
            show_options,
        } => {
            let result = run_list(
                &client,
                &config,
                entity,
                search.as_deref(),
                filters,
                *page,
                *page_size,
                export.as_deref(),
                output.as_deref(),
                *show_options,
            )
            .await;
            if let Err(e) = result {
                fail("List failed", e);
            }
        }

        Commands::Watch { entity, interval_ms } => {
            if let Err(e) = run_watch(client, &config, entity, *interval_ms).await {
                fail("Watch failed", e);
            }
        }

        Commands::Create { entity, data } => {
            let outcome = async {
                let entity = Commands::parse_entity(entity)?;
                let body = Commands::parse_data(data)?;
                let message = client.create(entity, body).await?;
                Ok::<_, anyhow::Error>((entity, message))
            }
            .await;
            match outcome {
                Ok((entity, message)) => confirm_mutation(&client, entity, &message).await,
                Err(e) => fail("Create failed", e),
            }
        }

        Commands::Update { entity, id, data } => {
            let outcome = async {
                let entity = Commands::parse_entity(entity)?;
                let body = Commands::parse_data(data)?;
                let message = client.update(entity, id, body).await?;
                Ok::<_, anyhow::Error>((entity, message))
            }
            .await;
            match outcome {
                Ok((entity, message)) => confirm_mutation(&client, entity, &message).await,
                Err(e) => fail("Update failed", e),
            }
        }

        Commands::Delete { entity, id } => {
            let outcome = async {
                let entity = Commands::parse_entity(entity)?;
                let message = client.delete(entity, id).await?;
                Ok::<_, anyhow::Error>((entity, message))
            }
            .await;
            match outcome {
                Ok((entity, message)) => confirm_mutation(&client, entity, &message).await,
                Err(e) => fail("Delete failed", e),
            }
        }

        Commands::Entities => {
            for entity in Entity::all() {
                println!(
                    "{:<28} realm={:<10} search=[{}] filters=[{}]",
                    entity.as_str(),
                    entity.realm().as_str(),
                    entity.searchable_fields().join(", "),
                    entity.filter_fields().join(", "),
                );
            }
        }
    }

    Ok(())
}

fn fail(context: &str, e: anyhow::Error) -> ! {
    error!("{}: {}", context, e);
    std::process::exit(1);
}

/// Mutations never patch local state; after a confirmed success the
/// collection is re-fetched and the new count reported.
async fn confirm_mutation(client: &ApiClient, entity: Entity, message: &str) {
    info!("Server response: {}", message);
    match client.fetch_collection(entity, None).await {
        Ok(refreshed) => info!(
            "{} now has {} records",
            entity.as_str(),
            refreshed.records.len()
        ),
        Err(e) => warn!("Mutation confirmed but re-fetch failed: {}", e),
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_list(
    client: &ApiClient,
    config: &Config,
    entity_name: &str,
    search: Option<&str>,
    filters: &[String],
    page: usize,
    page_size: Option<usize>,
    export: Option<&str>,
    output: Option<&str>,
    show_options: bool,
) -> Result<()> {
    let entity = Commands::parse_entity(entity_name)?;
    let page_size = page_size.unwrap_or(config.page_size).max(1);

    let mut criteria = FilterCriteria::default();
    if let Some(term) = search {
        criteria.search = term.to_string();
    }
    for spec in filters {
        let (field, value) = Commands::parse_filter(spec)?;
        if !entity.filter_fields().contains(&field.as_str()) {
            warn!(
                "'{}' is not a catalogued filter field for {}",
                field,
                entity.as_str()
            );
        }
        criteria = criteria.select(&field, &value);
    }

    // Endpoints that paginate server-side return an already-sliced page;
    // everything downstream (options, export, criteria) works on whatever
    // collection the fetch produced.
    let server_request = entity.server_paginated().then(|| PageRequest {
        page: page.max(1) as u64,
        items_per_page: page_size as u64,
    });
    let mut fetched = client.fetch_collection(entity, server_request).await?;
    if let Some((field, descending)) = entity.default_sort() {
        engine::sort_by_field(&mut fetched.records, field, descending);
    }

    if show_options {
        for field in entity.filter_fields() {
            let options = engine::derive_filter_options(&fetched.records, field);
            println!("{}: {}", field, options.join(", "));
        }
        if !entity.filter_fields().is_empty() {
            println!();
        }
    }

    if let Some(format) = export {
        let format = Commands::parse_export_format(format)?;
        if entity.server_paginated() {
            warn!(
                "{} paginates on the server; the export covers the fetched page only",
                entity.as_str()
            );
        }
        let export_set =
            engine::compute_export_set(&fetched.records, &criteria, entity.searchable_fields());
        let default_name = format!(
            "{}.{}",
            entity.as_str().replace('-', "_"),
            format.extension()
        );
        let path = output.unwrap_or(&default_name);
        export::export_to_path(
            format,
            Path::new(path),
            entity.as_str(),
            entity.export_columns(),
            &export_set,
        )?;
        println!("Exported {} records to {}", export_set.len(), path);
        return Ok(());
    }

    if entity.server_paginated() {
        let view = engine::server_page_view(fetched, &criteria, entity.searchable_fields());
        render_view(entity, &view, page.max(1), page_size);
        return Ok(());
    }

    let filtered = engine::apply_filters(&fetched.records, &criteria, entity.searchable_fields());

    // Each invocation starts from page 1, so a fresh filter can never
    // show a stale page; an explicit --page is clamped below.
    let mut view_state = ViewState::new(page_size);
    let total_pages = filtered.len().div_ceil(page_size).max(1);
    if !view_state.change_page(page, total_pages) {
        warn!(
            "Page {} is out of range (1..={}), showing page {}",
            page, total_pages, view_state.current_page
        );
    }

    let view = engine::paginate(&filtered, view_state.page_size, view_state.current_page);
    render_view(entity, &view, view_state.current_page, view_state.page_size);
    Ok(())
}

async fn run_watch(
    client: ApiClient,
    config: &Config,
    entity_name: &str,
    interval_ms: Option<u64>,
) -> Result<()> {
    let entity = Commands::parse_entity(entity_name)?;
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.poll_interval());
    let page_size = config.page_size;

    info!(
        "Watching {} every {} ms (Ctrl-C to stop)",
        entity.as_str(),
        interval.as_millis()
    );

    let source: Arc<dyn CollectionSource> = Arc::new(client);
    let handle = PollingCoordinator::start(source, entity, interval, move |page| {
        let mut records = page.records;
        if let Some((field, descending)) = entity.default_sort() {
            engine::sort_by_field(&mut records, field, descending);
        }
        let view = engine::paginate(&records, page_size, 1);
        println!(
            "-- {} [{}] {} records --",
            entity.as_str(),
            chrono::Local::now().format("%H:%M:%S"),
            view.total_filtered
        );
        render_view(entity, &view, 1, page_size);
    });

    tokio::signal::ctrl_c().await?;
    handle.cancel().await;
    info!("Stopped watching {}", entity.as_str());
    Ok(())
}

fn render_view(entity: Entity, view: &FilteredView, current_page: usize, page_size: usize) {
    if view.total_filtered == 0 {
        println!("No {} available.", entity.as_str().replace('-', " "));
        return;
    }

    let columns = entity.export_columns();
    let header = columns
        .iter()
        .map(|(_, title)| *title)
        .collect::<Vec<_>>()
        .join(" | ");
    println!("{:<4} {}", "#", header);

    for (index, record) in view.page_records.iter().enumerate() {
        let row = columns
            .iter()
            .map(|(field, _)| record.display(field))
            .collect::<Vec<_>>()
            .join(" | ");
        println!("{:<4} {}", (current_page - 1) * page_size + index + 1, row);
    }

    println!(
        "Page {} of {} ({} records match)",
        current_page, view.total_pages, view.total_filtered
    );
}
