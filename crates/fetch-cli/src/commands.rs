use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use fetch_change::{ChangeSet, Entity};
use fetch_processors::{AuditProcessor, AuditTrail, EntityPackage, GuardProcessor, Processor, ProcessorRegistry, Stage};
use fetch_repository::{
    EntityRepository, FetchConfig, PageInfo, PaginationEngine, RepositoryError, RepositoryRegistrar,
};
use fetch_store::InMemoryStore;
use tokio_util::sync::CancellationToken;

use crate::cli::*;
use crate::model::{Address, Customer};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => FetchConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => FetchConfig::default(),
    };
    match cli.command {
        Command::Demo(args) => cmd_demo(args, config, cli.format).await,
        Command::Paginate(args) => cmd_paginate(args, config, cli.format).await,
        Command::Config(args) => cmd_config(args, config),
    }
}

fn print_changes(label: &str, changes: &ChangeSet) {
    println!("{} {}", "✓".green().bold(), label);
    for change in changes {
        println!("    {} = {}", change.path.to_string().cyan(), change.value);
    }
}

async fn cmd_demo(args: DemoArgs, mut config: FetchConfig, format: OutputFormat) -> anyhow::Result<()> {
    if let Some(policy) = args.collections {
        config.store.collection_changes = policy.into();
    }
    let store = Arc::new(InMemoryStore::with_config(config.store.clone()));

    let trail = AuditTrail::new();
    let audit: Arc<dyn Processor<Customer>> = Arc::new(AuditProcessor::new(trail.clone()));
    let mut registry = ProcessorRegistry::new();
    for stage in Stage::ALL {
        registry.register_shared(stage, Arc::clone(&audit));
    }
    registry.register(
        Stage::Deleting,
        GuardProcessor::new("protect-vip", |package: &EntityPackage<'_, Customer>| {
            if package.entity().is_tagged("vip") {
                Err("vip customers cannot be deleted".to_string())
            } else {
                Ok(())
            }
        }),
    );

    let mut registrar = RepositoryRegistrar::new(Arc::clone(&store), config.pipeline.clone());
    registrar.register::<Customer>(&registry);
    let repo = registrar
        .resolve::<Customer>()
        .context("customer repository is not registered")?;
    let cancel = CancellationToken::new();

    let mut customer = Customer::new("Ada", "ada@example.com", Address::new("1 Main St", "London"));
    let keys = repo.add(&mut customer, &cancel).await?;
    println!("{} Added customer {}", "✓".green().bold(), keys.to_string().yellow());

    let mut copy = repo
        .find(&keys, &cancel)
        .await?
        .context("customer vanished after add")?;
    copy.address.set_city("Cambridge");
    copy.set_email("ada@cam.example");
    let applied = repo.update(&mut copy, &cancel).await?;
    print_changes("Updated", &applied);

    copy.tags.push("vip".to_string());
    let applied = repo.update(&mut copy, &cancel).await?;
    print_changes(
        &format!("Tagged (collections: {:?})", config.store.collection_changes),
        &applied,
    );

    match repo.delete(&copy, &cancel).await {
        Err(RepositoryError::OperationCancelled { processor, reason, .. }) => {
            println!("{} Delete vetoed by {}: {}", "✗".yellow().bold(), processor.bold(), reason);
        }
        Err(err) => return Err(err.into()),
        Ok(()) => println!("{} Deleted customer {}", "✓".green().bold(), keys),
    }

    let stored = store
        .document(Customer::entity_name(), &keys)?
        .context("customer row missing")?;
    match format {
        OutputFormat::Json => {
            let report = serde_json::json!({ "row": stored, "audit": trail.entries() });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("\nStored row: {}", stored);
            println!("Audit trail:");
            for entry in trail.entries() {
                let changed: Vec<String> = entry.changed.iter().map(ToString::to_string).collect();
                println!("  {:<9} {}", entry.stage.to_string().blue(), changed.join(", ").dimmed());
            }
        }
    }
    Ok(())
}

async fn cmd_paginate(args: PaginateArgs, config: FetchConfig, format: OutputFormat) -> anyhow::Result<()> {
    let store = Arc::new(InMemoryStore::with_config(config.store.clone()));
    let mut registrar = RepositoryRegistrar::new(store, config.pipeline.clone());
    registrar.register::<Customer>(&ProcessorRegistry::<Customer>::new());
    let repo = registrar
        .resolve::<Customer>()
        .context("customer repository is not registered")?;
    let cancel = CancellationToken::new();

    for i in (0..args.count).rev() {
        let mut customer = Customer::new(
            &format!("customer-{i:03}"),
            &format!("c{i}@example.com"),
            Address::new("", "Springfield"),
        );
        repo.add(&mut customer, &cancel).await?;
    }

    let engine = PaginationEngine::for_repository(
        repo,
        |c: &Customer| (c.name.clone(), c.id),
        config.pagination.clone(),
    );
    let total = engine.count(None, &cancel).await?;
    let mut info = PageInfo::new(args.page.unwrap_or(0), args.page_size)?;
    loop {
        let page = engine.page(info, None, &cancel).await?;
        match format {
            OutputFormat::Json => {
                let names: Vec<&str> = page.results.iter().map(|c| c.name.as_str()).collect();
                println!("{}", serde_json::json!({ "page": page.page, "names": names }));
            }
            OutputFormat::Text => {
                println!("{} {} ({} of {})", "Page".bold(), page.page, page.count(), total);
                for customer in &page.results {
                    println!("  {}", customer.name);
                }
            }
        }
        if args.page.is_some() || !page.is_full() {
            break;
        }
        info = info.next();
    }
    Ok(())
}

fn cmd_config(args: ConfigArgs, config: FetchConfig) -> anyhow::Result<()> {
    let config = if args.defaults { FetchConfig::default() } else { config };
    print!("{}", config.to_toml_string()?);
    Ok(())
}
