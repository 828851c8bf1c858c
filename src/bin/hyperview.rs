use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, Level};

use hyperview::database;
use hyperview::database::directory::ProjectDirectory;
use hyperview::database::inventory::{fetch_instances, InstanceFilters, InventoryQuery};
use hyperview::enrich::{self, EnrichOptions};
use hyperview::probe::{NetworkProber, Prober};
use hyperview::progress::probe_progress_bar;
use hyperview::render::{self, Column, ColumnConfig, RenderContext};
use hyperview::HyperviewConfig;

trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Get instance and hypervisor state information based on inputs.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// configuration file path, by default $HOME/.hyperview/hyperview.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// show only this environment (hostname prefix)
    #[clap(short, long)]
    env: Option<String>,

    /// show only instances matching this (fuzzy) name
    #[clap(short, long)]
    name: Option<String>,

    /// show only this project (a.k.a. tenant)
    #[clap(short, long)]
    project: Option<String>,

    /// show only instances made by this user
    #[clap(short, long)]
    user: Option<String>,

    /// restrict output to only these (fuzzy) hypervisors
    #[clap(short = 'y', long, num_args = 1..)]
    hypervisors: Vec<String>,

    /// specify a column to sort by [Hostname]
    #[clap(short, long)]
    sort_by: Option<String>,

    /// show the instance UUID
    #[clap(long)]
    uuid: bool,

    /// provide availability information (requires root)
    #[clap(long)]
    ping: bool,

    /// test DNS resolution against IP
    #[clap(long)]
    check_dns: bool,

    /// show only VMs without IP addresses
    #[clap(long)]
    bad_ips: bool,

    /// show the corresponding SQL query for your parameters
    #[clap(long)]
    show_query: bool,

    /// output table in HTML format
    #[clap(long)]
    html: bool,
}

impl Validate for Cli {
    fn validate(&self) -> Result<()> {
        if self.bad_ips && (self.ping || self.check_dns) {
            bail!("Cannot perform networking tasks on instances without IPs.");
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();
    }

    // Usage errors reject before any query executes.
    cli.validate()?;

    if cli.ping && unsafe { libc::geteuid() } != 0 {
        bail!("Run me as root to enable ICMP echo requests.");
    }

    let config = HyperviewConfig::new(&cli.config)?;

    // Tenant directory, loaded once and read-only afterwards
    let directory_conn = database::open_readonly(&config.directory_db)?;
    let directory = ProjectDirectory::load(&directory_conn)?;
    info!("loaded {} projects", directory.len());

    let project_id = match &cli.project {
        Some(name) => match directory.id_of(name) {
            Some(id) => Some(id.to_string()),
            None => bail!("Unknown project \"{}\".", name),
        },
        None => None,
    };

    let filters = InstanceFilters {
        name: cli.name.clone(),
        env: cli.env.clone(),
        project_id,
        user_id: cli.user.clone(),
        hypervisors: cli.hypervisors.clone(),
    };
    let query = InventoryQuery::from_filters(&filters);

    if cli.show_query {
        let rule = "=".repeat(80);
        println!("\n{}", rule);
        println!("{}", query.sql());
        let params = query.params();
        if !params.is_empty() {
            println!("-- parameters: {:?}", params);
        }
        println!("{}\n", rule);
    }

    let inventory_conn = database::open_readonly(&config.inventory_db)?;
    let records = fetch_instances(&inventory_conn, &query)?;

    if records.is_empty() {
        println!("Nothing matched your query.");
        if !cli.show_query {
            println!("Try again with \"--show-query\" to see the corresponding SQL.");
        }
        return Ok(());
    }

    // Disabled-hypervisor columns are a batch-level decision, made before
    // per-record enrichment so the column set is uniform across all rows.
    let show_disabled = records.iter().any(|r| r.disabled != 0);

    let column_config = ColumnConfig {
        ping: cli.ping,
        check_dns: cli.check_dns,
        uuid: cli.uuid,
        show_disabled,
    };
    let columns = render::active_columns(&column_config);

    // Validate the sort choice before any probing starts.
    let sort_column = match &cli.sort_by {
        Some(name) => Some(render::resolve_sort_column(name, &columns)?),
        None if !cli.hypervisors.is_empty() => Some(Column::Hypervisor),
        None => None,
    };

    let mut rows = if cli.ping || cli.check_dns {
        let opts = EnrichOptions {
            ping: cli.ping,
            check_dns: cli.check_dns,
            dns_suffix: config.dns_suffix.clone(),
            workers: config.probe_workers,
        };

        eprintln!(
            "Gathering instance networking information on {} nodes...",
            records.len()
        );
        let pb = probe_progress_bar(records.len() as u64);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let rows = runtime.block_on(async {
            let prober: Arc<dyn Prober> = Arc::new(NetworkProber::new()?);
            Ok::<_, anyhow::Error>(
                enrich::enrich_all(records, &opts, prober, Some(pb.clone())).await,
            )
        })?;
        pb.finish_and_clear();
        rows
    } else {
        enrich::enrich_sequential(records)
    };

    if cli.bad_ips {
        render::retain_bad_ips(&mut rows);
    }

    let ctx = RenderContext {
        directory: &directory,
        dns_suffix: &config.dns_suffix,
    };

    if let Some(column) = sort_column {
        render::sort_rows(&mut rows, column, &ctx);
    }

    if cli.html {
        println!("{}", render::render_html(&rows, &columns, &ctx));
    } else {
        println!("{}", render::render_text(&rows, &columns, &ctx));
    }

    Ok(())
}
