use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sf")]
#[command(about = "Storefront operations CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env -> site ...)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,

        /// Treat config keys this build does not read as an error.
        #[arg(long, default_value_t = false)]
        fail_unused: bool,
    },

    /// Cart maintenance
    Carts {
        #[command(subcommand)]
        cmd: CartsCmd,
    },

    /// Order status and lookups
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },

    /// Catalog seeding
    Catalog {
        #[command(subcommand)]
        cmd: CatalogCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum CartsCmd {
    /// Delete anonymous carts untouched for longer than the TTL.
    Purge {
        /// Overrides cart.anonymous_ttl_days
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(sf_config::MAX_ANONYMOUS_TTL_DAYS)))]
        ttl_days: Option<u32>,
    },
}

#[derive(Subcommand)]
enum OrderCmd {
    /// Change an order's status (one history row per real change).
    SetStatus {
        #[arg(long)]
        order_id: i64,

        /// PLACED | IN_PROCESS | DELIVERY_SOON | OUT_FOR_DELIVERY | DELIVERED | CANCELLED
        #[arg(long)]
        status: String,

        #[arg(long)]
        note: Option<String>,

        /// Staff user id recorded on the history row
        #[arg(long)]
        actor: Option<i64>,
    },

    /// Print an order with its items, tracking and history
    Show {
        #[arg(long)]
        order_id: i64,
    },

    /// List orders, newest first
    List {
        #[arg(long)]
        status: Option<String>,

        /// YYYY-MM-DD, needs --end-date
        #[arg(long)]
        start_date: Option<String>,

        /// YYYY-MM-DD, inclusive
        #[arg(long)]
        end_date: Option<String>,
    },
}

#[derive(Subcommand)]
enum CatalogCmd {
    /// Create categories and products from a JSON file.
    Import {
        #[arg(long)]
        file: String,

        /// Parse and validate only; no database access.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let config_paths = cli.config_paths;

    match cli.cmd {
        Commands::Db { cmd } => {
            let (pool, _) = commands::connect(&config_paths).await?;
            match cmd {
                DbCmd::Status => {
                    let s = sf_db::status(&pool).await?;
                    println!("db_ok={} has_orders_table={}", s.ok, s.has_orders_table);
                }
                DbCmd::Migrate => {
                    sf_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths, fail_unused } => {
            commands::config_hash(&paths, fail_unused)?;
        }

        Commands::Carts { cmd } => match cmd {
            CartsCmd::Purge { ttl_days } => {
                commands::carts::purge(&config_paths, ttl_days).await?;
            }
        },

        Commands::Order { cmd } => match cmd {
            OrderCmd::SetStatus {
                order_id,
                status,
                note,
                actor,
            } => {
                commands::orders::set_status(&config_paths, order_id, &status, note.as_deref(), actor)
                    .await?;
            }
            OrderCmd::Show { order_id } => {
                commands::orders::show(&config_paths, order_id).await?;
            }
            OrderCmd::List {
                status,
                start_date,
                end_date,
            } => {
                commands::orders::list(
                    &config_paths,
                    status.as_deref(),
                    start_date.as_deref(),
                    end_date.as_deref(),
                )
                .await?;
            }
        },

        Commands::Catalog { cmd } => match cmd {
            CatalogCmd::Import { file, dry_run } => {
                commands::catalog::import(&config_paths, &file, dry_run).await?;
            }
        },
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable `key=value` lines.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
