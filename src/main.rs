use clap::Parser;
use tabular_ingest::runner::{IngestArgs, run_ingest};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Download a CSV or Parquet file and append its rows to a database table
#[derive(Parser, Clone)]
#[command(version, about)]
struct Args {
    /// Database driver (postgresql)
    db: String,

    /// Database user
    user: String,

    /// Database password
    password: String,

    /// Database host
    host: String,

    /// Database port
    port: u16,

    /// Database name
    database_name: String,

    /// Target table; created from the first batch if it does not exist
    table_name: String,

    /// URL (or local path) of the .csv, .parquet or .gz source
    url: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // RUST_LOG overrides the default filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tabular_ingest=info,sqlx=warn"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    println!("Tabular Ingest");
    println!("==============");
    println!("Source: {}", args.url);
    println!("Table: {}", args.table_name);
    println!(
        "Database: {}://{}@{}:{}/{}",
        args.db, args.user, args.host, args.port, args.database_name
    );
    println!();

    let report = run_ingest(IngestArgs {
        db: args.db,
        user: args.user,
        password: args.password,
        host: args.host,
        port: args.port,
        database_name: args.database_name,
        table_name: args.table_name,
        url: args.url,
        download_dir: std::env::current_dir()?,
    })
    .await?;

    let seconds = report.duration.as_secs_f64();

    println!();
    println!("Load Summary");
    println!("============");
    println!("Job ID: {}", report.job_id);
    println!("Source file: {}", report.source_path.display());
    println!("Batches appended: {}", report.stats.batches);
    println!("Rows appended: {}", report.stats.rows);
    println!("Duration: {:.2}s", seconds);
    if seconds > 0.0 {
        println!("Throughput: {:.2} rows/sec", report.stats.rows as f64 / seconds);
    }
    let (p50, p90, p99) = report.stats.get_percentiles();
    if let (Some(p50), Some(p90), Some(p99)) = (p50, p90, p99) {
        println!("Batch time: p50: {}ms, p90: {}ms, p99: {}ms", p50, p90, p99);
    }

    Ok(())
}
