use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use qrcompiler::config::CompilerConfig;
use qrcompiler::join_catalog::{CatalogConfig, DataSourceHandle};
use qrcompiler::qr_parser::parse_document_str;
use qrcompiler::query_generator::{BackendKind, ConditionBackend, DialectKind, SqlBackend};
use qrcompiler::session::{SessionCache, SessionKey};

/// qrc - compile Qr query documents against a table catalog
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML catalog describing tables, aliases and joins
    #[arg(long)]
    catalog: PathBuf,

    /// JSON query document, or `-` to read stdin
    #[arg(long, default_value = "-")]
    query: String,

    /// Target backend: sql or condition
    #[arg(long, default_value = "sql")]
    backend: BackendKind,

    /// Identifier dialect (overrides the configuration)
    #[arg(long)]
    dialect: Option<DialectKind>,

    /// Maximum page size (overrides the configuration)
    #[arg(long)]
    max_page_size: Option<u64>,

    /// YAML compiler configuration; environment variables are used when absent
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => CompilerConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => CompilerConfig::from_env().context("loading configuration from environment")?,
    };
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect;
    }
    if let Some(max) = cli.max_page_size {
        config.max_page_size = max;
    }
    config.check().context("validating configuration")?;

    let catalog = CatalogConfig::from_yaml_file(&cli.catalog)
        .with_context(|| format!("loading catalog {}", cli.catalog.display()))?;

    let text = if cli.query == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading query from stdin")?;
        buf
    } else {
        fs::read_to_string(&cli.query).with_context(|| format!("reading query {}", cli.query))?
    };
    let document = parse_document_str(&text).context("parsing query document")?;

    let cache = SessionCache::from_config(&config);
    let key = SessionKey::new(
        DataSourceHandle::new(cli.catalog.display().to_string()),
        catalog.join_description(),
        cli.backend,
        config.dialect,
        config.page_limits(),
    );
    let session = cache
        .get_or_load(&catalog, &key)
        .context("building query session")?;
    log::debug!("session cache: {:?}", cache.metrics());

    match cli.backend {
        BackendKind::Sql => {
            let backend = SqlBackend;
            let compiled = session.compile(&backend, &document)?;
            let statement = backend.render_select(&compiled);
            println!("{}", statement.sql);
            for (i, param) in statement.params.iter().enumerate() {
                println!("  ${} = {}", i + 1, param);
            }
            for warning in &compiled.warnings {
                eprintln!("warning: {}", warning);
            }
        }
        BackendKind::Condition => {
            let compiled = session.compile(&ConditionBackend, &document)?;
            println!("from:      {}", compiled.from);
            for join in &compiled.joins {
                println!(
                    "join:      {} {} on {} = {}",
                    join.kind.to_sql(),
                    join.table,
                    join.left,
                    join.right
                );
            }
            println!("where:     {}", compiled.predicate);
            let order: Vec<String> = compiled.order_by.iter().map(ToString::to_string).collect();
            println!("order by:  {}", order.join(", "));
            println!(
                "window:    offset {} limit {}",
                compiled.window.offset, compiled.window.limit
            );
            for warning in &compiled.warnings {
                eprintln!("warning: {}", warning);
            }
        }
    }
    Ok(())
}
