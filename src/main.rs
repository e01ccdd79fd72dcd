use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use docsql::config::QueryConfig;
use docsql::select_plan::{ParameterInliner, ParameterValues, SelectExpr};
use docsql::sql_generator::{debug_view, generate_sql};

/// docsql - render a serialized query block as document SQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Query block serialized as JSON
    plan: PathBuf,

    /// YAML configuration file (defaults to DOCSQL_* environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Parameter value as name=<json>; a value that is not JSON is taken as a string
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, Value)>,

    /// Replace supplied parameters with literal constants before printing
    #[arg(long)]
    inline_params: bool,

    /// Print the projection binding table before the query text
    #[arg(long)]
    debug_view: bool,
}

fn parse_param(arg: &str) -> Result<(String, Value), String> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=<json>, got '{}'", arg))?;
    let name = name.trim().trim_start_matches('@');
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", arg));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => QueryConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => QueryConfig::from_env().context("loading configuration from environment")?,
    };

    let content = std::fs::read_to_string(&cli.plan)
        .with_context(|| format!("reading {}", cli.plan.display()))?;
    let select: SelectExpr = serde_json::from_str(&content)
        .with_context(|| format!("parsing query block from {}", cli.plan.display()))?;
    select.validate().context("query block failed validation")?;

    let values: ParameterValues = cli.params.into_iter().collect();

    let mut select = Arc::new(select);
    if cli.inline_params {
        select = ParameterInliner::inline(&select, &values)?;
    }

    let text = if cli.debug_view {
        debug_view(&select, &config)
    } else {
        generate_sql(&select, &config)
    };
    println!("{}", text);

    let unbound: Vec<String> = select
        .parameter_names()
        .into_iter()
        .filter(|name| !values.contains_key(name))
        .map(|name| format!("@{}", name))
        .collect();
    if !unbound.is_empty() {
        println!("-- unbound parameters: {}", unbound.join(", "));
    }

    println!("-- partition key: {}", select.partition_key_value(&values));

    if let Some(read_item) = select.read_item() {
        match read_item.resolve(&values) {
            Some(keys) => {
                let keys: Vec<String> = keys
                    .iter()
                    .map(|(property, value)| format!("{}={}", property.name, value))
                    .collect();
                println!("-- point read of {}: {}", read_item.entity_type, keys.join(", "));
            }
            None => log::warn!(
                "Point read of {} cannot be routed: missing key parameter values",
                read_item.entity_type
            ),
        }
    }

    Ok(())
}
