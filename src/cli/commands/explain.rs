use anyhow::bail;
use clap::Args;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::database::{build, SqlResult};
use crate::filter::{parse_json_bytes, parse_query_string, FilterSet};

#[derive(Args, Debug)]
pub struct ExplainArgs {
    #[arg(help = "Table name")]
    pub table: String,

    #[arg(long, help = "URL query string, e.g. 'price%3E=10&orderBy=name'", conflicts_with = "body")]
    pub query: Option<String>,

    #[arg(long, help = "JSON filter body, e.g. '{\"price >\": 10, \"limit\": 5}'")]
    pub body: Option<String>,

    #[arg(long, help = "Render the COUNT(*) form instead of SELECT *")]
    pub count: bool,
}

/// Render without a database: identifiers are spliced as given, so nothing here
/// proves the columns exist.
pub fn render(args: &ExplainArgs) -> anyhow::Result<(FilterSet, SqlResult)> {
    if args.table.is_empty() || !args.table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("Invalid table name: {}", args.table);
    }

    let filters = match (&args.query, &args.body) {
        (_, Some(body)) => parse_json_bytes(body.as_bytes())?,
        (Some(query), None) => parse_query_string(query),
        (None, None) => FilterSet::default(),
    };

    // Counting renders the WHERE part only, as the server does
    let sql = if args.count {
        build(&format!("SELECT COUNT(*) AS count FROM {}", args.table), &filters.conditions, None, None, None)
    } else {
        build(
            &format!("SELECT * FROM {}", args.table),
            &filters.conditions,
            filters.order_by.as_deref(),
            filters.limit,
            filters.offset,
        )
    };
    Ok((filters, sql))
}

pub fn handle(args: ExplainArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let (filters, sql) = render(&args)?;

    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "sql": sql.query,
                    "params": sql.params,
                    "filters": filters,
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", sql.query);
            if !sql.params.is_empty() {
                let params: Vec<String> = sql.params.iter().map(|p| p.to_string()).collect();
                println!("params: [{}]", params.join(", "));
            }
        }
    }
    Ok(())
}
