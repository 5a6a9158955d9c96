use clap::Subcommand;
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::cli::utils::print_table;
use crate::cli::OutputFormat;
use crate::endpoints::{Authorization, DescriptorStore, EndpointDescriptor, EndpointKind, STANDARD_ENDPOINTS};
use crate::handlers::route::api_path;

#[derive(Subcommand)]
pub enum EndpointCommands {
    #[command(about = "List the built-in endpoints")]
    List,

    #[command(about = "Load a table's settings document and summarize each endpoint")]
    Check {
        #[arg(help = "Table name")]
        table: String,

        #[arg(long, help = "Modules directory (defaults to ENDPOINTS_MODULES_DIR or ./modules)")]
        modules_dir: Option<PathBuf>,
    },
}

pub async fn handle(cmd: EndpointCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        EndpointCommands::List => list(&output_format),
        EndpointCommands::Check { table, modules_dir } => {
            let modules_dir = modules_dir.unwrap_or_else(|| crate::config::config().endpoints.modules_dir.clone());
            check(&DescriptorStore::new(modules_dir), &table, &output_format).await
        }
    }
}

fn list(output_format: &OutputFormat) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let endpoints: Vec<Value> = STANDARD_ENDPOINTS
                .iter()
                .map(|e| {
                    json!({
                        "name": e.name,
                        "request_type": e.request_type.as_str(),
                        "restful_identifier": e.restful_identifier,
                        "api_path": api_path(e.kind),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "endpoints": endpoints }))?);
        }
        OutputFormat::Text => {
            let rows: Vec<Vec<String>> = STANDARD_ENDPOINTS
                .iter()
                .map(|e| {
                    vec![
                        e.name.to_string(),
                        e.request_type.to_string(),
                        format!("/<table>/{}", e.restful_identifier).trim_end_matches('/').to_string(),
                        api_path(e.kind).to_string(),
                    ]
                })
                .collect();
            print_table(&["ENDPOINT", "METHOD", "SHORTHAND", "API PATH"], &rows);
        }
    }
    Ok(())
}

/// One row per document entry
pub fn summarize(name: &str, descriptor: &EndpointDescriptor) -> Value {
    let standard = match EndpointKind::from_name(name) {
        Some(kind) => json!(kind.standard().request_type == descriptor.request_type),
        // "Get By Post" is the older name for Search
        None if name == "Get By Post" => json!(true),
        None => Value::Null,
    };

    json!({
        "name": name,
        "request_type": descriptor.request_type.as_str(),
        "restful_identifier": descriptor.restful_identifier,
        "authorization": describe_authorization(descriptor.authorization.as_ref()),
        "before_hook": descriptor.before_hook,
        "after_hook": descriptor.after_hook,
        "enable_params": descriptor.enable_params,
        "standard_method": standard,
    })
}

fn describe_authorization(authorization: Option<&Authorization>) -> String {
    let policy = match authorization {
        None => return "not activated".to_string(),
        Some(Authorization::Wildcard) => return "*".to_string(),
        Some(Authorization::Policy(policy)) => policy,
    };

    let mut parts = Vec::new();
    if !policy.roles.is_empty() {
        parts.push(format!("roles={}", policy.roles.join("|")));
    }
    if !policy.user_ids.is_empty() {
        parts.push(format!("user_ids={}", policy.user_ids.join("|")));
    }
    if let Some(segment) = policy.user_id_segment {
        parts.push(format!("userIdSegment={}", segment));
    }
    if let Some(segment) = policy.user_code_segment {
        parts.push(format!("userCodeSegment={}", segment));
    }
    if let Some(owned) = &policy.user_owned_segment {
        parts.push(format!("owned({}@{})", owned.column, owned.segment_num));
    }
    if parts.is_empty() {
        "token holders with no matching rule are denied".to_string()
    } else {
        parts.join(", ")
    }
}

async fn check(store: &DescriptorStore, table: &str, output_format: &OutputFormat) -> anyhow::Result<()> {
    let document = store.load(table).await?;
    let entries: Vec<Value> = document.iter().map(|(name, d)| summarize(name, d)).collect();

    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "table": table,
                    "path": store.document_path(table).display().to_string(),
                    "endpoints": entries,
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{} ({} entries)", store.document_path(table).display(), entries.len());
            let rows: Vec<Vec<String>> = entries
                .iter()
                .map(|e| {
                    let flag = match e["standard_method"] {
                        Value::Bool(false) => " (method differs from built-in)",
                        Value::Null => " (custom)",
                        _ => "",
                    };
                    vec![
                        format!("{}{}", e["name"].as_str().unwrap_or_default(), flag),
                        e["request_type"].as_str().unwrap_or_default().to_string(),
                        e["authorization"].as_str().unwrap_or_default().to_string(),
                    ]
                })
                .collect();
            print_table(&["ENDPOINT", "METHOD", "AUTHORIZATION"], &rows);
        }
    }
    Ok(())
}
