use anyhow::Context;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method};
use clap::Args;
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::handlers::context::{RequestContext, METHOD_OVERRIDE_HEADER};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[arg(help = "HTTP method, e.g. GET")]
    pub method: String,

    #[arg(help = "Request path, optionally with a query string")]
    pub path: String,

    #[arg(long = "override", help = "Value for the X-HTTP-Method-Override header")]
    pub method_override: Option<String>,
}

/// Run the same resolution a live request goes through, minus the settings lookup
pub fn resolve(args: &ResolveArgs) -> anyhow::Result<RequestContext> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", args.method))?;

    let mut headers = HeaderMap::new();
    if let Some(value) = &args.method_override {
        headers.insert(METHOD_OVERRIDE_HEADER, HeaderValue::from_str(value)?);
    }

    let (path, query) = match args.path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (args.path.as_str(), None),
    };

    let token_header = &crate::config::config().api.token_header;
    Ok(RequestContext::build(&method, path, query, &headers, token_header, Bytes::new())?)
}

pub fn describe(ctx: &RequestContext) -> Value {
    json!({
        "endpoint": ctx.endpoint.name(),
        "method": ctx.method.as_str(),
        "table": ctx.table,
        "id": ctx.id,
        "via_api": ctx.via_api,
        "settings_key": format!("{}/assets/api.json#{}", ctx.table, ctx.endpoint.name()),
    })
}

pub fn handle(args: ResolveArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = resolve(&args)?;
    let summary = describe(&ctx);

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            println!("{} {} -> {}", ctx.method, args.path, ctx.endpoint.name());
            println!("table: {}", ctx.table);
            if let Some(id) = &ctx.id {
                println!("id: {}", id);
            }
            println!("route: {}", if ctx.via_api { "api prefix" } else { "shorthand" });
        }
    }
    Ok(())
}
