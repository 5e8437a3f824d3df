//! CLI command handlers.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::{ClientConfig, SessionAuth};
use crate::manager::RequestManager;
use crate::types::{BatchRequest, HttpMethod, RequestBody, RequestOptions};

use super::{BatchArgs, Cli, GetArgs, SendArgs};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Build the manager from config file, env and global flags.
pub fn build_manager(cli: &Cli) -> Result<RequestManager, Box<dyn std::error::Error>> {
    let mut config = ClientConfig::load()?;
    if let Some(host) = &cli.host {
        config = config.with_host(host.clone());
    }
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url.clone());
    }
    Ok(RequestManager::with_http(config, SessionAuth::new())?)
}

/// Handle `reqman get <endpoint>`.
pub async fn handle_get(manager: &RequestManager, args: &GetArgs) -> CliResult {
    let options = RequestOptions::builder()
        .bypass_cache(args.bypass_cache)
        .build();

    let calls = (0..args.repeat.max(1)).map(|_| manager.request(&args.endpoint, options.clone()));
    let results = futures::future::join_all(calls).await;

    for result in results {
        println!("{}", serde_json::to_string_pretty(&result?)?);
    }
    print_stats(manager)
}

/// Handle `reqman send <endpoint>`.
pub async fn handle_send(manager: &RequestManager, args: &SendArgs) -> CliResult {
    let method: HttpMethod = args
        .method
        .parse()
        .map_err(|_| format!("Unsupported method: {}", args.method))?;
    if let Some(token) = &args.csrf_token {
        manager.auth().set_csrf_token(token.clone());
    }

    let body = args
        .body
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()?;
    let options = RequestOptions {
        method,
        body: body.map(RequestBody::Json),
        ..Default::default()
    };

    let value = manager.request(&args.endpoint, options).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    print_stats(manager)
}

#[derive(Debug, Deserialize)]
struct BatchEntry {
    id: Option<String>,
    endpoint: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    bypass_cache: bool,
}

/// Parse a batch file body into requests.
pub fn parse_batch(source: &str) -> Result<Vec<BatchRequest>, Box<dyn std::error::Error>> {
    let entries: Vec<BatchEntry> = serde_json::from_str(source)?;

    let mut requests = Vec::with_capacity(entries.len());
    for entry in entries {
        let method = match entry.method.as_deref() {
            Some(m) => m
                .parse::<HttpMethod>()
                .map_err(|_| format!("Unsupported method: {m}"))?,
            None => HttpMethod::Get,
        };
        requests.push(BatchRequest {
            id: entry.id,
            endpoint: entry.endpoint,
            options: RequestOptions {
                method,
                body: entry.body.map(RequestBody::Json),
                bypass_cache: entry.bypass_cache,
                ..Default::default()
            },
        });
    }
    Ok(requests)
}

/// Run the batch in `file`, rendering each entry as `{"ok": ..}` or `{"error": ..}`.
pub async fn run_batch(
    manager: &RequestManager,
    file: &std::path::Path,
) -> Result<Map<String, Value>, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(file)?;
    let requests = parse_batch(&source)?;

    let results = manager.batch_request(requests).await;
    Ok(results
        .into_iter()
        .map(|(id, result)| {
            let value = match result {
                Ok(value) => json!({ "ok": value }),
                Err(e) => json!({ "error": e.to_string() }),
            };
            (id, value)
        })
        .collect())
}

/// Handle `reqman batch <file>`.
pub async fn handle_batch(manager: &RequestManager, args: &BatchArgs) -> CliResult {
    let rendered = run_batch(manager, &args.file).await?;
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    print_stats(manager)
}

fn print_stats(manager: &RequestManager) -> CliResult {
    eprintln!("{}", serde_json::to_string(&manager.stats())?);
    Ok(())
}
