use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "search-ab-cli")]
#[command(about = "Search A/B gateway CLI", version, long_about = None)]
struct Cli {
    #[arg(short, long, env = "SEARCH_AB_ENDPOINT", default_value = "http://localhost:8000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search one configuration
    Search {
        #[arg(short, long, default_value = "v1")]
        config: String,

        #[arg(short, long, default_value = "")]
        q: String,

        /// Comma-separated field:value filters
        #[arg(short, long)]
        facets: Option<String>,

        /// Comma-separated field:asc|desc clauses
        #[arg(short, long)]
        sort: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: i64,

        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Run the same query against several configurations side by side
    Compare {
        #[arg(short, long, default_value = "")]
        q: String,

        #[arg(short, long)]
        facets: Option<String>,

        #[arg(short, long, default_value = "10")]
        limit: i64,

        #[arg(short, long, value_delimiter = ',', default_value = "v1,v2")]
        configs: Vec<String>,
    },

    /// List configurations
    Configs,

    /// Check server health
    Health,
}

fn search_params(
    q: &str,
    facets: Option<&str>,
    sort: Option<&str>,
    page: i64,
    limit: i64,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("q", q.to_string()),
        ("page", page.to_string()),
        ("limit", limit.to_string()),
    ];
    if let Some(facets) = facets {
        params.push(("facets", facets.to_string()));
    }
    if let Some(sort) = sort {
        params.push(("sort", sort.to_string()));
    }
    params
}

async fn get_json(client: &Client, url: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?;

    let status = response.status();
    let body: Value = response.json().await.context("response is not JSON")?;

    if !status.is_success() {
        bail!("{} returned {}: {}", url, status, body["error"]["message"]);
    }
    Ok(body)
}

fn hit_ids(body: &Value, key: &str) -> Vec<String> {
    body["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .map(|hit| {
                    hit[key]
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| hit[key].to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Search {
            config,
            q,
            facets,
            sort,
            page,
            limit,
        } => {
            let body = get_json(
                &client,
                &format!("{}/search/{}", cli.endpoint, config),
                &search_params(&q, facets.as_deref(), sort.as_deref(), page, limit),
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Compare {
            q,
            facets,
            limit,
            configs,
        } => {
            let params = search_params(&q, facets.as_deref(), None, 1, limit);
            let requests = configs.iter().map(|config| {
                let url = format!("{}/search/{}", cli.endpoint, config);
                let client = &client;
                let params = &params;
                async move { get_json(client, &url, params).await }
            });
            let results = futures::future::join_all(requests).await;

            println!("Query: {:?}", q);
            println!();
            for (config, result) in configs.iter().zip(results) {
                match result {
                    Ok(body) => {
                        println!(
                            "{:<8} total hits: {}",
                            config, body["estimatedTotalHits"]
                        );
                        println!("{:<8} top ids:    {}", "", hit_ids(&body, "id").join(", "));
                    }
                    Err(e) => println!("{:<8} error: {:#}", config, e),
                }
            }
        }

        Commands::Configs => {
            let body = get_json(&client, &format!("{}/configurations", cli.endpoint), &[]).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Health => {
            let body = get_json(&client, &format!("{}/health", cli.endpoint), &[]).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}
