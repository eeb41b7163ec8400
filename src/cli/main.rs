use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use std::error::Error;

#[derive(Parser)]
#[command(name = "playbook-cli")]
#[command(about = "Playbook API client", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    endpoint: String,

    /// Id of the acting user, sent as X-User-Id
    #[arg(short, long, env = "PLAYBOOK_USER_ID")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search pickup lines
    List {
        #[arg(short, long, default_value = "0")]
        page: u32,

        #[arg(short, long)]
        title: Option<String>,

        /// Comma separated tag ids
        #[arg(long)]
        tags: Option<String>,

        /// ALL, VISIBLE or NOT_VISIBLE
        #[arg(short, long)]
        visibility: Option<String>,

        /// NEW, BEST_OF_ALL_TIME, TRENDING or RANDOM
        #[arg(short, long)]
        sorting: Option<String>,

        #[arg(long)]
        starred: bool,
    },

    /// Show the feed of visible pickup lines
    Feed {
        #[arg(short, long, default_value = "0")]
        page: u32,

        #[arg(short, long)]
        sorting: Option<String>,
    },

    /// React to a pickup line
    React {
        #[arg(value_name = "PICKUP_LINE_ID")]
        id: String,

        #[arg(long)]
        starred: bool,

        /// NONE, UPVOTE or DOWNVOTE
        #[arg(long, default_value = "NONE")]
        vote: String,
    },

    /// Rebuild the search projection from the relational store
    Reindex,

    /// Check server health
    Health,
}

fn with_user(request: RequestBuilder, user: &Option<String>) -> RequestBuilder {
    match user {
        Some(id) => request.header("x-user-id", id),
        None => request,
    }
}

async fn print_response(request: RequestBuilder) -> Result<(), Box<dyn Error>> {
    let response = request.send().await?;
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);

    if !status.is_success() {
        eprintln!("Request failed with status {}", status);
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::List {
            page,
            title,
            tags,
            visibility,
            sorting,
            starred,
        } => {
            let mut query = vec![("page".to_string(), page.to_string())];
            if let Some(title) = title {
                query.push(("title".to_string(), title));
            }
            if let Some(tags) = tags {
                query.push(("tags".to_string(), tags));
            }
            if let Some(visibility) = visibility {
                query.push(("visibility".to_string(), visibility));
            }
            if let Some(sorting) = sorting {
                query.push(("sorting_type".to_string(), sorting));
            }
            if starred {
                query.push(("starred".to_string(), "true".to_string()));
            }

            let request = client
                .get(format!("{}/api/pickup-lines", cli.endpoint))
                .query(&query);
            print_response(with_user(request, &cli.user)).await?;
        }

        Commands::Feed { page, sorting } => {
            let mut query = vec![("page".to_string(), page.to_string())];
            if let Some(sorting) = sorting {
                query.push(("sorting_type".to_string(), sorting));
            }

            let request = client
                .get(format!("{}/api/pickup-lines/feed", cli.endpoint))
                .query(&query);
            print_response(with_user(request, &cli.user)).await?;
        }

        Commands::React { id, starred, vote } => {
            let request = client
                .put(format!("{}/api/pickup-lines/{}/reaction", cli.endpoint, id))
                .json(&json!({
                    "starred": starred,
                    "vote": vote.to_uppercase(),
                }));
            print_response(with_user(request, &cli.user)).await?;
        }

        Commands::Reindex => {
            let request = client.post(format!("{}/admin/reindex", cli.endpoint));
            print_response(request).await?;
        }

        Commands::Health => {
            print_response(client.get(format!("{}/health", cli.endpoint))).await?;
        }
    }

    Ok(())
}
