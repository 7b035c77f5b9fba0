use cost_of_living_advisor::{
    cli::{is_exit_command, ChatSession, MenuChoice},
    config::AdvisorConfig,
    dataset::CityDataset,
    gateway::LlmGateway,
    providers::{build_http_client, default_providers},
};
use std::sync::Arc;
use tokio::io::{stdout, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = AdvisorConfig::from_env()?;

    let client = build_http_client()?;
    let mut gateway = LlmGateway::new(default_providers(&config.providers, &client))
        .with_parallel(config.providers.parallel);

    match CityDataset::load(&config.assets.city_data) {
        Ok(dataset) => gateway = gateway.with_dataset(Arc::new(dataset)),
        Err(e) => warn!("Answering without city context: {}", e),
    }

    info!(
        providers = ?gateway.provider_names(),
        parallel = config.providers.parallel,
        "Gateway ready"
    );

    let mut session = ChatSession::new(&gateway);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("\nWelcome to the multi-provider cost of living advisor\n");

    loop {
        let Some(query) = prompt(&mut lines, "\nYou: ").await? else {
            break;
        };
        let query = query.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit_command(query) {
            break;
        }

        println!("\nFetching responses...\n");
        let outcomes = session.ask(&gateway, query).await;
        for outcome in &outcomes {
            println!("\n{}: {}\n", outcome.provider, outcome.display_text());
        }
        session.record(query, &outcomes);

        // Re-prompt until the menu answer parses
        loop {
            print!("\n{}", session.menu());
            let Some(answer) = prompt(&mut lines, "Select: ").await? else {
                return Ok(());
            };
            match session.parse_choice(&answer) {
                MenuChoice::Select(selection) => {
                    session.select(selection);
                    break;
                }
                MenuChoice::Continue => break,
                MenuChoice::Exit => return Ok(()),
                MenuChoice::Invalid => println!("Unrecognized choice: {}", answer.trim()),
            }
        }
    }

    Ok(())
}

/// `None` on EOF
async fn prompt(
    lines: &mut Lines<BufReader<Stdin>>,
    label: &str,
) -> std::io::Result<Option<String>> {
    let mut out = stdout();
    out.write_all(label.as_bytes()).await?;
    out.flush().await?;
    lines.next_line().await
}
