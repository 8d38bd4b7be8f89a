use credit_agent_orchestrator::{
    agents::create_default_registry,
    api::start_server,
    bureau::SimulatedBureau,
    directory::InMemoryDirectory,
    llm::GeminiClient,
    orchestrator::Orchestrator,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 Agent calls will fail until it is configured");
        String::new()
    });

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("🚀 Credit Agent Orchestrator - API Server");
    info!("📍 Port: {}", api_port);

    // Create components
    let llm = Arc::new(GeminiClient::new(gemini_api_key)?);
    let registry = create_default_registry();
    let directory = Arc::new(InMemoryDirectory::new());
    let bureau = Arc::new(SimulatedBureau::new());

    let orchestrator = Arc::new(Orchestrator::new(llm, registry, directory, bureau));

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(orchestrator, api_port).await?;

    Ok(())
}
