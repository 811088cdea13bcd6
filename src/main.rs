use kb_query::completion::client_from_config;
use kb_query::config::Config;
use kb_query::http_handler::{function_handler, AppState};
use kb_query::knowledge::KnowledgeBase;
use lambda_http::{run, service_fn, tracing, Error};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for CloudWatch logs
    tracing::init_default_subscriber();

    // Resolve configuration once during cold start.
    // A missing API key stops the instance before it can serve anything.
    let config = Config::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        Box::new(e) as Box<dyn std::error::Error + Send + Sync>
    })?;

    let knowledge = KnowledgeBase::load(&config.knowledge_base_path).map_err(|e| {
        tracing::error!(
            path = %config.knowledge_base_path.display(),
            "Failed to load knowledge base: {}",
            e
        );
        Box::new(e) as Box<dyn std::error::Error + Send + Sync>
    })?;

    let completion = client_from_config(&config);
    tracing::info!(
        provider = completion.name(),
        model = %config.generation.model,
        knowledge_len = knowledge.text().len(),
        "Query handler ready"
    );

    // Read-only after this point; each invocation clones the Arc
    let state = Arc::new(AppState {
        knowledge,
        completion,
        params: config.generation,
    });

    run(service_fn(move |event| {
        let state = state.clone();
        function_handler(state, event)
    }))
    .await
}
