use crate::{
    config::Config,
    error::Result,
    handlers::json_config,
    ml::{OpenAiChatGenerator, OpenAiEmbedder},
    routes::api_routes,
    services::{build_http_client, PipelineSettings, RecommendationPipeline, SupabaseClient},
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;
use std::net::TcpListener;
use std::sync::Arc;

pub struct Application {
    port: u16,
    host: String,
    pipeline: RecommendationPipeline,
}

impl Application {
    /// Wire the model and vector store clients into a single pipeline.
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(config)?;

        let embedder = OpenAiEmbedder::new(client.clone(), config);
        let generator = OpenAiChatGenerator::new(client.clone(), config);
        let store = SupabaseClient::new(client, config);
        info!(
            "Using embedding model {} and chat model {}",
            embedder.model_name(),
            config.chat_model
        );

        Ok(Self {
            port: config.port,
            host: config.host.clone(),
            pipeline: RecommendationPipeline::new(
                Arc::new(embedder),
                Arc::new(store),
                Arc::new(generator),
                PipelineSettings::from(config),
            ),
        })
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        let bind_address = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&bind_address)?;
        info!("Starting server at http://{}", bind_address);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    /// This is useful for testing where we want to use a random port
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let pipeline = web::Data::new(self.pipeline.clone());

        let server = HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .app_data(pipeline.clone())
                .app_data(json_config())
                .service(api_routes())
        })
        .listen(listener)?
        .run();

        server.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[actix_web::test]
    async fn test_application_serves_health() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Application::new(&test_config()).unwrap();
        let server = actix_web::rt::spawn(async move { app.run_with_listener(listener).await });

        let client = reqwest::Client::new();
        let health = client
            .get(format!("http://{}/api/health", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(health.status(), 200);

        let rejected = client
            .delete(format!("http://{}/api/recommendations", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), 405);

        server.abort();
    }
}
