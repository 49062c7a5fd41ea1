use crate::{
    error::ApiError,
    models::{RecommendationRequest, RecommendationResponse},
    services::{PipelineOutcome, RecommendationPipeline},
};
use actix_web::{
    web::{self, Json},
    HttpRequest, HttpResponse,
};
use tracing::{error, warn};

pub fn recommendations_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/recommendations")
            .route(web::post().to(get_recommendations))
            .default_service(web::to(method_not_allowed)),
    );
}

/// Rejects malformed JSON bodies with the standard error envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        warn!("Rejected recommendation body: {}", err);
        ApiError::InvalidInput(err.to_string()).into()
    })
}

/// Recommend islands for the submitted travel preferences
pub async fn get_recommendations(
    request: Json<RecommendationRequest>,
    pipeline: Option<web::Data<RecommendationPipeline>>,
) -> Result<HttpResponse, ApiError> {
    let Some(pipeline) = pipeline else {
        error!("Recommendation pipeline is not configured");
        return Err(ApiError::Configuration(
            "Recommendation pipeline is not configured".to_string(),
        ));
    };

    let preferences = request.into_inner().into_preferences()?;

    let response = match pipeline.recommend(&preferences).await? {
        PipelineOutcome::Matched(items) => RecommendationResponse {
            recommendation: items,
            message: None,
        },
        PipelineOutcome::NoMatch { message } => RecommendationResponse {
            recommendation: Vec::new(),
            message: Some(message),
        },
    };

    Ok(HttpResponse::Ok().json(response))
}

async fn method_not_allowed(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    Err(ApiError::MethodNotAllowed(format!(
        "{} is not supported on {}",
        req.method(),
        req.path()
    )))
}
