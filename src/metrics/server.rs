use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Registry, TextEncoder};
use std::sync::Arc;

/// Serve `/metrics` (Prometheus text format) and `/health` on the given
/// port. Runs until the process exits; callers put it on its own runtime so
/// scrapes never compete with order traffic.
pub async fn start_metrics_server(registry: Arc<Registry>, port: u16) -> std::io::Result<()> {
    tracing::info!("📊 Starting metrics server on http://0.0.0.0:{}/metrics", port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(registry.clone()))
            .route("/metrics", web::get().to(scrape))
            .route("/health", web::get().to(health))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

async fn scrape(registry: web::Data<Arc<Registry>>) -> impl Responder {
    match TextEncoder::new().encode_to_string(&registry.gather()) {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            tracing::error!(error = %e, "metrics encoding failed");
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "zone-orders",
        "status": "healthy",
    }))
}
