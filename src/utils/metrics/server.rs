//! HTTP server exposing `/metrics` and `/debug`.
//!
//! `/metrics` serves the Prometheus text exposition of the injected
//! [`Metrics`] registry; `/debug` serves the current feed list as JSON, read
//! from the state shared with the manager.

use actix_web::middleware::{Compress, NormalizePath};
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use std::sync::Arc;
use tracing::{error, info};

use crate::services::monitor::SharedFeedList;
use crate::utils::metrics::Metrics;

/// Metrics endpoint handler.
async fn metrics_handler(metrics: web::Data<Arc<Metrics>>) -> impl Responder {
	metrics.update_system_metrics();

	match metrics.gather() {
		Ok(buffer) => HttpResponse::Ok()
			.content_type("text/plain; version=0.0.4; charset=utf-8")
			.body(buffer),
		Err(e) => {
			error!("Error gathering metrics: {}", e);
			HttpResponse::InternalServerError().finish()
		}
	}
}

/// Debug endpoint handler: the feed list the manager is currently
/// monitoring.
async fn debug_handler(feeds: web::Data<SharedFeedList>) -> impl Responder {
	match feeds.lock() {
		Ok(list) => HttpResponse::Ok().json(&*list),
		Err(e) => {
			error!("Feed list lock poisoned: {}", e);
			HttpResponse::InternalServerError().finish()
		}
	}
}

/// Creates the HTTP server for `/metrics` and `/debug`.
pub fn create_http_server(
	bind_address: String,
	metrics: Arc<Metrics>,
	feeds: SharedFeedList,
) -> std::io::Result<actix_web::dev::Server> {
	info!("Starting HTTP server on {}", bind_address);

	Ok(HttpServer::new(move || {
		App::new()
			.wrap(Compress::default())
			.wrap(NormalizePath::trim())
			.app_data(web::Data::new(metrics.clone()))
			.app_data(web::Data::new(feeds.clone()))
			.route("/metrics", web::get().to(metrics_handler))
			.route("/debug", web::get().to(debug_handler))
	})
	.workers(2)
	.bind(bind_address)?
	.shutdown_timeout(5)
	.run())
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::test;
	use std::sync::Mutex;

	fn test_state() -> (Arc<Metrics>, SharedFeedList) {
		let metrics = Arc::new(Metrics::new().unwrap());
		let feeds: SharedFeedList = Arc::new(Mutex::new(Vec::new()));
		(metrics, feeds)
	}

	#[actix_web::test]
	async fn metrics_endpoint_serves_exposition_format() {
		let (metrics, feeds) = test_state();

		let app = test::init_service(
			App::new()
				.app_data(web::Data::new(metrics.clone()))
				.app_data(web::Data::new(feeds.clone()))
				.route("/metrics", web::get().to(metrics_handler)),
		)
		.await;

		let req = test::TestRequest::get().uri("/metrics").to_request();
		let resp = test::call_service(&app, req).await;
		assert!(resp.status().is_success());

		let content_type = resp
			.headers()
			.get("content-type")
			.unwrap()
			.to_str()
			.unwrap();
		assert_eq!(content_type, "text/plain; version=0.0.4; charset=utf-8");

		let body = test::read_body(resp).await;
		let body_str = String::from_utf8(body.to_vec()).unwrap();
		assert!(body_str.contains("# HELP"));
	}

	#[actix_web::test]
	async fn debug_endpoint_serves_feed_list() {
		let (metrics, feeds) = test_state();

		let app = test::init_service(
			App::new()
				.app_data(web::Data::new(metrics.clone()))
				.app_data(web::Data::new(feeds.clone()))
				.route("/debug", web::get().to(debug_handler)),
		)
		.await;

		let req = test::TestRequest::get().uri("/debug").to_request();
		let resp = test::call_service(&app, req).await;
		assert!(resp.status().is_success());
		assert_eq!(
			resp.headers().get("content-type").unwrap().to_str().unwrap(),
			"application/json"
		);

		let body = test::read_body(resp).await;
		assert_eq!(&body[..], b"[]");
	}
}
