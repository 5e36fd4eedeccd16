//! Native host: actix-web in front of the same handlers the Spin component
//! uses. Requests are translated to spin types and back.

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

use crate::context::Services;
use crate::core::db::IdentityStore;
use crate::handlers;

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            _ => Method::Get,
        };

        let uri = req.uri().to_string();
        let mut builder = Request::builder();
        builder.method(method).uri(&uri);
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }
        builder.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(*spin_resp.status())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

        actix_web::HttpResponse::build(status)
            .content_type("application/json")
            .body(spin_resp.body().to_vec())
    }
}

async fn handle_all<S: IdentityStore + 'static>(
    services: web::Data<Services<S>>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let spin_req = adapter::actix_to_spin_request(&req, body);
    let spin_resp = handlers::handle(services.get_ref(), spin_req).await;
    adapter::spin_to_actix_response(spin_resp)
}

/// Routes every path to the shared request entry.
pub fn routes<S: IdentityStore + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/{tail:.*}", web::route().to(handle_all::<S>));
}

pub async fn run<S>(services: Services<S>, bind_addr: &str) -> std::io::Result<()>
where
    S: IdentityStore + Send + Sync + 'static,
{
    let data = web::Data::new(services);
    tracing::info!(%bind_addr, "server listening");

    HttpServer::new(move || App::new().app_data(data.clone()).configure(routes::<S>))
        .bind(bind_addr)?
        .run()
        .await
}
