use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::Response;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub mod auth;
pub mod call_out_jobs;
pub mod clients;
pub mod daily_logs;
pub mod dashboard;
pub mod documents;
pub mod health;
pub mod profile;
pub mod service_tickets;
pub mod sub_agreements;
pub mod ticket_issues;
pub mod users;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/register", post(auth::register))
        .route("/me", get(auth::me));

    let users_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/stats", get(users::user_stats))
        .route("/roles", get(users::list_roles))
        .route("/bulk-delete", post(users::bulk_delete_users))
        .route("/bulk-approve", post(users::bulk_approve_users))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/:id/reset-password", post(users::reset_password))
        .route("/:id/approve", post(users::approve_user))
        .route("/:id/reject", post(users::reject_user));

    let profile_routes = Router::new()
        .route("/", get(profile::get_profile).put(profile::update_profile))
        .route("/change-password", post(profile::change_password));

    let clients_routes = Router::new()
        .route("/", get(clients::list_clients).post(clients::create_client))
        .route(
            "/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        );

    let agreements_routes = Router::new()
        .route(
            "/",
            get(sub_agreements::list_agreements).post(sub_agreements::create_agreement),
        )
        .route("/stats", get(sub_agreements::agreement_stats))
        .route("/client/:client_id", get(sub_agreements::agreements_by_client))
        .route(
            "/:id",
            get(sub_agreements::get_agreement)
                .put(sub_agreements::update_agreement)
                .delete(sub_agreements::delete_agreement),
        );

    let jobs_routes = Router::new()
        .route(
            "/",
            get(call_out_jobs::list_jobs).post(call_out_jobs::create_job),
        )
        .route("/stats", get(call_out_jobs::job_stats))
        .route("/client/:client_id", get(call_out_jobs::jobs_by_client))
        .route(
            "/:id",
            get(call_out_jobs::get_job)
                .put(call_out_jobs::update_job)
                .delete(call_out_jobs::delete_job),
        )
        .route("/:id/status", patch(call_out_jobs::update_job_status));

    let daily_logs_routes = Router::new()
        .route("/", get(daily_logs::list_logs).post(daily_logs::create_log))
        .route("/client/:client_id", get(daily_logs::logs_by_client))
        .route(
            "/:id",
            get(daily_logs::get_log)
                .put(daily_logs::update_log)
                .delete(daily_logs::delete_log),
        )
        .route("/:id/generate-excel", post(daily_logs::generate_excel))
        .route("/:id/download/:file_type", get(daily_logs::download_file))
        .route(
            "/:id/download-file/:file_type",
            get(daily_logs::download_file_direct),
        );

    let tickets_routes = Router::new()
        .route(
            "/",
            get(service_tickets::list_tickets).post(service_tickets::create_ticket),
        )
        .route("/generate", post(service_tickets::generate_from_logs))
        .route("/client/:client_id", get(service_tickets::tickets_by_client))
        .route(
            "/:id",
            get(service_tickets::get_ticket)
                .put(service_tickets::update_ticket)
                .delete(service_tickets::delete_ticket),
        );

    let issues_routes = Router::new()
        .route(
            "/",
            get(ticket_issues::list_issues).post(ticket_issues::create_issue),
        )
        .route("/ticket/:ticket_id", get(ticket_issues::issues_by_ticket))
        .route(
            "/:id",
            get(ticket_issues::get_issue)
                .put(ticket_issues::update_issue)
                .delete(ticket_issues::delete_issue),
        );

    let documents_routes = Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route("/categories", get(documents::list_categories))
        .route("/stats", get(documents::document_stats))
        .route("/bulk-upload", post(documents::bulk_upload))
        .route("/bulk-delete", post(documents::bulk_delete))
        .route("/client/:client_id", get(documents::documents_by_client))
        .route(
            "/:id",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/:id/download", get(documents::download_document))
        .route(
            "/:id/download-direct",
            get(documents::download_document_direct),
        )
        .route("/:id/preview", get(documents::preview_document));

    let dashboard_routes = Router::new().route("/stats", get(dashboard::stats));

    // Unauthenticated download endpoints keyed by stored filename.
    let public_routes = Router::new()
        .route(
            "/api/daily-logs/public/download/:filename",
            get(daily_logs::public_download),
        )
        .route(
            "/api/documents/public/download/:filename",
            get(documents::public_download),
        );

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/users", users_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/clients", clients_routes)
        .nest("/api/sub-agreements", agreements_routes)
        .nest("/api/call-out-jobs", jobs_routes)
        .nest("/api/daily-logs", daily_logs_routes)
        .nest("/api/service-tickets", tickets_routes)
        .nest("/api/ticket-issues", issues_routes)
        .nest("/api/documents", documents_routes)
        .nest("/api/dashboard", dashboard_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 32))
}

/// Streams stored bytes back to the browser with a filename the client can
/// save. `inline` keeps the browser from forcing a download (previews).
pub(crate) fn file_response(
    file_name: &str,
    mime_type: &str,
    bytes: Vec<u8>,
    inline: bool,
) -> AppResult<Response> {
    let disposition_kind = if inline { "inline" } else { "attachment" };
    let ascii_name: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' { c } else { '_' })
        .collect();
    let encoded = utf8_percent_encode(file_name, NON_ALPHANUMERIC);
    let disposition = format!(
        "{disposition_kind}; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}"
    );

    Response::builder()
        .header(header::CONTENT_TYPE, mime_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(bytes))
        .map_err(|err| AppError::internal(format!("failed to build file response: {err}")))
}
