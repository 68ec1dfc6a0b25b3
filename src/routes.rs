use std::sync::Arc;
use std::time::Instant;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::CookieJar;
use log::info;
use sqlx::SqlitePool;

use crate::auth::{self, SESSION_COOKIE};
use crate::config::Config;
use crate::error::AppError;
use crate::handlers;
use crate::models::UserId;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        AppState {
            pool,
            config: Arc::new(config),
        }
    }
}

/// The identity behind the session cookie. Rejects with 401 when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(SESSION_COOKIE).ok_or(AppError::Unauthenticated)?;
        auth::resolve_session(&state.pool, token.value())
            .await?
            .map(CurrentUser)
            .ok_or(AppError::Unauthenticated)
    }
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(request).await;
    info!(
        "{method} {path} -> {} ({} ms)",
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login/", post(handlers::login))
        .route("/logout/", get(handlers::logout).post(handlers::logout))
        .route("/cadastro/", post(handlers::register))
        .route("/cliente/dashboard/", get(handlers::client_dashboard))
        .route("/profissional/dashboard/", get(handlers::professional_dashboard))
        .route(
            "/cliente/agendar/",
            get(handlers::booking_form).post(handlers::reserve),
        )
        .route("/buscar_profissionais/", get(handlers::find_professionals))
        .route("/buscar_horarios/", get(handlers::find_open_times))
        .route(
            "/profissional/horario/novo/",
            get(handlers::slot_form).post(handlers::create_slots),
        )
        .route("/servicos/", get(handlers::list_services))
        .route("/servicos/novo/", post(handlers::create_service))
        .route(
            "/servicos/:id/editar/",
            get(handlers::show_service).post(handlers::update_service),
        )
        .route("/servicos/:id/excluir/", post(handlers::delete_service))
        .route("/agendamento/:id/cancelar/", post(handlers::cancel_booking))
        .route(
            "/agendamento/:id/editar/",
            get(handlers::show_booking).post(handlers::reschedule_booking),
        )
        .route(
            "/meus-dados/",
            get(handlers::show_my_data).post(handlers::update_my_data),
        )
        .route("/profissional/agenda/", get(handlers::agenda))
        .route(
            "/profissional/perfil/",
            get(handlers::show_professional_profile).post(handlers::update_professional_profile),
        )
        .route(
            "/cliente/perfil/",
            get(handlers::show_client_profile).post(handlers::update_client_profile),
        )
        .route(
            "/horarios/editar/:id/",
            get(handlers::show_slot).post(handlers::update_slot),
        )
        .route("/horarios/excluir/:id/", post(handlers::delete_slot))
        .route("/horarios/filtro/", get(handlers::filter_slots))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}
