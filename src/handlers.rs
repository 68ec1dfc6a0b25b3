//! HTTP handlers. Each one resolves the caller, calls a single component
//! operation and answers with JSON: a view model for pages, a notice with the
//! next location for form submissions.

use axum::extract::{Form, Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::{self, NewAccount, SESSION_COOKIE};
use crate::availability;
use crate::booking;
use crate::catalog::{self, ServiceInput};
use crate::error::{AppError, AppResult};
use crate::models::{parse_date, parse_time, Price, Role, UserId};
use crate::profile::{self, ContactUpdate};
use crate::queries;
use crate::routes::{AppState, CurrentUser};

#[derive(Debug, Serialize)]
pub struct Notice {
    pub level: &'static str,
    pub message: String,
    pub redirect: &'static str,
}

fn notice(level: &'static str, message: impl Into<String>, redirect: &'static str) -> Json<Notice> {
    Json(Notice {
        level,
        message: message.into(),
        redirect,
    })
}

/// Browsers submit untouched inputs as empty strings.
fn field(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_id(value: Option<String>, name: &str) -> AppResult<Option<i64>> {
    field(value)
        .map(|v| {
            v.parse()
                .map_err(|_| AppError::Validation(format!("invalid {name}: {v:?}")))
        })
        .transpose()
}

fn parse_optional_date(value: Option<String>) -> AppResult<Option<chrono::NaiveDate>> {
    field(value).map(|v| parse_date(&v)).transpose()
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

// ---------------------------------------------------------------------------
// Landing and identity
// ---------------------------------------------------------------------------

pub async fn index(State(state): State<AppState>, user: Option<CurrentUser>) -> AppResult<Response> {
    if let Some(CurrentUser(user)) = user {
        let profile = profile::get(&state.pool, user).await?;
        return Ok(Redirect::to(profile.role.dashboard()).into_response());
    }
    Ok(Json(json!({
        "message": "Book services with independent professionals.",
        "login": "/login/",
        "register": "/cadastro/",
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: Option<String>,
    password: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<(CookieJar, Json<Notice>)> {
    let username = field(form.username).ok_or(AppError::InvalidCredentials)?;
    let password = form.password.unwrap_or_default();
    let profile = auth::authenticate(&state.pool, &username, &password).await?;
    let token = auth::open_session(&state.pool, profile.user_id).await?;
    Ok((
        jar.add(session_cookie(token)),
        notice(
            "success",
            format!("Welcome, {}!", profile.display_name()),
            profile.role.dashboard(),
        ),
    ))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> AppResult<(CookieJar, Json<Notice>)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        auth::close_session(&state.pool, cookie.value()).await?;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, notice("info", "You have logged out.", "/")))
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    username: Option<String>,
    password: Option<String>,
    #[serde(rename = "nome_completo")]
    full_name: Option<String>,
    #[serde(rename = "telefone")]
    phone: Option<String>,
    #[serde(rename = "endereco")]
    address: Option<String>,
    #[serde(rename = "cpf_cnpj")]
    tax_id: Option<String>,
    #[serde(rename = "tipo")]
    kind: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> AppResult<(CookieJar, Json<Notice>)> {
    let role: Role = form.kind.as_deref().unwrap_or_default().parse()?;
    let account = NewAccount {
        username: field(form.username).unwrap_or_default(),
        password: form.password.unwrap_or_default(),
        full_name: field(form.full_name).unwrap_or_default(),
        phone: field(form.phone).unwrap_or_default(),
        address: field(form.address).unwrap_or_default(),
        tax_id: field(form.tax_id).unwrap_or_default(),
        role,
    };
    let full_name = account.full_name.clone();
    let user = auth::register(&state.pool, state.config.bcrypt_cost, account).await?;
    let token = auth::open_session(&state.pool, user).await?;
    Ok((
        jar.add(session_cookie(token)),
        notice(
            "success",
            format!("Welcome, {full_name}! Registration complete."),
            role.dashboard(),
        ),
    ))
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

pub async fn client_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let profile = profile::require_role(&state.pool, user, Role::Client).await?;
    let bookings = booking::list_for_client(&state.pool, user).await?;
    Ok(Json(json!({
        "perfil": profile,
        "agendamentos": bookings,
    })))
}

pub async fn professional_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let profile = profile::require_role(&state.pool, user, Role::Professional).await?;
    let services = catalog::list(&state.pool, user).await?;
    let open = availability::list_open(&state.pool, user, None, None).await?;
    let bookings = booking::list_for_professional(&state.pool, user).await?;
    Ok(Json(json!({
        "perfil": profile,
        "servicos": services,
        "horarios_disponiveis": open,
        "agendamentos": bookings,
    })))
}

// ---------------------------------------------------------------------------
// Booking (client)
// ---------------------------------------------------------------------------

pub async fn booking_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    profile::require_role(&state.pool, user, Role::Client).await?;
    let services = catalog::list_all(&state.pool).await?;
    let professionals = queries::professionals(&state.pool).await?;
    Ok(Json(json!({
        "servicos": services,
        "profissionais": professionals,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ReserveForm {
    #[serde(rename = "servico")]
    service: Option<String>,
    #[serde(rename = "profissional")]
    professional: Option<String>,
    #[serde(rename = "data")]
    date: Option<String>,
    #[serde(rename = "hora")]
    time: Option<String>,
}

pub async fn reserve(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ReserveForm>,
) -> AppResult<Json<Notice>> {
    let incomplete = || AppError::Validation("please fill in all fields before booking".to_owned());
    let service = parse_id(form.service, "service")?.ok_or_else(incomplete)?;
    let professional = parse_id(form.professional, "professional")?.ok_or_else(incomplete)?;
    let date = field(form.date).ok_or_else(incomplete)?;
    let time = field(form.time).ok_or_else(incomplete)?;

    booking::reserve(
        &state.pool,
        user,
        service,
        professional,
        parse_date(&date)?,
        parse_time(&time)?,
    )
    .await?;
    Ok(notice("success", "Booking confirmed!", Role::Client.dashboard()))
}

#[derive(Debug, Deserialize)]
pub struct ProfessionalsQuery {
    #[serde(rename = "servico")]
    service: Option<String>,
}

/// Public lookup. Bad input and failures both degrade to an empty list.
pub async fn find_professionals(
    State(state): State<AppState>,
    Query(query): Query<ProfessionalsQuery>,
) -> Json<Value> {
    let service = field(query.service).and_then(|v| v.parse().ok());
    let professionals = queries::professionals_for_service(&state.pool, service)
        .await
        .unwrap_or_else(|e| {
            error!("professional lookup failed: {e}");
            Vec::new()
        });
    Json(json!({ "profissionais": professionals }))
}

#[derive(Debug, Deserialize)]
pub struct OpenTimesQuery {
    #[serde(rename = "profissional")]
    professional: Option<String>,
    #[serde(rename = "data")]
    date: Option<String>,
}

pub async fn find_open_times(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(query): Query<OpenTimesQuery>,
) -> Json<Value> {
    let professional = field(query.professional).and_then(|v| v.parse().ok());
    let date = field(query.date).and_then(|v| parse_date(&v).ok());
    let times = queries::open_slots(&state.pool, professional, date)
        .await
        .unwrap_or_else(|e| {
            error!("open slot lookup failed: {e}");
            Vec::new()
        });
    Json(json!({ "horarios": times }))
}

// ---------------------------------------------------------------------------
// Bookings (edit / cancel)
// ---------------------------------------------------------------------------

pub async fn cancel_booking(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Notice>> {
    let cancelled = booking::cancel(&state.pool, user, id).await?;
    let redirect = if cancelled.professional_id == user {
        Role::Professional.dashboard()
    } else {
        Role::Client.dashboard()
    };
    Ok(notice("warning", "Booking cancelled.", redirect))
}

pub async fn show_booking(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let details = booking::get_for_professional(&state.pool, user, id).await?;
    let open = availability::list_open(&state.pool, user, None, None).await?;
    Ok(Json(json!({
        "agendamento": details,
        "horarios": open,
    })))
}

#[derive(Debug, Deserialize)]
pub struct MoveForm {
    #[serde(rename = "data")]
    date: Option<String>,
    #[serde(rename = "hora")]
    time: Option<String>,
}

impl MoveForm {
    fn parse(self) -> AppResult<(chrono::NaiveDate, chrono::NaiveTime)> {
        let incomplete = || AppError::Validation("fill in the date and the time".to_owned());
        let date = field(self.date).ok_or_else(incomplete)?;
        let time = field(self.time).ok_or_else(incomplete)?;
        Ok((parse_date(&date)?, parse_time(&time)?))
    }
}

pub async fn reschedule_booking(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<MoveForm>,
) -> AppResult<Json<Notice>> {
    let (date, time) = form.parse()?;
    booking::reschedule(&state.pool, user, id, date, time).await?;
    Ok(notice("success", "Booking updated.", Role::Professional.dashboard()))
}

// ---------------------------------------------------------------------------
// Slots (professional)
// ---------------------------------------------------------------------------

pub async fn slot_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    profile::require_role(&state.pool, user, Role::Professional).await?;
    let services = catalog::list(&state.pool, user).await?;
    Ok(Json(json!({
        "horas": availability::hour_options(),
        "servicos": services,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SlotBatchForm {
    #[serde(rename = "servico")]
    service: Option<String>,
    #[serde(rename = "data")]
    date: Option<String>,
    #[serde(rename = "horarios_selecionados")]
    times: Option<String>,
}

pub async fn create_slots(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<SlotBatchForm>,
) -> AppResult<Json<Notice>> {
    let service = parse_id(form.service, "service")?;
    let date = parse_optional_date(form.date)?;
    let times: Vec<String> = form
        .times
        .unwrap_or_default()
        .split(',')
        .map(str::to_owned)
        .collect();
    let created = availability::create_batch(&state.pool, user, service, date, &times).await?;
    Ok(notice(
        "success",
        format!("{} times saved.", created.len()),
        Role::Professional.dashboard(),
    ))
}

pub async fn show_slot(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let slot = availability::get(&state.pool, user, id).await?;
    Ok(Json(json!({ "horario": slot })))
}

pub async fn update_slot(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<MoveForm>,
) -> AppResult<Json<Notice>> {
    let (date, time) = form.parse()?;
    availability::update(&state.pool, user, id, date, time).await?;
    Ok(notice("success", "Time updated.", "/profissional/agenda/"))
}

pub async fn delete_slot(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Notice>> {
    availability::delete(&state.pool, user, id).await?;
    Ok(notice("warning", "Time deleted.", "/profissional/agenda/"))
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    #[serde(rename = "inicio")]
    from: Option<String>,
    #[serde(rename = "fim")]
    to: Option<String>,
}

/// Agenda view: the date range applies only when both ends are given.
pub async fn agenda(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<Value>> {
    let profile = profile::require_role(&state.pool, user, Role::Professional).await?;
    let from = parse_optional_date(range.from)?;
    let to = parse_optional_date(range.to)?;
    let (lower, upper) = match (from, to) {
        (Some(from), Some(to)) => (Some(from), Some(to)),
        _ => (None, None),
    };
    let bookings = booking::list_for_professional(&state.pool, user).await?;
    let open = availability::list_open(&state.pool, user, lower, upper).await?;
    Ok(Json(json!({
        "perfil": profile,
        "agendamentos": bookings,
        "horarios_disponiveis": open,
        "data_inicio": from,
        "data_fim": to,
    })))
}

/// Slot filter: each end of the range is optional on its own.
pub async fn filter_slots(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<Value>> {
    let profile = profile::require_role(&state.pool, user, Role::Professional).await?;
    let from = parse_optional_date(range.from)?;
    let to = parse_optional_date(range.to)?;
    let bookings = booking::list_for_professional(&state.pool, user).await?;
    let open = availability::list_open(&state.pool, user, from, to).await?;
    Ok(Json(json!({
        "perfil": profile,
        "agendamentos": bookings,
        "horarios_disponiveis": open,
        "data_inicio": from,
        "data_fim": to,
    })))
}

// ---------------------------------------------------------------------------
// Services (professional)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ServiceForm {
    #[serde(rename = "nome")]
    name: Option<String>,
    #[serde(rename = "descricao")]
    description: Option<String>,
    #[serde(rename = "preco")]
    price: Option<String>,
    #[serde(rename = "duracao")]
    duration: Option<String>,
}

impl TryFrom<ServiceForm> for ServiceInput {
    type Error = AppError;

    fn try_from(form: ServiceForm) -> AppResult<Self> {
        let name = field(form.name)
            .ok_or_else(|| AppError::Validation("service name is required".to_owned()))?;
        let price: Price = field(form.price)
            .ok_or_else(|| AppError::Validation("price is required".to_owned()))?
            .parse()?;
        let duration = field(form.duration)
            .ok_or_else(|| AppError::Validation("duration is required".to_owned()))?;
        let duration = duration
            .parse()
            .map_err(|_| AppError::Validation(format!("invalid duration: {duration:?}")))?;
        Ok(ServiceInput {
            name,
            description: field(form.description),
            price,
            duration,
        })
    }
}

pub async fn list_services(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let services = catalog::list(&state.pool, user).await?;
    Ok(Json(json!({ "servicos": services })))
}

pub async fn create_service(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ServiceForm>,
) -> AppResult<Json<Notice>> {
    catalog::create(&state.pool, user, form.try_into()?).await?;
    Ok(notice("success", "Service created.", "/servicos/"))
}

pub async fn show_service(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let service = catalog::get(&state.pool, user, id).await?;
    Ok(Json(json!({ "servico": service })))
}

pub async fn update_service(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<ServiceForm>,
) -> AppResult<Json<Notice>> {
    catalog::update(&state.pool, user, id, form.try_into()?).await?;
    Ok(notice("success", "Service updated.", "/servicos/"))
}

pub async fn delete_service(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Notice>> {
    catalog::delete(&state.pool, user, id).await?;
    Ok(notice("warning", "Service deleted.", "/servicos/"))
}

// ---------------------------------------------------------------------------
// Own data
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(rename = "nome_completo")]
    full_name: Option<String>,
    #[serde(rename = "telefone")]
    phone: Option<String>,
    #[serde(rename = "endereco")]
    address: Option<String>,
    #[serde(rename = "cpf_cnpj")]
    tax_id: Option<String>,
    #[serde(rename = "nova_senha")]
    new_password: Option<String>,
}

impl ContactForm {
    fn update(&mut self, with_tax_id: bool) -> ContactUpdate {
        ContactUpdate {
            full_name: field(self.full_name.take()).unwrap_or_default(),
            phone: field(self.phone.take()).unwrap_or_default(),
            address: field(self.address.take()).unwrap_or_default(),
            tax_id: if with_tax_id { field(self.tax_id.take()) } else { None },
        }
    }
}

pub async fn show_my_data(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let profile = profile::get(&state.pool, user).await?;
    Ok(Json(json!({ "perfil": profile })))
}

/// Contact details plus an optional password change.
pub async fn update_my_data(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(mut form): Form<ContactForm>,
) -> AppResult<Json<Notice>> {
    profile::update_contact(&state.pool, user, form.update(false)).await?;
    if let Some(password) = form.new_password.filter(|p| !p.is_empty()) {
        auth::set_password(&state.pool, state.config.bcrypt_cost, user, &password).await?;
    }
    Ok(notice("success", "Your data has been updated.", "/meus-dados/"))
}

async fn show_role_profile(
    state: &AppState,
    user: UserId,
    role: Role,
) -> AppResult<Json<Value>> {
    let profile = profile::require_role(&state.pool, user, role).await?;
    Ok(Json(json!({ "perfil": profile })))
}

async fn update_role_profile(
    state: &AppState,
    user: UserId,
    role: Role,
    mut form: ContactForm,
) -> AppResult<Json<Notice>> {
    profile::require_role(&state.pool, user, role).await?;
    profile::update_contact(&state.pool, user, form.update(true)).await?;
    let redirect = match role {
        Role::Professional => "/profissional/perfil/",
        Role::Client => "/cliente/perfil/",
    };
    Ok(notice("success", "Your data has been updated.", redirect))
}

pub async fn show_professional_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    show_role_profile(&state, user, Role::Professional).await
}

pub async fn update_professional_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ContactForm>,
) -> AppResult<Json<Notice>> {
    update_role_profile(&state, user, Role::Professional, form).await
}

pub async fn show_client_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    show_role_profile(&state, user, Role::Client).await
}

pub async fn update_client_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ContactForm>,
) -> AppResult<Json<Notice>> {
    update_role_profile(&state, user, Role::Client, form).await
}
