#![cfg(feature = "web")]
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error as ThisError;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::downloader::{facturas_to_csv, facturas_to_xlsx, monthly_costs_to_xlsx, report_filename};
use crate::error::{AuthError, StoreError, ValidationErrors};
use crate::forms::{CategoriaForm, FacturaForm, PerfilForm, UsuarioForm};
use crate::graph::{ChartOptions, department_spend_chart, monthly_costs_chart, yearly_totals_chart};
use crate::kpi::{
    annual_total, available_years, default_year, filtered_total, generate_dashboard_kpis,
    monthly_costs, status_breakdown, visible_total, yearly_totals,
};
use crate::model::{MOEDA_PADRAO, MessageKind, User};
use crate::permissions::{
    Permissoes, can_access_settings, can_approve_factura, can_create_factura, can_create_user,
    can_delete_factura, can_edit_factura, can_edit_user, can_export_reports,
    can_manage_categorias, can_manage_permissions, can_view_factura, can_view_user, navigation,
    report_facturas, visible_facturas, visible_users,
};
use crate::saving;
use crate::seed::SeedGenerator;
use crate::store::DataStore;
use crate::table::{DataTable, Record, TableView};

pub const SESSION_COOKIE: &str = "session";

/// List screens that keep their own table state per session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum ListKind {
    Facturas,
    Usuarios,
    Categorias,
}

pub struct AppState {
    store: Mutex<DataStore>,
    auth: Mutex<AuthService>,
    tables: Mutex<HashMap<(String, ListKind), DataTable>>,
    generator: Mutex<SeedGenerator>,
    snapshot_path: PathBuf,
}

impl AppState {
    pub fn new(
        store: DataStore,
        auth: AuthService,
        generator: SeedGenerator,
        snapshot_path: PathBuf,
    ) -> Self {
        AppState {
            store: Mutex::new(store),
            auth: Mutex::new(auth),
            tables: Mutex::new(HashMap::new()),
            generator: Mutex::new(generator),
            snapshot_path,
        }
    }

    /// Number of list states currently kept across all sessions
    pub fn open_tables(&self) -> usize {
        lock(&self.tables).len()
    }

    /// Loads the snapshot from the data directory, or seeds a fresh store
    pub fn from_config(config: &AppConfig) -> Result<Self, Box<dyn Error>> {
        let mut generator = SeedGenerator::new(config.seed);
        let snapshot_path = config.snapshot_path();
        let store = if snapshot_path.exists() {
            saving::load_store(&snapshot_path)?
        } else {
            DataStore::seeded(&mut generator, config.facturas, config.users)
        };

        let mut auth = AuthService::new(&config.data_dir);
        auth.seed_admin()?;

        Ok(AppState::new(store, auth, generator, snapshot_path))
    }
}

/// Locks a mutex, recovering the data if a handler panicked while holding it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("Sem permissão para esta operação")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn unauthenticated() -> Self {
        ApiError::Unauthorized("Sessão inválida ou expirada".to_string())
    }

    fn internal(e: impl std::fmt::Display) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            warn!("request failed: {}", self);
        }

        let body = match self {
            ApiError::Validation(errors) => serde_json::json!({ "errors": errors.errors }),
            other => serde_json::json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } | StoreError::ConversationNotFound(_) => {
                ApiError::NotFound(e.to_string())
            }
            StoreError::NotParticipant { .. } => ApiError::Forbidden,
            StoreError::Validation(errors) => ApiError::Validation(errors),
            StoreError::DuplicateInvoiceNumber(_)
            | StoreError::DuplicateEmail(_)
            | StoreError::UnknownReference { .. } => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials | AuthError::InactiveUser => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::PasswordTooShort => ApiError::BadRequest(e.to_string()),
            AuthError::Hashing(_) | AuthError::SessionIo(_) | AuthError::SessionData(_) => {
                ApiError::internal(e)
            }
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Search, sort and paging parameters of a list request
///
/// `sort` behaves like a column header click: repeating the same key flips
/// the direction. Only the parameters present are applied.
#[derive(Debug, Default, Deserialize)]
pub struct TableQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl TableQuery {
    fn apply(self, table: &mut DataTable) {
        if let Some(n) = self.per_page {
            if n != table.items_per_page() {
                table.set_items_per_page(n);
            }
        }
        if let Some(term) = self.search {
            table.set_search_term(term);
        }
        if let Some(key) = self.sort {
            table.request_sort(key);
        }
        if let Some(page) = self.page {
            table.set_current_page(page);
        }
    }
}

#[derive(Serialize)]
struct ListResponse<'a, R> {
    #[serde(flatten)]
    view: TableView<'a, R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valor_total: Option<f64>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct PasswordChange {
    old_password: String,
    new_password: String,
}

#[derive(Deserialize)]
struct StatusChange {
    status_id: u64,
}

#[derive(Deserialize)]
struct NewConversation {
    recipient_id: u64,
}

#[derive(Deserialize)]
struct NewMessage {
    content: String,
    #[serde(default = "text_kind")]
    kind: MessageKind,
}

fn text_kind() -> MessageKind {
    MessageKind::Text
}

#[derive(Deserialize)]
struct YearQuery {
    year: Option<i32>,
    month: Option<u32>,
}

#[derive(Serialize)]
struct NavEntry {
    label: &'static str,
    href: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/me", get(me).put(update_me))
        .route("/api/me/password", post(change_password))
        .route("/api/nav", get(nav))
        .route("/api/facturas", get(list_facturas).post(create_factura))
        .route(
            "/api/facturas/:id",
            get(get_factura).put(update_factura).delete(delete_factura),
        )
        .route("/api/facturas/:id/status", post(set_factura_status))
        .route("/api/usuarios", get(list_usuarios).post(create_usuario))
        .route("/api/usuarios/:id", put(update_usuario).delete(delete_usuario))
        .route("/api/usuarios/:id/permissoes", put(update_permissoes))
        .route("/api/categorias", get(list_categorias).post(create_categoria))
        .route(
            "/api/categorias/:id",
            put(update_categoria).delete(delete_categoria),
        )
        .route("/api/dashboard", get(dashboard))
        .route("/api/reports/years", get(report_years))
        .route("/api/reports/monthly", get(report_monthly))
        .route("/api/reports/yearly", get(report_yearly))
        .route("/api/reports/total", get(report_total))
        .route("/api/reports/status", get(report_status))
        .route("/api/export/facturas.csv", get(export_facturas_csv))
        .route("/api/export/facturas.xlsx", get(export_facturas_xlsx))
        .route("/api/export/monthly.xlsx", get(export_monthly_xlsx))
        .route("/api/charts/monthly.png", get(chart_monthly))
        .route("/api/charts/yearly.png", get(chart_yearly))
        .route("/api/charts/departments.png", get(chart_departments))
        .route(
            "/api/conversations",
            get(list_conversations).post(start_conversation),
        )
        .route("/api/conversations/:id/messages", post(send_message))
        .route("/api/conversations/:id/read", post(mark_conversation_read))
        .route(
            "/api/notifications",
            get(list_notifications).delete(clear_notifications),
        )
        .route("/api/save", post(save_snapshot))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    let state = Arc::new(AppState::from_config(&config)?);
    let app = router(state);

    let listener = TcpListener::bind(&config.addr).await?;
    info!("Listening on http://{}", config.addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Token and user of the request's session
fn session(state: &AppState, jar: &CookieJar) -> ApiResult<(String, User)> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(ApiError::unauthenticated)?;
    let Some(user_id) = lock(&state.auth).validate_session(&token) else {
        forget_tables(state, &[token]);
        return Err(ApiError::unauthenticated());
    };
    let user = lock(&state.store)
        .user(user_id)
        .cloned()
        .ok_or_else(ApiError::unauthenticated)?;
    if !user.ativo {
        return Err(ApiError::unauthenticated());
    }
    Ok((token, user))
}

/// Drops the list state kept for sessions that no longer exist
fn forget_tables(state: &AppState, tokens: &[String]) {
    if tokens.is_empty() {
        return;
    }
    lock(&state.tables).retain(|(token, _), _| !tokens.contains(token));
}

fn require(allowed: bool) -> ApiResult<()> {
    if allowed { Ok(()) } else { Err(ApiError::Forbidden) }
}

/// Applies the query to the session's table for `kind` and renders `rows`
fn list_view<R: Record + Serialize>(
    state: &AppState,
    token: &str,
    kind: ListKind,
    query: TableQuery,
    rows: &[R],
    total: impl Fn(&[&R]) -> Option<f64>,
) -> ApiResult<serde_json::Value> {
    let mut tables = lock(&state.tables);
    let table = tables
        .entry((token.to_string(), kind))
        .or_insert_with(DataTable::default);
    query.apply(table);

    let view = table.view(rows);
    let valor_total = total(view.current_data.as_slice());
    serde_json::to_value(ListResponse { view, valor_total }).map_err(ApiError::internal)
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<User>)> {
    let session = {
        let mut store = lock(&state.store);
        lock(&state.auth).login(&mut store, &request.email, &request.password)?
    };
    let expired = lock(&state.auth).purge_expired();
    forget_tables(&state, &expired);

    let mut cookie = Cookie::new(SESSION_COOKIE, session.token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    Ok((jar.add(cookie), Json(session.user)))
}

async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> ApiResult<CookieJar> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let token = cookie.value().to_string();
        lock(&state.auth).logout(&token)?;
        forget_tables(&state, &[token]);
    }
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    Ok(jar.remove(cookie))
}

async fn me(State(state): State<Arc<AppState>>, jar: CookieJar) -> ApiResult<Json<User>> {
    let (_, user) = session(&state, &jar)?;
    Ok(Json(user))
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<PerfilForm>,
) -> ApiResult<Json<User>> {
    let (_, user) = session(&state, &jar)?;
    let updated = lock(&state.store).update_profile(user.id, form)?.clone();
    lock(&state.auth).update_current_user(&updated)?;
    Ok(Json(updated))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(change): Json<PasswordChange>,
) -> ApiResult<StatusCode> {
    let (_, user) = session(&state, &jar)?;
    lock(&state.auth).change_password(user.id, &change.old_password, &change.new_password)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn nav(State(state): State<Arc<AppState>>, jar: CookieJar) -> ApiResult<Json<Vec<NavEntry>>> {
    let (_, user) = session(&state, &jar)?;
    let entries = navigation(Some(&user))
        .into_iter()
        .map(|item| NavEntry {
            label: item.label(),
            href: item.href(),
        })
        .collect();
    Ok(Json(entries))
}

async fn list_facturas(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<TableQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let (token, user) = session(&state, &jar)?;
    let rows = visible_facturas(&user, lock(&state.store).facturas());
    let body = list_view(&state, &token, ListKind::Facturas, query, &rows, |current| {
        Some(visible_total(current))
    })?;
    Ok(Json(body))
}

async fn get_factura(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
) -> ApiResult<Json<crate::model::Factura>> {
    let (_, user) = session(&state, &jar)?;
    let factura = lock(&state.store)
        .factura(id)
        .cloned()
        .filter(|f| can_view_factura(&user, f))
        .ok_or_else(|| ApiError::NotFound(format!("fatura {} não encontrada", id)))?;
    Ok(Json(factura))
}

async fn create_factura(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<FacturaForm>,
) -> ApiResult<(StatusCode, Json<crate::model::Factura>)> {
    let (_, user) = session(&state, &jar)?;
    require(can_create_factura(&user))?;
    let factura = lock(&state.store).add_factura(form, &user)?.clone();
    Ok((StatusCode::CREATED, Json(factura)))
}

async fn update_factura(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
    Json(form): Json<FacturaForm>,
) -> ApiResult<Json<crate::model::Factura>> {
    let (_, user) = session(&state, &jar)?;
    let mut store = lock(&state.store);
    let existing = store.factura(id).ok_or(StoreError::NotFound {
        entity: "fatura",
        id,
    })?;
    require(can_edit_factura(&user, existing))?;
    Ok(Json(store.update_factura(id, form, &user)?.clone()))
}

async fn set_factura_status(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Json<crate::model::Factura>> {
    let (_, user) = session(&state, &jar)?;
    let mut store = lock(&state.store);
    let existing = store.factura(id).ok_or(StoreError::NotFound {
        entity: "fatura",
        id,
    })?;
    require(can_approve_factura(&user, existing))?;
    Ok(Json(store.set_factura_status(id, change.status_id, &user)?.clone()))
}

async fn delete_factura(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    let (_, user) = session(&state, &jar)?;
    require(can_delete_factura(&user))?;
    lock(&state.store).delete_factura(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_usuarios(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<TableQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let (token, user) = session(&state, &jar)?;
    let rows = visible_users(&user, lock(&state.store).users());
    let body = list_view(&state, &token, ListKind::Usuarios, query, &rows, |_| None)?;
    Ok(Json(body))
}

async fn create_usuario(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<UsuarioForm>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let (_, user) = session(&state, &jar)?;
    require(can_create_user(&user))?;

    let password = form.password.clone();
    let mut store = lock(&state.store);
    let created = store.add_user(form)?.clone();
    if let Some(password) = password {
        if let Err(e) = lock(&state.auth).set_password(created.id, &password) {
            store.delete_user(created.id)?;
            return Err(e.into());
        }
    }
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_usuario(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
    Json(form): Json<UsuarioForm>,
) -> ApiResult<Json<User>> {
    let (_, user) = session(&state, &jar)?;
    let mut store = lock(&state.store);
    let target = store.user(id).ok_or(StoreError::NotFound {
        entity: "utilizador",
        id,
    })?;
    require(can_view_user(&user, target) && can_edit_user(&user, target))?;

    let updated = store.update_user(id, form)?.clone();
    lock(&state.auth).update_current_user(&updated)?;
    Ok(Json(updated))
}

async fn update_permissoes(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
    Json(permissoes): Json<Permissoes>,
) -> ApiResult<Json<User>> {
    let (_, user) = session(&state, &jar)?;
    require(can_manage_permissions(&user))?;
    let updated = lock(&state.store).update_permissions(id, permissoes)?.clone();
    lock(&state.auth).update_current_user(&updated)?;
    Ok(Json(updated))
}

async fn delete_usuario(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    let (_, user) = session(&state, &jar)?;
    if id == user.id {
        return Err(ApiError::BadRequest(
            "Não é possível eliminar o próprio utilizador".to_string(),
        ));
    }
    let mut store = lock(&state.store);
    let target = store.user(id).ok_or(StoreError::NotFound {
        entity: "utilizador",
        id,
    })?;
    require(can_view_user(&user, target) && can_edit_user(&user, target))?;

    store.delete_user(id)?;
    let tokens = lock(&state.auth).remove_user(id);
    forget_tables(&state, &tokens);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_categorias(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<TableQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let (token, _) = session(&state, &jar)?;
    let rows = lock(&state.store).categorias().to_vec();
    let body = list_view(&state, &token, ListKind::Categorias, query, &rows, |_| None)?;
    Ok(Json(body))
}

async fn create_categoria(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<CategoriaForm>,
) -> ApiResult<(StatusCode, Json<crate::model::CategoriaFactura>)> {
    let (_, user) = session(&state, &jar)?;
    require(can_manage_categorias(&user))?;
    let categoria = lock(&state.store).add_categoria(form)?.clone();
    Ok((StatusCode::CREATED, Json(categoria)))
}

async fn update_categoria(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
    Json(form): Json<CategoriaForm>,
) -> ApiResult<Json<crate::model::CategoriaFactura>> {
    let (_, user) = session(&state, &jar)?;
    require(can_manage_categorias(&user))?;
    Ok(Json(lock(&state.store).update_categoria(id, form)?.clone()))
}

async fn delete_categoria(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    let (_, user) = session(&state, &jar)?;
    require(can_manage_categorias(&user))?;
    lock(&state.store).delete_categoria(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<Json<crate::kpi::DashboardKpi>> {
    let (_, user) = session(&state, &jar)?;
    let store = lock(&state.store);
    let facturas = visible_facturas(&user, store.facturas());
    let kpis = generate_dashboard_kpis(&facturas, store.departamentos(), Utc::now().date_naive());
    Ok(Json(kpis))
}

/// Invoices feeding `user`'s reports; users without report access are refused
fn report_rows(state: &AppState, user: &User) -> ApiResult<Vec<crate::model::Factura>> {
    let p = &user.permissoes().relatorios;
    require(p.departamento || p.globais)?;
    Ok(report_facturas(user, lock(&state.store).facturas()))
}

async fn report_years(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<Json<Vec<i32>>> {
    let (_, user) = session(&state, &jar)?;
    let rows = report_rows(&state, &user)?;
    Ok(Json(available_years(&rows)))
}

async fn report_monthly(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let (_, user) = session(&state, &jar)?;
    let rows = report_rows(&state, &user)?;
    let year = query
        .year
        .unwrap_or_else(|| default_year(&rows, Utc::now().date_naive()));
    let monthly = monthly_costs(&rows, year);
    Ok(Json(serde_json::json!({
        "year": year,
        "months": monthly,
        "annual_total": annual_total(&monthly),
    })))
}

async fn report_yearly(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<Json<Vec<crate::kpi::YearValue>>> {
    let (_, user) = session(&state, &jar)?;
    let rows = report_rows(&state, &user)?;
    Ok(Json(yearly_totals(&rows)))
}

async fn report_total(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let (_, user) = session(&state, &jar)?;
    let rows = report_rows(&state, &user)?;
    let year = query
        .year
        .unwrap_or_else(|| default_year(&rows, Utc::now().date_naive()));
    let month = query.month.filter(|m| (1..=12).contains(m));
    Ok(Json(serde_json::json!({
        "year": year,
        "month": month,
        "total": filtered_total(&rows, year, month),
    })))
}

async fn report_status(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<Json<Vec<crate::kpi::StatusCount>>> {
    let (_, user) = session(&state, &jar)?;
    let rows = report_rows(&state, &user)?;
    let statuses = lock(&state.store).statuses().to_vec();
    Ok(Json(status_breakdown(&rows, &statuses)))
}

/// The session's invoice list as currently searched and sorted
fn current_invoice_rows(state: &AppState, token: &str, user: &User) -> Vec<crate::model::Factura> {
    let rows = visible_facturas(user, lock(&state.store).facturas());
    let mut tables = lock(&state.tables);
    let table = tables
        .entry((token.to_string(), ListKind::Facturas))
        .or_insert_with(DataTable::default);
    let view = table.view(&rows);
    view.current_data.into_iter().cloned().collect()
}

fn download(content_type: &str, filename: String, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

async fn export_facturas_csv(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<Response> {
    let (token, user) = session(&state, &jar)?;
    require(can_export_reports(&user))?;
    let rows = current_invoice_rows(&state, &token, &user);
    let refs: Vec<&crate::model::Factura> = rows.iter().collect();
    let csv = facturas_to_csv(&refs).map_err(ApiError::internal)?;
    Ok(download(
        "text/csv; charset=utf-8",
        report_filename("Faturas", "csv"),
        csv.into_bytes(),
    ))
}

async fn export_facturas_xlsx(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<Response> {
    let (token, user) = session(&state, &jar)?;
    require(can_export_reports(&user))?;
    let rows = current_invoice_rows(&state, &token, &user);
    let refs: Vec<&crate::model::Factura> = rows.iter().collect();
    let xlsx = facturas_to_xlsx(&refs).map_err(ApiError::internal)?;
    Ok(download(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        report_filename("Faturas", "xlsx"),
        xlsx,
    ))
}

async fn export_monthly_xlsx(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<YearQuery>,
) -> ApiResult<Response> {
    let (_, user) = session(&state, &jar)?;
    require(can_export_reports(&user))?;
    let rows = report_rows(&state, &user)?;
    let year = query
        .year
        .unwrap_or_else(|| default_year(&rows, Utc::now().date_naive()));
    let xlsx = monthly_costs_to_xlsx(&monthly_costs(&rows, year), year, MOEDA_PADRAO)
        .map_err(ApiError::internal)?;
    Ok(download(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        report_filename(&format!("Custos Mensais {}", year), "xlsx"),
        xlsx,
    ))
}

fn png(body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], body).into_response()
}

async fn chart_monthly(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<YearQuery>,
) -> ApiResult<Response> {
    let (_, user) = session(&state, &jar)?;
    let rows = report_rows(&state, &user)?;
    let year = query
        .year
        .unwrap_or_else(|| default_year(&rows, Utc::now().date_naive()));
    let options = ChartOptions::titled(&format!("Custos Mensais ({})", year), "Mês");
    let image = monthly_costs_chart(&monthly_costs(&rows, year), &options)
        .map_err(ApiError::internal)?;
    Ok(png(image))
}

async fn chart_yearly(State(state): State<Arc<AppState>>, jar: CookieJar) -> ApiResult<Response> {
    let (_, user) = session(&state, &jar)?;
    let rows = report_rows(&state, &user)?;
    let totals = yearly_totals(&rows);
    if totals.is_empty() {
        return Err(ApiError::NotFound("Sem dados para o gráfico".to_string()));
    }
    let options = ChartOptions::titled("Custos Anuais", "Ano");
    let image = yearly_totals_chart(&totals, &options).map_err(ApiError::internal)?;
    Ok(png(image))
}

async fn chart_departments(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<Response> {
    let (_, user) = session(&state, &jar)?;
    let rows = report_rows(&state, &user)?;
    let departamentos = lock(&state.store).departamentos().to_vec();
    let kpis = generate_dashboard_kpis(&rows, &departamentos, Utc::now().date_naive());
    let options = ChartOptions::titled("Gasto por Departamento", "Departamento");
    let image = department_spend_chart(&kpis.gasto_por_departamento, &options)
        .map_err(ApiError::internal)?;
    Ok(png(image))
}

async fn list_conversations(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<Json<serde_json::Value>> {
    let (_, user) = session(&state, &jar)?;
    let mut store = lock(&state.store);
    if store.inbox(user.id).is_none() {
        store.refresh_conversations(&user, &mut lock(&state.generator));
    }
    let inbox = store.inbox_mut(user.id);
    Ok(Json(serde_json::json!({
        "conversations": inbox.conversations(),
        "unread": inbox.unread_count(),
    })))
}

async fn start_conversation(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<NewConversation>,
) -> ApiResult<Json<serde_json::Value>> {
    let (_, user) = session(&state, &jar)?;
    let mut store = lock(&state.store);
    if store.user(request.recipient_id).is_none() {
        return Err(StoreError::NotFound {
            entity: "utilizador",
            id: request.recipient_id,
        }
        .into());
    }
    let id = store
        .inbox_mut(user.id)
        .start_conversation(user.id, request.recipient_id);
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
    Json(message): Json<NewMessage>,
) -> ApiResult<Json<crate::model::Message>> {
    let (_, user) = session(&state, &jar)?;
    if message.content.trim().is_empty() {
        return Err(ApiError::BadRequest("A mensagem está vazia".to_string()));
    }
    let sent = lock(&state.store)
        .inbox_mut(user.id)
        .send_message(id, user.id, &message.content, message.kind)?
        .clone();
    Ok(Json(sent))
}

async fn mark_conversation_read(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    let (_, user) = session(&state, &jar)?;
    let mut store = lock(&state.store);
    let inbox = store.inbox_mut(user.id);
    if inbox.conversation(id).is_none() {
        return Err(StoreError::ConversationNotFound(id).into());
    }
    inbox.mark_as_read(id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<Json<Vec<crate::model::Notification>>> {
    session(&state, &jar)?;
    Ok(Json(lock(&state.store).notifications().to_vec()))
}

async fn clear_notifications(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<StatusCode> {
    session(&state, &jar)?;
    lock(&state.store).clear_notifications();
    Ok(StatusCode::NO_CONTENT)
}

async fn save_snapshot(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<StatusCode> {
    let (_, user) = session(&state, &jar)?;
    require(can_access_settings(&user))?;
    if let Some(dir) = state.snapshot_path.parent() {
        std::fs::create_dir_all(dir).map_err(ApiError::internal)?;
    }
    saving::save_store(&lock(&state.store), &state.snapshot_path).map_err(ApiError::internal)?;
    Ok(StatusCode::NO_CONTENT)
}
