//! In-process fake of the administration backend: cookie session, users and
//! roles kept in memory, same `{success, message, ...}` envelope.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "secret";

#[derive(Debug, Clone)]
pub struct FakeUser {
    pub id: i64,
    pub nombre: String,
    pub email: String,
    pub password: String,
    pub rol_id: i64,
    pub activo: bool,
    pub bloqueado_hasta: Option<String>,
}

impl FakeUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "uuid": format!("00000000-0000-4000-8000-{:012}", self.id),
            "nombre": self.nombre,
            "username": self.nombre,
            "email": self.email,
            "rol_id": self.rol_id,
            "activo": if self.activo { 1 } else { 0 },
            "ultimo_acceso": null,
            "intentos_fallidos": 0,
            "bloqueado_hasta": self.bloqueado_hasta,
            "created_at": "Mon, 01 Jan 2024 00:00:00 GMT",
            "updated_at": null,
        })
    }
}

#[derive(Debug, Default)]
pub struct Backend {
    pub users: Vec<FakeUser>,
    pub roles: Vec<(i64, String, String)>,
    pub sessions: HashMap<String, i64>,
    next_id: i64,
    next_token: u64,
    pub hits: Vec<String>,
}

impl Backend {
    fn seeded() -> Self {
        let mut b = Backend { next_id: 1, ..Default::default() };
        b.roles = vec![(1, "Admin".into(), "Full access".into()), (2, "User".into(), "Read only".into())];
        b.add_user("admin", "admin@example.com", ADMIN_PASSWORD, 1, true, None);
        b.add_user("ana", "ana@example.com", "pw", 2, true, Some("2999-01-01 00:00:00".into()));
        b.add_user("luis", "luis@example.com", "pw", 2, false, None);
        b
    }

    fn add_user(&mut self, nombre: &str, email: &str, pw: &str, rol: i64, activo: bool, lock: Option<String>) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.users.push(FakeUser {
            id,
            nombre: nombre.into(),
            email: email.into(),
            password: pw.into(),
            rol_id: rol,
            activo,
            bloqueado_hasta: lock,
        });
        id
    }

    fn session_user(&self, headers: &HeaderMap) -> Option<&FakeUser> {
        let token = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .find_map(|kv| kv.trim().strip_prefix("session="))?;
        let id = self.sessions.get(token)?;
        self.users.iter().find(|u| u.id == *id)
    }
}

pub type Shared = Arc<Mutex<Backend>>;

pub struct FakeServer {
    pub base_url: String,
    pub state: Shared,
    handle: JoinHandle<()>,
}

impl Drop for FakeServer {
    fn drop(&mut self) { self.handle.abort(); }
}

impl FakeServer {
    pub fn hits(&self, prefix: &str) -> usize {
        self.state.lock().hits.iter().filter(|h| h.starts_with(prefix)).count()
    }
}

pub async fn start() -> anyhow::Result<FakeServer> {
    let state: Shared = Arc::new(Mutex::new(Backend::seeded()));
    let app = Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/user/current", get(current_user))
        .route("/api/check-session", get(check_session))
        .route("/api/users", get(list_users))
        .route("/api/register", post(register))
        .route("/api/users/{id}", put(update_user).delete(delete_user))
        .route("/api/users/{id}/toggle-active", patch(toggle_active))
        .route("/api/users/{id}/unlock", patch(unlock))
        .route("/api/roles", get(list_roles).post(create_role))
        .route("/api/roles/{id}", put(update_role).delete(delete_role))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("fake backend error: {e:?}");
        }
    });
    Ok(FakeServer { base_url: format!("http://{}", addr), state, handle })
}

fn reply(status: StatusCode, body: Value) -> Response { (status, Json(body)).into_response() }

fn unauthorized() -> Response {
    reply(StatusCode::UNAUTHORIZED, json!({"success": false, "message": "No active session"}))
}

macro_rules! authed {
    ($b:expr, $headers:expr) => {
        if $b.session_user(&$headers).is_none() {
            return unauthorized();
        }
    };
}

async fn login(State(s): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut b = s.lock();
    b.hits.push("POST /api/login".into());
    let usuario = body.get("usuario").and_then(Value::as_str).unwrap_or_default();
    let contrasena = body.get("contrasena").and_then(Value::as_str).unwrap_or_default();
    let Some(user) = b.users.iter().find(|u| u.nombre == usuario && u.password == contrasena).cloned() else {
        return reply(StatusCode::UNAUTHORIZED, json!({"success": false, "message": "Invalid credentials"}));
    };
    b.next_token += 1;
    let token = format!("tok{}", b.next_token);
    b.sessions.insert(token.clone(), user.id);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, format!("session={}; Path=/; HttpOnly", token))],
        Json(json!({"success": true, "message": format!("Welcome {}", user.nombre)})),
    )
        .into_response()
}

async fn logout(State(s): State<Shared>, headers: HeaderMap) -> Response {
    let mut b = s.lock();
    b.hits.push("POST /api/logout".into());
    if let Some(id) = b.session_user(&headers).map(|u| u.id) {
        b.sessions.retain(|_, v| *v != id);
    }
    reply(StatusCode::OK, json!({"success": true, "message": "Session closed"}))
}

async fn current_user(State(s): State<Shared>, headers: HeaderMap) -> Response {
    let mut b = s.lock();
    b.hits.push("GET /api/user/current".into());
    match b.session_user(&headers) {
        Some(u) => reply(StatusCode::OK, json!({"success": true, "user": u.to_json()})),
        None => unauthorized(),
    }
}

async fn check_session(State(s): State<Shared>, headers: HeaderMap) -> Response {
    let b = s.lock();
    match b.session_user(&headers) {
        Some(u) => reply(
            StatusCode::OK,
            json!({"success": true, "logged_in": true, "user": {"id": u.id, "username": u.nombre, "rol_id": u.rol_id}}),
        ),
        None => reply(StatusCode::OK, json!({"success": true, "logged_in": false})),
    }
}

async fn list_users(State(s): State<Shared>, headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    let mut b = s.lock();
    b.hits.push(format!("GET /api/users {:?}", {
        let mut keys: Vec<_> = q.iter().map(|(k, v)| format!("{k}={v}")).collect();
        keys.sort();
        keys
    }));
    authed!(b, headers);
    let search = q.get("search").map(|s| s.to_lowercase());
    let rol = q.get("rol_id").and_then(|r| r.parse::<i64>().ok());
    let activo = q.get("activo").map(|a| a == "true");
    let users: Vec<Value> = b
        .users
        .iter()
        .filter(|u| search.as_ref().map_or(true, |s| u.nombre.to_lowercase().contains(s) || u.email.to_lowercase().contains(s)))
        .filter(|u| rol.map_or(true, |r| u.rol_id == r))
        .filter(|u| activo.map_or(true, |a| u.activo == a))
        .map(FakeUser::to_json)
        .collect();
    reply(StatusCode::OK, json!({"success": true, "count": users.len(), "users": users}))
}

async fn register(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut b = s.lock();
    authed!(b, headers);
    let field = |k: &str| body.get(k).and_then(Value::as_str).unwrap_or_default().to_string();
    let (nombre, email, pw) = (field("nombre_usuario"), field("correo_electronico"), field("contrasena"));
    if nombre.is_empty() || email.is_empty() || pw.is_empty() {
        return reply(StatusCode::BAD_REQUEST, json!({"success": false, "message": "Missing fields"}));
    }
    if b.users.iter().any(|u| u.email == email) {
        return reply(StatusCode::BAD_REQUEST, json!({"success": false, "message": "Email already registered"}));
    }
    let rol = body.get("rol_id").and_then(Value::as_i64).unwrap_or(2);
    let id = b.add_user(&nombre, &email, &pw, rol, true, None);
    reply(StatusCode::CREATED, json!({"success": true, "message": "User registered", "user_id": id}))
}

async fn update_user(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<i64>, Json(body): Json<Value>) -> Response {
    let mut b = s.lock();
    authed!(b, headers);
    b.hits.push(format!("PUT /api/users/{} {}", id, body));
    let Some(u) = b.users.iter_mut().find(|u| u.id == id) else {
        return reply(StatusCode::NOT_FOUND, json!({"success": false, "message": "User not found"}));
    };
    if let Some(v) = body.get("nombre").and_then(Value::as_str) {
        u.nombre = v.to_string();
    }
    if let Some(v) = body.get("email").and_then(Value::as_str) {
        u.email = v.to_string();
    }
    if let Some(v) = body.get("rol_id").and_then(Value::as_i64) {
        u.rol_id = v;
    }
    if let Some(v) = body.get("activo").and_then(Value::as_bool) {
        u.activo = v;
    }
    if let Some(v) = body.get("password").and_then(Value::as_str) {
        u.password = v.to_string();
    }
    reply(StatusCode::OK, json!({"success": true, "message": "User updated"}))
}

async fn delete_user(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let mut b = s.lock();
    authed!(b, headers);
    let before = b.users.len();
    b.users.retain(|u| u.id != id);
    if b.users.len() == before {
        return reply(StatusCode::NOT_FOUND, json!({"success": false, "message": "User not found"}));
    }
    reply(StatusCode::OK, json!({"success": true, "message": "User deleted"}))
}

async fn toggle_active(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let mut b = s.lock();
    authed!(b, headers);
    let Some(u) = b.users.iter_mut().find(|u| u.id == id) else {
        return reply(StatusCode::NOT_FOUND, json!({"success": false, "message": "User not found"}));
    };
    u.activo = !u.activo;
    let msg = if u.activo { "User activated" } else { "User deactivated" };
    reply(StatusCode::OK, json!({"success": true, "message": msg, "activo": if u.activo { 1 } else { 0 }}))
}

async fn unlock(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let mut b = s.lock();
    authed!(b, headers);
    let Some(u) = b.users.iter_mut().find(|u| u.id == id) else {
        return reply(StatusCode::NOT_FOUND, json!({"success": false, "message": "User not found"}));
    };
    u.bloqueado_hasta = None;
    reply(StatusCode::OK, json!({"success": true, "message": "User unlocked"}))
}

fn role_json(r: &(i64, String, String)) -> Value { json!({"id": r.0, "nombre": r.1, "descripcion": r.2}) }

async fn list_roles(State(s): State<Shared>, headers: HeaderMap) -> Response {
    let b = s.lock();
    authed!(b, headers);
    let data: Vec<Value> = b.roles.iter().map(role_json).collect();
    reply(StatusCode::OK, json!({"success": true, "data": data}))
}

async fn create_role(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut b = s.lock();
    authed!(b, headers);
    let nombre = body.get("nombre").and_then(Value::as_str).unwrap_or_default().to_string();
    if b.roles.iter().any(|r| r.1.eq_ignore_ascii_case(&nombre)) {
        return reply(StatusCode::CONFLICT, json!({"success": false, "message": "Role already exists"}));
    }
    let id = b.roles.iter().map(|r| r.0).max().unwrap_or(0) + 1;
    let descripcion = body.get("descripcion").and_then(Value::as_str).unwrap_or_default().to_string();
    b.roles.push((id, nombre, descripcion));
    reply(StatusCode::CREATED, json!({"success": true, "id": id}))
}

async fn update_role(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<i64>, Json(body): Json<Value>) -> Response {
    let mut b = s.lock();
    authed!(b, headers);
    let Some(r) = b.roles.iter_mut().find(|r| r.0 == id) else {
        return reply(StatusCode::NOT_FOUND, json!({"success": false, "message": "Role not found"}));
    };
    if let Some(v) = body.get("nombre").and_then(Value::as_str) {
        r.1 = v.to_string();
    }
    if let Some(v) = body.get("descripcion").and_then(Value::as_str) {
        r.2 = v.to_string();
    }
    reply(StatusCode::OK, json!({"success": true}))
}

async fn delete_role(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let mut b = s.lock();
    authed!(b, headers);
    if b.users.iter().any(|u| u.rol_id == id) {
        return reply(StatusCode::BAD_REQUEST, json!({"success": false, "message": "Role is assigned to users"}));
    }
    b.roles.retain(|r| r.0 != id);
    reply(StatusCode::OK, json!({"success": true}))
}

/// Notifier that keeps every message for later assertions.
#[derive(Default)]
pub struct CollectingNotifier {
    pub seen: Mutex<Vec<(String, admin_console::ui::Severity)>>,
}

impl CollectingNotifier {
    pub fn messages(&self) -> Vec<String> { self.seen.lock().iter().map(|(m, _)| m.clone()).collect() }
}

impl admin_console::ui::Notifier for CollectingNotifier {
    fn notify(&self, message: &str, severity: admin_console::ui::Severity) {
        self.seen.lock().push((message.to_string(), severity));
    }
}

/// A console wired to `server` over real HTTP, with no redirect delay.
pub fn console(server: &FakeServer, notifier: Arc<CollectingNotifier>) -> anyhow::Result<Arc<admin_console::app::Console>> {
    let config = admin_console::config::ConsoleConfig {
        base_url: server.base_url.clone(),
        debounce_ms: 100,
        redirect_delay_ms: 0,
        ..Default::default()
    };
    let transport = Arc::new(admin_console::transport::HttpSession::new(&config.base_url, config.request_timeout())?);
    Ok(admin_console::app::Console::new(
        config,
        transport,
        notifier,
        Arc::new(admin_console::ui::FixedConfirmer(true)),
    ))
}

pub async fn sign_in(console: &admin_console::app::Console) -> anyhow::Result<()> {
    console.navigate("/login").await;
    console.login().set_usuario(ADMIN_USER);
    console.login().set_contrasena(ADMIN_PASSWORD);
    console.login().submit().await?;
    console.sync().await;
    Ok(())
}
