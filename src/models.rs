//! Wire and form models for users and roles.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "UserRecord")]
pub struct User {
    pub id: i64,
    pub nombre: String,
    pub email: String,
    pub rol_id: Option<i64>,
    pub activo: bool,
    pub uuid: Option<String>,
    pub ultimo_acceso: Option<String>,
    pub intentos_fallidos: Option<i64>,
    pub bloqueado_hasta: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// User as the backend sends it. The name may arrive as `nombre`,
/// `username` (sent alongside `nombre`) or `nombre_usuario`.
#[derive(Deserialize)]
struct UserRecord {
    id: i64,
    #[serde(default)]
    nombre: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    nombre_usuario: Option<String>,
    #[serde(default, alias = "correo_electronico")]
    email: String,
    #[serde(default)]
    rol_id: Option<i64>,
    #[serde(default = "default_true", deserialize_with = "flag")]
    activo: bool,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    ultimo_acceso: Option<String>,
    #[serde(default)]
    intentos_fallidos: Option<i64>,
    #[serde(default)]
    bloqueado_hasta: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        User {
            id: r.id,
            nombre: r.nombre.or(r.username).or(r.nombre_usuario).unwrap_or_default(),
            email: r.email,
            rol_id: r.rol_id,
            activo: r.activo,
            uuid: r.uuid,
            ultimo_acceso: r.ultimo_acceso,
            intentos_fallidos: r.intentos_fallidos,
            bloqueado_hasta: r.bloqueado_hasta,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn default_true() -> bool { true }

/// The backend sends `activo` as a bool or as a MySQL tinyint.
pub(crate) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
        Null(()),
    }
    Ok(match Flag::deserialize(d)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
        Flag::Text(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Flag::Null(()) => false,
    })
}

impl User {
    /// True while `bloqueado_hasta` lies after `now`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.bloqueado_hasta
            .as_deref()
            .and_then(parse_backend_time)
            .map(|until| until > now)
            .unwrap_or(false)
    }

    pub fn is_locked(&self) -> bool { self.is_locked_at(Utc::now()) }
}

/// Timestamps arrive as RFC 2822 (Flask's default JSON encoding), RFC 3339,
/// or a bare `YYYY-MM-DD HH:MM:SS` assumed to be UTC.
pub fn parse_backend_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc2822(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(n.and_utc());
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Editable copy of a user. `password` is write-only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserDraft {
    pub nombre: String,
    pub email: String,
    /// `None` keeps the stored role untouched on update.
    pub rol_id: Option<i64>,
    pub activo: bool,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleDraft {
    pub nombre: String,
    pub descripcion: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserFilter {
    pub search_text: String,
    pub filter_rol: Option<i64>,
    pub filter_activo: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub text: &'static str,
    pub class: &'static str,
}

pub fn role_badge(rol_id: Option<i64>) -> Badge {
    match rol_id {
        Some(1) => Badge { text: "Admin", class: "primary" },
        Some(2) => Badge { text: "User", class: "success" },
        _ => Badge { text: "N/A", class: "secondary" },
    }
}

pub fn status_badge(activo: bool) -> Badge {
    if activo {
        Badge { text: "Active", class: "success" }
    } else {
        Badge { text: "Inactive", class: "danger" }
    }
}
