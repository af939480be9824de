use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::list::{ListController, ListFilter, MutationOutcome, Resource};
use crate::config::ConsoleConfig;
use crate::error::{AppError, AppResult};
use crate::models::{User, UserDraft, UserFilter};
use crate::transport::{ApiRequest, Envelope, TransportError};

impl ListFilter for UserFilter {
    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        if !self.search_text.is_empty() {
            q.push(("search".to_string(), self.search_text.clone()));
        }
        if let Some(rol) = self.filter_rol {
            q.push(("rol_id".to_string(), rol.to_string()));
        }
        if let Some(activo) = self.filter_activo {
            q.push(("activo".to_string(), activo.to_string()));
        }
        q
    }

    fn set_search_text(&mut self, text: &str) -> bool {
        if self.search_text == text {
            return false;
        }
        self.search_text = text.to_string();
        true
    }
}

pub struct UserResource;

impl Resource for UserResource {
    type Entity = User;
    type Draft = UserDraft;
    type Filter = UserFilter;

    const PLURAL: &'static str = "users";
    const SINGULAR: &'static str = "user";
    const TITLE: &'static str = "User";

    fn list_request() -> ApiRequest { ApiRequest::get("/api/users") }

    fn parse_list(env: &Envelope) -> Result<(Vec<User>, Option<u64>), TransportError> {
        let users: Vec<User> = env.field("users")?;
        let count = env.data.get("count").and_then(Value::as_u64);
        Ok((users, count))
    }

    fn id(u: &User) -> i64 { u.id }

    fn label(u: &User) -> &str { &u.nombre }

    fn new_draft(config: &ConsoleConfig) -> UserDraft {
        UserDraft { rol_id: Some(config.default_role_id), activo: true, ..UserDraft::default() }
    }

    fn draft_from(u: &User) -> UserDraft {
        UserDraft {
            nombre: u.nombre.clone(),
            email: u.email.clone(),
            rol_id: u.rol_id,
            activo: u.activo,
            password: String::new(),
        }
    }

    fn validate(d: &UserDraft, editing: bool) -> AppResult<()> {
        if d.nombre.trim().is_empty() || d.email.trim().is_empty() {
            return Err(AppError::validation("user_fields_required", "Name and email are required"));
        }
        if !editing && d.password.is_empty() {
            return Err(AppError::validation("password_required", "Password is required for new users"));
        }
        Ok(())
    }

    fn save_request(d: &UserDraft, id: Option<i64>) -> ApiRequest {
        match id {
            None => {
                let mut body = Map::new();
                body.insert("nombre_usuario".into(), json!(d.nombre));
                body.insert("correo_electronico".into(), json!(d.email));
                body.insert("contrasena".into(), json!(d.password));
                if let Some(rol) = d.rol_id {
                    body.insert("rol_id".into(), json!(rol));
                }
                ApiRequest::post("/api/register", Value::Object(body))
            }
            Some(id) => {
                let mut body = Map::new();
                body.insert("nombre".into(), json!(d.nombre));
                body.insert("email".into(), json!(d.email));
                if let Some(rol) = d.rol_id {
                    body.insert("rol_id".into(), json!(rol));
                }
                body.insert("activo".into(), json!(d.activo));
                if !d.password.is_empty() {
                    body.insert("password".into(), json!(d.password));
                }
                ApiRequest::put(format!("/api/users/{}", id), Value::Object(body))
            }
        }
    }

    fn delete_request(id: i64) -> ApiRequest { ApiRequest::delete(format!("/api/users/{}", id)) }
}

pub type UsersController = ListController<UserResource>;

#[derive(Deserialize)]
struct Toggled {
    #[serde(deserialize_with = "crate::models::flag")]
    activo: bool,
}

impl ListController<UserResource> {
    /// Takes effect on the next load or [`Self::apply_filters`].
    pub fn set_role_filter(&self, rol_id: Option<i64>) { self.edit_filter(|f| f.filter_rol = rol_id); }

    pub fn set_active_filter(&self, activo: Option<bool>) { self.edit_filter(|f| f.filter_activo = activo); }

    fn listed(&self, id: i64) -> AppResult<User> {
        self.find(id)
            .ok_or_else(|| AppError::validation("not_listed".to_string(), format!("User {} is not in the current list", id)))
    }

    /// Flip `activo` on the backend and copy back the value it reports.
    pub async fn toggle_active(&self, id: i64) -> AppResult<MutationOutcome> {
        if self.is_saving() {
            return Ok(MutationOutcome::Busy);
        }
        let user = self.listed(id)?;
        let action = if user.activo { "deactivate" } else { "activate" };
        if !self.confirm(&format!("Are you sure you want to {} \"{}\"?", action, user.nombre)).await {
            return Ok(MutationOutcome::Declined);
        }
        let req = ApiRequest::patch(format!("/api/users/{}/toggle-active", id));
        let Some((env, message)) = self.mutate(req, "Error changing status", "Status updated").await? else {
            return Ok(MutationOutcome::Busy);
        };
        match serde_json::from_value::<Toggled>(Value::Object(env.data.clone())) {
            Ok(t) => {
                self.edit_item(id, |u| u.activo = t.activo);
            }
            Err(e) => {
                tracing::warn!(target: "list", user_id = id, error = %e, "toggle answer carried no activo");
                let _ = self.load(false).await;
            }
        }
        Ok(MutationOutcome::Done { message })
    }

    /// Clear a lockout, then reload the list quietly.
    pub async fn unlock(&self, id: i64) -> AppResult<MutationOutcome> {
        if self.is_saving() {
            return Ok(MutationOutcome::Busy);
        }
        let user = self.listed(id)?;
        if !self.confirm(&format!("Unlock user \"{}\"?", user.nombre)).await {
            return Ok(MutationOutcome::Declined);
        }
        let req = ApiRequest::patch(format!("/api/users/{}/unlock", id));
        let Some((_, message)) = self.mutate(req, "Error unlocking user", "User unlocked").await? else {
            return Ok(MutationOutcome::Busy);
        };
        let _ = self.load(false).await;
        Ok(MutationOutcome::Done { message })
    }
}
