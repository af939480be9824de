use serde_json::json;

use super::list::{ListController, NoFilter, Resource};
use crate::config::ConsoleConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Role, RoleDraft};
use crate::transport::{ApiRequest, Envelope, TransportError};

pub const ROLE_NAME_MAX: usize = 50;

pub struct RoleResource;

impl Resource for RoleResource {
    type Entity = Role;
    type Draft = RoleDraft;
    type Filter = NoFilter;

    const PLURAL: &'static str = "roles";
    const SINGULAR: &'static str = "role";
    const TITLE: &'static str = "Role";

    fn list_request() -> ApiRequest { ApiRequest::get("/api/roles") }

    fn parse_list(env: &Envelope) -> Result<(Vec<Role>, Option<u64>), TransportError> {
        Ok((env.field("data")?, None))
    }

    fn id(r: &Role) -> i64 { r.id }

    fn label(r: &Role) -> &str { &r.nombre }

    fn new_draft(_config: &ConsoleConfig) -> RoleDraft { RoleDraft::default() }

    fn draft_from(r: &Role) -> RoleDraft {
        RoleDraft { nombre: r.nombre.clone(), descripcion: r.descripcion.clone().unwrap_or_default() }
    }

    fn validate(d: &RoleDraft, _editing: bool) -> AppResult<()> {
        let name = d.nombre.trim();
        if name.is_empty() {
            return Err(AppError::validation("role_name_required", "Role name is required"));
        }
        if name.chars().count() > ROLE_NAME_MAX {
            return Err(AppError::validation(
                "role_name_too_long".to_string(),
                format!("Role name must be at most {} characters", ROLE_NAME_MAX),
            ));
        }
        Ok(())
    }

    fn save_request(d: &RoleDraft, id: Option<i64>) -> ApiRequest {
        let body = json!({ "nombre": d.nombre.trim(), "descripcion": d.descripcion.trim() });
        match id {
            None => ApiRequest::post("/api/roles", body),
            Some(id) => ApiRequest::put(format!("/api/roles/{}", id), body),
        }
    }

    fn delete_request(id: i64) -> ApiRequest { ApiRequest::delete(format!("/api/roles/{}", id)) }

    fn saved_message(d: &RoleDraft, editing: bool) -> String {
        if editing {
            "Role updated successfully".to_string()
        } else {
            format!("Role '{}' created.", d.nombre.trim())
        }
    }
}

pub type RolesController = ListController<RoleResource>;
