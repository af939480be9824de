use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;

use super::outputformatter::{roles_table, terminal_width, users_table};
use crate::app::Console;
use crate::controllers::{LoadOutcome, MutationOutcome, UsersController};
use crate::identity::LogoutOutcome;
use crate::models::{role_badge, RoleDraft, UserDraft};
use crate::router::View;

pub const HELP: &str = "\
commands:
  go <path>                      navigate (/, /login, /users, /roles)
  reload                         discard view state and re-enter the current path
  login <user> <password>        sign in
  logout                         sign out (asks first)
  whoami                         show the signed-in user
  status                         current location and view state
  users list                     reload and print users
  users search <text>            debounced search (empty text clears)
  users filter rol <id|none>     set role filter
  users filter activo <true|false|none>
  users apply                    reload with the current filters
  users clear                    reset filters and reload
  users new k=v ...              fields: nombre email rol_id activo password
  users edit <id> k=v ...
  users delete|toggle|unlock <id>
  roles list
  roles new k=v ...              fields: nombre descripcion
  roles edit <id> k=v ...
  roles delete <id>
  config                         print effective configuration
  help
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Go(String),
    Reload,
    Login { usuario: String, contrasena: String },
    Logout,
    WhoAmI,
    Status,
    Users(UsersCmd),
    Roles(RolesCmd),
    Config,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UsersCmd {
    List,
    Search(String),
    FilterRol(Option<i64>),
    FilterActivo(Option<bool>),
    Apply,
    Clear,
    New(Vec<(String, String)>),
    Edit(i64, Vec<(String, String)>),
    Delete(i64),
    Toggle(i64),
    Unlock(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RolesCmd {
    List,
    New(Vec<(String, String)>),
    Edit(i64, Vec<(String, String)>),
    Delete(i64),
}

/// What the REPL should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue(String),
    Quit,
}

/// Split on whitespace, honoring double quotes: `nombre="Ana Maria"`.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut started = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                started = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if started {
                    out.push(std::mem::take(&mut cur));
                    started = false;
                }
            }
            c => {
                cur.push(c);
                started = true;
            }
        }
    }
    if in_quotes {
        bail!("unterminated quote");
    }
    if started {
        out.push(cur);
    }
    Ok(out)
}

fn parse_id(s: Option<&String>) -> Result<i64> {
    let s = s.ok_or_else(|| anyhow!("missing id"))?;
    s.parse::<i64>().with_context(|| format!("invalid id '{}'", s))
}

fn parse_pairs(tokens: &[String]) -> Result<Vec<(String, String)>> {
    tokens
        .iter()
        .map(|t| {
            t.split_once('=')
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .ok_or_else(|| anyhow!("expected key=value, got '{}'", t))
        })
        .collect()
}

fn parse_bool(v: &str) -> Result<bool> {
    match v.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "si" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => bail!("expected true or false, got '{}'", v),
    }
}

/// `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let tokens = tokenize(line)?;
    let Some((head, rest)) = tokens.split_first() else {
        return Ok(None);
    };
    let cmd = match head.to_ascii_lowercase().as_str() {
        "go" => Command::Go(rest.first().cloned().ok_or_else(|| anyhow!("usage: go <path>"))?),
        "reload" => Command::Reload,
        "login" => match rest {
            [u, p] => Command::Login { usuario: u.clone(), contrasena: p.clone() },
            _ => bail!("usage: login <user> <password>"),
        },
        "logout" => Command::Logout,
        "whoami" => Command::WhoAmI,
        "status" => Command::Status,
        "users" => Command::Users(parse_users(rest)?),
        "roles" => Command::Roles(parse_roles(rest)?),
        "config" => Command::Config,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "\\q" => Command::Quit,
        other => bail!("unknown command '{}'; try 'help'", other),
    };
    Ok(Some(cmd))
}

fn parse_users(rest: &[String]) -> Result<UsersCmd> {
    let sub = rest.first().map(|s| s.to_ascii_lowercase()).unwrap_or_else(|| "list".to_string());
    let args = rest.get(1..).unwrap_or(&[]);
    Ok(match sub.as_str() {
        "list" => UsersCmd::List,
        "search" => UsersCmd::Search(args.join(" ")),
        "filter" => match args {
            [k, v] if k.eq_ignore_ascii_case("rol") => {
                if v.eq_ignore_ascii_case("none") {
                    UsersCmd::FilterRol(None)
                } else {
                    UsersCmd::FilterRol(Some(parse_id(Some(v))?))
                }
            }
            [k, v] if k.eq_ignore_ascii_case("activo") => {
                if v.eq_ignore_ascii_case("none") {
                    UsersCmd::FilterActivo(None)
                } else {
                    UsersCmd::FilterActivo(Some(parse_bool(v)?))
                }
            }
            _ => bail!("usage: users filter rol <id|none> | users filter activo <true|false|none>"),
        },
        "apply" => UsersCmd::Apply,
        "clear" => UsersCmd::Clear,
        "new" => UsersCmd::New(parse_pairs(args)?),
        "edit" => UsersCmd::Edit(parse_id(args.first())?, parse_pairs(args.get(1..).unwrap_or(&[]))?),
        "delete" => UsersCmd::Delete(parse_id(args.first())?),
        "toggle" => UsersCmd::Toggle(parse_id(args.first())?),
        "unlock" => UsersCmd::Unlock(parse_id(args.first())?),
        other => bail!("unknown users command '{}'", other),
    })
}

fn parse_roles(rest: &[String]) -> Result<RolesCmd> {
    let sub = rest.first().map(|s| s.to_ascii_lowercase()).unwrap_or_else(|| "list".to_string());
    let args = rest.get(1..).unwrap_or(&[]);
    Ok(match sub.as_str() {
        "list" => RolesCmd::List,
        "new" => RolesCmd::New(parse_pairs(args)?),
        "edit" => RolesCmd::Edit(parse_id(args.first())?, parse_pairs(args.get(1..).unwrap_or(&[]))?),
        "delete" => RolesCmd::Delete(parse_id(args.first())?),
        other => bail!("unknown roles command '{}'", other),
    })
}

fn apply_user_fields(d: &mut UserDraft, pairs: &[(String, String)]) -> Result<()> {
    for (k, v) in pairs {
        match k.as_str() {
            "nombre" | "name" => d.nombre = v.clone(),
            "email" => d.email = v.clone(),
            "rol_id" | "rol" => d.rol_id = Some(v.parse().with_context(|| format!("invalid rol_id '{}'", v))?),
            "activo" => d.activo = parse_bool(v)?,
            "password" | "contrasena" => d.password = v.clone(),
            other => bail!("unknown user field '{}'", other),
        }
    }
    Ok(())
}

fn apply_role_fields(d: &mut RoleDraft, pairs: &[(String, String)]) -> Result<()> {
    for (k, v) in pairs {
        match k.as_str() {
            "nombre" | "name" => d.nombre = v.clone(),
            "descripcion" | "description" => d.descripcion = v.clone(),
            other => bail!("unknown role field '{}'", other),
        }
    }
    Ok(())
}

fn describe(outcome: MutationOutcome) -> String {
    match outcome {
        MutationOutcome::Done { message } => message,
        MutationOutcome::Declined => "cancelled".to_string(),
        MutationOutcome::Busy => "another change is still in progress".to_string(),
    }
}

/// Enter `path` unless already there; fail when the guard sends us elsewhere.
async fn ensure_view(console: &Console, path: &str, view: View) -> Result<()> {
    if console.location().view == Some(view) {
        return Ok(());
    }
    let loc = console.navigate(path).await;
    if loc.view != Some(view) {
        bail!("cannot open {}; now at {} (sign in first?)", path, loc.path);
    }
    Ok(())
}

pub async fn execute(console: &Arc<Console>, cmd: Command) -> Result<Flow> {
    let text = match cmd {
        Command::Quit => return Ok(Flow::Quit),
        Command::Help => HELP.to_string(),
        Command::Go(path) => {
            let loc = console.navigate(&path).await;
            format!("at {}", loc.path)
        }
        Command::Reload => {
            let loc = console.reload().await;
            format!("reloaded; at {}", loc.path)
        }
        Command::Login { usuario, contrasena } => {
            let _ = ensure_view(console, "/login", View::Login).await;
            if console.location().view != Some(View::Login) {
                bail!("already signed in; log out first");
            }
            console.login().set_usuario(&usuario);
            console.login().set_contrasena(&contrasena);
            let out = console.login().submit().await?;
            out.message
        }
        Command::Logout => match console.auth().logout().await? {
            LogoutOutcome::Cancelled => "cancelled".to_string(),
            LogoutOutcome::LoggedOut => "logged out".to_string(),
        },
        Command::WhoAmI => match console.session().current_user() {
            Some(u) => format!("{} <{}> (id {}, {})", u.nombre, u.email, u.id, role_badge(u.rol_id).text),
            None => "not signed in".to_string(),
        },
        Command::Status => {
            let loc = console.location();
            format!(
                "path: {}\nview: {:?}\nlogged_in: {}\nusers: {:?}, {} loaded{}\nroles: {:?}, {} loaded",
                loc.path,
                loc.view,
                console.session().logged_in(),
                console.users().phase(),
                console.users().items().len(),
                if console.users().search_pending() { ", search pending" } else { "" },
                console.roles().phase(),
                console.roles().items().len(),
            )
        }
        Command::Config => serde_json::to_string_pretty(console.config())?,
        Command::Users(sub) => {
            ensure_view(console, "/users", View::Users).await?;
            users(console, sub).await?
        }
        Command::Roles(sub) => {
            ensure_view(console, "/roles", View::Roles).await?;
            roles(console, sub).await?
        }
    };
    Ok(Flow::Continue(text))
}

fn users_view(ctl: &UsersController) -> String {
    users_table(&ctl.items(), Utc::now()).render(terminal_width(), true)
}

async fn users(console: &Arc<Console>, cmd: UsersCmd) -> Result<String> {
    let ctl = console.users();
    Ok(match cmd {
        UsersCmd::List => {
            if let LoadOutcome::Stale = ctl.load(true).await? {
                return Ok("superseded by a newer load".to_string());
            }
            users_view(ctl)
        }
        UsersCmd::Search(text) => {
            ctl.on_search_input(&text);
            format!("search '{}' scheduled", text)
        }
        UsersCmd::FilterRol(r) => {
            ctl.set_role_filter(r);
            "role filter set; 'users apply' to reload".to_string()
        }
        UsersCmd::FilterActivo(a) => {
            ctl.set_active_filter(a);
            "status filter set; 'users apply' to reload".to_string()
        }
        UsersCmd::Apply => {
            ctl.apply_filters().await?;
            users_view(ctl)
        }
        UsersCmd::Clear => {
            ctl.clear_filters().await?;
            users_view(ctl)
        }
        UsersCmd::New(pairs) => {
            ctl.start_create();
            let mut draft = ctl.draft().unwrap_or_default();
            apply_user_fields(&mut draft, &pairs)?;
            ctl.update_draft(|d| *d = draft);
            describe(ctl.save().await?)
        }
        UsersCmd::Edit(id, pairs) => {
            let user = ctl.find(id).ok_or_else(|| anyhow!("user {} is not listed", id))?;
            ctl.start_edit(&user);
            let mut draft = ctl.draft().unwrap_or_default();
            apply_user_fields(&mut draft, &pairs)?;
            ctl.update_draft(|d| *d = draft);
            describe(ctl.save().await?)
        }
        UsersCmd::Delete(id) => {
            let user = ctl.find(id).ok_or_else(|| anyhow!("user {} is not listed", id))?;
            describe(ctl.request_delete(&user).await?)
        }
        UsersCmd::Toggle(id) => describe(ctl.toggle_active(id).await?),
        UsersCmd::Unlock(id) => describe(ctl.unlock(id).await?),
    })
}

async fn roles(console: &Arc<Console>, cmd: RolesCmd) -> Result<String> {
    let ctl = console.roles();
    Ok(match cmd {
        RolesCmd::List => {
            ctl.load(true).await?;
            roles_table(&ctl.items()).render(terminal_width(), true)
        }
        RolesCmd::New(pairs) => {
            ctl.start_create();
            let mut draft = ctl.draft().unwrap_or_default();
            apply_role_fields(&mut draft, &pairs)?;
            ctl.update_draft(|d| *d = draft);
            describe(ctl.save().await?)
        }
        RolesCmd::Edit(id, pairs) => {
            let role = ctl.find(id).ok_or_else(|| anyhow!("role {} is not listed", id))?;
            ctl.start_edit(&role);
            let mut draft = ctl.draft().unwrap_or_default();
            apply_role_fields(&mut draft, &pairs)?;
            ctl.update_draft(|d| *d = draft);
            describe(ctl.save().await?)
        }
        RolesCmd::Delete(id) => {
            let role = ctl.find(id).ok_or_else(|| anyhow!("role {} is not listed", id))?;
            describe(ctl.request_delete(&role).await?)
        }
    })
}
