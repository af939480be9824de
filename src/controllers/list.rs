//! Generic list/edit/delete controller shared by the users and roles views.
//!
//! A [`Resource`] describes the wire shape of one backend collection; the
//! [`ListController`] owns the list, filter, editor and pending-delete state
//! for it and runs every request through the envelope interpreter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;

use crate::config::ConsoleConfig;
use crate::debounce::Debouncer;
use crate::error::{AppError, AppResult};
use crate::transport::{call, ApiRequest, Envelope, Transport, TransportError};
use crate::ui::{Confirmer, Notifier, Severity};

/// Filter state serialized into the list request's query string.
pub trait ListFilter: Clone + Default + Send + Sync + 'static {
    /// Only non-empty filters; an omitted key means "no filter".
    fn query_pairs(&self) -> Vec<(String, String)>;

    /// Returns true when the text actually changed.
    fn set_search_text(&mut self, _text: &str) -> bool { false }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoFilter;

impl ListFilter for NoFilter {
    fn query_pairs(&self) -> Vec<(String, String)> { Vec::new() }
}

pub trait Resource: Send + Sync + 'static {
    type Entity: Clone + Send + Sync + DeserializeOwned + 'static;
    type Draft: Clone + Default + Send + Sync + 'static;
    type Filter: ListFilter;

    /// Lower-case, e.g. `users`.
    const PLURAL: &'static str;
    /// Lower-case, e.g. `user`.
    const SINGULAR: &'static str;
    /// Capitalized singular, e.g. `User`.
    const TITLE: &'static str;

    /// Base request; the controller appends the filter's query pairs.
    fn list_request() -> ApiRequest;

    /// Entities plus the server-side count when the backend sends one.
    fn parse_list(env: &Envelope) -> Result<(Vec<Self::Entity>, Option<u64>), TransportError>;

    fn id(entity: &Self::Entity) -> i64;

    fn label(entity: &Self::Entity) -> &str;

    fn new_draft(config: &ConsoleConfig) -> Self::Draft;

    fn draft_from(entity: &Self::Entity) -> Self::Draft;

    fn validate(draft: &Self::Draft, editing: bool) -> AppResult<()>;

    /// POST-to-create when `id` is `None`, PUT-to-update otherwise.
    fn save_request(draft: &Self::Draft, id: Option<i64>) -> ApiRequest;

    fn delete_request(id: i64) -> ApiRequest;

    fn saved_message(_draft: &Self::Draft, editing: bool) -> String {
        if editing {
            format!("{} updated successfully", Self::TITLE)
        } else {
            format!("{} saved successfully", Self::TITLE)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Editor<D> {
    Closed,
    Creating(D),
    Editing { id: i64, draft: D },
}

impl<D> Editor<D> {
    pub fn is_open(&self) -> bool { !matches!(self, Editor::Closed) }

    pub fn is_editing(&self) -> bool { matches!(self, Editor::Editing { .. }) }

    pub fn draft(&self) -> Option<&D> {
        match self {
            Editor::Closed => None,
            Editor::Creating(d) | Editor::Editing { draft: d, .. } => Some(d),
        }
    }

    fn draft_mut(&mut self) -> Option<&mut D> {
        match self {
            Editor::Closed => None,
            Editor::Creating(d) | Editor::Editing { draft: d, .. } => Some(d),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Idle,
    Saving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    /// A newer load was issued while this one was in flight; its answer was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Done { message: String },
    /// The user declined the confirmation; nothing was sent.
    Declined,
    /// Another mutating request is in flight; nothing was sent.
    Busy,
}

struct State<R: Resource> {
    items: Vec<R::Entity>,
    count: Option<u64>,
    filter: R::Filter,
    editor: Editor<R::Draft>,
    pending_delete: Option<R::Entity>,
    loading: bool,
    saving: bool,
}

impl<R: Resource> Default for State<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            count: None,
            filter: R::Filter::default(),
            editor: Editor::Closed,
            pending_delete: None,
            loading: false,
            saving: false,
        }
    }
}

/// Holds the saving flag for the duration of one mutating request.
struct SavingSlot<'a, R: Resource> {
    ctl: &'a ListController<R>,
}

impl<R: Resource> Drop for SavingSlot<'_, R> {
    fn drop(&mut self) {
        self.ctl.state.lock().saving = false;
    }
}

pub struct ListController<R: Resource> {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    confirmer: Arc<dyn Confirmer>,
    config: ConsoleConfig,
    state: Mutex<State<R>>,
    generation: AtomicU64,
    debouncer: Debouncer,
}

impl<R: Resource> ListController<R> {
    pub fn new(
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
        config: ConsoleConfig,
    ) -> Self {
        let debouncer = Debouncer::new(config.debounce());
        Self {
            transport,
            notifier,
            confirmer,
            config,
            state: Mutex::new(State::default()),
            generation: AtomicU64::new(0),
            debouncer,
        }
    }

    pub fn items(&self) -> Vec<R::Entity> { self.state.lock().items.clone() }

    pub fn count(&self) -> Option<u64> { self.state.lock().count }

    pub fn find(&self, id: i64) -> Option<R::Entity> {
        self.state.lock().items.iter().find(|e| R::id(e) == id).cloned()
    }

    pub fn filter(&self) -> R::Filter { self.state.lock().filter.clone() }

    pub fn editor(&self) -> Editor<R::Draft> { self.state.lock().editor.clone() }

    pub fn draft(&self) -> Option<R::Draft> { self.state.lock().editor.draft().cloned() }

    pub fn pending_delete(&self) -> Option<R::Entity> { self.state.lock().pending_delete.clone() }

    pub fn phase(&self) -> Phase {
        let s = self.state.lock();
        if s.saving {
            Phase::Saving
        } else if s.loading {
            Phase::Loading
        } else {
            Phase::Idle
        }
    }

    pub fn is_saving(&self) -> bool { self.state.lock().saving }

    pub fn search_pending(&self) -> bool { self.debouncer.is_pending() }

    /// Drop every piece of view state and fence off in-flight loads.
    pub fn reset(&self) {
        self.debouncer.cancel();
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = State::default();
        tracing::debug!(target: "list", resource = R::PLURAL, "state reset");
    }

    /// Replace the list with what the backend currently holds for the filter.
    pub async fn load(&self, show_spinner: bool) -> AppResult<LoadOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let req = {
            let mut s = self.state.lock();
            if show_spinner {
                s.loading = true;
            }
            let mut req = R::list_request();
            req.query.extend(s.filter.query_pairs());
            req
        };
        tracing::debug!(target: "list", resource = R::PLURAL, generation, query = ?req.query, "load");

        let fallback = format!("Error loading {}", R::PLURAL);
        let res = call(self.transport.as_ref(), req, &fallback)
            .await
            .and_then(|env| R::parse_list(&env).map_err(|e| AppError::transport("decode".to_string(), e.to_string())));

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(target: "list", resource = R::PLURAL, generation, "stale response dropped");
            return Ok(LoadOutcome::Stale);
        }

        match res {
            Ok((items, count)) => {
                let n = items.len();
                {
                    let mut s = self.state.lock();
                    s.items = items;
                    s.count = count;
                    s.loading = false;
                }
                if !show_spinner {
                    let shown = count.unwrap_or(n as u64);
                    self.notifier.notify(&format!("{} {} found", shown, R::PLURAL), Severity::Success);
                }
                Ok(LoadOutcome::Loaded(n))
            }
            Err(e) => {
                self.state.lock().loading = false;
                let text = match &e {
                    AppError::Server { code, message } if code == "rejected" => message.clone(),
                    other if other.message() == fallback => fallback.clone(),
                    other => format!("{}: {}", fallback, other.message()),
                };
                tracing::warn!(target: "list", resource = R::PLURAL, error = %e, "load failed");
                self.notifier.notify(&text, Severity::Error);
                Err(e)
            }
        }
    }

    pub fn start_create(&self) {
        let draft = R::new_draft(&self.config);
        self.state.lock().editor = Editor::Creating(draft);
    }

    pub fn start_edit(&self, entity: &R::Entity) {
        let draft = R::draft_from(entity);
        self.state.lock().editor = Editor::Editing { id: R::id(entity), draft };
    }

    pub fn close_editor(&self) { self.state.lock().editor = Editor::Closed; }

    /// Mutate the open draft. Returns false when no editor is open.
    pub fn update_draft<F: FnOnce(&mut R::Draft)>(&self, f: F) -> bool {
        let mut s = self.state.lock();
        match s.editor.draft_mut() {
            Some(d) => {
                f(d);
                true
            }
            None => false,
        }
    }

    pub async fn save(&self) -> AppResult<MutationOutcome> {
        if self.is_saving() {
            return Ok(MutationOutcome::Busy);
        }
        let editor = self.state.lock().editor.clone();
        let (draft, id) = match editor {
            Editor::Closed => return Err(AppError::validation("editor_closed", "No form is open")),
            Editor::Creating(d) => (d, None),
            Editor::Editing { id, draft } => (draft, Some(id)),
        };
        if let Err(e) = R::validate(&draft, id.is_some()) {
            self.notifier.notify(e.message(), e.severity());
            return Err(e);
        }

        let req = R::save_request(&draft, id);
        let default_ok = R::saved_message(&draft, id.is_some());
        let fallback = format!("Error saving {}", R::SINGULAR);
        match self.mutate(req, &fallback, &default_ok).await? {
            None => Ok(MutationOutcome::Busy),
            Some((_, message)) => {
                self.close_editor();
                let _ = self.load(false).await;
                Ok(MutationOutcome::Done { message })
            }
        }
    }

    /// Phase one of delete: remember the candidate and ask. Declining clears
    /// it; accepting runs [`Self::confirm_delete`].
    pub async fn request_delete(&self, entity: &R::Entity) -> AppResult<MutationOutcome> {
        if self.is_saving() {
            return Ok(MutationOutcome::Busy);
        }
        self.state.lock().pending_delete = Some(entity.clone());
        let prompt = format!(
            "Are you sure you want to delete {} \"{}\"?\n\nThis action cannot be undone.",
            R::SINGULAR,
            R::label(entity)
        );
        if !self.confirm(&prompt).await {
            self.cancel_delete();
            return Ok(MutationOutcome::Declined);
        }
        self.confirm_delete().await
    }

    pub async fn confirm_delete(&self) -> AppResult<MutationOutcome> {
        let Some(candidate) = self.state.lock().pending_delete.clone() else {
            return Ok(MutationOutcome::Declined);
        };
        let id = R::id(&candidate);
        let default_ok = format!("{} {} deleted", R::TITLE, R::label(&candidate));
        let fallback = format!("Error deleting {}", R::SINGULAR);
        let res = self.mutate(R::delete_request(id), &fallback, &default_ok).await;
        self.cancel_delete();
        match res? {
            None => Ok(MutationOutcome::Busy),
            Some((_, message)) => {
                let _ = self.load(false).await;
                Ok(MutationOutcome::Done { message })
            }
        }
    }

    pub fn cancel_delete(&self) { self.state.lock().pending_delete = None; }

    /// Debounced search. Same text again is not a change.
    pub fn on_search_input(self: &Arc<Self>, text: &str) {
        if !self.state.lock().filter.set_search_text(text) {
            return;
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        self.debouncer.schedule(async move {
            if let Some(ctl) = weak.upgrade() {
                let _ = ctl.load(false).await;
            }
        });
    }

    pub async fn apply_filters(&self) -> AppResult<LoadOutcome> {
        self.debouncer.cancel();
        self.load(false).await
    }

    pub async fn clear_filters(&self) -> AppResult<LoadOutcome> {
        self.debouncer.cancel();
        self.state.lock().filter = R::Filter::default();
        self.load(false).await
    }

    pub(super) fn edit_filter<F: FnOnce(&mut R::Filter)>(&self, f: F) {
        f(&mut self.state.lock().filter);
    }

    pub(super) fn edit_item<F: FnOnce(&mut R::Entity)>(&self, id: i64, f: F) -> bool {
        let mut s = self.state.lock();
        match s.items.iter_mut().find(|e| R::id(e) == id) {
            Some(e) => {
                f(e);
                true
            }
            None => false,
        }
    }

    pub(super) async fn confirm(&self, prompt: &str) -> bool { self.confirmer.confirm(prompt).await }

    /// Run one mutating request under the saving flag and notify the result.
    /// `Ok(None)` means another mutation held the flag and nothing was sent.
    pub(super) async fn mutate(
        &self,
        req: ApiRequest,
        fallback: &str,
        default_ok: &str,
    ) -> AppResult<Option<(Envelope, String)>> {
        let Some(_slot) = self.try_begin_saving() else {
            tracing::debug!(target: "list", resource = R::PLURAL, "mutation skipped; another is in flight");
            return Ok(None);
        };
        let method = req.method.clone();
        let path = req.path.clone();
        match call(self.transport.as_ref(), req, fallback).await {
            Ok(env) => {
                let message = env.message_or(default_ok);
                tracing::info!(target: "list", %method, path = %path, "mutation accepted");
                self.notifier.notify(&message, Severity::Success);
                Ok(Some((env, message)))
            }
            Err(e) => {
                tracing::warn!(target: "list", %method, path = %path, error = %e, "mutation failed");
                self.notifier.notify(&failure_text(&e), Severity::Error);
                Err(e)
            }
        }
    }

    fn try_begin_saving(&self) -> Option<SavingSlot<'_, R>> {
        let mut s = self.state.lock();
        if s.saving {
            return None;
        }
        s.saving = true;
        Some(SavingSlot { ctl: self })
    }
}

/// `success=false` answers show the server text as-is; everything else is
/// prefixed the way the list views always did.
fn failure_text(e: &AppError) -> String {
    match e {
        AppError::Server { code, message } if code == "rejected" => message.clone(),
        other => format!("Error: {}", other.message()),
    }
}
