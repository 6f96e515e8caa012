//! Inline edition sessions ("relation edit in place").
//!
//! A session is keyed by the div id of the edited value and goes
//! `Closed -> Editing -> Submitting -> Closed`. The form is fetched into the
//! `{divid}-reledit` region; after a successful submission the server's
//! directive decides between navigating away, reloading the page, or
//! re-rendering the `{divid}` region in place.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::constants::{
    DELETE_CONFIRMATION_FORM, RELEDIT_FORM_FUNCTION, form_region, reledit_region, value_region,
};
use crate::error::{RelEditError, Result};
use crate::events::RegionEvent;
use crate::fetch::FetchClient;
use crate::form;
use crate::models::{
    EditFormArgs, FetchRequest, Method, Reload, SessionParams, SubmitResponse, SwapMode,
    SwapOutcome,
};
use crate::render::Renderer;
use crate::swap::SwapEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Editing,
    Submitting,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Closed => "closed",
            SessionState::Editing => "editing",
            SessionState::Submitting => "submitting",
        }
    }
}

/// How a successful submission was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The page was sent to this url
    Navigated(String),
    /// The whole page was reloaded in place
    PageReloaded,
    /// The edited region was re-rendered
    Refreshed(SessionParams),
    /// The refresh lost to a newer load of the same region
    Superseded,
}

#[derive(Debug)]
struct Session {
    args: EditFormArgs,
    state: SessionState,
    /// Markup of the committed form, source of the hidden session fields
    form: Option<String>,
}

pub struct SessionController {
    engine: Arc<SwapEngine>,
    fetch: FetchClient,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionController {
    pub fn new(engine: Arc<SwapEngine>, fetch: FetchClient) -> Self {
        Self {
            engine,
            fetch,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn renderer(&self) -> &dyn Renderer {
        self.engine.renderer().as_ref()
    }

    pub fn state(&self, div_id: &str) -> SessionState {
        self.sessions()
            .get(div_id)
            .map_or(SessionState::Closed, |session| session.state)
    }

    pub fn args(&self, div_id: &str) -> Option<EditFormArgs> {
        self.sessions().get(div_id).map(|session| session.args.clone())
    }

    /// Fetch the edition form for `args.div_id` and show it in place of the value.
    ///
    /// Opening again while a form is shown or loading replaces it; the older
    /// load is dropped when it completes. On failure the session is closed.
    pub async fn load_inline_edition_form(&self, args: EditFormArgs) -> Result<SwapOutcome> {
        let div_id = args.div_id.clone();
        {
            let mut sessions = self.sessions();
            match sessions.get_mut(&div_id) {
                Some(session) if session.state == SessionState::Submitting => {
                    return Err(RelEditError::InvalidState {
                        div_id,
                        state: session.state.name(),
                        operation: "open the form",
                    });
                }
                Some(session) => session.args = args.clone(),
                None => {
                    sessions.insert(
                        div_id.clone(),
                        Session {
                            args: args.clone(),
                            state: SessionState::Closed,
                            form: None,
                        },
                    );
                }
            }
        }

        let region = reledit_region(&div_id);
        self.engine.ensure(&region).await;
        let request = FetchRequest::new(&region, RELEDIT_FORM_FUNCTION)
            .method(Method::Post)
            .param("rtype", args.rtype.as_str())
            .param("role", args.role.as_str())
            .param("eid", args.eid.to_string())
            .param("divid", div_id.as_str())
            .param("formid", args.form_id.as_str())
            .param("reload", args.reload.to_param())
            .param("vid", args.vid.as_str())
            .param("action", args.action.as_str());
        info!(div_id = %div_id, form_id = %args.form_id, eid = args.eid, "opening inline edition form");

        let result = self
            .engine
            .load_then(
                &region,
                SwapMode::Replace,
                self.fetch.call(&request),
                |content, renderer| {
                    let mut sessions = self.sessions();
                    let session = match sessions.get_mut(&div_id) {
                        Some(session) if session.state != SessionState::Submitting => session,
                        Some(_) => {
                            debug!(div_id = %div_id, "form arrived during a submission, dropped");
                            return false;
                        }
                        None => {
                            debug!(div_id = %div_id, "form arrived for a closed session, dropped");
                            return false;
                        }
                    };
                    session.state = SessionState::Editing;
                    session.form = Some(content.as_markup().into_owned());
                    show_form(renderer, &div_id);
                    true
                },
            )
            .await;

        if let Err(err) = &result {
            let mut sessions = self.sessions();
            if sessions
                .get(&div_id)
                .is_some_and(|session| session.state != SessionState::Submitting)
            {
                warn!(div_id = %div_id, error = %err, "form load failed, closing session");
                sessions.remove(&div_id);
                drop(sessions);
                show_value(self.renderer(), &div_id);
            }
        }
        result
    }

    /// Submit the open form with the user's `fields`.
    ///
    /// Any failure puts the session back in editing with the form still shown.
    pub async fn submit(
        &self,
        div_id: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<SubmitOutcome> {
        let form = {
            let mut sessions = self.sessions();
            let session = sessions
                .get_mut(div_id)
                .ok_or_else(|| RelEditError::NoSession(div_id.to_string()))?;
            if session.state != SessionState::Editing {
                return Err(RelEditError::InvalidState {
                    div_id: div_id.to_string(),
                    state: session.state.name(),
                    operation: "submit",
                });
            }
            session.state = SessionState::Submitting;
            session.form.clone().unwrap_or_default()
        };
        self.engine.cancel(&reledit_region(div_id)).await;
        info!(div_id, "submitting inline edition form");

        let result = self.resolve_submission(div_id, &form, fields).await;
        if let Err(err) = &result {
            warn!(div_id, error = %err, "submission failed, form stays open");
            if let Some(session) = self.sessions().get_mut(div_id) {
                if session.state == SessionState::Submitting {
                    session.state = SessionState::Editing;
                }
            }
        }
        result
    }

    async fn resolve_submission(
        &self,
        div_id: &str,
        form: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<SubmitOutcome> {
        let mut posted = form::hidden_fields(form)?;
        posted.extend(fields.iter().map(|(name, value)| (name.clone(), value.clone())));

        let response = self.fetch.submit(&posted).await?;
        if !response.is_success() {
            let message = response
                .failure_message()
                .unwrap_or_else(|| "submission failed".to_string());
            return Err(RelEditError::ServerReported(message));
        }

        let prefix = self.fetch.config().session_prefix.clone();
        posted.extend(directive_fields(&response, &prefix));
        let params = form::session_params(
            posted.iter().map(|(name, value)| (name.as_str(), value.as_str())),
            &prefix,
        )?;
        debug!(div_id, form_id = %params.form_id, reload = ?params.reload, "submission accepted");

        if let Reload::Navigate(url) = &params.reload {
            info!(div_id, url = %url, "navigating after edition");
            self.sessions().remove(div_id);
            self.renderer().navigate(url);
            return Ok(SubmitOutcome::Navigated(url.clone()));
        }
        if params.reload == Reload::Page || params.form_id == DELETE_CONFIRMATION_FORM {
            info!(div_id, form_id = %params.form_id, "reloading page after edition");
            self.sessions().remove(div_id);
            self.renderer().reload_page();
            return Ok(SubmitOutcome::PageReloaded);
        }
        self.refresh(div_id, params).await
    }

    /// Re-render the edited region and close the session.
    async fn refresh(&self, session_div: &str, params: SessionParams) -> Result<SubmitOutcome> {
        let target = params.div_id.clone();
        self.engine.ensure(&target).await;
        let request = params
            .to_params()
            .into_iter()
            .fold(
                FetchRequest::new(&target, RELEDIT_FORM_FUNCTION).method(Method::Post),
                |request, (name, value)| request.param(name, value),
            );

        let outcome = self
            .engine
            .load_then(
                &target,
                SwapMode::Swap,
                self.fetch.call(&request),
                |_, renderer| {
                    self.sessions().remove(session_div);
                    show_value(renderer, session_div);
                    true
                },
            )
            .await?;

        match outcome {
            SwapOutcome::Applied => {
                info!(div_id = %target, "edited region reloaded");
                self.engine.events().emit(RegionEvent::RelEditReloaded {
                    params: params.clone(),
                });
                Ok(SubmitOutcome::Refreshed(params))
            }
            SwapOutcome::Superseded => {
                debug!(div_id = %target, "refresh superseded, closing session");
                self.sessions().remove(session_div);
                show_value(self.renderer(), session_div);
                Ok(SubmitOutcome::Superseded)
            }
        }
    }

    /// Leave edition: drop error messages, hide the form, show the value again.
    ///
    /// Returns false when there was nothing to close. A pending form load for
    /// the session is abandoned either way.
    pub async fn cancel(&self, div_id: &str) -> Result<bool> {
        self.engine.cancel(&reledit_region(div_id)).await;
        let previous = {
            let mut sessions = self.sessions();
            match sessions.get(div_id).map(|session| session.state) {
                Some(SessionState::Submitting) => {
                    return Err(RelEditError::InvalidState {
                        div_id: div_id.to_string(),
                        state: SessionState::Submitting.name(),
                        operation: "cancel",
                    });
                }
                Some(state) => {
                    sessions.remove(div_id);
                    state
                }
                None => SessionState::Closed,
            }
        };
        if previous != SessionState::Editing {
            return Ok(false);
        }
        info!(div_id, "inline edition cancelled");
        let renderer = self.renderer();
        renderer.clear_messages();
        show_value(renderer, div_id);
        Ok(true)
    }
}

/// Directive fields of a submission answer, as prefixed form fields so they
/// override the form's own values.
fn directive_fields(response: &SubmitResponse, prefix: &str) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    if let Some(reload) = &response.reload {
        fields.push((format!("{prefix}reload"), reload.to_string()));
    }
    if let Some(div_id) = &response.div_id {
        fields.push((format!("{prefix}divid"), div_id.clone()));
    }
    if let Some(form_id) = &response.form_id {
        fields.push((format!("{prefix}formid"), form_id.clone()));
    }
    fields
}

fn show_form(renderer: &dyn Renderer, div_id: &str) {
    renderer.set_visible(div_id, false);
    renderer.set_visible(&value_region(div_id), false);
    renderer.set_visible(&form_region(div_id), true);
}

fn show_value(renderer: &dyn Renderer, div_id: &str) {
    renderer.set_visible(div_id, true);
    renderer.set_visible(&value_region(div_id), true);
    renderer.set_visible(&form_region(div_id), false);
}
