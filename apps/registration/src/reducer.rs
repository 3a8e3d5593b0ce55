//! Reducer for the per-session pass flow.
//!
//! The session moves `Form → PassShown → Form`. Submitting validates the
//! form (completeness, gender, encodability) before any store access; only a
//! valid form produces the register effect. Downloading produces the
//! accounting effect. Effects report back through `Registered`,
//! `RegistrationFailed` and `DownloadRecorded`.

use crate::services::{self, RegistrationError};
use crate::types::{
    FormError, Notice, PassAction, PassState, RegistrationForm, Screen, SubmissionFailure,
    REGISTERED_MESSAGE,
};
use eventpass_core::{
    code::CodeGenerator, effect::Effect, environment::Clock, record_store::NewRegistration,
    record_store::RecordStore, reducer::Reducer, smallvec, SmallVec,
};
use std::sync::Arc;

/// Environment dependencies for the pass reducer
#[derive(Clone)]
pub struct PassEnvironment {
    /// Registration records
    pub store: Arc<dyn RecordStore>,
    /// Pass image generator (used here only to check encodability)
    pub codes: Arc<dyn CodeGenerator>,
    /// Clock for pass timestamps
    pub clock: Arc<dyn Clock>,
}

impl PassEnvironment {
    /// Creates a new `PassEnvironment`
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        codes: Arc<dyn CodeGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            codes,
            clock,
        }
    }
}

/// Reducer for the pass flow
#[derive(Clone, Debug)]
pub struct PassReducer;

impl PassReducer {
    /// Creates a new `PassReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a submitted form
    fn validate_submission(
        form: &RegistrationForm,
        codes: &dyn CodeGenerator,
    ) -> Result<NewRegistration, String> {
        let registration = form.validate().map_err(|e: FormError| e.to_string())?;

        codes.check(&registration.identifier).map_err(|_| {
            "The identifier may only contain printable ASCII characters.".to_string()
        })?;

        Ok(registration)
    }

    fn reject(state: &mut PassState, notice: Notice, failure: SubmissionFailure) {
        state.notice = Some(notice);
        state.last_failure = Some(failure);
    }
}

impl Default for PassReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for PassReducer {
    type State = PassState;
    type Action = PassAction;
    type Environment = PassEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            PassAction::Submit { form } => {
                if state.pass_identifier().is_some() {
                    tracing::debug!("Ignoring submit while a pass is shown");
                    return SmallVec::new();
                }

                if state.submitting {
                    tracing::debug!("Ignoring submit while a registration is in flight");
                    return SmallVec::new();
                }

                let registration = match Self::validate_submission(&form, env.codes.as_ref()) {
                    Ok(registration) => registration,
                    Err(message) => {
                        Self::reject(state, Notice::warning(message), SubmissionFailure::Invalid);
                        return SmallVec::new();
                    },
                };

                state.submitting = true;
                state.notice = None;
                state.last_failure = None;

                let store = Arc::clone(&env.store);
                smallvec![Effect::future(async move {
                    let identifier = registration.identifier.clone();
                    match services::register(store.as_ref(), registration).await {
                        Ok(()) => Some(PassAction::Registered { identifier }),
                        Err(error) => Some(PassAction::RegistrationFailed { error }),
                    }
                })]
            },

            PassAction::DownloadRequested => {
                let Some(identifier) = state.pass_identifier().map(str::to_string) else {
                    tracing::debug!("Ignoring download without a pass");
                    return SmallVec::new();
                };

                let store = Arc::clone(&env.store);
                smallvec![Effect::future(async move {
                    services::record_download(store.as_ref(), &identifier).await;
                    Some(PassAction::DownloadRecorded { identifier })
                })]
            },

            PassAction::RegisterAnother => {
                if state.pass_identifier().is_some() {
                    *state = PassState::default();
                }
                SmallVec::new()
            },

            // ========== Effect outcomes ==========
            PassAction::Registered { identifier } => {
                state.submitting = false;
                state.screen = Screen::PassShown { identifier };
                state.notice = Some(Notice::success(REGISTERED_MESSAGE));
                state.last_failure = None;
                state.issued_at = Some(env.clock.now());
                state.downloads = 0;
                SmallVec::new()
            },

            PassAction::RegistrationFailed { error } => {
                state.submitting = false;
                let failure = match error {
                    RegistrationError::AlreadyExists { .. } => SubmissionFailure::Duplicate,
                    RegistrationError::Store(_) => SubmissionFailure::Unavailable,
                };
                Self::reject(state, Notice::error(error.to_string()), failure);
                SmallVec::new()
            },

            PassAction::DownloadRecorded { identifier } => {
                if state.pass_identifier() == Some(identifier.as_str()) {
                    state.downloads += 1;
                }
                SmallVec::new()
            },
        }
    }
}
