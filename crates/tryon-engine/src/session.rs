//! The guided try-on wizard
//!
//! `Session` owns the asset registry and the [`SessionState`] and exposes the
//! named transitions that change them. Two generation slots exist: try-on
//! composition (`generating`) and garment-from-prompt (`generating_garment`).
//! Starting an action in a busy slot is a no-op.
//!
//! Errors never escape a session action. They become `last_error` text plus
//! a defined state transition, and are handed back in [`Outcome::Failed`] for
//! callers that want the structured error.
//!
//! Internal state sits behind a mutex that is never held across an await, so
//! actions take `&self` and overlapping calls observe each other's slot flags.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{Instrument, debug, warn};

use crate::codec::{DisplayRef, EncodedImage};
use crate::fetch::{HttpFetcher, ImageFetcher};
use crate::pipeline::{GarmentPrompt, GenerationPipeline};
use crate::registry::{AssetId, AssetInput, AssetKind, AssetRegistry, ImageAsset, Provenance};
use tryon_config::Config;
use tryon_utils::error::{AssetError, TryOnError, UserFriendlyError};
use tryon_utils::logging::{action_span, log_action_complete, log_action_error, log_action_start};
use tryon_utils::redaction::redact_error_message;

/// Wizard step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    ChoosingPerson,
    ChoosingGarment,
    ViewingResult,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::ChoosingPerson => "choosing person",
            Step::ChoosingGarment => "choosing garment",
            Step::ViewingResult => "viewing result",
        })
    }
}

/// Observable session state
///
/// `current_result` is only present after a successful composition with no
/// failure since. `history` holds every successful result, newest first, and
/// only ever grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub step: Step,
    pub generating: bool,
    pub generating_garment: bool,
    pub current_result: Option<DisplayRef>,
    pub history: Vec<DisplayRef>,
    /// Cleared only when a generation action starts or by [`Session::dismiss_error`];
    /// successful selections, uploads and step changes leave it in place.
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            step: Step::ChoosingPerson,
            generating: false,
            generating_garment: false,
            current_result: None,
            history: Vec::new(),
            last_error: None,
        }
    }
}

/// Result of a session action
#[derive(Debug)]
pub enum Outcome<T> {
    /// Preconditions not met or the slot was busy; nothing changed
    Skipped,
    Done(T),
    /// The action ran and failed; `last_error` has been set
    Failed(TryOnError),
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped)
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// The produced value, if the action succeeded
    #[must_use]
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            _ => None,
        }
    }
}

struct Inner {
    registry: AssetRegistry,
    state: SessionState,
}

/// One user's try-on session
pub struct Session {
    inner: Mutex<Inner>,
    pipeline: GenerationPipeline,
    fetcher: Arc<dyn ImageFetcher>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn describe(error: &TryOnError) -> String {
    redact_error_message(&error.user_message())
}

impl Session {
    #[must_use]
    pub fn new(
        registry: AssetRegistry,
        pipeline: GenerationPipeline,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                registry,
                state: SessionState::default(),
            }),
            pipeline,
            fetcher,
        }
    }

    /// Session seeded with the configured presets, using the configured
    /// provider and an HTTP fetcher
    ///
    /// # Errors
    ///
    /// Returns `TryOnError` if the provider backend or HTTP fetcher cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, TryOnError> {
        let pipeline = GenerationPipeline::from_config(config)?;
        let fetcher = HttpFetcher::from_config(config)?;
        Ok(Self::new(
            AssetRegistry::with_presets(&config.presets),
            pipeline,
            Arc::new(fetcher),
        ))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is updated in single assignments, so a poisoned lock still holds consistent data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// Read access to the registry
    pub fn with_registry<R>(&self, f: impl FnOnce(&AssetRegistry) -> R) -> R {
        f(&self.lock().registry)
    }

    #[must_use]
    pub fn selected(&self, kind: AssetKind) -> Option<ImageAsset> {
        self.lock().registry.selected(kind).cloned()
    }

    #[must_use]
    pub fn history(&self) -> Vec<DisplayRef> {
        self.lock().state.history.clone()
    }

    /// History entry `index` (0 = newest). Does not change `current_result`.
    #[must_use]
    pub fn history_entry(&self, index: usize) -> Option<DisplayRef> {
        self.lock().state.history.get(index).cloned()
    }

    /// Add an uploaded, remote or encoded asset and select it
    ///
    /// # Errors
    ///
    /// Returns `AssetError::Creation` for unusable input; `last_error` is set too.
    pub fn add_asset(
        &self,
        kind: AssetKind,
        input: AssetInput,
        provenance: Provenance,
    ) -> Result<ImageAsset, AssetError> {
        let span = action_span("upload");
        let _guard = span.enter();

        let mut inner = self.lock();
        match inner.registry.add_asset(kind, input, provenance) {
            Ok(asset) => {
                debug!(kind = %kind, id = %asset.id(), provenance = %provenance, "Asset added");
                Ok(asset)
            }
            Err(err) => {
                warn!(kind = %kind, error = %err, "Asset creation failed");
                inner.state.last_error = Some(redact_error_message(&err.user_message()));
                Err(err)
            }
        }
    }

    /// Select an asset by id
    ///
    /// # Errors
    ///
    /// Returns `AssetError::NotFound` if the id is absent; `last_error` is set
    /// and the previous selection is kept.
    pub fn select(&self, kind: AssetKind, id: &AssetId) -> Result<(), AssetError> {
        let mut inner = self.lock();
        let result = inner.registry.select(kind, id);
        if let Err(err) = &result {
            warn!(kind = %kind, id = %id, "Selection refers to a missing asset");
            inner.state.last_error = Some(redact_error_message(&err.user_message()));
        }
        result
    }

    /// Move to `target`. Returns whether the step was applied.
    ///
    /// Backward moves always apply. Moving to `ChoosingGarment` needs a
    /// selected person; moving to `ViewingResult` needs a current result.
    /// Anything else is a no-op.
    pub fn go_to_step(&self, target: Step) -> bool {
        let mut inner = self.lock();
        let allowed = target <= inner.state.step
            || match target {
                Step::ChoosingPerson => true,
                Step::ChoosingGarment => inner.registry.selected(AssetKind::Person).is_some(),
                Step::ViewingResult => inner.state.current_result.is_some(),
            };

        if allowed {
            inner.state.step = target;
        } else {
            debug!(from = %inner.state.step, to = %target, "Step change rejected");
        }
        allowed
    }

    /// Clear `last_error`
    pub fn dismiss_error(&self) {
        self.lock().state.last_error = None;
    }

    /// Compose the selected person and garment into a try-on result
    ///
    /// No-op unless both are selected and no composition is in flight. On
    /// failure the session returns to garment selection with `last_error` set.
    pub async fn start_try_on(&self) -> Outcome<DisplayRef> {
        let span = action_span("start_try_on");
        self.start_try_on_inner().instrument(span).await
    }

    async fn start_try_on_inner(&self) -> Outcome<DisplayRef> {
        let (person, garment) = {
            let mut inner = self.lock();
            if inner.state.generating {
                debug!("Try-on already in progress, ignoring duplicate request");
                return Outcome::Skipped;
            }
            let (Some(person), Some(garment)) = (
                inner.registry.selected(AssetKind::Person).cloned(),
                inner.registry.selected(AssetKind::Garment).cloned(),
            ) else {
                debug!("Try-on requested without both selections");
                return Outcome::Skipped;
            };

            let state = &mut inner.state;
            state.generating = true;
            state.step = Step::ViewingResult;
            state.last_error = None;
            state.current_result = None;
            (person, garment)
        };

        let started = Instant::now();
        log_action_start("start_try_on");

        let result = self.compose(&person, &garment).await;

        let mut inner = self.lock();
        let state = &mut inner.state;
        state.generating = false;
        let elapsed = started.elapsed().as_millis();

        match result {
            Ok(display_ref) => {
                state.current_result = Some(display_ref.clone());
                state.history.insert(0, display_ref.clone());
                log_action_complete("start_try_on", elapsed);
                Outcome::Done(display_ref)
            }
            Err(err) => {
                let message = describe(&err);
                log_action_error("start_try_on", &err.to_string(), elapsed);
                state.last_error = Some(message);
                state.step = Step::ChoosingGarment;
                Outcome::Failed(err)
            }
        }
    }

    /// Strictly ordered: person encoding, garment encoding, composition.
    async fn compose(
        &self,
        person: &ImageAsset,
        garment: &ImageAsset,
    ) -> Result<DisplayRef, TryOnError> {
        let person_encoding = person.resolve_encoding(self.fetcher.as_ref()).await?;
        let garment_encoding = garment.resolve_encoding(self.fetcher.as_ref()).await?;
        let result = self
            .pipeline
            .compose_try_on(&person_encoding, &garment_encoding)
            .await?;
        Ok(result.to_display_ref())
    }

    /// Generate a garment from a text description and select it
    ///
    /// No-op for a blank prompt or while another garment generation is in
    /// flight. On failure `last_error` is set and the step is left unchanged.
    pub async fn generate_garment_from_prompt(&self, prompt_text: &str) -> Outcome<ImageAsset> {
        let span = action_span("generate_garment");
        self.generate_garment_inner(prompt_text)
            .instrument(span)
            .await
    }

    async fn generate_garment_inner(&self, prompt_text: &str) -> Outcome<ImageAsset> {
        let Some(prompt) = GarmentPrompt::parse(prompt_text) else {
            debug!("Empty garment prompt, ignoring");
            return Outcome::Skipped;
        };

        {
            let mut inner = self.lock();
            if inner.state.generating_garment {
                debug!("Garment generation already in progress, ignoring duplicate request");
                return Outcome::Skipped;
            }
            inner.state.generating_garment = true;
            inner.state.last_error = None;
        }

        let started = Instant::now();
        log_action_start("generate_garment");

        let generated = self.pipeline.generate_garment(&prompt).await;

        let mut inner = self.lock();
        inner.state.generating_garment = false;
        let elapsed = started.elapsed().as_millis();

        let outcome = generated
            .map_err(TryOnError::from)
            .and_then(|EncodedImage { media_type, data }| {
                inner
                    .registry
                    .add_asset(
                        AssetKind::Garment,
                        AssetInput::Encoded {
                            data,
                            media_type: Some(media_type),
                        },
                        Provenance::Generated,
                    )
                    .map_err(TryOnError::from)
            });

        match outcome {
            Ok(asset) => {
                log_action_complete("generate_garment", elapsed);
                Outcome::Done(asset)
            }
            Err(err) => {
                log_action_error("generate_garment", &err.to_string(), elapsed);
                inner.state.last_error = Some(describe(&err));
                Outcome::Failed(err)
            }
        }
    }
}
