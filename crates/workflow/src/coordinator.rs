//! The try-on workflow coordinator.
//!
//! Owns every piece of session state behind one mutex and exposes the
//! workflow operations as the only way to change it. The mutex is never held
//! across an `.await`: operations check their precondition, release the lock,
//! call the encoder or gateway, then re-lock to apply the outcome.
//!
//! Each stage transition and each reset bumps an epoch counter. A completion
//! whose epoch no longer matches only applies its append-only effects (a new
//! generated candidate, a history entry); slot and stage effects are dropped.

use bananafit_config::CatalogConfig;
use bananafit_core::{
    AssetEncoder, AssetPayload, DomainEvent, EventBus, GenerationGateway, ImageAsset, InlineImage,
    LocalFile, Stage,
};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::candidates::ClothingCandidates;
use crate::history::{HistoryEntry, HistoryLog};
use crate::snapshot::{BusyFlags, Notice, Operation, OperationOutcome, WorkflowSnapshot};

struct SessionState {
    stage: Stage,
    person: Option<InlineImage>,
    clothing: Option<InlineImage>,
    clothing_id: Option<String>,
    result: Option<InlineImage>,
    candidates: ClothingCandidates,
    history: HistoryLog,
    busy: BusyFlags,
    notice: Option<Notice>,
    epoch: u64,
    /// Bumped whenever a clothing selection starts or lands; the latest wins.
    clothing_ticket: u64,
    generated_seq: u64,
}

impl SessionState {
    fn new(clothing: Vec<ImageAsset>) -> Self {
        Self {
            stage: Stage::SelectPerson,
            person: None,
            clothing: None,
            clothing_id: None,
            result: None,
            candidates: ClothingCandidates::new(clothing),
            history: HistoryLog::new(),
            busy: BusyFlags::default(),
            notice: None,
            epoch: 0,
            clothing_ticket: 0,
            generated_seq: 0,
        }
    }

    fn transition(&mut self, to: Stage, events: &EventBus) {
        if self.stage == to {
            return;
        }
        let from = self.stage;
        self.stage = to;
        self.epoch += 1;
        info!(from = %from, to = %to, "Workflow stage changed");
        events.publish(DomainEvent::StageChanged {
            from,
            to,
            timestamp: Utc::now(),
        });
    }

    fn raise(&mut self, notice: Notice, events: &EventBus) {
        warn!(
            operation = %notice.operation,
            detail = %notice.detail,
            "Workflow operation failed"
        );
        events.publish(DomainEvent::NoticeRaised {
            operation: notice.operation.to_string(),
            message: notice.message.clone(),
            timestamp: notice.raised_at,
        });
        self.notice = Some(notice);
    }
}

/// Drives one try-on session.
pub struct WorkflowCoordinator {
    encoder: Arc<dyn AssetEncoder>,
    gateway: Arc<dyn GenerationGateway>,
    persons: Vec<ImageAsset>,
    state: Mutex<SessionState>,
    event_bus: Arc<EventBus>,
}

impl WorkflowCoordinator {
    pub fn new(
        encoder: Arc<dyn AssetEncoder>,
        gateway: Arc<dyn GenerationGateway>,
        persons: Vec<ImageAsset>,
        clothing: Vec<ImageAsset>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            encoder,
            gateway,
            persons,
            state: Mutex::new(SessionState::new(clothing)),
            event_bus,
        }
    }

    /// Build a coordinator whose presets come from the configured catalog.
    pub fn from_catalog(
        encoder: Arc<dyn AssetEncoder>,
        gateway: Arc<dyn GenerationGateway>,
        catalog: &CatalogConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self::new(
            encoder,
            gateway,
            catalog.person_assets(),
            catalog.clothing_assets(),
            event_bus,
        )
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.state();
        WorkflowSnapshot {
            stage: state.stage,
            person: state.person.clone(),
            clothing: state.clothing.clone(),
            selected_clothing_id: state.clothing_id.clone(),
            result: state.result.clone(),
            candidates: state.candidates.to_vec(),
            busy: state.busy,
            notice: state.notice.clone(),
            history_len: state.history.len(),
        }
    }

    /// Completed compositions, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state().history.all().to_vec()
    }

    pub fn person_presets(&self) -> &[ImageAsset] {
        &self.persons
    }

    pub fn find_person(&self, id: &str) -> Option<ImageAsset> {
        self.persons.iter().find(|asset| asset.id == id).cloned()
    }

    pub fn find_clothing(&self, id: &str) -> Option<ImageAsset> {
        self.state().candidates.find(id).cloned()
    }

    // ── Person selection ────────────────────────────────────────────────

    /// Select a catalog person. Moves to clothing selection on success.
    pub async fn choose_person_from_catalog(&self, asset: &ImageAsset) -> OperationOutcome {
        let op = Operation::ChoosePerson;
        let Some(epoch) = self.begin_person(op) else {
            return OperationOutcome::Rejected;
        };
        let encoded = match &asset.payload {
            AssetPayload::Inline(image) => Ok(image.clone()),
            AssetPayload::Remote(url) => self
                .encoder
                .encode_remote_url(url)
                .await
                .map_err(bananafit_core::Error::from),
        };
        self.finish_person(op, epoch, encoded)
    }

    /// Use an uploaded photo as the person. Moves to clothing selection on success.
    pub async fn upload_person(&self, file: &LocalFile) -> OperationOutcome {
        let op = Operation::UploadPerson;
        let Some(epoch) = self.begin_person(op) else {
            return OperationOutcome::Rejected;
        };
        let encoded = self
            .encoder
            .encode_local_file(file)
            .await
            .map_err(bananafit_core::Error::from);
        self.finish_person(op, epoch, encoded)
    }

    fn begin_person(&self, op: Operation) -> Option<u64> {
        let state = self.state();
        if state.stage != Stage::SelectPerson {
            debug!(operation = %op, stage = %state.stage, "Rejected: not selecting a person");
            return None;
        }
        Some(state.epoch)
    }

    fn finish_person(
        &self,
        op: Operation,
        epoch: u64,
        encoded: bananafit_core::Result<InlineImage>,
    ) -> OperationOutcome {
        let mut state = self.state();
        match encoded {
            Ok(image) => {
                if state.epoch != epoch {
                    debug!(operation = %op, "Dropped: superseded while encoding");
                    return OperationOutcome::Rejected;
                }
                debug!(
                    operation = %op,
                    mime = %image.mime_type(),
                    bytes = image.approx_byte_len(),
                    "Person image loaded"
                );
                state.person = Some(image);
                state.notice = None;
                state.transition(Stage::SelectClothing, &self.event_bus);
                OperationOutcome::Applied
            }
            Err(e) => {
                let notice = Notice::new(op, e);
                state.raise(notice.clone(), &self.event_bus);
                OperationOutcome::Failed(notice)
            }
        }
    }

    // ── Clothing selection ──────────────────────────────────────────────

    /// Select a clothing candidate. Inline payloads are used as-is.
    pub async fn choose_clothing(&self, asset: &ImageAsset) -> OperationOutcome {
        let op = Operation::ChooseClothing;
        let Some((epoch, ticket)) = self.begin_clothing(op) else {
            return OperationOutcome::Rejected;
        };
        let encoded = match &asset.payload {
            AssetPayload::Inline(image) => Ok(image.clone()),
            AssetPayload::Remote(url) => self
                .encoder
                .encode_remote_url(url)
                .await
                .map_err(bananafit_core::Error::from),
        };
        self.finish_clothing(op, epoch, ticket, Some(asset.id.clone()), encoded)
    }

    /// Use an uploaded photo as the garment.
    pub async fn upload_clothing(&self, file: &LocalFile) -> OperationOutcome {
        let op = Operation::UploadClothing;
        let Some((epoch, ticket)) = self.begin_clothing(op) else {
            return OperationOutcome::Rejected;
        };
        let encoded = self
            .encoder
            .encode_local_file(file)
            .await
            .map_err(bananafit_core::Error::from);
        self.finish_clothing(op, epoch, ticket, None, encoded)
    }

    fn begin_clothing(&self, op: Operation) -> Option<(u64, u64)> {
        let mut state = self.state();
        if state.stage != Stage::SelectClothing {
            debug!(operation = %op, stage = %state.stage, "Rejected: not selecting clothing");
            return None;
        }
        state.clothing_ticket += 1;
        Some((state.epoch, state.clothing_ticket))
    }

    fn finish_clothing(
        &self,
        op: Operation,
        epoch: u64,
        ticket: u64,
        asset_id: Option<String>,
        encoded: bananafit_core::Result<InlineImage>,
    ) -> OperationOutcome {
        let mut state = self.state();
        match encoded {
            Ok(image) => {
                if state.epoch != epoch || state.clothing_ticket != ticket {
                    debug!(operation = %op, "Dropped: superseded while encoding");
                    return OperationOutcome::Rejected;
                }
                debug!(
                    operation = %op,
                    asset_id = ?asset_id,
                    mime = %image.mime_type(),
                    bytes = image.approx_byte_len(),
                    "Clothing image loaded"
                );
                state.clothing = Some(image);
                state.clothing_id = asset_id;
                state.notice = None;
                OperationOutcome::Applied
            }
            Err(e) => {
                let notice = Notice::new(op, e);
                state.raise(notice.clone(), &self.event_bus);
                OperationOutcome::Failed(notice)
            }
        }
    }

    // ── Generation ──────────────────────────────────────────────────────

    /// Synthesize a garment from a text description.
    ///
    /// The new garment is prepended to the candidates and selected, unless a
    /// clothing selection started after it. A second request while one is in
    /// flight is rejected.
    pub async fn generate_clothing(&self, prompt: &str) -> OperationOutcome {
        let op = Operation::GenerateClothing;
        if prompt.trim().is_empty() {
            debug!(operation = %op, "Rejected: empty prompt");
            return OperationOutcome::Rejected;
        }

        let (epoch, ticket) = {
            let mut state = self.state();
            if state.stage != Stage::SelectClothing {
                debug!(operation = %op, stage = %state.stage, "Rejected: not selecting clothing");
                return OperationOutcome::Rejected;
            }
            if state.busy.generating_clothing {
                debug!(operation = %op, "Rejected: clothing generation already in flight");
                return OperationOutcome::Rejected;
            }
            state.busy.generating_clothing = true;
            state.clothing_ticket += 1;
            (state.epoch, state.clothing_ticket)
        };

        debug!(gateway = %self.gateway.name(), prompt_len = prompt.len(), "Generating clothing");
        let generated = self.gateway.synthesize_clothing(prompt).await;

        let mut state = self.state();
        state.busy.generating_clothing = false;
        match generated {
            Ok(image) => {
                state.generated_seq += 1;
                let id = format!("gen_{}_{}", Utc::now().timestamp_millis(), state.generated_seq);
                state
                    .candidates
                    .prepend_generated(ImageAsset::generated(id.clone(), image.clone()));
                info!(asset_id = %id, mime = %image.mime_type(), "Clothing generated");
                self.event_bus.publish(DomainEvent::ClothingGenerated {
                    asset_id: id.clone(),
                    timestamp: Utc::now(),
                });

                if state.epoch == epoch && state.clothing_ticket == ticket {
                    state.clothing = Some(image);
                    state.clothing_id = Some(id);
                    state.notice = None;
                } else {
                    debug!(asset_id = %id, "Generated clothing kept as candidate only");
                }
                OperationOutcome::Applied
            }
            Err(e) => {
                let notice = Notice::new(op, e);
                state.raise(notice.clone(), &self.event_bus);
                OperationOutcome::Failed(notice)
            }
        }
    }

    /// Compose the selected person and garment.
    ///
    /// The stage moves to `Result` before the gateway is called and moves
    /// back to `SelectClothing` if the call fails.
    pub async fn generate_result(&self) -> OperationOutcome {
        let op = Operation::GenerateResult;

        let (epoch, person, clothing) = {
            let mut state = self.state();
            if state.stage != Stage::SelectClothing {
                debug!(operation = %op, stage = %state.stage, "Rejected: not selecting clothing");
                return OperationOutcome::Rejected;
            }
            if state.busy.generating_result {
                debug!(operation = %op, "Rejected: composition already in flight");
                return OperationOutcome::Rejected;
            }
            let (Some(person), Some(clothing)) = (state.person.clone(), state.clothing.clone())
            else {
                debug!(operation = %op, "Rejected: person or clothing missing");
                return OperationOutcome::Rejected;
            };
            state.busy.generating_result = true;
            state.result = None;
            state.transition(Stage::Result, &self.event_bus);
            (state.epoch, person, clothing)
        };

        debug!(
            gateway = %self.gateway.name(),
            person_bytes = person.approx_byte_len(),
            clothing_bytes = clothing.approx_byte_len(),
            "Generating try-on"
        );
        let composed = self.gateway.synthesize_try_on(&person, &clothing).await;

        let mut state = self.state();
        state.busy.generating_result = false;
        match composed {
            Ok(image) => {
                let entry = HistoryEntry::new(person, clothing, image.clone());
                let entry_id = entry.id.clone();
                state.history.append(entry);
                info!(entry_id = %entry_id, mime = %image.mime_type(), "Try-on composed");
                self.event_bus.publish(DomainEvent::CompositionCompleted {
                    entry_id,
                    timestamp: Utc::now(),
                });

                if state.epoch == epoch {
                    state.result = Some(image);
                    state.notice = None;
                } else {
                    debug!("Composition recorded in history only");
                }
                OperationOutcome::Applied
            }
            Err(e) => {
                let notice = Notice::new(op, e);
                state.raise(notice.clone(), &self.event_bus);
                if state.epoch == epoch {
                    state.result = None;
                    state.transition(Stage::SelectClothing, &self.event_bus);
                }
                OperationOutcome::Failed(notice)
            }
        }
    }

    // ── Reset ───────────────────────────────────────────────────────────

    /// Return to person selection with every slot emptied. History and
    /// generated candidates are kept.
    pub fn reset(&self) {
        let mut state = self.state();
        state.person = None;
        state.clothing = None;
        state.clothing_id = None;
        state.result = None;
        state.notice = None;
        state.clothing_ticket += 1;
        state.epoch += 1;
        state.transition(Stage::SelectPerson, &self.event_bus);
        info!("Workflow reset");
        self.event_bus.publish(DomainEvent::SessionReset {
            timestamp: Utc::now(),
        });
    }
}
