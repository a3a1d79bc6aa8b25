//! Workflow lifecycle controller.
//!
//! Owns the single `Workflow` value, turns UI commands into workflow events,
//! performs the effects those transitions request and publishes a snapshot
//! to presentation layers after every step.

use super::post_process::process_off_runtime;
use crate::acquisition::{Acquire, FilePicker, MediaGate, ValidationOutcome};
use crate::engine::{self, AnalysisClient};
use crate::error::{SubmitError, ValidationError};
use crate::model::{AnalysisRequest, AnalysisResult, AppEvent, InfoEvent, RunConfig};
use crate::workflow::{Effect, Workflow, WorkflowEvent, WorkflowState};
use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

/// Commands emitted by UI layers to drive the workflow.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// Picked or dropped path to read and validate.
    Open(PathBuf),
    /// An adapter rejected its input before a file could be read.
    Rejected(ValidationError),
    Submit,
    Reset,
    SelectFrame(usize),
    NextFrame,
    PreviousFrame,
    Quit,
}

/// Outcome of one spawned submission.
struct Completion {
    generation: u64,
    outcome: Result<AnalysisResult, SubmitError>,
}

struct Controller {
    cfg: RunConfig,
    client: AnalysisClient,
    gate: MediaGate,
    workflow: Workflow,
    // Request id of the latest dispatch; only that generation can still land.
    latest_request: Option<(u64, String)>,
    event_tx: UnboundedSender<AppEvent>,
    done_tx: UnboundedSender<Completion>,
}

impl Controller {
    fn publish(&self) {
        let _ = self
            .event_tx
            .send(AppEvent::Workflow(Box::new(self.workflow.clone())));
    }

    fn info(&self, ev: InfoEvent) {
        let _ = self.event_tx.send(AppEvent::Info(ev));
    }

    async fn acquire(&self, path: PathBuf) -> ValidationOutcome {
        self.info(InfoEvent::Opening {
            path: path.display().to_string(),
        });
        let outcome = match FilePicker::open(&path).await {
            Ok(candidate) => self.gate.submit(candidate),
            Err(e) => ValidationOutcome::Rejected(e),
        };
        debug!(path = %path.display(), accepted = outcome.is_accepted(), "acquired file");
        outcome
    }

    fn apply(&mut self, event: WorkflowEvent) {
        let from = self.workflow.state().label();
        let t = std::mem::take(&mut self.workflow).step(event);
        self.workflow = t.workflow;
        debug!(
            from,
            to = self.workflow.state().label(),
            generation = self.workflow.generation(),
            "workflow transition"
        );

        match t.effect {
            Some(Effect::Dispatch {
                generation,
                file,
                include_evidence,
            }) => {
                let req = AnalysisRequest {
                    generation,
                    request_id: engine::gen_request_id(),
                    file,
                    include_evidence,
                };
                self.latest_request = Some((generation, req.request_id.clone()));
                self.info(InfoEvent::Dispatched {
                    request_id: req.request_id.clone(),
                    name: req.file.name.clone(),
                });
                let client = self.client.clone();
                let done_tx = self.done_tx.clone();
                tokio::spawn(async move {
                    let outcome = engine::submit(&client, &req).await;
                    let _ = done_tx.send(Completion {
                        generation: req.generation,
                        outcome,
                    });
                });
            }
            Some(Effect::Discarded { generation }) => {
                info!(generation, "discarding response for abandoned request");
                self.info(InfoEvent::StaleDiscarded { generation });
            }
            None => {}
        }

        self.publish();
    }

    async fn complete(&mut self, done: Completion) {
        let generation = done.generation;
        self.apply(WorkflowEvent::Completed {
            generation,
            outcome: done.outcome,
        });

        let request_id = match &self.latest_request {
            Some((g, id)) if *g == generation => id.clone(),
            _ => return,
        };
        match self.workflow.state() {
            WorkflowState::Resulted { file, result, .. } => {
                let processed = process_off_runtime(
                    self.cfg.clone(),
                    request_id,
                    file.clone(),
                    result.clone(),
                )
                .await;
                let _ = self.event_tx.send(AppEvent::Processed(Box::new(processed)));
            }
            WorkflowState::Failed { error, .. } => {
                self.info(InfoEvent::SubmissionFailed(error.clone()));
            }
            _ => {}
        }
    }
}

/// Drive the workflow from UI commands and emit snapshots back to
/// presentation layers. Returns when the UI quits or drops its sender.
pub(crate) async fn run_controller(
    cfg: &RunConfig,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
    let mut ctl = Controller {
        cfg: cfg.clone(),
        client: AnalysisClient::new(cfg)?,
        gate: MediaGate,
        workflow: Workflow::new(cfg.include_evidence),
        latest_request: None,
        event_tx,
        done_tx,
    };
    ctl.publish();
    ctl.info(InfoEvent::Message(format!(
        "Using inference service at {}",
        ctl.client.base_url
    )));

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let event = match cmd {
                    Some(UiCommand::Open(path)) => WorkflowEvent::Select(ctl.acquire(path).await),
                    Some(UiCommand::Rejected(e)) => {
                        WorkflowEvent::Select(ValidationOutcome::Rejected(e))
                    }
                    Some(UiCommand::Submit) => WorkflowEvent::Submit,
                    Some(UiCommand::Reset) => WorkflowEvent::Reset,
                    Some(UiCommand::SelectFrame(i)) => WorkflowEvent::SelectFrame(i),
                    Some(UiCommand::NextFrame) => WorkflowEvent::NextFrame,
                    Some(UiCommand::PreviousFrame) => WorkflowEvent::PreviousFrame,
                    // In-flight requests are abandoned; the service is not told.
                    Some(UiCommand::Quit) | None => break Ok(()),
                };
                ctl.apply(event);
            }
            Some(done) = done_rx.recv() => {
                ctl.complete(done).await;
            }
        }
    }
}
