//! The verification workflow as an explicit state value and a pure
//! transition function.
//!
//! `Workflow::step` consumes one event and returns the next workflow plus at
//! most one side effect for the caller to perform. Nothing in here touches
//! the network or the clock, so every transition is testable in isolation.

use crate::acquisition::ValidationOutcome;
use crate::error::{SubmitError, ValidationError};
use crate::model::{AnalysisResult, MediaFile};
use crate::navigator::VisualizationNavigator;

#[derive(Debug, Clone, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    Ready {
        file: MediaFile,
    },
    Submitting {
        file: MediaFile,
        generation: u64,
    },
    Resulted {
        file: MediaFile,
        result: AnalysisResult,
        navigator: VisualizationNavigator,
    },
    Failed {
        file: MediaFile,
        error: SubmitError,
    },
}

impl WorkflowState {
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "Idle",
            WorkflowState::Ready { .. } => "Ready",
            WorkflowState::Submitting { .. } => "Submitting",
            WorkflowState::Resulted { .. } => "Resulted",
            WorkflowState::Failed { .. } => "Failed",
        }
    }
}

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    Select(ValidationOutcome),
    Submit,
    Completed {
        generation: u64,
        outcome: Result<AnalysisResult, SubmitError>,
    },
    Reset,
    SelectFrame(usize),
    NextFrame,
    PreviousFrame,
}

/// Work the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send `file` to the service, tagged with `generation`.
    Dispatch {
        generation: u64,
        file: MediaFile,
        include_evidence: bool,
    },
    /// A completion arrived for a request the workflow no longer waits on.
    Discarded { generation: u64 },
}

#[derive(Debug)]
pub struct Transition {
    pub workflow: Workflow,
    pub effect: Option<Effect>,
}

#[derive(Debug, Clone, Default)]
pub struct Workflow {
    state: WorkflowState,
    notice: Option<ValidationError>,
    generation: u64,
    include_evidence: bool,
}

impl Workflow {
    pub fn new(include_evidence: bool) -> Self {
        Self {
            include_evidence,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Last rejected selection, if it has not been superseded.
    pub fn notice(&self) -> Option<&ValidationError> {
        self.notice.as_ref()
    }

    /// Generation of the most recently dispatched request.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn file(&self) -> Option<&MediaFile> {
        match &self.state {
            WorkflowState::Idle => None,
            WorkflowState::Ready { file }
            | WorkflowState::Submitting { file, .. }
            | WorkflowState::Resulted { file, .. }
            | WorkflowState::Failed { file, .. } => Some(file),
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            WorkflowState::Resulted { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn navigator(&self) -> Option<&VisualizationNavigator> {
        match &self.state {
            WorkflowState::Resulted { navigator, .. } => Some(navigator),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SubmitError> {
        match &self.state {
            WorkflowState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn can_submit(&self) -> bool {
        matches!(self.state, WorkflowState::Ready { .. })
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, WorkflowState::Submitting { .. })
    }

    pub fn step(self, event: WorkflowEvent) -> Transition {
        let mut next = self;
        let mut effect = None;

        match event {
            WorkflowEvent::Select(ValidationOutcome::Accepted(file)) => {
                // Accepted from any state; a request still in flight becomes stale.
                next.state = WorkflowState::Ready { file };
                next.notice = None;
            }
            WorkflowEvent::Select(ValidationOutcome::Rejected(err)) => {
                next.notice = Some(err);
            }
            WorkflowEvent::Submit => match std::mem::take(&mut next.state) {
                WorkflowState::Ready { file } => {
                    next.generation += 1;
                    effect = Some(Effect::Dispatch {
                        generation: next.generation,
                        file: file.clone(),
                        include_evidence: next.include_evidence,
                    });
                    next.state = WorkflowState::Submitting {
                        file,
                        generation: next.generation,
                    };
                }
                other => next.state = other,
            },
            WorkflowEvent::Completed {
                generation: done,
                outcome,
            } => match std::mem::take(&mut next.state) {
                WorkflowState::Submitting { file, generation } if generation == done => {
                    next.state = match outcome {
                        Ok(result) => {
                            let navigator =
                                VisualizationNavigator::new(result.evidence_frames.clone());
                            WorkflowState::Resulted {
                                file,
                                result,
                                navigator,
                            }
                        }
                        Err(error) => WorkflowState::Failed { file, error },
                    };
                }
                other => {
                    next.state = other;
                    effect = Some(Effect::Discarded { generation: done });
                }
            },
            WorkflowEvent::Reset => {
                next.state = WorkflowState::Idle;
                next.notice = None;
            }
            WorkflowEvent::SelectFrame(i) => {
                if let WorkflowState::Resulted { navigator, .. } = &mut next.state {
                    navigator.select(i);
                }
            }
            WorkflowEvent::NextFrame => {
                if let WorkflowState::Resulted { navigator, .. } = &mut next.state {
                    navigator.next();
                }
            }
            WorkflowEvent::PreviousFrame => {
                if let WorkflowState::Resulted { navigator, .. } = &mut next.state {
                    navigator.previous();
                }
            }
        }

        Transition {
            workflow: next,
            effect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, EvidenceFrame, Provenance};
    use bytes::Bytes;

    fn video(name: &str) -> MediaFile {
        MediaFile {
            name: name.into(),
            mime: "video/mp4".into(),
            payload: Bytes::from_static(b"mp4-bytes"),
        }
    }

    fn accepted(name: &str) -> WorkflowEvent {
        WorkflowEvent::Select(ValidationOutcome::Accepted(video(name)))
    }

    fn rejected() -> WorkflowEvent {
        WorkflowEvent::Select(ValidationOutcome::Rejected(ValidationError::NotVideo {
            name: "photo.png".into(),
            mime: "image/png".into(),
        }))
    }

    fn result(frames: Vec<EvidenceFrame>) -> AnalysisResult {
        AnalysisResult {
            category: Category::Manipulated,
            confidence: 0.972,
            source_name: "a.mp4".into(),
            evidence_frames: frames.into(),
            provenance: Provenance::default(),
        }
    }

    fn frame(frame_index: i64) -> EvidenceFrame {
        EvidenceFrame {
            image: String::new(),
            frame_index,
            score: 0.5,
            is_key_detection: false,
        }
    }

    fn run(mut wf: Workflow, events: Vec<WorkflowEvent>) -> (Workflow, Vec<Effect>) {
        let mut effects = Vec::new();
        for ev in events {
            let t = wf.step(ev);
            wf = t.workflow;
            effects.extend(t.effect);
        }
        (wf, effects)
    }

    #[test]
    fn valid_selection_moves_to_ready_and_clears_notice() {
        let (wf, _) = run(Workflow::new(true), vec![rejected(), accepted("a.mp4")]);
        assert!(matches!(wf.state(), WorkflowState::Ready { file } if file.name == "a.mp4"));
        assert!(wf.notice().is_none());
    }

    #[test]
    fn invalid_selection_from_idle_stays_idle() {
        let (wf, effects) = run(Workflow::new(true), vec![rejected()]);
        assert!(matches!(wf.state(), WorkflowState::Idle));
        assert!(matches!(wf.notice(), Some(ValidationError::NotVideo { .. })));
        assert!(effects.is_empty());
    }

    #[test]
    fn invalid_selection_keeps_existing_file() {
        let (wf, _) = run(Workflow::new(true), vec![accepted("a.mp4"), rejected()]);
        assert_eq!(wf.file().map(|f| f.name.as_str()), Some("a.mp4"));
        assert!(wf.can_submit());
        assert!(wf.notice().is_some());
    }

    #[test]
    fn invalid_selection_does_not_disturb_result() {
        let (wf, _) = run(
            Workflow::new(true),
            vec![
                accepted("a.mp4"),
                WorkflowEvent::Submit,
                WorkflowEvent::Completed {
                    generation: 1,
                    outcome: Ok(result(vec![])),
                },
                rejected(),
            ],
        );
        assert!(wf.result().is_some());
        assert!(wf.notice().is_some());
    }

    #[test]
    fn submit_outside_ready_is_a_noop() {
        let (idle, effects) = run(Workflow::new(true), vec![WorkflowEvent::Submit]);
        assert!(matches!(idle.state(), WorkflowState::Idle));
        assert_eq!(idle.generation(), 0);
        assert!(effects.is_empty());

        let (submitting, effects) = run(
            Workflow::new(true),
            vec![accepted("a.mp4"), WorkflowEvent::Submit, WorkflowEvent::Submit],
        );
        assert!(submitting.is_submitting());
        assert_eq!(submitting.generation(), 1);
        assert_eq!(effects.len(), 1);

        let (failed, effects) = run(
            submitting,
            vec![
                WorkflowEvent::Completed {
                    generation: 1,
                    outcome: Err(SubmitError::Service("nope".into())),
                },
                WorkflowEvent::Submit,
            ],
        );
        assert!(matches!(failed.state(), WorkflowState::Failed { .. }));
        assert!(effects.is_empty());
    }

    #[test]
    fn submit_dispatches_the_ready_file() {
        let (wf, effects) = run(
            Workflow::new(false),
            vec![accepted("a.mp4"), WorkflowEvent::Submit],
        );
        assert!(matches!(
            wf.state(),
            WorkflowState::Submitting { generation: 1, .. }
        ));
        assert_eq!(
            effects,
            vec![Effect::Dispatch {
                generation: 1,
                file: video("a.mp4"),
                include_evidence: false,
            }]
        );
    }

    #[test]
    fn success_carries_result_and_selects_first_frame() {
        let (wf, _) = run(
            Workflow::new(true),
            vec![
                accepted("a.mp4"),
                WorkflowEvent::Submit,
                WorkflowEvent::Completed {
                    generation: 1,
                    outcome: Ok(result(vec![frame(10), frame(20), frame(30)])),
                },
            ],
        );
        assert_eq!(wf.state().label(), "Resulted");
        assert!(wf.error().is_none());
        let nav = wf.navigator().unwrap();
        assert_eq!(nav.selected(), Some(0));
        assert_eq!(nav.current().unwrap().frame_index, 10);
    }

    #[test]
    fn failure_carries_error() {
        let (wf, _) = run(
            Workflow::new(true),
            vec![
                accepted("a.mp4"),
                WorkflowEvent::Submit,
                WorkflowEvent::Completed {
                    generation: 1,
                    outcome: Err(SubmitError::Service("file too large".into())),
                },
            ],
        );
        assert!(wf.result().is_none());
        assert_eq!(wf.error().unwrap().to_string(), "file too large");
    }

    #[test]
    fn frame_navigation_only_applies_to_results() {
        let (wf, _) = run(
            Workflow::new(true),
            vec![
                accepted("a.mp4"),
                WorkflowEvent::SelectFrame(2),
                WorkflowEvent::Submit,
                WorkflowEvent::Completed {
                    generation: 1,
                    outcome: Ok(result(vec![frame(10), frame(20), frame(30)])),
                },
                WorkflowEvent::SelectFrame(2),
                WorkflowEvent::PreviousFrame,
                WorkflowEvent::SelectFrame(9),
            ],
        );
        assert_eq!(wf.navigator().unwrap().current().unwrap().frame_index, 20);

        let (wf, _) = run(wf, vec![WorkflowEvent::NextFrame, WorkflowEvent::NextFrame]);
        assert_eq!(wf.navigator().unwrap().selected(), Some(2));
    }

    #[test]
    fn late_response_after_reset_is_discarded() {
        let (wf, effects) = run(
            Workflow::new(true),
            vec![
                accepted("a.mp4"),
                WorkflowEvent::Submit,
                WorkflowEvent::Reset,
                WorkflowEvent::Completed {
                    generation: 1,
                    outcome: Ok(result(vec![])),
                },
            ],
        );
        assert!(matches!(wf.state(), WorkflowState::Idle));
        assert_eq!(effects.last(), Some(&Effect::Discarded { generation: 1 }));
    }

    #[test]
    fn late_response_does_not_overwrite_newer_request() {
        let (wf, effects) = run(
            Workflow::new(true),
            vec![
                accepted("a.mp4"),
                WorkflowEvent::Submit,
                accepted("b.mp4"),
                WorkflowEvent::Submit,
                WorkflowEvent::Completed {
                    generation: 1,
                    outcome: Err(SubmitError::transport("connection reset")),
                },
            ],
        );
        assert!(matches!(
            wf.state(),
            WorkflowState::Submitting { generation: 2, file } if file.name == "b.mp4"
        ));
        assert_eq!(effects.last(), Some(&Effect::Discarded { generation: 1 }));

        let (wf, _) = run(
            wf,
            vec![WorkflowEvent::Completed {
                generation: 2,
                outcome: Ok(result(vec![])),
            }],
        );
        assert!(wf.result().is_some());
    }

    #[test]
    fn reset_clears_everything() {
        for outcome in [
            Ok(result(vec![frame(1), frame(2)])),
            Err(SubmitError::Service("x".into())),
        ] {
            let (wf, _) = run(
                Workflow::new(true),
                vec![
                    accepted("a.mp4"),
                    WorkflowEvent::Submit,
                    WorkflowEvent::Completed {
                        generation: 1,
                        outcome,
                    },
                    WorkflowEvent::SelectFrame(1),
                    rejected(),
                    WorkflowEvent::Reset,
                ],
            );
            assert!(matches!(wf.state(), WorkflowState::Idle));
            assert!(wf.file().is_none());
            assert!(wf.result().is_none());
            assert!(wf.error().is_none());
            assert!(wf.notice().is_none());
            assert!(wf.navigator().is_none());
        }
    }

    #[test]
    fn failed_workflow_accepts_a_new_file() {
        let (wf, _) = run(
            Workflow::new(true),
            vec![
                accepted("a.mp4"),
                WorkflowEvent::Submit,
                WorkflowEvent::Completed {
                    generation: 1,
                    outcome: Err(SubmitError::Service("x".into())),
                },
                accepted("b.mp4"),
            ],
        );
        assert!(wf.can_submit());
        assert!(wf.error().is_none());
    }

    #[test]
    fn selection_restarts_at_first_frame_for_every_result() {
        let done = |generation| WorkflowEvent::Completed {
            generation,
            outcome: Ok(result(vec![frame(1), frame(2), frame(3)])),
        };
        let (wf, _) = run(
            Workflow::new(true),
            vec![
                accepted("a.mp4"),
                WorkflowEvent::Submit,
                done(1),
                WorkflowEvent::SelectFrame(2),
                WorkflowEvent::Reset,
                accepted("a.mp4"),
                WorkflowEvent::Submit,
                done(2),
            ],
        );
        assert_eq!(wf.navigator().unwrap().selected(), Some(0));
    }
}
