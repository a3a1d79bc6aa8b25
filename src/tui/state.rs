use crate::acquisition::DropZone;
use crate::model::{AnalysisRecord, AppEvent};
use crate::orchestrator::{ProcessedRun, UiCommand};
use crate::workflow::Workflow;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

pub const TAB_VERIFY: usize = 0;
pub const TAB_HISTORY: usize = 1;
pub const TAB_HELP: usize = 2;
const TAB_COUNT: usize = 3;

pub struct UiState {
    pub tab: usize,
    pub info: String,
    /// Latest snapshot published by the controller.
    pub workflow: Workflow,
    pub drop_zone: DropZone,
    /// Path being typed after `o`; `None` when not editing.
    pub path_input: Option<String>,
    pub last_processed: Option<ProcessedRun>,
    pub history: Vec<AnalysisRecord>,
    pub history_selected: usize, // Index of selected history item (0 = most recent)
    pub history_scroll_offset: usize,
    pub history_load_size: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: TAB_VERIFY,
            info: String::new(),
            workflow: Workflow::default(),
            drop_zone: DropZone::default(),
            path_input: None,
            last_processed: None,
            history: Vec::new(),
            history_selected: 0,
            history_scroll_offset: 0,
            history_load_size: 66,
        }
    }
}

/// What the event loop should do after an input event.
#[derive(Debug)]
pub enum KeyAction {
    None,
    Send(UiCommand),
    ExportJson,
    CopyHash,
    RefreshHistory,
    Quit,
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
    color: Option<Color>,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;
    let value_style = color.map(|c| Style::default().fg(c)).unwrap_or_default();

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::styled(line_text, value_style),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(line_text, value_style),
            ]));
        }

        remaining = rest;
    }
}

impl UiState {
    pub fn is_editing_path(&self) -> bool {
        self.path_input.is_some()
    }

    /// Fold a controller event into the view state.
    /// Returns true when the saved history should be reloaded.
    pub fn apply_event(&mut self, ev: AppEvent) -> bool {
        match ev {
            AppEvent::Workflow(wf) => {
                if let Some(notice) = wf.notice() {
                    self.info = notice.to_string();
                }
                // Export follows the verdict on screen; a reset or new cycle drops it.
                if wf.result().is_none() {
                    self.last_processed = None;
                }
                self.workflow = *wf;
                false
            }
            AppEvent::Info(info) => {
                self.info = info.to_message();
                false
            }
            AppEvent::Processed(p) => {
                if let Some(path) = p.auto_saved_path.as_ref() {
                    self.info = format!("Saved: {}", path.display());
                }
                if !p.messages.is_empty() {
                    self.info = p.messages.join("; ");
                }
                let saved = p.auto_saved_path.is_some();
                self.last_processed = Some(*p);
                saved
            }
        }
    }

    /// Terminal drag-and-drop arrives as a bracketed paste.
    pub fn handle_paste(&mut self, text: &str) -> KeyAction {
        if let Some(input) = self.path_input.as_mut() {
            input.push_str(text);
            self.drop_zone.over();
            return KeyAction::None;
        }
        self.tab = TAB_VERIFY;
        match self.drop_zone.drop(text) {
            Ok(path) => KeyAction::Send(UiCommand::Open(path)),
            Err(e) => KeyAction::Send(UiCommand::Rejected(e)),
        }
    }

    pub fn handle_key(&mut self, k: KeyEvent) -> KeyAction {
        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            return KeyAction::Quit;
        }
        if self.is_editing_path() {
            return self.handle_path_key(k);
        }

        let on_verify = self.tab == TAB_VERIFY;
        match k.code {
            KeyCode::Char('q') => KeyAction::Quit,
            KeyCode::Char('o') => {
                self.tab = TAB_VERIFY;
                self.path_input = Some(String::new());
                self.drop_zone.enter();
                self.info = "Type or drop a video path, Enter to open, Esc to cancel".into();
                KeyAction::None
            }
            KeyCode::Enter | KeyCode::Char('s') if on_verify => {
                if !self.workflow.can_submit() && !self.workflow.is_submitting() {
                    self.info = "Select a video first (o or drop a file)".into();
                }
                KeyAction::Send(UiCommand::Submit)
            }
            KeyCode::Char('x') if on_verify => KeyAction::Send(UiCommand::Reset),
            KeyCode::Left | KeyCode::Char('h') if on_verify => {
                KeyAction::Send(UiCommand::PreviousFrame)
            }
            KeyCode::Right | KeyCode::Char('l') if on_verify => {
                KeyAction::Send(UiCommand::NextFrame)
            }
            KeyCode::Char(c @ '1'..='9') if on_verify => {
                KeyAction::Send(UiCommand::SelectFrame(c as usize - '1' as usize))
            }
            KeyCode::Char('e') => KeyAction::ExportJson,
            KeyCode::Char('y') => KeyAction::CopyHash,
            KeyCode::Char('r') if self.tab == TAB_HISTORY => KeyAction::RefreshHistory,
            KeyCode::Tab => {
                self.tab = (self.tab + 1) % TAB_COUNT;
                if self.tab == TAB_HISTORY {
                    self.history_selected = 0;
                    self.history_scroll_offset = 0;
                }
                KeyAction::None
            }
            KeyCode::Char('?') => {
                self.tab = TAB_HELP;
                KeyAction::None
            }
            KeyCode::Up | KeyCode::Char('k') if self.tab == TAB_HISTORY => {
                if self.history_selected > 0 {
                    self.history_selected -= 1;
                    if self.history_selected < self.history_scroll_offset {
                        self.history_scroll_offset = self.history_selected;
                    }
                }
                KeyAction::None
            }
            KeyCode::Down | KeyCode::Char('j') if self.tab == TAB_HISTORY => {
                if self.history_selected + 1 < self.history.len() {
                    self.history_selected += 1;
                }
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }

    fn handle_path_key(&mut self, k: KeyEvent) -> KeyAction {
        match k.code {
            KeyCode::Esc => {
                self.path_input = None;
                self.drop_zone.leave();
                self.info = "Cancelled".into();
                KeyAction::None
            }
            KeyCode::Enter => {
                let text = self.path_input.take().unwrap_or_default();
                match self.drop_zone.drop(&text) {
                    Ok(path) => KeyAction::Send(UiCommand::Open(path)),
                    Err(e) => KeyAction::Send(UiCommand::Rejected(e)),
                }
            }
            KeyCode::Backspace => {
                if let Some(input) = self.path_input.as_mut() {
                    input.pop();
                }
                KeyAction::None
            }
            KeyCode::Char(c) => {
                if let Some(input) = self.path_input.as_mut() {
                    input.push(c);
                }
                self.drop_zone.over();
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }

    /// Keep the history selection in range after a reload.
    pub fn replace_history(&mut self, history: Vec<AnalysisRecord>) {
        self.history = history;
        if self.history.is_empty() {
            self.history_selected = 0;
            self.history_scroll_offset = 0;
        } else if self.history_selected >= self.history.len() {
            self.history_selected = self.history.len() - 1;
        }
        if self.history_scroll_offset > self.history_selected {
            self.history_scroll_offset = self.history_selected;
        }
    }

    pub fn selected_history(&self) -> Option<&AnalysisRecord> {
        self.history.get(self.history_selected)
    }

    /// Record the Export/Copy actions act on for the current tab.
    pub fn active_record(&self) -> Option<&AnalysisRecord> {
        match self.tab {
            TAB_HISTORY => self.selected_history(),
            _ => self.last_processed.as_ref().map(|p| &p.record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::ValidationOutcome;
    use crate::error::ValidationError;
    use crate::model::{AnalysisResult, Category, EvidenceFrame, InfoEvent, MediaFile, Provenance};
    use crate::workflow::WorkflowEvent;
    use bytes::Bytes;
    use std::path::PathBuf;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(state: &mut UiState, s: &str) {
        for c in s.chars() {
            assert!(matches!(state.handle_key(key(KeyCode::Char(c))), KeyAction::None));
        }
    }

    #[test]
    fn typed_path_opens_on_enter() {
        let mut state = UiState::default();
        state.handle_key(key(KeyCode::Char('o')));
        assert!(state.is_editing_path());
        assert!(state.drop_zone.is_hovering());

        // While editing, command keys are plain text.
        type_str(&mut state, "/tmp/quick.mpx");
        state.handle_key(key(KeyCode::Backspace));
        type_str(&mut state, "4");

        match state.handle_key(key(KeyCode::Enter)) {
            KeyAction::Send(UiCommand::Open(p)) => assert_eq!(p, PathBuf::from("/tmp/quick.mp4")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!state.is_editing_path());
        assert!(!state.drop_zone.is_hovering());
    }

    #[test]
    fn quoted_typed_path_keeps_spaces() {
        let mut state = UiState::default();
        state.handle_key(key(KeyCode::Char('o')));
        type_str(&mut state, "'/tmp/my clip.mp4'");
        match state.handle_key(key(KeyCode::Enter)) {
            KeyAction::Send(UiCommand::Open(p)) => {
                assert_eq!(p, PathBuf::from("/tmp/my clip.mp4"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn escape_cancels_path_entry() {
        let mut state = UiState::default();
        state.handle_key(key(KeyCode::Char('o')));
        type_str(&mut state, "abc");
        assert!(matches!(state.handle_key(key(KeyCode::Esc)), KeyAction::None));
        assert!(!state.is_editing_path());
        assert!(!state.drop_zone.is_hovering());
    }

    #[test]
    fn empty_entry_is_rejected() {
        let mut state = UiState::default();
        state.handle_key(key(KeyCode::Char('o')));
        match state.handle_key(key(KeyCode::Enter)) {
            KeyAction::Send(UiCommand::Rejected(ValidationError::Empty)) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn paste_drops_a_file() {
        let mut state = UiState {
            tab: TAB_HELP,
            ..Default::default()
        };
        match state.handle_paste("file:///home/me/clip.webm\n") {
            KeyAction::Send(UiCommand::Open(p)) => {
                assert_eq!(p, PathBuf::from("/home/me/clip.webm"))
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(state.tab, TAB_VERIFY);
    }

    #[test]
    fn paste_while_editing_appends() {
        let mut state = UiState::default();
        state.handle_key(key(KeyCode::Char('o')));
        assert!(matches!(state.handle_paste("/tmp/a.mp4"), KeyAction::None));
        assert_eq!(state.path_input.as_deref(), Some("/tmp/a.mp4"));
    }

    #[test]
    fn verify_keys_map_to_commands() {
        let mut state = UiState::default();
        assert!(matches!(
            state.handle_key(key(KeyCode::Char('3'))),
            KeyAction::Send(UiCommand::SelectFrame(2))
        ));
        assert!(matches!(
            state.handle_key(key(KeyCode::Right)),
            KeyAction::Send(UiCommand::NextFrame)
        ));
        assert!(matches!(
            state.handle_key(key(KeyCode::Char('h'))),
            KeyAction::Send(UiCommand::PreviousFrame)
        ));
        assert!(matches!(
            state.handle_key(key(KeyCode::Char('x'))),
            KeyAction::Send(UiCommand::Reset)
        ));
        assert!(matches!(
            state.handle_key(key(KeyCode::Enter)),
            KeyAction::Send(UiCommand::Submit)
        ));
        // Nothing selected yet.
        assert!(state.info.starts_with("Select a video"));
        assert!(matches!(state.handle_key(key(KeyCode::Char('q'))), KeyAction::Quit));
        assert!(matches!(
            state.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyAction::Quit
        ));
    }

    #[test]
    fn frame_keys_are_ignored_off_the_verify_tab() {
        let mut state = UiState::default();
        state.handle_key(key(KeyCode::Tab));
        assert_eq!(state.tab, TAB_HISTORY);
        assert!(matches!(state.handle_key(key(KeyCode::Char('2'))), KeyAction::None));
        assert!(matches!(
            state.handle_key(key(KeyCode::Char('r'))),
            KeyAction::RefreshHistory
        ));
        state.handle_key(key(KeyCode::Tab));
        state.handle_key(key(KeyCode::Tab));
        assert_eq!(state.tab, TAB_VERIFY);
    }

    #[test]
    fn info_events_update_the_status_line() {
        let mut state = UiState::default();
        let reload = state.apply_event(AppEvent::Info(InfoEvent::StaleDiscarded { generation: 4 }));
        assert!(!reload);
        assert!(state.info.contains("#4"));
    }

    fn resulted_workflow() -> Workflow {
        let file = MediaFile {
            name: "a.mp4".into(),
            mime: "video/mp4".into(),
            payload: Bytes::from_static(b"mp4"),
        };
        let wf = Workflow::new(true)
            .step(WorkflowEvent::Select(ValidationOutcome::Accepted(file)))
            .workflow
            .step(WorkflowEvent::Submit)
            .workflow;
        let generation = wf.generation();
        wf.step(WorkflowEvent::Completed {
            generation,
            outcome: Ok(AnalysisResult {
                category: Category::Authentic,
                confidence: 0.9,
                source_name: "a.mp4".into(),
                evidence_frames: Vec::<EvidenceFrame>::new().into(),
                provenance: Provenance::default(),
            }),
        })
        .workflow
    }

    fn processed_run() -> ProcessedRun {
        ProcessedRun {
            record: AnalysisRecord {
                timestamp_utc: "2026-03-04T05:06:07Z".into(),
                base_url: "http://localhost:8000".into(),
                request_id: "abc".into(),
                source_name: "a.mp4".into(),
                file_size: 3,
                prediction: "REAL".into(),
                confidence: 0.9,
                evidence: Vec::new(),
                provenance: Provenance::default(),
            },
            auto_saved_path: None,
            frame_paths: Vec::new(),
            messages: Vec::new(),
        }
    }

    #[test]
    fn reset_drops_the_exportable_record() {
        let mut state = UiState::default();
        let wf = resulted_workflow();
        assert!(wf.result().is_some());
        state.apply_event(AppEvent::Workflow(Box::new(wf.clone())));
        state.apply_event(AppEvent::Processed(Box::new(processed_run())));
        assert_eq!(
            state.active_record().map(|r| r.source_name.as_str()),
            Some("a.mp4")
        );

        // Frame navigation republishes the same verdict and keeps it.
        state.apply_event(AppEvent::Workflow(Box::new(
            wf.clone().step(WorkflowEvent::NextFrame).workflow,
        )));
        assert!(state.active_record().is_some());

        let idle = wf.step(WorkflowEvent::Reset).workflow;
        state.apply_event(AppEvent::Workflow(Box::new(idle)));
        assert!(state.workflow.result().is_none());
        assert!(state.active_record().is_none());
        assert!(state.last_processed.is_none());
    }

    #[test]
    fn history_selection_is_clamped_after_reload() {
        let mut state = UiState {
            history_selected: 5,
            history_scroll_offset: 5,
            ..Default::default()
        };
        state.replace_history(Vec::new());
        assert_eq!(state.history_selected, 0);
        assert_eq!(state.history_scroll_offset, 0);
        assert!(state.selected_history().is_none());
    }
}
