//! Selection over the evidence frames of one result.

use crate::interpret::format_percent;
use crate::model::EvidenceFrame;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationNavigator {
    frames: Arc<[EvidenceFrame]>,
    selected: usize,
}

/// Display metadata for the selected frame. `position` is 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameView {
    pub position: usize,
    pub total: usize,
    pub frame_index: i64,
    pub score_text: String,
    pub is_key_detection: bool,
}

impl VisualizationNavigator {
    /// Selection always starts at the first frame.
    pub fn new(frames: Arc<[EvidenceFrame]>) -> Self {
        Self {
            frames,
            selected: 0,
        }
    }

    pub fn has_evidence(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[EvidenceFrame] {
        &self.frames
    }

    /// `None` when no frames were returned.
    pub fn selected(&self) -> Option<usize> {
        self.has_evidence().then_some(self.selected)
    }

    /// Out-of-range indices are rejected and leave the selection unchanged.
    pub fn select(&mut self, i: usize) -> bool {
        if i >= self.frames.len() {
            return false;
        }
        self.selected = i;
        true
    }

    pub fn next(&mut self) -> bool {
        self.select(self.selected + 1)
    }

    pub fn previous(&mut self) -> bool {
        match self.selected.checked_sub(1) {
            Some(i) => self.select(i),
            None => false,
        }
    }

    pub fn current_frame(&self) -> Option<&EvidenceFrame> {
        self.frames.get(self.selected)
    }

    pub fn current(&self) -> Option<FrameView> {
        let f = self.current_frame()?;
        Some(FrameView {
            position: self.selected,
            total: self.frames.len(),
            frame_index: f.frame_index,
            score_text: format_percent(f.score),
            is_key_detection: f.is_key_detection,
        })
    }

    pub fn key_detections(&self) -> Vec<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_key_detection)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn status_text(&self) -> String {
        match self.current() {
            Some(v) => format!(
                "Frame {}/{} (#{}) score {}{}",
                v.position + 1,
                v.total,
                v.frame_index,
                v.score_text,
                if v.is_key_detection { " [key detection]" } else { "" }
            ),
            None => "No evidence available".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(frame_index: i64, score: f64, key: bool) -> EvidenceFrame {
        EvidenceFrame {
            image: String::new(),
            frame_index,
            score,
            is_key_detection: key,
        }
    }

    fn three() -> VisualizationNavigator {
        VisualizationNavigator::new(
            vec![frame(5, 0.41, false), frame(17, 0.88, false), frame(3, 0.9847, true)].into(),
        )
    }

    #[test]
    fn empty_navigator_reports_no_evidence() {
        let mut nav = VisualizationNavigator::new(Vec::new().into());
        assert!(!nav.has_evidence());
        assert_eq!(nav.selected(), None);
        assert_eq!(nav.current(), None);
        for i in [0, 1, 7] {
            assert!(!nav.select(i));
        }
        assert!(!nav.next());
        assert!(!nav.previous());
        assert_eq!(nav.status_text(), "No evidence available");
    }

    #[test]
    fn fresh_navigator_selects_first_frame() {
        let nav = three();
        assert_eq!(nav.selected(), Some(0));
        assert_eq!(nav.current().unwrap().frame_index, 5);
    }

    #[test]
    fn select_updates_displayed_metadata() {
        let mut nav = three();
        assert!(nav.select(2));
        let v = nav.current().unwrap();
        assert_eq!(v.position, 2);
        assert_eq!(v.total, 3);
        assert_eq!(v.frame_index, 3);
        assert_eq!(v.score_text, "98.5%");
        assert!(v.is_key_detection);
        assert_eq!(nav.status_text(), "Frame 3/3 (#3) score 98.5% [key detection]");
    }

    #[test]
    fn out_of_range_select_is_rejected() {
        let mut nav = three();
        nav.select(1);
        assert!(!nav.select(3));
        assert_eq!(nav.selected(), Some(1));
    }

    #[test]
    fn stepping_clamps_at_the_ends() {
        let mut nav = three();
        assert!(!nav.previous());
        assert!(nav.next());
        assert!(nav.next());
        assert!(!nav.next());
        assert_eq!(nav.selected(), Some(2));
        assert!(nav.previous());
        assert_eq!(nav.selected(), Some(1));
    }

    #[test]
    fn key_detections_are_listed_by_position() {
        assert_eq!(three().key_detections(), vec![2]);
    }
}
