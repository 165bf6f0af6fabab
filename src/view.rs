use serde::{Deserialize, Serialize};

/// The three screens. Navigation between them is unconditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Home,
    List,
    Interpretation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpretationPhase {
    Idle,
    Requesting,
    ResultReady,
}

/// Which screen is active, plus the interpretation workflow state: the set
/// of selected entry ids and the single-in-flight request machine
/// `Idle -> Requesting -> ResultReady`. Failure also lands in ResultReady,
/// carrying the fixed failure string; there is no separate error phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    view: View,
    selection: Vec<String>,
    phase: InterpretationPhase,
    result: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            view: View::Home,
            selection: Vec::new(),
            phase: InterpretationPhase::Idle,
            result: None,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    /// Completing a recording always lands the user on the journal list.
    pub fn finish_recording(&mut self) {
        self.view = View::List;
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.iter().any(|s| s == id)
    }

    /// Selection survives navigation; it is only reduced by toggling ids off
    /// or by clearing the interpretation result.
    pub fn toggle_selection(&mut self, id: &str) {
        if let Some(pos) = self.selection.iter().position(|s| s == id) {
            self.selection.remove(pos);
        } else {
            self.selection.push(id.to_string());
        }
    }

    pub fn phase(&self) -> InterpretationPhase {
        self.phase
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn can_request(&self) -> bool {
        self.phase != InterpretationPhase::Requesting && !self.selection.is_empty()
    }

    /// Guards the single-outstanding-request rule. The caller only spawns
    /// the network call when this returns Ok.
    pub fn begin_interpretation(&mut self) -> Result<(), String> {
        if self.phase == InterpretationPhase::Requesting {
            return Err("An interpretation is already in progress".to_string());
        }
        if self.selection.is_empty() {
            return Err("Select at least one dream first".to_string());
        }
        self.phase = InterpretationPhase::Requesting;
        Ok(())
    }

    /// Success and failure both end here; the failure case carries the fixed
    /// failure string as its text.
    pub fn finish_interpretation(&mut self, text: String) {
        self.result = Some(text);
        self.phase = InterpretationPhase::ResultReady;
    }

    /// Dismissing the reading resets the whole workflow, selection included.
    pub fn clear_interpretation(&mut self) {
        self.result = None;
        self.phase = InterpretationPhase::Idle;
        self.selection.clear();
    }

    /// Entries removed from the journal must not linger as selected ids.
    pub fn retain_selection(&mut self, exists: impl Fn(&str) -> bool) {
        self.selection.retain(|id| exists(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_home_with_nothing_selected() {
        let state = ViewState::new();
        assert_eq!(state.view(), View::Home);
        assert!(state.selection().is_empty());
        assert_eq!(state.phase(), InterpretationPhase::Idle);
    }

    #[test]
    fn any_view_reaches_any_other_view() {
        let mut state = ViewState::new();
        for &target in &[View::Interpretation, View::Home, View::List, View::Home] {
            state.set_view(target);
            assert_eq!(state.view(), target);
        }
    }

    #[test]
    fn finishing_a_recording_forces_the_list_view() {
        let mut state = ViewState::new();
        state.set_view(View::Interpretation);
        state.finish_recording();
        assert_eq!(state.view(), View::List);
    }

    #[test]
    fn toggling_selects_and_deselects() {
        let mut state = ViewState::new();
        state.toggle_selection("a");
        state.toggle_selection("b");
        assert!(state.is_selected("a") && state.is_selected("b"));
        state.toggle_selection("a");
        assert!(!state.is_selected("a"));
        assert_eq!(state.selection(), ["b".to_string()]);
    }

    #[test]
    fn selection_survives_navigation() {
        let mut state = ViewState::new();
        state.toggle_selection("a");
        state.set_view(View::Home);
        state.set_view(View::Interpretation);
        assert!(state.is_selected("a"));
    }

    #[test]
    fn request_needs_a_selection() {
        let mut state = ViewState::new();
        assert!(state.begin_interpretation().is_err());
        assert_eq!(state.phase(), InterpretationPhase::Idle);
    }

    #[test]
    fn second_request_is_rejected_while_one_is_outstanding() {
        let mut state = ViewState::new();
        state.toggle_selection("a");
        state.toggle_selection("b");
        assert!(state.begin_interpretation().is_ok());
        assert!(!state.can_request());
        assert!(state.begin_interpretation().is_err());

        state.finish_interpretation("themes of escape".to_string());
        assert_eq!(state.phase(), InterpretationPhase::ResultReady);
        assert!(state.can_request(), "resolved request frees the trigger");
    }

    #[test]
    fn failure_text_is_still_result_ready() {
        let mut state = ViewState::new();
        state.toggle_selection("a");
        state.begin_interpretation().unwrap();
        state.finish_interpretation(crate::constants::INTERPRETATION_FAILED.to_string());
        assert_eq!(state.phase(), InterpretationPhase::ResultReady);
        assert_eq!(state.result(), Some(crate::constants::INTERPRETATION_FAILED));
    }

    #[test]
    fn clearing_the_result_also_clears_the_selection() {
        let mut state = ViewState::new();
        state.toggle_selection("a");
        state.begin_interpretation().unwrap();
        state.finish_interpretation("text".to_string());
        state.clear_interpretation();
        assert_eq!(state.phase(), InterpretationPhase::Idle);
        assert!(state.result().is_none());
        assert!(state.selection().is_empty());
    }

    #[test]
    fn retain_selection_drops_dangling_ids() {
        let mut state = ViewState::new();
        state.toggle_selection("kept");
        state.toggle_selection("gone");
        state.retain_selection(|id| id == "kept");
        assert_eq!(state.selection(), ["kept".to_string()]);
    }
}
