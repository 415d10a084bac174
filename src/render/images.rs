//! Per-element image load state.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
struct ImageState {
    url: String,
    failed: bool,
}

/// Tracks which image elements failed to load, keyed by element id.
///
/// A failure is remembered together with the URL that failed, so pointing an
/// element at a new URL clears the flag and the new source gets a fresh try.
#[derive(Debug, Clone, Default)]
pub struct ImageStates {
    states: HashMap<String, ImageState>,
}

impl ImageStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the URL an element currently shows. Resets the failure flag on change.
    pub fn observe(&mut self, element_id: &str, url: &str) {
        match self.states.get_mut(element_id) {
            Some(state) if state.url == url => {}
            Some(state) => {
                state.url = url.to_string();
                state.failed = false;
            }
            None => {
                self.states.insert(
                    element_id.to_string(),
                    ImageState {
                        url: url.to_string(),
                        failed: false,
                    },
                );
            }
        }
    }

    pub fn mark_failed(&mut self, element_id: &str, url: &str) {
        self.observe(element_id, url);
        if let Some(state) = self.states.get_mut(element_id) {
            state.failed = true;
        }
    }

    pub fn mark_loaded(&mut self, element_id: &str, url: &str) {
        self.observe(element_id, url);
        if let Some(state) = self.states.get_mut(element_id) {
            state.failed = false;
        }
    }

    /// Whether `url` is the element's current source and it failed.
    pub fn is_failed(&self, element_id: &str, url: &str) -> bool {
        self.states
            .get(element_id)
            .is_some_and(|state| state.failed && state.url == url)
    }

    /// Forget an element (after deletion).
    pub fn forget(&mut self, element_id: &str) {
        self.states.remove(element_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_tied_to_url() {
        let mut states = ImageStates::new();
        states.mark_failed("logo", "http://a/logo.png");
        assert!(states.is_failed("logo", "http://a/logo.png"));
        assert!(!states.is_failed("logo", "http://b/logo.png"));

        states.observe("logo", "http://b/logo.png");
        assert!(!states.is_failed("logo", "http://a/logo.png"));
        assert!(!states.is_failed("logo", "http://b/logo.png"));
    }

    #[test]
    fn observing_same_url_keeps_failure() {
        let mut states = ImageStates::new();
        states.mark_failed("img", "u");
        states.observe("img", "u");
        assert!(states.is_failed("img", "u"));
        states.mark_loaded("img", "u");
        assert!(!states.is_failed("img", "u"));
        states.mark_failed("img", "u");
        states.forget("img");
        assert!(!states.is_failed("img", "u"));
    }
}
