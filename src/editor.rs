//! Editor shell: the stateful canvas that mutates a template in place.
//!
//! Pointer coordinates arrive in view space (zoomed) and are divided by the
//! zoom factor before touching element geometry, which is always stored in
//! unscaled document pixels.
//!
//! ```text
//!            pointer_down on unlocked element
//!   Idle ─────────────────────────────────────▶ Dragging { id, offset }
//!    ▲                                              │ pointer_move: x,y = pointer - offset
//!    └──────────────── pointer_up ──────────────────┘   (snapped, clamped to page)
//! ```

use crate::context::RendererContext;
use crate::document::{Template, TemplateElement};
use crate::error::ReportCardError;
use crate::render::{ImageStates, PageView, RenderedPage};

pub const MIN_ZOOM: f32 = 0.3;
pub const MAX_ZOOM: f32 = 2.0;
pub const GRID_SIZE: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        element_id: String,
        /// Pointer position minus element origin, in document pixels.
        offset: (f32, f32),
    },
}

/// Where keyboard input currently goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Canvas,
    TextInput,
}

/// Keys the shell reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Delete,
    Backspace,
    Escape,
    Other,
}

pub struct EditorShell {
    template: Template,
    selection: Option<String>,
    state: DragState,
    zoom: f32,
    pub snap_to_grid: bool,
    pub focus: Focus,
    editing: bool,
    images: ImageStates,
}

impl EditorShell {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            selection: None,
            state: DragState::Idle,
            zoom: 1.0,
            snap_to_grid: true,
            focus: Focus::Canvas,
            editing: false,
            images: ImageStates::new(),
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Hand the edited template back (e.g. to save it).
    pub fn into_template(self) -> Template {
        self.template
    }

    pub fn selection(&self) -> Option<&TemplateElement> {
        self.selection
            .as_deref()
            .and_then(|id| self.template.element(id))
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the view zoom, clamped to 0.3..=2.0.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        };
    }

    pub fn image_states_mut(&mut self) -> &mut ImageStates {
        &mut self.images
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.selection = id.filter(|id| self.template.element(id).is_some()).map(String::from);
        if self.selection.is_none() {
            self.editing = false;
        }
    }

    fn to_document(&self, view: (f32, f32)) -> (f32, f32) {
        (view.0 / self.zoom, view.1 / self.zoom)
    }

    /// Topmost visible element under a document-space point.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&TemplateElement> {
        self.template
            .layer_order()
            .into_iter()
            .map(|i| &self.template.elements[i])
            .find(|el| el.visible && el.contains(x, y))
    }

    /// Pointer pressed at a view-space position.
    pub fn pointer_down(&mut self, view_x: f32, view_y: f32) {
        let (x, y) = self.to_document((view_x, view_y));
        let hit = self
            .hit_test(x, y)
            .map(|el| (el.id.clone(), el.locked, el.x, el.y));
        match hit {
            Some((id, locked, ex, ey)) => {
                if self.selection.as_deref() != Some(id.as_str()) {
                    self.editing = false;
                }
                self.selection = Some(id.clone());
                self.focus = Focus::Canvas;
                if !locked {
                    self.state = DragState::Dragging {
                        element_id: id,
                        offset: (x - ex, y - ey),
                    };
                }
            }
            None => {
                self.selection = None;
                self.editing = false;
                self.state = DragState::Idle;
            }
        }
    }

    /// Pointer moved to a view-space position.
    pub fn pointer_move(&mut self, view_x: f32, view_y: f32) {
        let DragState::Dragging { element_id, offset } = &self.state else {
            return;
        };
        let (x, y) = self.to_document((view_x, view_y));
        let (page_w, page_h) = self.template.page_size();
        let snap = self.snap_to_grid;
        let Some(el) = self.template.element_mut(element_id) else {
            return;
        };

        let mut nx = x - offset.0;
        let mut ny = y - offset.1;
        if snap {
            nx = (nx / GRID_SIZE).round() * GRID_SIZE;
            ny = (ny / GRID_SIZE).round() * GRID_SIZE;
        }
        el.x = nx.clamp(0.0, (page_w as f32 - el.width).max(0.0));
        el.y = ny.clamp(0.0, (page_h as f32 - el.height).max(0.0));
    }

    /// Pointer released: back to idle, keeping the selection.
    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
    }

    /// Keyboard input. Returns `true` when the template changed.
    pub fn key_down(&mut self, key: Key) -> bool {
        match key {
            Key::Delete | Key::Backspace => {
                if self.focus == Focus::TextInput {
                    return false;
                }
                let Some(selected) = self.selection() else {
                    return false;
                };
                if selected.locked {
                    return false;
                }
                let id = selected.id.clone();
                self.delete_element(&id).is_ok()
            }
            Key::Escape => {
                self.editing = false;
                self.focus = Focus::Canvas;
                false
            }
            Key::Other => false,
        }
    }

    /// Start inline editing of the selected free-text element.
    pub fn begin_editing(&mut self) -> bool {
        let editable = self
            .selection()
            .is_some_and(|el| el.kind.family() == crate::document::ElementFamily::Text);
        if editable {
            self.editing = true;
            self.focus = Focus::TextInput;
        }
        editable
    }

    /// Write inline editor text back into the element's content.
    pub fn update_content(&mut self, id: &str, content: &str) -> Result<(), ReportCardError> {
        let el = self
            .template
            .element_mut(id)
            .ok_or_else(|| ReportCardError::NotFound(format!("element '{}'", id)))?;
        el.content = content.to_string();
        Ok(())
    }

    pub fn end_editing(&mut self) {
        self.editing = false;
        self.focus = Focus::Canvas;
    }

    /// Add an element and select it.
    pub fn add_element(&mut self, type_name: &str) -> Result<String, ReportCardError> {
        let id = self.template.add_element(type_name)?.id.clone();
        self.selection = Some(id.clone());
        self.editing = false;
        Ok(id)
    }

    /// Duplicate an element and select the copy.
    pub fn duplicate_element(&mut self, id: &str) -> Result<String, ReportCardError> {
        let new_id = self.template.duplicate_element(id)?.id.clone();
        self.selection = Some(new_id.clone());
        self.editing = false;
        Ok(new_id)
    }

    /// Delete an element, clearing the selection if it was selected.
    pub fn delete_element(&mut self, id: &str) -> Result<(), ReportCardError> {
        self.template.remove_element(id)?;
        self.images.forget(id);
        if self.selection.as_deref() == Some(id) {
            self.selection = None;
            self.editing = false;
            self.state = DragState::Idle;
        }
        Ok(())
    }

    pub fn move_layer_up(&mut self, id: &str) -> Result<bool, ReportCardError> {
        self.template.move_layer_up(id)
    }

    pub fn move_layer_down(&mut self, id: &str) -> Result<bool, ReportCardError> {
        self.template.move_layer_down(id)
    }

    pub fn set_preview_rows(&mut self, id: &str, rows: u8) -> Result<(), ReportCardError> {
        self.template.set_preview_rows(id, rows)
    }

    /// Render the canvas as the editor shows it.
    pub fn render(&self, ctx: Option<&RendererContext>, preview: bool) -> RenderedPage {
        let view = PageView {
            preview,
            selection: self.selection.as_deref(),
            editing: self.editing,
        };
        self.template.render_page(ctx, view, &self.images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BlockBody;
    use pretty_assertions::assert_eq;

    /// Shell with one 100x40 text element at (100, 100).
    fn shell() -> (EditorShell, String) {
        let mut shell = EditorShell::new(Template::new("t"));
        let id = shell.add_element("text").unwrap();
        let el = shell.template.element_mut(&id).unwrap();
        el.x = 100.0;
        el.y = 100.0;
        el.width = 100.0;
        el.height = 40.0;
        shell.select(None);
        (shell, id)
    }

    fn pos(shell: &EditorShell, id: &str) -> (f32, f32) {
        let el = shell.template().element(id).unwrap();
        (el.x, el.y)
    }

    #[test]
    fn drag_moves_with_snap() {
        let (mut shell, id) = shell();
        shell.pointer_down(110.0, 110.0);
        assert!(matches!(shell.state(), DragState::Dragging { .. }));
        shell.pointer_move(157.0, 204.0);
        assert_eq!(pos(&shell, &id), (150.0, 190.0));
        shell.pointer_up();
        assert_eq!(shell.state(), &DragState::Idle);
        assert_eq!(shell.selection().map(|e| e.id.clone()), Some(id));
    }

    #[test]
    fn drag_without_snap_is_exact() {
        let (mut shell, id) = shell();
        shell.snap_to_grid = false;
        shell.pointer_down(110.0, 110.0);
        shell.pointer_move(157.0, 204.0);
        assert_eq!(pos(&shell, &id), (147.0, 194.0));
    }

    #[test]
    fn drag_is_clamped_to_page() {
        let (mut shell, id) = shell();
        shell.pointer_down(110.0, 110.0);
        shell.pointer_move(-500.0, 5000.0);
        assert_eq!(pos(&shell, &id), (0.0, 1123.0 - 40.0));
        shell.pointer_move(5000.0, -50.0);
        assert_eq!(pos(&shell, &id), (794.0 - 100.0, 0.0));
    }

    #[test]
    fn zoom_divides_pointer_coordinates() {
        let (mut shell, id) = shell();
        shell.set_zoom(2.0);
        // view (220, 220) is document (110, 110)
        shell.pointer_down(220.0, 220.0);
        shell.pointer_move(420.0, 220.0);
        assert_eq!(pos(&shell, &id), (200.0, 100.0));
        shell.set_zoom(9.0);
        assert_eq!(shell.zoom(), MAX_ZOOM);
        shell.set_zoom(0.0);
        assert_eq!(shell.zoom(), MIN_ZOOM);
    }

    #[test]
    fn locked_elements_select_but_do_not_drag() {
        let (mut shell, id) = shell();
        shell.template.element_mut(&id).unwrap().locked = true;
        shell.pointer_down(110.0, 110.0);
        assert_eq!(shell.state(), &DragState::Idle);
        assert!(shell.selection().is_some());
        shell.pointer_move(300.0, 300.0);
        assert_eq!(pos(&shell, &id), (100.0, 100.0));
    }

    #[test]
    fn clicking_empty_canvas_clears_selection() {
        let (mut shell, _) = shell();
        shell.pointer_down(110.0, 110.0);
        shell.pointer_up();
        shell.pointer_down(700.0, 1000.0);
        assert!(shell.selection().is_none());
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let (mut shell, bottom) = shell();
        let top = shell.duplicate_element(&bottom).unwrap();
        // duplicate sits at (120, 120), overlapping
        assert_eq!(shell.hit_test(130.0, 130.0).map(|e| e.id.clone()), Some(top));
        shell.template.element_mut(&shell.selection.clone().unwrap()).unwrap().visible = false;
        assert_eq!(
            shell.hit_test(130.0, 130.0).map(|e| e.id.clone()),
            Some(bottom)
        );
    }

    #[test]
    fn delete_key_rules() {
        let (mut shell, id) = shell();
        shell.pointer_down(110.0, 110.0);
        shell.pointer_up();

        shell.focus = Focus::TextInput;
        assert!(!shell.key_down(Key::Backspace));
        assert!(shell.template().element(&id).is_some());

        shell.focus = Focus::Canvas;
        shell.template.element_mut(&id).unwrap().locked = true;
        assert!(!shell.key_down(Key::Delete));
        assert!(shell.template().element(&id).is_some());

        shell.template.element_mut(&id).unwrap().locked = false;
        assert!(shell.key_down(Key::Delete));
        assert!(shell.template().element(&id).is_none());
        assert!(shell.selection().is_none());
        assert!(!shell.key_down(Key::Delete));
    }

    #[test]
    fn add_selects_new_element() {
        let mut shell = EditorShell::new(Template::new("t"));
        let id = shell.add_element("school_name").unwrap();
        assert_eq!(shell.selection().map(|e| e.id.as_str()), Some(id.as_str()));
        assert!(shell.add_element("nope").is_err());
    }

    #[test]
    fn inline_editing_round_trip() {
        let (mut shell, id) = shell();
        assert!(!shell.begin_editing());
        shell.select(Some(id.as_str()));
        assert!(shell.begin_editing());
        assert_eq!(shell.focus, Focus::TextInput);

        let page = shell.render(None, false);
        assert!(matches!(page.blocks[0].body, BlockBody::Editor { .. }));
        // preview forces display text even mid-edit
        let page = shell.render(None, true);
        assert!(matches!(page.blocks[0].body, BlockBody::Text { .. }));

        shell.update_content(&id, "Hello [Student Name]").unwrap();
        shell.end_editing();
        let page = shell.render(None, false);
        assert_eq!(
            page.blocks[0].body,
            BlockBody::Text {
                text: "Hello John Doe".into(),
                rule_above: false
            }
        );
        assert!(page.blocks[0].outlined);
    }
}
