//! Structural edits on a template's element list.
//!
//! Layer order is the reverse of draw order: draw order is ascending
//! `(z_index, list index)`, so layer index 0 is the element drawn last.
//! Moving a layer swaps both `z_index` and list position with its
//! immediate neighbour; z-index gaps and collisions are left alone.

use super::{ElementKind, Template, TemplateElement, grade_table_height, new_element_id};
use crate::error::ReportCardError;

/// Offset applied to duplicated elements.
pub const DUPLICATE_OFFSET: f32 = 20.0;

/// Step between successive additions so stacked elements stay visible.
const ADD_STAGGER: f32 = 10.0;

impl Template {
    /// Append a new element of the given type with its editor preset.
    pub fn add_element(&mut self, type_name: &str) -> Result<&TemplateElement, ReportCardError> {
        let kind = ElementKind::from_type_name(type_name).ok_or_else(|| {
            ReportCardError::Template(format!("unknown element type '{}'", type_name))
        })?;
        Ok(self.push_element(TemplateElement::new(kind)))
    }

    /// Append an element, assigning z-index and stagger offset.
    pub fn push_element(&mut self, mut element: TemplateElement) -> &TemplateElement {
        let count = self.elements.len();
        let stagger = (count % 10) as f32 * ADD_STAGGER;
        element.x += stagger;
        element.y += stagger;
        element.z_index = count as i32 + 1;
        self.elements.push(element);
        &self.elements[count]
    }

    /// Copy an element with a new id, offset by (+20, +20), drawn on top.
    pub fn duplicate_element(&mut self, id: &str) -> Result<&TemplateElement, ReportCardError> {
        let source = self
            .element(id)
            .ok_or_else(|| ReportCardError::NotFound(format!("element '{}'", id)))?;
        let mut copy = source.clone();
        copy.id = new_element_id();
        copy.x += DUPLICATE_OFFSET;
        copy.y += DUPLICATE_OFFSET;
        copy.z_index = self.max_z_index() + 1;
        self.elements.push(copy);
        Ok(&self.elements[self.elements.len() - 1])
    }

    /// Remove an element. Returns the removed element.
    pub fn remove_element(&mut self, id: &str) -> Result<TemplateElement, ReportCardError> {
        let index = self
            .elements
            .iter()
            .position(|el| el.id == id)
            .ok_or_else(|| ReportCardError::NotFound(format!("element '{}'", id)))?;
        Ok(self.elements.remove(index))
    }

    pub fn max_z_index(&self) -> i32 {
        self.elements.iter().map(|el| el.z_index).max().unwrap_or(0)
    }

    /// List indices in layer order (topmost first).
    pub fn layer_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.elements.len()).collect();
        order.sort_by(|&a, &b| {
            (self.elements[b].z_index, b).cmp(&(self.elements[a].z_index, a))
        });
        order
    }

    /// Visible elements in draw order (bottom first).
    pub fn draw_order(&self) -> Vec<&TemplateElement> {
        let mut order = self.layer_order();
        order.reverse();
        order
            .into_iter()
            .map(|i| &self.elements[i])
            .filter(|el| el.visible)
            .collect()
    }

    /// Move an element one step toward the top of the layer stack.
    ///
    /// Returns `false` when it is already on top.
    pub fn move_layer_up(&mut self, id: &str) -> Result<bool, ReportCardError> {
        self.swap_with_layer_neighbour(id, true)
    }

    /// Move an element one step toward the bottom of the layer stack.
    ///
    /// Returns `false` when it is already at the bottom.
    pub fn move_layer_down(&mut self, id: &str) -> Result<bool, ReportCardError> {
        self.swap_with_layer_neighbour(id, false)
    }

    fn swap_with_layer_neighbour(&mut self, id: &str, up: bool) -> Result<bool, ReportCardError> {
        let order = self.layer_order();
        let pos = order
            .iter()
            .position(|&i| self.elements[i].id == id)
            .ok_or_else(|| ReportCardError::NotFound(format!("element '{}'", id)))?;

        let neighbour_pos = if up {
            match pos.checked_sub(1) {
                Some(p) => p,
                None => return Ok(false),
            }
        } else if pos + 1 < order.len() {
            pos + 1
        } else {
            return Ok(false);
        };

        let a = order[pos];
        let b = order[neighbour_pos];
        let z_a = self.elements[a].z_index;
        self.elements[a].z_index = self.elements[b].z_index;
        self.elements[b].z_index = z_a;
        self.elements.swap(a, b);
        Ok(true)
    }

    /// Set a grade table's preview row count (clamped to 1..=20) and resize it.
    pub fn set_preview_rows(&mut self, id: &str, rows: u8) -> Result<(), ReportCardError> {
        let element = self
            .element_mut(id)
            .ok_or_else(|| ReportCardError::NotFound(format!("element '{}'", id)))?;
        let ElementKind::GradeTable(props) = &mut element.kind else {
            return Err(ReportCardError::Template(format!(
                "element '{}' is not a grade table",
                id
            )));
        };
        let rows = rows.clamp(1, 20);
        props.preview_rows = rows;
        element.height = grade_table_height(rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn template_with(types: &[&str]) -> Template {
        let mut t = Template::new("t");
        for ty in types {
            t.add_element(ty).unwrap();
        }
        t
    }

    fn ids(t: &Template) -> Vec<String> {
        t.elements.iter().map(|el| el.id.clone()).collect()
    }

    #[test]
    fn add_assigns_count_based_z_and_stagger() {
        let t = template_with(&["text", "text", "text"]);
        let z: Vec<i32> = t.elements.iter().map(|el| el.z_index).collect();
        assert_eq!(z, vec![1, 2, 3]);
        assert_eq!(t.elements[1].x - t.elements[0].x, 10.0);
        assert_eq!(t.elements[2].y - t.elements[0].y, 20.0);
    }

    #[test]
    fn add_unknown_type_fails() {
        let mut t = Template::new("t");
        assert!(matches!(
            t.add_element("hologram"),
            Err(ReportCardError::Template(_))
        ));
    }

    #[test]
    fn duplicate_offsets_and_goes_on_top() {
        let mut t = template_with(&["text", "student_name"]);
        t.elements[0].z_index = 40;
        let src = t.elements[1].clone();
        let dup = t.duplicate_element(&src.id).unwrap().clone();
        assert_ne!(dup.id, src.id);
        assert_eq!(dup.x, src.x + 20.0);
        assert_eq!(dup.y, src.y + 20.0);
        assert_eq!(dup.z_index, 41);
        assert_eq!(dup.content, src.content);
        assert_eq!(dup.kind, src.kind);
    }

    #[test]
    fn remove_missing_element_is_not_found() {
        let mut t = template_with(&["text"]);
        assert!(matches!(
            t.remove_element("nope"),
            Err(ReportCardError::NotFound(_))
        ));
        let id = t.elements[0].id.clone();
        t.remove_element(&id).unwrap();
        assert!(t.elements.is_empty());
    }

    #[test]
    fn top_up_and_bottom_down_are_noops() {
        let mut t = template_with(&["text", "text", "text"]);
        let before = t.clone();
        let top = t.elements[2].id.clone();
        let bottom = t.elements[0].id.clone();
        assert!(!t.move_layer_up(&top).unwrap());
        assert!(!t.move_layer_down(&bottom).unwrap());
        assert_eq!(t, before);
    }

    #[test]
    fn move_swaps_z_and_position_and_inverse_restores() {
        let mut t = template_with(&["text", "text", "text"]);
        t.elements[0].z_index = 2;
        t.elements[1].z_index = 7;
        t.elements[2].z_index = 9;
        let before = t.clone();
        let middle = t.elements[1].id.clone();

        assert!(t.move_layer_up(&middle).unwrap());
        assert_eq!(t.elements[2].id, middle);
        assert_eq!(t.elements[2].z_index, 9);
        assert_eq!(t.elements[1].z_index, 7);
        assert_eq!(ids(&t)[1], before.elements[2].id);

        assert!(t.move_layer_down(&middle).unwrap());
        assert_eq!(t, before);
    }

    #[test]
    fn move_with_colliding_z_is_well_defined() {
        let mut t = template_with(&["text", "text"]);
        t.elements[0].z_index = 5;
        t.elements[1].z_index = 5;
        let before = t.clone();
        let lower = t.elements[0].id.clone();
        assert!(t.move_layer_up(&lower).unwrap());
        assert_eq!(t.elements[1].id, lower);
        assert_eq!(t.layer_order()[0], 1);
        assert!(t.move_layer_down(&lower).unwrap());
        assert_eq!(t, before);
    }

    #[test]
    fn draw_order_skips_hidden_and_sorts_by_z() {
        let mut t = template_with(&["text", "text", "text"]);
        t.elements[0].z_index = 10;
        t.elements[2].visible = false;
        let order: Vec<&str> = t.draw_order().iter().map(|el| el.id.as_str()).collect();
        assert_eq!(order, vec![t.elements[1].id.as_str(), t.elements[0].id.as_str()]);
    }

    #[test]
    fn preview_rows_clamps_and_resizes() {
        let mut t = template_with(&["grade_table", "text"]);
        let id = t.elements[0].id.clone();
        t.set_preview_rows(&id, 7).unwrap();
        assert_eq!(t.elements[0].height, 40.0 + 7.0 * 35.0 + 20.0);
        t.set_preview_rows(&id, 50).unwrap();
        assert_eq!(t.elements[0].height, 760.0);
        t.set_preview_rows(&id, 0).unwrap();
        assert_eq!(t.elements[0].height, 95.0);

        let text_id = t.elements[1].id.clone();
        assert!(t.set_preview_rows(&text_id, 3).is_err());
    }
}
