//! The editor session: surface sizing, pointer-driven field mutations, and undo.

use kurbo::Point;

use crate::editor::history::History;
use crate::model::field::{Field, PctRect, normalize};

/// Minimum field size while resizing, percent.
pub const MIN_SIZE_PCT: f64 = 1.0;
/// Minimum field size while resizing with grid snap active, percent.
pub const MIN_SIZE_SNAPPED_PCT: f64 = 5.0;
/// Offset applied to duplicated fields, percent on both axes.
const DUPLICATE_OFFSET_PCT: f64 = 2.0;

/// Pixel size of the rendering surface the editor is currently mapped onto.
///
/// Pointer coordinates arrive in this space; the model itself never leaves
/// percentages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSize {
    /// Surface width in pixels.
    pub width: f64,
    /// Surface height in pixels.
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq)]
enum Interaction {
    Idle,
    Dragging {
        id: String,
        // Pointer-to-field-origin offset captured at drag start, surface px.
        grab_x: f64,
        grab_y: f64,
    },
    Resizing {
        id: String,
    },
}

/// Single-document editing session: selection, drag/resize state machine,
/// grid snap, z-order operations and bounded undo/redo.
///
/// All mutations are synchronous with respect to pointer events; only one
/// drag or resize can be active, and attempting to start another while one
/// is active is a no-op until the first ends.
#[derive(Debug)]
pub struct EditorSession {
    fields: Vec<Field>,
    selected: Option<String>,
    interaction: Interaction,
    surface: SurfaceSize,
    grid_pct: Option<f64>,
    history: History,
    next_id: u64,
    interaction_moved: bool,
}

impl EditorSession {
    /// Open a session over an already-loaded field list.
    pub fn new(fields: Vec<Field>, surface: SurfaceSize) -> Self {
        let fields: Vec<Field> = fields.into_iter().map(normalize).collect();
        let history = History::new(fields.clone());
        Self {
            fields,
            selected: None,
            interaction: Interaction::Idle,
            surface,
            grid_pct: None,
            history,
            next_id: 0,
            interaction_moved: false,
        }
    }

    /// Current field list in insertion order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Fields in paint order: ascending `z_index`, ties by list position.
    pub fn paint_order(&self) -> Vec<&Field> {
        let mut out: Vec<&Field> = self.fields.iter().collect();
        out.sort_by_key(|f| f.z_index);
        out
    }

    /// Update the surface pixel size (viewport resize).
    pub fn set_surface_size(&mut self, surface: SurfaceSize) {
        self.surface = surface;
    }

    /// Enable grid snapping at `step` percent, or disable with `None`.
    pub fn set_grid(&mut self, step: Option<f64>) {
        self.grid_pct = step.filter(|s| s.is_finite() && *s > 0.0);
    }

    /// Currently selected field id.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Change selection. Selecting never starts a drag or resize and never
    /// touches history.
    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id
            .filter(|id| self.fields.iter().any(|f| f.id == *id))
            .map(str::to_string);
    }

    /// Topmost field containing `point` (surface px): hit priority is
    /// descending paint order.
    pub fn field_at(&self, point: Point) -> Option<&Field> {
        if self.surface.width <= 0.0 || self.surface.height <= 0.0 {
            return None;
        }
        let x_pct = point.x / self.surface.width * 100.0;
        let y_pct = point.y / self.surface.height * 100.0;
        self.paint_order()
            .into_iter()
            .rev()
            .find(|f| {
                x_pct >= f.rect.x
                    && x_pct <= f.rect.x + f.rect.width
                    && y_pct >= f.rect.y
                    && y_pct <= f.rect.y + f.rect.height
            })
    }

    fn alloc_id(&mut self) -> String {
        loop {
            let id = format!("field-{}", self.next_id);
            self.next_id += 1;
            if !self.fields.iter().any(|f| f.id == id) {
                return id;
            }
        }
    }

    fn commit(&mut self) {
        self.history.push(self.fields.clone());
    }

    /// Add a photo field with default placement; selects it.
    pub fn add_photo_field(&mut self) -> String {
        let id = self.alloc_id();
        self.fields.push(normalize(Field::photo(id.clone())));
        self.selected = Some(id.clone());
        self.commit();
        id
    }

    /// Add a text field with default placement; selects it.
    pub fn add_text_field(&mut self) -> String {
        let id = self.alloc_id();
        self.fields.push(normalize(Field::text(id.clone())));
        self.selected = Some(id.clone());
        self.commit();
        id
    }

    /// Apply an edit to one field; the result is re-normalized and recorded
    /// in history. Returns false for unknown ids.
    pub fn update_field(&mut self, id: &str, edit: impl FnOnce(&mut Field)) -> bool {
        let Some(field) = self.fields.iter_mut().find(|f| f.id == id) else {
            return false;
        };
        edit(field);
        let fixed = normalize(field.clone());
        *field = fixed;
        self.commit();
        true
    }

    /// Remove a field. Returns false for unknown ids.
    pub fn delete_field(&mut self, id: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f.id != id);
        if self.fields.len() == before {
            return false;
        }
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.commit();
        true
    }

    /// Clone the selected field, offset slightly, on top of the stack.
    pub fn duplicate_selected(&mut self) -> Option<String> {
        let src = self
            .fields
            .iter()
            .find(|f| Some(f.id.as_str()) == self.selected.as_deref())?
            .clone();
        let id = self.alloc_id();
        let top = self.max_z().saturating_add(1);
        let mut dup = Field {
            id: id.clone(),
            z_index: top,
            ..src
        };
        dup.rect = PctRect {
            x: dup.rect.x + DUPLICATE_OFFSET_PCT,
            y: dup.rect.y + DUPLICATE_OFFSET_PCT,
            ..dup.rect
        };
        self.fields.push(normalize(dup));
        self.selected = Some(id.clone());
        self.commit();
        Some(id)
    }

    fn max_z(&self) -> i32 {
        self.fields.iter().map(|f| f.z_index).max().unwrap_or(0)
    }

    fn min_z(&self) -> i32 {
        self.fields.iter().map(|f| f.z_index).min().unwrap_or(0)
    }

    /// Raise the selected field above everything else.
    pub fn bring_to_front(&mut self) -> bool {
        let top = self.max_z().saturating_add(1);
        self.reassign_selected_z(top)
    }

    /// Lower the selected field below everything else.
    pub fn send_to_back(&mut self) -> bool {
        let bottom = self.min_z().saturating_sub(1);
        self.reassign_selected_z(bottom)
    }

    fn reassign_selected_z(&mut self, z: i32) -> bool {
        let Some(id) = self.selected.clone() else {
            return false;
        };
        let Some(field) = self.fields.iter_mut().find(|f| f.id == id) else {
            return false;
        };
        if field.z_index == z {
            return false;
        }
        field.z_index = z;
        self.commit();
        true
    }

    /// Begin dragging a field. No-op (returns false) while another drag or
    /// resize is active, or for unknown ids.
    pub fn begin_drag(&mut self, id: &str, pointer: Point) -> bool {
        if self.interaction != Interaction::Idle {
            return false;
        }
        let Some(field) = self.fields.iter().find(|f| f.id == id) else {
            return false;
        };
        let origin_x = field.rect.x / 100.0 * self.surface.width;
        let origin_y = field.rect.y / 100.0 * self.surface.height;
        self.interaction = Interaction::Dragging {
            id: id.to_string(),
            grab_x: pointer.x - origin_x,
            grab_y: pointer.y - origin_y,
        };
        self.selected = Some(id.to_string());
        self.interaction_moved = false;
        true
    }

    /// Begin resizing a field; the fixed anchor is its top-left corner and
    /// the drag target is the opposite corner. Same exclusivity as drag.
    pub fn begin_resize(&mut self, id: &str, _pointer: Point) -> bool {
        if self.interaction != Interaction::Idle {
            return false;
        }
        if !self.fields.iter().any(|f| f.id == id) {
            return false;
        }
        self.interaction = Interaction::Resizing { id: id.to_string() };
        self.selected = Some(id.to_string());
        self.interaction_moved = false;
        true
    }

    /// Route a pointer move into the active drag or resize. Intermediate
    /// frames mutate the field list but are NOT individually recorded; the
    /// single history entry is pushed by [`EditorSession::end_interaction`].
    pub fn pointer_moved(&mut self, pointer: Point) {
        if self.surface.width <= 0.0 || self.surface.height <= 0.0 {
            return;
        }
        let grid = self.grid_pct;
        match self.interaction.clone() {
            Interaction::Idle => {}
            Interaction::Dragging { id, grab_x, grab_y } => {
                let x_pct = (pointer.x - grab_x) / self.surface.width * 100.0;
                let y_pct = (pointer.y - grab_y) / self.surface.height * 100.0;
                let (x_pct, y_pct) = match grid {
                    Some(g) => (snap(x_pct, g), snap(y_pct, g)),
                    None => (x_pct, y_pct),
                };
                if let Some(field) = self.fields.iter_mut().find(|f| f.id == id) {
                    field.rect.x = x_pct;
                    field.rect.y = y_pct;
                    *field = normalize(field.clone());
                    self.interaction_moved = true;
                }
            }
            Interaction::Resizing { id } => {
                if let Some(field) = self.fields.iter_mut().find(|f| f.id == id) {
                    // Fixed top-left corner; pointer tracks the opposite one.
                    let origin_x = field.rect.x / 100.0 * self.surface.width;
                    let origin_y = field.rect.y / 100.0 * self.surface.height;
                    let mut w_pct = (pointer.x - origin_x) / self.surface.width * 100.0;
                    let mut h_pct = (pointer.y - origin_y) / self.surface.height * 100.0;
                    let min = match grid {
                        Some(g) => {
                            w_pct = snap(w_pct, g);
                            h_pct = snap(h_pct, g);
                            MIN_SIZE_SNAPPED_PCT
                        }
                        None => MIN_SIZE_PCT,
                    };
                    field.rect.width = w_pct.max(min);
                    field.rect.height = h_pct.max(min);
                    *field = normalize(field.clone());
                    self.interaction_moved = true;
                }
            }
        }
    }

    /// Finish the active drag or resize, coalescing it into one history
    /// entry. No-op when idle.
    pub fn end_interaction(&mut self) {
        let was_active = self.interaction != Interaction::Idle;
        self.interaction = Interaction::Idle;
        if was_active && self.interaction_moved {
            self.commit();
        }
        self.interaction_moved = false;
    }

    /// Step history backwards. Returns false at the oldest retained state.
    pub fn undo(&mut self) -> bool {
        if let Some(fields) = self.history.undo().map(<[Field]>::to_vec) {
            self.fields = fields;
            self.prune_selection();
            true
        } else {
            false
        }
    }

    /// Step history forwards. Returns false at the newest state.
    pub fn redo(&mut self) -> bool {
        if let Some(fields) = self.history.redo().map(<[Field]>::to_vec) {
            self.fields = fields;
            self.prune_selection();
            true
        } else {
            false
        }
    }

    fn prune_selection(&mut self) {
        if let Some(sel) = self.selected.as_deref()
            && !self.fields.iter().any(|f| f.id == sel)
        {
            self.selected = None;
        }
    }
}

fn snap(value: f64, grid: f64) -> f64 {
    (value / grid).round() * grid
}
