use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::geometry::{self, Hit, DEFAULT_HIT_THRESHOLD};
use crate::render::{self, Canvas, Draft};
use crate::state::data::{parse_distance, DistanceUnit, Endpoint, Marking, MarkingEdit, NewMarking};
use crate::state::history::{UndoAction, UndoLog};
use crate::state::library::MarkingStore;
use crate::state::settings::AppSettings;

/// Where the editor is in a gesture
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CanvasState {
    #[default]
    Idle,
    /// Create mode; the draft exists once the first drag started
    Creating { draft: Option<Draft> },
    /// Draft finished, waiting for the user to type its distance
    AwaitingDistance(Draft),
    Selected(i64),
    /// An endpoint of the selected marking is being moved
    Dragging(i64, Endpoint),
}

/// Interactive marking editor for one photo
///
/// Gestures arrive in view pixels and are normalized against the view size.
/// Every mutation goes straight to the store; the fresh marking list is then
/// published to subscribers, which re-render from it.
pub struct MarkingCanvas<S: MarkingStore> {
    store: S,
    photo_id: i64,
    settings: watch::Receiver<AppSettings>,
    state: CanvasState,
    history: UndoLog,
    snapshot: watch::Sender<Vec<Marking>>,
    /// View size in pixels (width, height)
    view_size: (f32, f32),
    threshold: f32,
}

impl<S: MarkingStore> MarkingCanvas<S> {
    /// Start editing `photo_id`, loading its current markings
    pub fn open(store: S, photo_id: i64, settings: watch::Receiver<AppSettings>) -> Result<Self> {
        let markings = store.markings_for_photo(photo_id)?;
        log::debug!("Canvas opened for photo {} with {} markings", photo_id, markings.len());
        let (snapshot, _) = watch::channel(markings);
        Ok(Self {
            store,
            photo_id,
            settings,
            state: CanvasState::Idle,
            history: UndoLog::new(),
            snapshot,
            view_size: (1.0, 1.0),
            threshold: DEFAULT_HIT_THRESHOLD,
        })
    }

    /// Size of the view gestures are measured in.
    /// Until set, positions are taken as already normalized.
    pub fn set_view_size(&mut self, width: f32, height: f32) {
        self.view_size = (width, height);
    }

    pub fn set_hit_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn photo_id(&self) -> i64 {
        self.photo_id
    }

    pub fn state(&self) -> CanvasState {
        self.state
    }

    pub fn selected(&self) -> Option<i64> {
        match self.state {
            CanvasState::Selected(id) | CanvasState::Dragging(id, _) => Some(id),
            _ => None,
        }
    }

    /// The marking being created, if any
    pub fn draft(&self) -> Option<Draft> {
        match self.state {
            CanvasState::Creating { draft } => draft,
            CanvasState::AwaitingDistance(draft) => Some(draft),
            _ => None,
        }
    }

    /// Current markings, ascending display order
    pub fn markings(&self) -> Vec<Marking> {
        self.snapshot.borrow().clone()
    }

    /// Receiver holding the latest marking list
    pub fn subscribe(&self) -> watch::Receiver<Vec<Marking>> {
        self.snapshot.subscribe()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Finish the session; the undo log goes with it
    pub fn close(self) -> S {
        log::debug!("Canvas closed for photo {}", self.photo_id);
        self.store
    }

    // ========== Gestures ==========

    /// Enter create mode, dropping any selection
    pub fn begin_create(&mut self) {
        self.transition(CanvasState::Creating { draft: None });
    }

    pub fn drag_start(&mut self, x: f32, y: f32) {
        let point = self.normalize(x, y);
        match self.state {
            CanvasState::Creating { .. } => {
                let draft = Draft { start: point, end: point };
                self.transition(CanvasState::Creating { draft: Some(draft) });
            }
            CanvasState::Selected(_) => {
                if let Some(Hit::Endpoint(id, endpoint)) = self.hit(point) {
                    self.transition(CanvasState::Dragging(id, endpoint));
                }
            }
            _ => {}
        }
    }

    pub fn drag_move(&mut self, x: f32, y: f32) -> Result<()> {
        let point = self.normalize(x, y);
        match self.state {
            CanvasState::Creating { draft: Some(draft) } => {
                self.state = CanvasState::Creating {
                    draft: Some(Draft { end: point, ..draft }),
                };
            }
            CanvasState::Dragging(id, endpoint) => {
                let Some(mut marking) = self.find(id) else {
                    return Ok(());
                };
                marking.set_endpoint(endpoint, point.0, point.1);
                if self.store.update_marking(&marking)? {
                    self.refresh()?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn drag_end(&mut self) {
        match self.state {
            CanvasState::Creating { draft: Some(draft) } => {
                self.transition(CanvasState::AwaitingDistance(draft));
            }
            CanvasState::Dragging(id, _) => self.transition(CanvasState::Selected(id)),
            _ => {}
        }
    }

    /// Commit the pending draft with the distance the user typed, in the
    /// default unit from settings
    pub fn confirm_distance(&mut self, input: &str) -> Result<Option<i64>> {
        let unit = self.settings.borrow().default_distance_unit;
        self.confirm_distance_in(input, unit)
    }

    /// Commit the pending draft. Invalid input leaves the draft waiting.
    /// Returns None when there is no draft to commit.
    pub fn confirm_distance_in(&mut self, input: &str, unit: DistanceUnit) -> Result<Option<i64>> {
        let CanvasState::AwaitingDistance(draft) = self.state else {
            return Ok(None);
        };
        let distance_value = parse_distance(input)?;

        let style = self.settings.borrow().marking_style();
        let new = NewMarking {
            photo_id: self.photo_id,
            start_x: draft.start.0,
            start_y: draft.start.1,
            end_x: draft.end.0,
            end_y: draft.end.1,
            distance_value,
            distance_unit: unit,
            style,
            display_order: self.store.next_display_order(self.photo_id)?,
        };
        let id = self.store.insert_marking(&new)?;
        self.history.push(UndoAction::Create(id));
        log::debug!("Created marking {} on photo {}", id, self.photo_id);

        self.transition(CanvasState::Idle);
        self.refresh()?;
        Ok(Some(id))
    }

    /// Abandon creation without touching storage
    pub fn cancel_create(&mut self) {
        if matches!(self.state, CanvasState::Creating { .. } | CanvasState::AwaitingDistance(_)) {
            self.transition(CanvasState::Idle);
        }
    }

    /// Resolve a tap. Ignored while creating.
    pub fn tap(&mut self, x: f32, y: f32) -> Option<Hit> {
        if matches!(self.state, CanvasState::Creating { .. } | CanvasState::AwaitingDistance(_)) {
            return None;
        }
        let hit = self.hit(self.normalize(x, y))?;
        match hit {
            Hit::Endpoint(id, endpoint) => self.transition(CanvasState::Dragging(id, endpoint)),
            Hit::Segment(id) => self.transition(CanvasState::Selected(id)),
        }
        Some(hit)
    }

    /// Select a marking by id, as picking it from a list would.
    /// Abandons any creation in progress. Unknown ids change nothing.
    pub fn select(&mut self, id: i64) -> Result<bool> {
        if self.find(id).is_none() {
            return Ok(false);
        }
        self.transition(CanvasState::Selected(id));
        Ok(true)
    }

    /// Drop any selection or draft
    pub fn deselect(&mut self) {
        self.transition(CanvasState::Idle);
    }

    // ========== Edits ==========

    /// Delete a marking. Unknown ids are ignored.
    pub fn delete(&mut self, id: i64) -> Result<bool> {
        let Some(marking) = self.store.delete_marking(id)? else {
            return Ok(false);
        };
        self.history.push(UndoAction::Delete(marking));
        if self.selected() == Some(id) {
            self.transition(CanvasState::Idle);
        }
        log::debug!("Deleted marking {}", id);
        self.refresh()?;
        Ok(true)
    }

    /// Apply the edit panel to a marking. Not undoable.
    pub fn apply_edit(&mut self, id: i64, edit: &MarkingEdit) -> Result<bool> {
        let distance_value = parse_distance(&edit.distance_input)?;
        let Some(mut marking) = self.store.marking(id)? else {
            return Ok(false);
        };
        marking.distance_value = distance_value;
        marking.line_color = edit.style.line_color;
        marking.line_width_dp = edit.style.line_width_dp;
        marking.text_color = edit.style.text_color;
        marking.text_size_sp = edit.style.text_size_sp;

        let updated = self.store.update_marking(&marking)?;
        if updated {
            self.refresh()?;
        }
        Ok(updated)
    }

    /// Restack markings: `order[0]` ends up at the bottom.
    /// `order` must list every current marking exactly once.
    pub fn reorder(&mut self, order: &[i64]) -> Result<()> {
        let current = self.markings();
        let mut wanted = order.to_vec();
        let mut existing: Vec<i64> = current.iter().map(|m| m.id).collect();
        wanted.sort_unstable();
        existing.sort_unstable();
        if wanted != existing {
            return Err(Error::InvalidPermutation);
        }

        let reordered: Vec<Marking> = order
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                let mut marking = current.iter().find(|m| m.id == *id)?.clone();
                marking.display_order = index as u32;
                Some(marking)
            })
            .collect();
        self.store.update_markings(&reordered)?;
        log::debug!("Reordered {} markings on photo {}", reordered.len(), self.photo_id);
        self.refresh()
    }

    /// Revert the most recent create or delete
    pub fn undo(&mut self) -> Result<Option<UndoAction>> {
        let Some(action) = self.history.pop() else {
            return Ok(None);
        };
        let outcome = match &action {
            UndoAction::Create(id) => self.store.delete_marking(*id).map(|_| ()),
            UndoAction::Delete(marking) => self.store.restore_marking(marking).map(|_| ()),
        };
        if let Err(e) = outcome {
            log::warn!("Undo failed, keeping action: {}", e);
            self.history.restore(action);
            return Err(e);
        }

        if let UndoAction::Create(id) = &action {
            if self.selected() == Some(*id) {
                self.transition(CanvasState::Idle);
            }
        }
        log::debug!("Undid {:?}", action);
        self.refresh()?;
        Ok(Some(action))
    }

    // ========== Drawing ==========

    /// Draw the live view: markings, then the draft, then handles of the
    /// selected marking
    pub fn render<C: Canvas + ?Sized>(&self, target: &mut C, density: f32) {
        let markings = self.snapshot.borrow();
        let settings = self.settings.borrow();
        render::render_markings(target, &markings, settings.arrow_style, density);
        if let Some(draft) = self.draft() {
            render::render_draft(target, &draft, &settings.marking_style(), density);
        }
        if let Some(selected) = self.selected().and_then(|id| markings.iter().find(|m| m.id == id)) {
            render::render_selection_handles(target, selected, density);
        }
    }

    fn normalize(&self, x: f32, y: f32) -> (f32, f32) {
        geometry::normalize(x, y, self.view_size.0, self.view_size.1)
    }

    fn hit(&self, (x, y): (f32, f32)) -> Option<Hit> {
        geometry::hit_test(&self.snapshot.borrow(), self.selected(), x, y, self.threshold)
    }

    fn find(&self, id: i64) -> Option<Marking> {
        self.snapshot.borrow().iter().find(|m| m.id == id).cloned()
    }

    fn transition(&mut self, next: CanvasState) {
        if self.state != next {
            log::debug!("Canvas state {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }

    /// Reload from storage and publish
    fn refresh(&mut self) -> Result<()> {
        let markings = self.store.markings_for_photo(self.photo_id)?;
        self.snapshot.send_replace(markings);
        Ok(())
    }
}
