//! In-memory platform
//!
//! Keeps the page state in maps and records draw calls, so the whole app can
//! run without a browser. Used by the native demo and by tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::rc::Rc;

use glam::Vec2;

use super::{Color, Item, Platform, PlatformError, RenderTarget, SCREEN_ACTIVE, ScreenClasses, TextSink};
use crate::flow::{Screen, ScreenHost};
use crate::session::InputHandle;

/// One recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Color),
    Rect { x: f32, y: f32, w: f32, h: f32, color: Color },
    Circle { center: Vec2, radius: f32, color: Color },
    Text { text: String, pos: Vec2 },
}

/// Render target that stores what was drawn
#[derive(Debug, Default)]
pub struct Recorder {
    pub ops: Vec<DrawOp>,
    /// Which session this surface belongs to; logged on release
    pub canvas: String,
    released: Option<Rc<RefCell<Vec<String>>>>,
}

impl Recorder {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(log) = &self.released {
            log.borrow_mut().push(self.canvas.clone());
        }
    }
}

impl RenderTarget for Recorder {
    fn clear(&mut self, color: Color) {
        // A frame starts over
        self.ops.clear();
        self.ops.push(DrawOp::Clear(color));
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.ops.push(DrawOp::Rect { x, y, w, h, color });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.ops.push(DrawOp::Circle { center, radius, color });
    }

    fn fill_text(&mut self, text: &str, pos: Vec2, _size: f32, _color: Color) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            pos,
        });
    }
}

/// Page model without a browser
#[derive(Debug)]
pub struct Headless {
    /// Screen containers that exist
    pub screens: BTreeSet<String>,
    pub visible: BTreeSet<String>,
    pub texts: BTreeMap<String, String>,
    pub classes: BTreeMap<String, BTreeSet<String>>,
    pub hidden: BTreeSet<String>,
    pub items: BTreeMap<String, Vec<Item>>,
    /// Canvases that `acquire` should report as missing
    pub missing_canvases: HashSet<String>,
    /// Canvas ids whose surfaces were dropped, in order
    pub released: Rc<RefCell<Vec<String>>>,
}

impl Default for Headless {
    fn default() -> Self {
        Self {
            screens: Screen::ALL.iter().map(|s| s.element_id().to_string()).collect(),
            visible: BTreeSet::new(),
            texts: BTreeMap::new(),
            classes: BTreeMap::new(),
            hidden: BTreeSet::new(),
            items: BTreeMap::new(),
            missing_canvases: HashSet::new(),
            released: Rc::default(),
        }
    }
}

impl Headless {
    pub fn text(&self, id: &str) -> Option<&str> {
        self.texts.get(id).map(String::as_str)
    }

    pub fn has_class(&self, id: &str, class: &str) -> bool {
        self.classes.get(id).is_some_and(|c| c.contains(class))
    }

    pub fn is_shown(&self, id: &str) -> bool {
        !self.hidden.contains(id)
    }

    pub fn items(&self, selector: &str) -> &[Item] {
        self.items.get(selector).map_or(&[], Vec::as_slice)
    }

    /// Screen ids currently carrying the active class
    pub fn marked_active(&self) -> Vec<&str> {
        self.screens
            .iter()
            .filter(|id| self.has_class(&format!("#{id}"), SCREEN_ACTIVE))
            .map(String::as_str)
            .collect()
    }

    fn screen_classes(&mut self, id: &str, change: ScreenClasses) {
        change.apply(self.classes.entry(format!("#{id}")).or_default());
    }
}

impl ScreenHost for Headless {
    fn has_screen(&self, id: &str) -> bool {
        self.screens.contains(id)
    }

    fn activate(&mut self, id: &str) {
        self.visible.insert(id.to_string());
        self.screen_classes(id, ScreenClasses::ACTIVATE);
    }

    fn begin_exit(&mut self, id: &str) {
        self.screen_classes(id, ScreenClasses::EXIT);
    }

    fn hide(&mut self, id: &str) {
        self.visible.remove(id);
        self.screen_classes(id, ScreenClasses::HIDE);
    }
}

impl TextSink for Headless {
    fn set_text(&mut self, id: &str, text: &str) {
        self.texts.insert(id.to_string(), text.to_string());
    }

    fn set_class(&mut self, id: &str, class: &str, on: bool) {
        let classes = self.classes.entry(id.to_string()).or_default();
        if on {
            classes.insert(class.to_string());
        } else {
            classes.remove(class);
        }
    }

    fn set_visible(&mut self, id: &str, visible: bool) {
        if visible {
            self.hidden.remove(id);
        } else {
            self.hidden.insert(id.to_string());
        }
    }

    fn clear_items(&mut self, selector: &str) {
        self.items.remove(selector);
    }

    fn append_item(&mut self, selector: &str, item: &Item) {
        self.items.entry(selector.to_string()).or_default().push(item.clone());
    }
}

impl Platform for Headless {
    type Surface = Recorder;

    fn has_canvas(&self, canvas_id: &str) -> bool {
        !self.missing_canvases.contains(canvas_id)
    }

    fn acquire(&mut self, canvas_id: &str, _input: &InputHandle) -> Result<Recorder, PlatformError> {
        if self.missing_canvases.contains(canvas_id) {
            return Err(PlatformError::MissingCanvas(canvas_id.to_string()));
        }
        Ok(Recorder {
            ops: Vec::new(),
            canvas: canvas_id.to_string(),
            released: Some(self.released.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::InputState;

    #[test]
    fn test_surface_release_is_recorded() {
        let mut host = Headless::default();
        let input: InputHandle = Rc::new(RefCell::new(InputState::new()));
        let surface = host.acquire("maze-canvas", &input).unwrap();
        assert!(host.released.borrow().is_empty());
        drop(surface);
        assert_eq!(*host.released.borrow(), vec!["maze-canvas"]);
    }

    #[test]
    fn test_missing_canvas() {
        let mut host = Headless::default();
        host.missing_canvases.insert("world1-canvas".into());
        let input: InputHandle = Rc::new(RefCell::new(InputState::new()));
        assert_eq!(
            host.acquire("world1-canvas", &input).err(),
            Some(PlatformError::MissingCanvas("world1-canvas".into()))
        );
    }

    #[test]
    fn test_clear_starts_new_frame() {
        let mut r = Recorder::default();
        r.fill_rect(0.0, 0.0, 1.0, 1.0, [1.0; 4]);
        r.clear([0.0; 4]);
        assert_eq!(r.ops, vec![DrawOp::Clear([0.0; 4])]);
    }
}
