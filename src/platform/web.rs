//! Browser platform
//!
//! Screens, HUD text and generated items are plain DOM elements found by
//! selector. Each mini-game session gets a [`CanvasSurface`] that owns its
//! input listeners; dropping the surface unregisters them.

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, Event, EventTarget, HtmlCanvasElement, HtmlElement,
    KeyboardEvent, TouchEvent,
};

use super::{Color, Item, Platform, PlatformError, RenderTarget, ScreenClasses, TextSink, css_color};
use crate::consts::{CANVAS_H, CANVAS_W};
use crate::flow::ScreenHost;
use crate::session::InputHandle;
use crate::sim::Action;

/// An event listener that is removed again when dropped
pub struct Listener {
    target: EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl Listener {
    pub fn new(target: &EventTarget, kind: &'static str, f: impl FnMut(Event) + 'static) -> Self {
        let closure = Closure::<dyn FnMut(Event)>::new(f);
        if target
            .add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
            .is_err()
        {
            log::warn!("Failed to add {kind} listener");
        }
        Self {
            target: target.clone(),
            kind,
            closure,
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if self
            .target
            .remove_event_listener_with_callback(self.kind, self.closure.as_ref().unchecked_ref())
            .is_err()
        {
            log::warn!("Failed to remove {} listener", self.kind);
        }
    }
}

/// First touch point of a touch event, in client coordinates
fn touch_point(event: &Event) -> Option<Vec2> {
    let touch = event.dyn_ref::<TouchEvent>()?.touches().get(0)?;
    Some(Vec2::new(touch.client_x() as f32, touch.client_y() as f32))
}

/// Keyboard, touch-drag and on-screen button listeners feeding `input`
fn input_listeners(document: &Document, canvas: &HtmlCanvasElement, input: &InputHandle) -> Vec<Listener> {
    let mut listeners = Vec::new();

    let inp = input.clone();
    listeners.push(Listener::new(document, "keydown", move |event| {
        let Some(key) = event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key) else {
            return;
        };
        if let Ok(mut input) = inp.try_borrow_mut() {
            if input.key_down(&key) {
                event.prevent_default();
            }
        }
    }));

    let inp = input.clone();
    listeners.push(Listener::new(document, "keyup", move |event| {
        if let (Some(key), Ok(mut input)) = (
            event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key),
            inp.try_borrow_mut(),
        ) {
            input.key_up(&key);
        }
    }));

    let inp = input.clone();
    listeners.push(Listener::new(canvas, "touchstart", move |event| {
        event.prevent_default();
        if let (Some(pos), Ok(mut input)) = (touch_point(&event), inp.try_borrow_mut()) {
            input.touch_start(pos);
        }
    }));

    let inp = input.clone();
    listeners.push(Listener::new(canvas, "touchmove", move |event| {
        event.prevent_default();
        if let (Some(pos), Ok(mut input)) = (touch_point(&event), inp.try_borrow_mut()) {
            input.touch_move(pos);
        }
    }));

    let inp = input.clone();
    listeners.push(Listener::new(canvas, "touchend", move |_event| {
        if let Ok(mut input) = inp.try_borrow_mut() {
            input.touch_end();
        }
    }));

    // D-pad and jump buttons: <button data-action="left">
    if let Ok(buttons) = document.query_selector_all("[data-action]") {
        for i in 0..buttons.length() {
            let Some(button) = buttons.item(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            let Some(action) = button
                .get_attribute("data-action")
                .and_then(|name| Action::from_button(&name))
            else {
                continue;
            };
            for kind in ["touchstart", "mousedown"] {
                let inp = input.clone();
                listeners.push(Listener::new(&button, kind, move |event| {
                    event.prevent_default();
                    if let Ok(mut input) = inp.try_borrow_mut() {
                        input.button_down(action);
                    }
                }));
            }
            for kind in ["touchend", "mouseup", "mouseleave"] {
                let inp = input.clone();
                listeners.push(Listener::new(&button, kind, move |_event| {
                    if let Ok(mut input) = inp.try_borrow_mut() {
                        input.button_up(action);
                    }
                }));
            }
        }
    }

    listeners
}

/// A mini-game canvas and the listeners of the session drawing on it
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
    _listeners: Vec<Listener>,
}

impl RenderTarget for CanvasSurface {
    fn clear(&mut self, color: Color) {
        self.ctx.set_global_alpha(1.0);
        self.ctx.set_fill_style_str(&css_color(color));
        self.ctx.fill_rect(0.0, 0.0, CANVAS_W as f64, CANVAS_H as f64);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.ctx.set_fill_style_str(&css_color(color));
        self.ctx.fill_rect(x as f64, y as f64, w as f64, h as f64);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.ctx.set_fill_style_str(&css_color(color));
        self.ctx.begin_path();
        if self
            .ctx
            .arc(center.x as f64, center.y as f64, radius as f64, 0.0, std::f64::consts::TAU)
            .is_ok()
        {
            self.ctx.fill();
        }
    }

    fn fill_text(&mut self, text: &str, pos: Vec2, size: f32, color: Color) {
        self.ctx.set_fill_style_str(&css_color(color));
        self.ctx.set_font(&format!("{size}px 'Press Start 2P', monospace"));
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        if self.ctx.fill_text(text, pos.x as f64, pos.y as f64).is_err() {
            log::warn!("Failed to draw text {text:?}");
        }
    }
}

/// The page
pub struct WebPlatform {
    document: Document,
}

impl WebPlatform {
    pub fn new() -> Result<Self, PlatformError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or(PlatformError::NoWindow)?;
        Ok(Self { document })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn html(&self, selector: &str) -> Option<HtmlElement> {
        self.document
            .query_selector(selector)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    }

    fn by_id(&self, id: &str) -> Result<HtmlElement, PlatformError> {
        self.document
            .get_element_by_id(id)
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .ok_or_else(|| PlatformError::MissingElement(id.to_string()))
    }
}

fn set_display(el: &HtmlElement, id: &str, display: &str) {
    if el.style().set_property("display", display).is_err() {
        log::warn!("Failed to set display:{display} on #{id}");
    }
}

fn apply_classes(el: &HtmlElement, id: &str, change: ScreenClasses) {
    let list = el.class_list();
    for class in change.remove {
        if list.remove_1(class).is_err() {
            log::warn!("Failed to remove {class} from #{id}");
        }
    }
    for class in change.add {
        if list.add_1(class).is_err() {
            log::warn!("Failed to add {class} to #{id}");
        }
    }
}

impl ScreenHost for WebPlatform {
    fn has_screen(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }

    fn activate(&mut self, id: &str) {
        let el = match self.by_id(id) {
            Ok(el) => el,
            Err(e) => {
                log::error!("Cannot show screen: {e}");
                return;
            }
        };
        set_display(&el, id, "flex");
        // Force reflow so the enter animation runs
        let _ = el.offset_height();
        apply_classes(&el, id, ScreenClasses::ACTIVATE);
    }

    fn begin_exit(&mut self, id: &str) {
        match self.by_id(id) {
            Ok(el) => apply_classes(&el, id, ScreenClasses::EXIT),
            Err(e) => log::warn!("Cannot exit screen: {e}"),
        }
    }

    fn hide(&mut self, id: &str) {
        match self.by_id(id) {
            Ok(el) => {
                set_display(&el, id, "none");
                apply_classes(&el, id, ScreenClasses::HIDE);
            }
            Err(e) => log::warn!("Cannot hide screen: {e}"),
        }
    }
}

impl TextSink for WebPlatform {
    fn set_text(&mut self, selector: &str, text: &str) {
        if let Some(el) = self.html(selector) {
            el.set_inner_text(text);
        }
    }

    fn set_class(&mut self, selector: &str, class: &str, on: bool) {
        if let Some(el) = self.html(selector) {
            if el.class_list().toggle_with_force(class, on).is_err() {
                log::warn!("Failed to toggle {class} on {selector}");
            }
        }
    }

    fn set_visible(&mut self, selector: &str, visible: bool) {
        if let Some(el) = self.html(selector) {
            if el.style().set_property("display", if visible { "" } else { "none" }).is_err() {
                log::warn!("Failed to set visibility of {selector}");
            }
        }
    }

    fn clear_items(&mut self, selector: &str) {
        if let Some(el) = self.html(selector) {
            el.set_inner_html("");
        }
    }

    fn append_item(&mut self, selector: &str, item: &Item) {
        let Some(parent) = self.html(selector) else {
            return;
        };
        let Ok(child) = self.document.create_element("div") else {
            return;
        };
        child.set_class_name(&item.class);
        child.set_text_content(Some(&item.text));
        if child
            .set_attribute("data-index", &parent.child_element_count().to_string())
            .is_err()
        {
            log::warn!("Failed to index {} under {selector}", item.class);
        }
        if !item.style.is_empty() && child.set_attribute("style", &item.style).is_err() {
            log::warn!("Failed to style {} under {selector}", item.class);
        }
        if parent.append_child(&child).is_err() {
            log::warn!("Failed to append {} under {selector}", item.class);
        }
    }
}

impl Platform for WebPlatform {
    type Surface = CanvasSurface;

    fn has_canvas(&self, canvas_id: &str) -> bool {
        self.document
            .get_element_by_id(canvas_id)
            .is_some_and(|el| el.dyn_into::<HtmlCanvasElement>().is_ok())
    }

    fn acquire(&mut self, canvas_id: &str, input: &InputHandle) -> Result<CanvasSurface, PlatformError> {
        let canvas = self
            .document
            .get_element_by_id(canvas_id)
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
            .ok_or_else(|| PlatformError::MissingCanvas(canvas_id.to_string()))?;
        canvas.set_width(CANVAS_W as u32);
        canvas.set_height(CANVAS_H as u32);

        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or_else(|| PlatformError::MissingContext(canvas_id.to_string()))?;
        ctx.set_image_smoothing_enabled(false);

        Ok(CanvasSurface {
            ctx,
            _listeners: input_listeners(&self.document, &canvas, input),
        })
    }
}
