//! Birthday Adventure entry point
//!
//! On the web this wires page buttons to the app and drives it from
//! `requestAnimationFrame`. Natively it runs a short headless playthrough.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element, Event};

    use birthday_adventure::app::{App, Click};
    use birthday_adventure::audio::AudioManager;
    use birthday_adventure::platform::web::WebPlatform;
    use birthday_adventure::session::run_exclusive;
    use birthday_adventure::{Settings, Tuning};

    type Shared = Rc<RefCell<App<WebPlatform, AudioManager>>>;

    fn now() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map_or(0.0, |p| p.now())
    }

    /// Tuning embedded in the page as `<script id="tuning" type="application/json">`,
    /// or the built-in defaults
    fn load_tuning(document: &Document) -> Tuning {
        let Some(json) = document.get_element_by_id("tuning").and_then(|el| el.text_content()) else {
            return Tuning::default();
        };
        match Tuning::from_json(&json) {
            Ok(tuning) => {
                log::info!("Loaded tuning from page");
                tuning
            }
            Err(e) => {
                log::error!("Invalid page tuning, using defaults: {e}");
                Tuning::default()
            }
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let settings = Settings::from_query(&window.location().search().unwrap_or_default());

        let level = if settings.debug { log::Level::Debug } else { log::Level::Info };
        let _ = console_log::init_with_level(level);
        log::info!("Birthday Adventure starting...");

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let platform = WebPlatform::new().map_err(|e| JsValue::from_str(&e.to_string()))?;
        let audio = AudioManager::new(settings.sfx_gain(), settings.music_gain());
        let tuning = load_tuning(&document);
        let seed = js_sys::Date::now() as u64;
        log::info!("Seed: {seed}");

        let app: Shared = Rc::new(RefCell::new(App::new(platform, audio, tuning, settings, seed)));

        setup_buttons(&document, &app);
        request_animation_frame(app);
        Ok(())
    }

    fn dispatch(app: &Shared, click: Click) {
        if run_exclusive(app, |app| app.click(click, now())).is_none() {
            log::warn!("Dropped {click:?}: app busy");
        }
    }

    /// Index of the element matching `selector` that the event hit
    fn hit_index(event: &Event, selector: &str) -> Option<usize> {
        let target = event.target()?.dyn_into::<Element>().ok()?;
        let hit = target.closest(selector).ok()??;
        hit.get_attribute("data-index")?.parse().ok()
    }

    /// Add a click listener to every element matching `selector`
    fn on_click(document: &Document, selector: &str, app: &Shared, to_click: impl Fn(&Event) -> Option<Click> + Clone + 'static) {
        let Ok(elements) = document.query_selector_all(selector) else {
            log::warn!("Bad selector: {selector}");
            return;
        };
        if elements.length() == 0 {
            log::debug!("No element for {selector}");
        }
        for i in 0..elements.length() {
            let Some(el) = elements.item(i) else { continue };
            let app = app.clone();
            let to_click = to_click.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: Event| {
                if let Some(click) = to_click(&event) {
                    event.stop_propagation();
                    dispatch(&app, click);
                }
            });
            let _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Page buttons live as long as the page, so their listeners are leaked
    fn setup_buttons(document: &Document, app: &Shared) {
        on_click(document, "#start-btn", app, |_| Some(Click::Start));
        on_click(document, ".opening-start-btn", app, |_| Some(Click::DialogStart));
        on_click(document, "#screen-opening", app, |_| Some(Click::Dialog));
        on_click(document, ".intro-btn", app, |_| Some(Click::IntroContinue));
        on_click(document, ".complete-btn", app, |_| Some(Click::CompleteContinue));
        on_click(document, ".retry-btn", app, |_| Some(Click::Retry));
        // Options are regenerated per question, so listen on the container
        on_click(document, ".quiz-options", app, |event| {
            hit_index(event, ".quiz-option").map(Click::QuizOption)
        });
        on_click(document, ".candle", app, |event| {
            hit_index(event, ".candle").map(Click::Candle)
        });
        on_click(document, "#music-toggle", app, |_| Some(Click::MusicToggle));
    }

    fn request_animation_frame(app: Shared) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(app: Shared, time: f64) {
        if run_exclusive(&app, |app| app.frame(time)).is_none() {
            log::warn!("Frame skipped: app busy");
        }
        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use birthday_adventure::app::{App, Click};
    use birthday_adventure::audio::NullAudio;
    use birthday_adventure::platform::Headless;
    use birthday_adventure::{Screen, Settings, Tuning};

    env_logger::init();
    log::info!("Birthday Adventure (native) starting...");
    log::info!("The game runs in the browser - build with `trunk serve`. Running a headless walkthrough.");

    let mut app = App::new(Headless::default(), NullAudio::default(), Tuning::default(), Settings::default(), 1);
    let frame_ms = 1000.0 / 60.0;
    let mut now = 0.0;
    let mut run_for = |app: &mut App<Headless, NullAudio>, ms: f64| {
        let end = now + ms;
        while now < end {
            now += frame_ms;
            app.frame(now);
        }
        now
    };

    let t = run_for(&mut app, 100.0);
    app.click(Click::Start, t);
    run_for(&mut app, 1000.0);

    // Click through the opening dialog
    for _ in 0..30 {
        let t = run_for(&mut app, 100.0);
        app.click(Click::Dialog, t);
        app.click(Click::DialogStart, t);
        if app.current() != Screen::Opening {
            break;
        }
    }
    let t = run_for(&mut app, 1000.0);
    app.click(Click::IntroContinue, t);
    let t = run_for(&mut app, 100.0);
    app.click(Click::IntroContinue, t);
    run_for(&mut app, 5000.0);

    println!("Screen: {:?}", app.current());
    for (selector, text) in &app.platform().texts {
        println!("  {selector}: {text}");
    }
}
