//! Game application
//!
//! Owns the screen sequencer, the active mini-game session and the scripted
//! screens (dialog, quiz, celebration), and routes everything to the
//! platform and audio collaborators. The host calls [`App::frame`] once per
//! animation frame and [`App::click`] for button presses.

use std::collections::HashMap;

use crate::audio::{AudioSink, MusicTrack, SoundEffect};
use crate::celebration::{CAST, Celebration, Cue};
use crate::dialog::{INTRO_MS_PER_CHAR, OpeningDialog, Typewriter};
use crate::flow::{FlowMachine, Screen};
use crate::platform::{Item, Platform, TextSink};
use crate::quiz::{Dot, Mood, OptionMark, Quiz, QuizEvent, QuizPhase, stars};
use crate::renderer;
use crate::session::Scheduler;
use crate::settings::Settings;
use crate::sim::{Controller, ControllerKind, GameEvent, Outcome};
use crate::tuning::Tuning;

/// Delay between the collector's win and the complete screen
pub const COLLECTOR_WIN_DELAY_MS: f64 = 1200.0;
/// How long the runner's portal overlay shows before moving on
pub const PORTAL_OVERLAY_MS: f64 = 2500.0;
/// Timer turns red at or below this many seconds
pub const TIMER_WARNING_SECS: u32 = 15;

/// A button press the app understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click {
    Start,
    /// Anywhere on the opening dialog
    Dialog,
    DialogStart,
    IntroContinue,
    CompleteContinue,
    Retry,
    QuizOption(usize),
    Candle(usize),
    MusicToggle,
}

/// Page selector for `child` inside `screen`'s container
fn sel(screen: Screen, child: &str) -> String {
    format!("#{} {child}", screen.element_id())
}

fn is_intro(screen: Screen) -> bool {
    matches!(screen, Screen::World1Intro | Screen::World2Intro | Screen::World3Intro)
}

fn indexed(screen: Screen, class: &str, index: usize) -> String {
    sel(screen, &format!(".{class}[data-index=\"{index}\"]"))
}

/// Per-screen scripted state
enum Script {
    None,
    Opening { dialog: OpeningDialog, shown_step: Option<usize> },
    Text(Typewriter),
    Quiz { quiz: Quiz, shown_question: Option<usize> },
    Celebration(Celebration),
}

/// Follow-up after a mini-game win
#[derive(Debug, Clone, Copy, PartialEq)]
struct Deferred {
    at: f64,
    next: Screen,
    hide_portal: bool,
}

/// HUD values copied out of the active controller
enum Hud {
    Collector {
        berries: String,
        seconds: u32,
    },
    Runner {
        dodged: String,
        lives: u32,
        max_lives: u32,
    },
    None,
}

impl Hud {
    fn of(controller: &Controller) -> Self {
        match controller {
            Controller::Collector(c) => Hud::Collector {
                berries: format!(
                    "{}/{} (Level {}/{})",
                    c.collected,
                    c.level_tuning().target,
                    c.level + 1,
                    c.level_count()
                ),
                seconds: c.seconds_left(),
            },
            Controller::Runner(r) => Hud::Runner {
                dodged: format!("{}/{}", r.dodged, r.total),
                lives: r.lives,
                max_lives: r.tuning.lives,
            },
            Controller::Maze(_) => Hud::None,
        }
    }
}

/// Remembers what was written to the page so unchanged values are skipped
#[derive(Default)]
struct PageCache {
    written: HashMap<String, String>,
}

impl PageCache {
    fn text(&mut self, page: &mut impl TextSink, selector: &str, text: &str) {
        let key = format!("text {selector}");
        if self.written.get(&key).map(String::as_str) != Some(text) {
            page.set_text(selector, text);
            self.written.insert(key, text.to_string());
        }
    }

    fn class(&mut self, page: &mut impl TextSink, selector: &str, class: &str, on: bool) {
        let key = format!("class {selector} {class}");
        let value = if on { "1" } else { "0" };
        if self.written.get(&key).map(String::as_str) != Some(value) {
            page.set_class(selector, class, on);
            self.written.insert(key, value.to_string());
        }
    }

    fn visible(&mut self, page: &mut impl TextSink, selector: &str, visible: bool) {
        let key = format!("visible {selector}");
        let value = if visible { "1" } else { "0" };
        if self.written.get(&key).map(String::as_str) != Some(value) {
            page.set_visible(selector, visible);
            self.written.insert(key, value.to_string());
        }
    }

    fn items(&mut self, page: &mut impl TextSink, selector: &str, items: &[Item]) {
        page.clear_items(selector);
        for item in items {
            page.append_item(selector, item);
        }
        // Generated children are new elements; forget the whole screen
        let scope = selector.split(' ').next().unwrap_or(selector);
        self.written.retain(|k, _| !k.contains(scope));
    }
}

pub struct App<P: Platform, A: AudioSink> {
    platform: P,
    audio: A,
    tuning: Tuning,
    settings: Settings,
    flow: FlowMachine,
    scheduler: Scheduler<P::Surface>,
    seed: u64,
    last_ms: Option<f64>,
    script: Script,
    deferred: Option<Deferred>,
    /// Session whose outcome was already acted on
    handled: Option<u64>,
    page: PageCache,
}

impl<P: Platform, A: AudioSink> App<P, A> {
    pub fn new(mut platform: P, mut audio: A, tuning: Tuning, settings: Settings, seed: u64) -> Self {
        let flow = FlowMachine::new(&mut platform);
        audio.set_gains(settings.sfx_gain(), settings.music_gain());
        audio.play_music(MusicTrack::Title);
        let mut app = Self {
            platform,
            audio,
            tuning,
            settings,
            flow,
            scheduler: Scheduler::new(),
            seed,
            last_ms: None,
            script: Script::None,
            deferred: None,
            handled: None,
            page: PageCache::default(),
        };
        app.update_mute_button();
        log::info!("Birthday adventure ready for {}", app.tuning.player_name);
        app
    }

    pub fn current(&self) -> Screen {
        self.flow.current()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn scheduler(&self) -> &Scheduler<P::Surface> {
        &self.scheduler
    }

    /// Mutable access to the running mini-game, for hosts that feed input
    /// directly
    pub fn scheduler_mut(&mut self) -> &mut Scheduler<P::Surface> {
        &mut self.scheduler
    }

    /// Move to `next`. The active session stops right away, so its
    /// listeners are gone before anything else starts. A game screen whose
    /// canvas is missing is never left for.
    fn go(&mut self, next: Screen, now_ms: f64) {
        if let Some(kind) = next.controller() {
            let canvas = renderer::canvas_id(kind);
            if !self.platform.has_canvas(canvas) {
                log::error!("Staying on {:?}: canvas #{canvas} not found", self.flow.current());
                return;
            }
        }
        match self.flow.transition(next, now_ms, &mut self.platform) {
            Ok(()) => {
                self.scheduler.stop();
                self.deferred = None;
            }
            Err(e) => log::warn!("Transition to {next:?} rejected: {e}"),
        }
    }

    pub fn click(&mut self, click: Click, now_ms: f64) {
        if click == Click::MusicToggle {
            self.settings.toggle_mute();
            self.audio.set_gains(self.settings.sfx_gain(), self.settings.music_gain());
            self.update_mute_button();
            return;
        }
        if !self.flow.accepts_input(now_ms) {
            log::debug!("Ignoring {click:?} during transition");
            return;
        }

        let screen = self.flow.current();
        match (screen, click) {
            (Screen::Start, Click::Start) => {
                self.audio.play_sfx(SoundEffect::Click);
                self.go(Screen::Opening, now_ms);
            }
            (Screen::Opening, Click::Dialog) => {
                if let Script::Opening { dialog, .. } = &mut self.script {
                    dialog.advance();
                }
            }
            (Screen::Opening, Click::DialogStart) => {
                let ready = match &self.script {
                    Script::Opening { dialog, .. } => dialog.view().is_some_and(|v| v.start_button),
                    _ => false,
                };
                if ready {
                    self.audio.play_sfx(SoundEffect::Click);
                    self.go(Screen::World1Intro, now_ms);
                }
            }
            (_, Click::IntroContinue | Click::CompleteContinue) if screen.world().is_some() => {
                let Script::Text(tw) = &mut self.script else {
                    return;
                };
                if tw.is_done() {
                    if let Some(next) = screen.next() {
                        self.audio.play_sfx(SoundEffect::Click);
                        self.go(next, now_ms);
                    }
                } else {
                    tw.skip();
                }
            }
            (Screen::World1Game | Screen::World2Game, Click::Retry) => self.retry(now_ms),
            (Screen::World3Game, Click::QuizOption(i)) => {
                let Script::Quiz { quiz, .. } = &mut self.script else {
                    return;
                };
                match quiz.answer(i) {
                    Some(true) => self.audio.play_sfx(SoundEffect::Correct),
                    Some(false) => self.audio.play_sfx(SoundEffect::Wrong),
                    None => {}
                }
            }
            (Screen::Celebration, Click::Candle(i)) => {
                let Script::Celebration(celebration) = &mut self.script else {
                    return;
                };
                if celebration.blow(i) {
                    self.audio.play_sfx(SoundEffect::Blow);
                    self.platform.set_class(&format!("#flame-{i}"), "out", true);
                    self.platform.set_class(&format!("#smoke-{i}"), "active", true);
                }
            }
            _ => log::debug!("{click:?} has no effect on {screen:?}"),
        }
    }

    /// Advance everything to `now_ms`
    pub fn frame(&mut self, now_ms: f64) {
        let dt = self.last_ms.map_or(0.0, |last| (now_ms - last).max(0.0));
        self.last_ms = Some(now_ms);

        if let Some(entered) = self.flow.settle(now_ms, &mut self.platform) {
            self.enter(entered, now_ms);
        }

        if let Some(d) = self.deferred {
            if now_ms >= d.at {
                self.deferred = None;
                if d.hide_portal {
                    let overlay = sel(self.flow.current(), ".portal-overlay");
                    self.page.class(&mut self.platform, &overlay, "active", false);
                }
                self.go(d.next, now_ms);
            }
        }

        self.run_session(now_ms);
        self.run_script(dt, now_ms);
        self.audio.update();
    }

    fn enter(&mut self, screen: Screen, now_ms: f64) {
        if let Some(track) = screen.music() {
            self.audio.play_music(track);
        }

        self.script = match screen {
            Screen::Opening => {
                let name = sel(screen, ".name-text");
                self.page.text(&mut self.platform, &name, &self.tuning.player_name);
                Script::Opening {
                    dialog: OpeningDialog::new(self.tuning.opening.clone()),
                    shown_step: None,
                }
            }
            Screen::World1Intro | Screen::World2Intro | Screen::World3Intro => {
                let text = self.world_text(screen, |w| &w.intro);
                self.page.visible(&mut self.platform, &sel(screen, ".intro-btn"), false);
                Script::Text(Typewriter::new(&text, INTRO_MS_PER_CHAR))
            }
            Screen::World1Complete | Screen::World2Complete | Screen::World3Complete => {
                if screen != Screen::World3Complete {
                    self.audio.play_sfx(SoundEffect::Victory);
                }
                let text = self.world_text(screen, |w| &w.complete);
                self.page.visible(&mut self.platform, &sel(screen, ".complete-btn"), false);
                Script::Text(Typewriter::new(&text, INTRO_MS_PER_CHAR))
            }
            Screen::World3Game => {
                let quiz = Quiz::new(self.tuning.quiz.clone());
                let dots = vec![Item::new("progress-dot", ""); quiz.total()];
                self.page.items(&mut self.platform, &sel(screen, ".quiz-progress"), &dots);
                Script::Quiz {
                    quiz,
                    shown_question: None,
                }
            }
            Screen::Celebration => self.start_celebration(),
            _ => Script::None,
        };

        if let Some(kind) = screen.controller() {
            self.start_session(kind, now_ms);
        }
    }

    fn world_text(&self, screen: Screen, pick: impl Fn(&crate::tuning::WorldText) -> &String) -> String {
        screen
            .world()
            .and_then(|n| self.tuning.worlds.get(n - 1))
            .map(|w| pick(w).clone())
            .unwrap_or_default()
    }

    fn start_celebration(&mut self) -> Script {
        let screen = Screen::Celebration;
        let seed = self.next_seed();
        let mut celebration = Celebration::new(&self.tuning.celebration, seed);

        let chars: Vec<Item> = CAST
            .iter()
            .map(|name| Item::new(&format!("celeb-char char-{name}"), ""))
            .collect();
        self.page
            .items(&mut self.platform, &sel(screen, ".celebration-characters"), &chars);

        let stars: Vec<Item> = celebration
            .star_field()
            .into_iter()
            .map(|style| Item::styled("star", style))
            .collect();
        self.page.items(&mut self.platform, &sel(screen, ".celebration-stars"), &stars);

        for child in [".confetti-container", ".birthday-message"] {
            self.page.items(&mut self.platform, &sel(screen, child), &[]);
        }
        for hidden in [
            ".celebration-cake",
            ".blow-prompt",
            ".happy-birthday-text",
            ".celebration-credits",
        ] {
            self.page.visible(&mut self.platform, &sel(screen, hidden), false);
        }
        Script::Celebration(celebration)
    }

    fn next_seed(&mut self) -> u64 {
        self.seed = self.seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.seed
    }

    /// Stop whatever runs and start `kind`. If the canvas exists but can't
    /// be claimed the screen stays up without a mini-game.
    fn start_session(&mut self, kind: ControllerKind, now_ms: f64) {
        let seed = self.next_seed();
        let platform = &mut self.platform;
        let started = self.scheduler.start(kind, &self.tuning, seed, now_ms, |input| {
            platform.acquire(renderer::canvas_id(kind), input)
        });
        match started {
            Ok(session) => {
                let hud = Hud::of(&session.controller);
                let screen = self.flow.current();
                self.page
                    .class(&mut self.platform, &sel(screen, ".retry-overlay"), "active", false);
                self.write_hud(screen, hud);
            }
            Err(e) => log::error!("Could not start {kind:?}: {e}"),
        }
    }

    fn retry(&mut self, now_ms: f64) {
        let Some(kind) = self.scheduler.active().map(|s| s.kind) else {
            return;
        };
        let failed = self
            .scheduler
            .active()
            .and_then(|s| s.controller.outcome())
            .is_some_and(|o| !o.is_success());
        if failed {
            self.audio.play_sfx(SoundEffect::Click);
            self.start_session(kind, now_ms);
        }
    }

    fn run_session(&mut self, now_ms: f64) {
        let settings = &self.settings;
        let Some(session) = self.scheduler.active_mut() else {
            return;
        };
        let frame = session.frame(now_ms);
        renderer::draw(&session.controller, &mut session.resources, settings);
        if settings.debug {
            let fps = session.fps();
            renderer::draw_fps(&mut session.resources, fps);
        }

        let id = session.id;
        let hud_changed = frame.events.contains(&GameEvent::HudChanged);
        let hud = Hud::of(&session.controller);
        let failure = session.controller.failure_text();
        let screen = self.flow.current();

        for event in &frame.events {
            if let GameEvent::Sfx(effect) = event {
                self.audio.play_sfx(*effect);
            }
        }
        if hud_changed || matches!(hud, Hud::Collector { .. }) {
            self.write_hud(screen, hud);
        }

        if let Some(outcome) = frame.outcome {
            if self.handled != Some(id) {
                self.handled = Some(id);
                self.finish(screen, outcome, failure, now_ms);
            }
        }
    }

    fn finish(&mut self, screen: Screen, outcome: Outcome, failure: Option<String>, now_ms: f64) {
        log::info!("{screen:?} finished: {outcome:?}");
        let Some(next) = screen.next() else {
            return;
        };
        match outcome {
            Outcome::Won if screen == Screen::World2Game => {
                self.page
                    .class(&mut self.platform, &sel(screen, ".portal-overlay"), "active", true);
                self.deferred = Some(Deferred {
                    at: now_ms + PORTAL_OVERLAY_MS,
                    next,
                    hide_portal: true,
                });
            }
            Outcome::Won => {
                self.deferred = Some(Deferred {
                    at: now_ms + COLLECTOR_WIN_DELAY_MS,
                    next,
                    hide_portal: false,
                });
            }
            Outcome::Done => self.go(next, now_ms),
            Outcome::TimedOut | Outcome::GameOver => {
                let text = failure.unwrap_or_default();
                self.page.text(&mut self.platform, &sel(screen, ".retry-text"), &text);
                self.page
                    .class(&mut self.platform, &sel(screen, ".retry-overlay"), "active", true);
            }
        }
    }

    fn write_hud(&mut self, screen: Screen, hud: Hud) {
        let page = &mut self.platform;
        match hud {
            Hud::Collector { berries, seconds } => {
                self.page.text(page, &sel(screen, ".hud-berries"), &berries);
                let timer = sel(screen, ".hud-timer");
                self.page.text(page, &timer, &format!("{seconds}s"));
                self.page.class(page, &timer, "warning", seconds <= TIMER_WARNING_SECS);
            }
            Hud::Runner {
                dodged,
                lives,
                max_lives,
            } => {
                self.page.text(page, &sel(screen, ".hud-obstacles"), &dodged);
                let hearts = "❤️".repeat(lives as usize) + &"🖤".repeat(max_lives.saturating_sub(lives) as usize);
                self.page.text(page, &sel(screen, ".hud-lives"), &hearts);
            }
            Hud::None => {}
        }
    }

    fn update_mute_button(&mut self) {
        let label = if self.settings.muted { "🔇" } else { "🔊" };
        self.page.text(&mut self.platform, "#music-toggle", label);
    }

    fn run_script(&mut self, dt: f64, now_ms: f64) {
        let screen = self.flow.current();
        let page = &mut self.platform;
        let cache = &mut self.page;
        let mut next = None;

        match &mut self.script {
            Script::None => {}
            Script::Opening { dialog, shown_step } => {
                dialog.update(dt);
                if *shown_step != Some(dialog.step_index()) {
                    let bg = sel(screen, ".opening-bg");
                    if let Some(prev) = shown_step.and_then(|i| self.tuning.opening.get(i)) {
                        page.set_class(&bg, &format!("bg-{}", prev.background), false);
                    }
                    if let Some(view) = dialog.view() {
                        page.set_class(&bg, &format!("bg-{}", view.background), true);
                        let chars: Vec<Item> = view
                            .characters
                            .iter()
                            .map(|c| Item::new(&format!("opening-char char-{c}"), ""))
                            .collect();
                        cache.items(page, &sel(screen, ".opening-characters"), &chars);
                    }
                    *shown_step = Some(dialog.step_index());
                }
                if let Some(view) = dialog.view() {
                    cache.text(page, &sel(screen, ".opening-text"), &view.lines.join("\n"));
                    cache.visible(page, &sel(screen, ".opening-world-map"), view.show_map);
                    cache.class(page, &format!("#{}", screen.element_id()), "funny", view.funny_moment);
                    cache.visible(page, &sel(screen, ".opening-name-reveal"), view.name_revealed);
                    cache.visible(page, &sel(screen, ".opening-indicator"), view.indicator);
                    cache.visible(page, &sel(screen, ".opening-start-btn"), view.start_button);
                }
            }
            Script::Text(tw) => {
                tw.advance(dt);
                let (text, button) = if is_intro(screen) {
                    (".intro-text", ".intro-btn")
                } else {
                    (".complete-text", ".complete-btn")
                };
                cache.text(page, &sel(screen, text), tw.visible());
                cache.visible(page, &sel(screen, button), tw.is_done());
            }
            Script::Quiz { quiz, shown_question } => {
                let event = quiz.update(dt);
                match quiz.phase() {
                    QuizPhase::Asking | QuizPhase::Answered { .. } => {
                        if *shown_question != Some(quiz.index()) {
                            *shown_question = Some(quiz.index());
                            if let Some(q) = quiz.question() {
                                let options: Vec<Item> =
                                    q.options.iter().map(|o| Item::new("quiz-option", o)).collect();
                                cache.items(page, &sel(screen, ".quiz-options"), &options);
                                cache.text(page, &sel(screen, ".quiz-funfact"), &q.fun_fact);
                            }
                        }
                        cache.text(page, &sel(screen, ".quiz-question"), quiz.prompt());
                        cache.class(page, &sel(screen, ".quiz-funfact"), "active", quiz.fun_fact_visible());
                        for (i, mark) in quiz.option_marks().into_iter().enumerate() {
                            let option = indexed(screen, "quiz-option", i);
                            cache.class(page, &option, "correct", mark == OptionMark::Correct);
                            cache.class(page, &option, "wrong", mark == OptionMark::Wrong);
                            cache.class(page, &option, "disabled", mark == OptionMark::Disabled);
                        }
                    }
                    QuizPhase::Score | QuizPhase::Finished => {
                        if event == Some(QuizEvent::ShowScore) {
                            cache.text(page, &sel(screen, ".quiz-question"), &quiz.score_text());
                            let rating = "⭐".repeat(usize::from(stars(quiz.score(), quiz.total())));
                            cache.items(page, &sel(screen, ".quiz-options"), &[Item::new("quiz-stars", &rating)]);
                            cache.class(page, &sel(screen, ".quiz-funfact"), "active", false);
                        }
                        if event == Some(QuizEvent::Finished) {
                            next = Some(Screen::World3Complete);
                        }
                    }
                }
                for (i, dot) in quiz.dots().into_iter().enumerate() {
                    let el = indexed(screen, "progress-dot", i);
                    cache.class(page, &el, "active", dot == Dot::Active);
                    cache.class(page, &el, "completed", dot == Dot::Completed);
                    cache.class(page, &el, "wrong", dot == Dot::Wrong);
                }
                let host = sel(screen, ".quiz-host");
                cache.class(page, &host, "happy", quiz.mood() == Mood::Happy);
                cache.class(page, &host, "comfort", quiz.mood() == Mood::Comfort);
            }
            Script::Celebration(celebration) => {
                for cue in celebration.update(dt) {
                    match cue {
                        Cue::CharacterEnters(i) => {
                            cache.class(page, &indexed(screen, "celeb-char", i), "enter", true);
                        }
                        Cue::CakeShown => cache.visible(page, &sel(screen, ".celebration-cake"), true),
                        Cue::BlowPrompt => cache.visible(page, &sel(screen, ".blow-prompt"), true),
                        Cue::Party => {
                            cache.visible(page, &sel(screen, ".blow-prompt"), false);
                            let banner = Celebration::banner(&self.tuning.player_name);
                            cache.text(page, &sel(screen, ".happy-birthday-text"), &banner);
                            cache.visible(page, &sel(screen, ".happy-birthday-text"), true);
                        }
                        Cue::Confetti(pieces) => {
                            if self.settings.particles {
                                let container = sel(screen, ".confetti-container");
                                for piece in &pieces {
                                    page.append_item(&container, &Item::styled("confetti", piece.style()));
                                }
                            }
                        }
                        Cue::MessageLine(i) => {
                            if let Some(line) = self.tuning.celebration.message.get(i) {
                                page.append_item(&sel(screen, ".birthday-message"), &Item::new("message-line", line));
                            }
                        }
                        Cue::Credits => {
                            let credits = format!("Made with love by {} 💖", self.tuning.from);
                            cache.text(page, &sel(screen, ".celebration-credits"), &credits);
                            cache.visible(page, &sel(screen, ".celebration-credits"), true);
                        }
                    }
                }
            }
        }

        if let Some(next) = next {
            self.go(next, now_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullAudio;
    use crate::flow::{ENTER_DELAY_MS, INPUT_LOCK_MS};
    use crate::platform::Headless;

    type TestApp = App<Headless, NullAudio>;

    fn app() -> TestApp {
        App::new(Headless::default(), NullAudio::default(), Tuning::default(), Settings::default(), 7)
    }

    /// Run frames at 60 Hz from `from` until `to`
    fn run(app: &mut TestApp, from: f64, to: f64) -> f64 {
        let mut t = from;
        while t < to {
            t += 1000.0 / 60.0;
            app.frame(t);
        }
        t
    }

    /// Click, then let the transition settle and the input lock expire
    fn click_through(app: &mut TestApp, click: Click, now: f64) -> f64 {
        app.click(click, now);
        run(app, now, now + INPUT_LOCK_MS.max(ENTER_DELAY_MS) + 20.0)
    }

    #[test]
    fn test_start_to_opening() {
        let mut app = app();
        app.frame(0.0);
        assert_eq!(app.current(), Screen::Start);
        assert_eq!(app.audio().current, Some(MusicTrack::Title));

        click_through(&mut app, Click::Start, 10.0);
        assert_eq!(app.current(), Screen::Opening);
        assert_eq!(app.audio().current, Some(MusicTrack::Opening));
        assert_eq!(app.audio().played, vec![SoundEffect::Click]);
        assert_eq!(app.platform().text("#screen-opening .name-text"), Some("Như"));
    }

    #[test]
    fn test_clicks_ignored_during_transition() {
        let mut app = app();
        app.frame(0.0);
        app.click(Click::Start, 10.0);
        // Second click lands while the transition is pending
        app.click(Click::Start, 20.0);
        assert_eq!(app.audio().played, vec![SoundEffect::Click]);
    }

    #[test]
    fn test_opening_dialog_to_world1_game() {
        let mut app = app();
        app.frame(0.0);
        let mut t = click_through(&mut app, Click::Start, 10.0);

        // Start button is not available until the last step
        app.click(Click::DialogStart, t);
        t = run(&mut app, t, t + 1000.0);
        assert_eq!(app.current(), Screen::Opening);

        for _ in 0..40 {
            app.click(Click::Dialog, t);
            t = run(&mut app, t, t + 50.0);
        }
        assert!(app.platform().is_shown("#screen-opening .opening-start-btn"));
        t = click_through(&mut app, Click::DialogStart, t);
        assert_eq!(app.current(), Screen::World1Intro);

        // First click finishes the typing, the second moves on
        app.click(Click::IntroContinue, t);
        assert_eq!(app.current(), Screen::World1Intro);
        t = run(&mut app, t, t + 50.0);
        assert!(app.platform().is_shown("#screen-world1-intro .intro-btn"));
        click_through(&mut app, Click::IntroContinue, t);
        assert_eq!(app.current(), Screen::World1Game);

        let session = app.scheduler().active().unwrap();
        assert_eq!(session.kind, ControllerKind::Collector);
        assert_eq!(session.resources.canvas, "world1-canvas");
        let berries = app.platform().text("#screen-world1-game .hud-berries").unwrap();
        assert!(berries.starts_with("0/"), "{berries}");
        assert!(berries.ends_with("(Level 1/3)"), "{berries}");
    }

    /// Jump straight to a screen through the flow machine and wait out
    /// the input lock
    fn enter(app: &mut TestApp, screen: Screen) -> f64 {
        app.frame(0.0);
        app.go(screen, 0.0);
        run(app, 0.0, INPUT_LOCK_MS.max(ENTER_DELAY_MS) + 20.0)
    }

    #[test]
    fn test_runner_game_over_and_retry() {
        let mut app = app();
        let mut t = enter(&mut app, Screen::World2Game);
        assert_eq!(app.scheduler().active().map(|s| s.kind), Some(ControllerKind::Runner));
        let full = "❤️".repeat(app.tuning.runner.lives as usize);
        assert_eq!(app.platform().text("#screen-world2-game .hud-lives"), Some(full.as_str()));

        // Standing still eventually runs out of lives
        let mut frames = 0;
        while !app.platform().has_class("#screen-world2-game .retry-overlay", "active") {
            t = run(&mut app, t, t + 1000.0 / 60.0);
            frames += 1;
            assert!(frames < 60 * 120, "runner never ended");
        }
        let text = app.platform().text("#screen-world2-game .retry-text").unwrap();
        assert!(text.starts_with("Oh no!"), "{text}");
        assert!(app.audio().played.contains(&SoundEffect::Hit));

        let first = app.scheduler().active().map(|s| s.id);
        app.click(Click::Retry, t);
        let second = app.scheduler().active().map(|s| s.id);
        assert_ne!(first, second);
        assert!(!app.platform().has_class("#screen-world2-game .retry-overlay", "active"));
        assert_eq!(*app.platform().released.borrow(), vec!["world2-canvas"]);
    }

    #[test]
    fn test_retry_ignored_while_running() {
        let mut app = app();
        let t = enter(&mut app, Screen::World1Game);
        let id = app.scheduler().active().map(|s| s.id);
        app.click(Click::Retry, t);
        assert_eq!(app.scheduler().active().map(|s| s.id), id);
    }

    #[test]
    fn test_leaving_a_game_releases_its_listeners() {
        let mut app = app();
        let t = enter(&mut app, Screen::Maze1);
        assert_eq!(app.scheduler().active().map(|s| s.kind), Some(ControllerKind::Maze(0)));
        app.go(Screen::World2Intro, t);
        assert!(!app.scheduler().is_running());
        assert_eq!(*app.platform().released.borrow(), vec!["maze-canvas"]);
    }

    #[test]
    fn test_missing_canvas_keeps_prior_screen() {
        let mut platform = Headless::default();
        platform.missing_canvases.insert("world1-canvas".into());
        let mut app = App::new(platform, NullAudio::default(), Tuning::default(), Settings::default(), 1);
        let mut t = enter(&mut app, Screen::World1Intro);

        app.click(Click::IntroContinue, t);
        t = run(&mut app, t, t + 50.0);
        app.click(Click::IntroContinue, t);
        run(&mut app, t, t + INPUT_LOCK_MS + 20.0);

        assert_eq!(app.current(), Screen::World1Intro);
        assert_eq!(app.flow.pending(), None);
        assert_eq!(app.platform().marked_active(), vec!["screen-world1-intro"]);
        assert!(!app.scheduler().is_running());
        assert!(app.platform().released.borrow().is_empty());
    }

    #[test]
    fn test_maze_walk_moves_to_next_world() {
        let mut app = app();
        let mut t = enter(&mut app, Screen::Maze1);
        app.audio.played.clear();

        // Teleport onto the portal and let the fade finish
        if let Some(session) = app.scheduler_mut().active_mut() {
            if let Controller::Maze(m) = &mut session.controller {
                m.player.pos = m.portal.center() - glam::Vec2::splat(16.0);
            }
        }
        t = run(&mut app, t, t + 2000.0);
        assert_eq!(app.audio().played.first(), Some(&SoundEffect::Victory));
        run(&mut app, t, t + ENTER_DELAY_MS + 20.0);
        assert_eq!(app.current(), Screen::World2Intro);
        assert!(!app.scheduler().is_running());
    }

    #[test]
    fn test_quiz_runs_to_complete_screen() {
        let mut app = app();
        let mut t = enter(&mut app, Screen::World3Game);
        let total = app.tuning.quiz.len();
        assert_eq!(app.platform().items("#screen-world3-game .quiz-progress").len(), total);

        for _ in 0..total {
            t = run(&mut app, t, t + 100.0);
            app.click(Click::QuizOption(0), t);
            t = run(&mut app, t, t + 2600.0);
        }
        let score = app.platform().text("#screen-world3-game .quiz-question").unwrap();
        assert!(score.starts_with("You got "), "{score}");
        t = run(&mut app, t, t + 3000.0 + ENTER_DELAY_MS + 50.0);
        assert_eq!(app.current(), Screen::World3Complete);
        assert_eq!(app.audio().played.len(), total);
    }

    #[test]
    fn test_celebration_candles_and_banner() {
        let mut app = app();
        let mut t = enter(&mut app, Screen::Celebration);
        assert_eq!(app.platform().items("#screen-celebration .celeb-char").len(), 0);
        assert_eq!(
            app.platform().items("#screen-celebration .celebration-characters").len(),
            CAST.len()
        );

        t = run(&mut app, t, t + 5000.0);
        assert!(app.platform().is_shown("#screen-celebration .celebration-cake"));
        for i in 0..app.tuning.celebration.candles as usize {
            app.click(Click::Candle(i), t);
            assert!(app.platform().has_class(&format!("#flame-{i}"), "out"));
        }
        app.click(Click::Candle(0), t);
        let blows = app.audio().played.iter().filter(|s| **s == SoundEffect::Blow).count();
        assert_eq!(blows, app.tuning.celebration.candles as usize);

        run(&mut app, t, t + 700.0);
        assert_eq!(
            app.platform().text("#screen-celebration .happy-birthday-text"),
            Some("HAPPY BIRTHDAY, NHƯ!!! 🎉")
        );
        assert!(!app.platform().is_shown("#screen-celebration .blow-prompt"));
        assert!(!app.platform().items("#screen-celebration .confetti-container").is_empty());
    }

    #[test]
    fn test_mute_toggle() {
        let mut app = app();
        assert_eq!(app.platform().text("#music-toggle"), Some("🔊"));
        app.click(Click::MusicToggle, 0.0);
        assert!(app.settings().muted);
        assert_eq!(app.platform().text("#music-toggle"), Some("🔇"));
    }
}
