//! Typed-out text
//!
//! [`Typewriter`] reveals a string one character at a time. It is a plain
//! resumable sequence: the caller feeds it elapsed milliseconds, reads the
//! visible prefix, and can cancel with [`Typewriter::skip`]. The opening
//! dialog chains typewriters line by line.

use crate::tuning::DialogStep;

/// Intro and complete screens
pub const INTRO_MS_PER_CHAR: f64 = 30.0;
/// Opening dialog lines
pub const DIALOG_MS_PER_CHAR: f64 = 40.0;
/// Pause between two dialog lines
pub const LINE_PAUSE_MS: f64 = 300.0;

const MAP_DELAY_MS: f64 = 500.0;
const FUNNY_DELAY_MS: f64 = 500.0;
const NAME_REVEAL_DELAY_MS: f64 = 1000.0;

/// Reveals `text` at a fixed rate
#[derive(Debug, Clone, PartialEq)]
pub struct Typewriter {
    text: String,
    /// Byte offset of the end of the visible prefix
    shown: usize,
    /// Characters revealed so far
    count: usize,
    ms_per_char: f64,
    elapsed: f64,
}

impl Typewriter {
    /// The first character shows immediately
    pub fn new(text: &str, ms_per_char: f64) -> Self {
        let mut tw = Self {
            text: text.to_string(),
            shown: 0,
            count: 0,
            ms_per_char,
            elapsed: 0.0,
        };
        tw.reveal_next();
        tw
    }

    /// Reveal one more character. Returns it, or `None` when done.
    pub fn reveal_next(&mut self) -> Option<char> {
        let c = self.text[self.shown..].chars().next()?;
        self.shown += c.len_utf8();
        self.count += 1;
        Some(c)
    }

    /// Let `dt_ms` pass. Returns whether more text became visible.
    pub fn advance(&mut self, dt_ms: f64) -> bool {
        if self.is_done() {
            return false;
        }
        self.elapsed += dt_ms.max(0.0);
        let due = (self.elapsed / self.ms_per_char).floor() as usize + 1;
        let mut changed = false;
        while self.count < due && self.reveal_next().is_some() {
            changed = true;
        }
        changed
    }

    /// Show everything now
    pub fn skip(&mut self) {
        self.shown = self.text.len();
        self.count = self.text.chars().count();
    }

    pub fn visible(&self) -> &str {
        &self.text[..self.shown]
    }

    pub fn is_done(&self) -> bool {
        self.shown >= self.text.len()
    }
}

/// What the opening screen should currently show
#[derive(Debug, Clone, PartialEq)]
pub struct DialogView<'a> {
    pub background: &'a str,
    pub characters: &'a [String],
    pub lines: Vec<&'a str>,
    pub show_map: bool,
    pub funny_moment: bool,
    pub name_revealed: bool,
    /// "Click to continue" marker
    pub indicator: bool,
    pub start_button: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum LineState {
    Typing(Typewriter),
    /// Between lines; the next one starts when this reaches zero
    Pause(f64),
    Finished,
}

/// The multi-step opening conversation
#[derive(Debug, Clone)]
pub struct OpeningDialog {
    steps: Vec<DialogStep>,
    step: usize,
    /// Lines of the current step that are fully typed
    done_lines: usize,
    line: LineState,
    /// Time since the step was shown
    step_ms: f64,
}

impl OpeningDialog {
    pub fn new(steps: Vec<DialogStep>) -> Self {
        let mut dialog = Self {
            steps,
            step: 0,
            done_lines: 0,
            line: LineState::Finished,
            step_ms: 0.0,
        };
        dialog.show_step(0);
        dialog
    }

    pub fn step_index(&self) -> usize {
        self.step
    }

    pub fn current(&self) -> Option<&DialogStep> {
        self.steps.get(self.step)
    }

    pub fn is_typing(&self) -> bool {
        self.line != LineState::Finished
    }

    fn show_step(&mut self, index: usize) {
        self.step = index;
        self.done_lines = 0;
        self.step_ms = 0.0;
        self.line = match self.steps.get(index).and_then(|s| s.lines.first()) {
            Some(first) => LineState::Typing(Typewriter::new(first, DIALOG_MS_PER_CHAR)),
            None => LineState::Finished,
        };
        log::debug!("Opening step {index}");
    }

    /// Let `dt_ms` pass
    pub fn update(&mut self, dt_ms: f64) {
        self.step_ms += dt_ms.max(0.0);
        let line_count = self.current().map_or(0, |s| s.lines.len());

        match &mut self.line {
            LineState::Typing(tw) => {
                tw.advance(dt_ms);
                if tw.is_done() {
                    self.done_lines += 1;
                    self.line = if self.done_lines < line_count {
                        LineState::Pause(LINE_PAUSE_MS)
                    } else {
                        LineState::Finished
                    };
                }
            }
            LineState::Pause(left) => {
                *left -= dt_ms;
                if *left <= 0.0 {
                    let next = self
                        .current()
                        .and_then(|s| s.lines.get(self.done_lines))
                        .map(|text| Typewriter::new(text, DIALOG_MS_PER_CHAR));
                    self.line = next.map_or(LineState::Finished, LineState::Typing);
                }
            }
            LineState::Finished => {}
        }
    }

    /// Click on the dialog. While typing, finishes the step at once;
    /// otherwise moves to the next step. Returns whether anything changed.
    pub fn advance(&mut self) -> bool {
        if self.is_typing() {
            self.done_lines = self.current().map_or(0, |s| s.lines.len());
            self.line = LineState::Finished;
            return true;
        }
        if self.step + 1 < self.steps.len() {
            self.show_step(self.step + 1);
            return true;
        }
        false
    }

    pub fn view(&self) -> Option<DialogView<'_>> {
        let step = self.current()?;
        let mut lines: Vec<&str> = step.lines.iter().take(self.done_lines).map(String::as_str).collect();
        if let LineState::Typing(tw) = &self.line {
            lines.push(tw.visible());
        }
        let finished = !self.is_typing();
        Some(DialogView {
            background: &step.background,
            characters: &step.characters,
            lines,
            show_map: step.show_map && self.step_ms >= MAP_DELAY_MS,
            funny_moment: step.funny_moment && self.step_ms >= FUNNY_DELAY_MS,
            name_revealed: step.name_reveal && self.step_ms >= NAME_REVEAL_DELAY_MS,
            indicator: finished && !step.show_start_button,
            start_button: finished && step.show_start_button,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(lines: &[&str]) -> DialogStep {
        DialogStep {
            background: "meadow".into(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            ..DialogStep::default()
        }
    }

    #[test]
    fn test_typewriter_reveals_over_time() {
        let mut tw = Typewriter::new("Hello", 30.0);
        assert_eq!(tw.visible(), "H");
        assert!(!tw.advance(29.0));
        assert!(tw.advance(1.0));
        assert_eq!(tw.visible(), "He");
        tw.advance(90.0);
        assert_eq!(tw.visible(), "Hello");
        assert!(tw.is_done());
        assert!(!tw.advance(100.0));
    }

    #[test]
    fn test_typewriter_multibyte_and_skip() {
        let mut tw = Typewriter::new("Như 🎂!", 40.0);
        tw.advance(80.0);
        assert_eq!(tw.visible(), "Như");
        tw.skip();
        assert_eq!(tw.visible(), "Như 🎂!");
        assert!(tw.is_done());
        assert_eq!(tw.reveal_next(), None);
    }

    #[test]
    fn test_empty_text_is_done() {
        let tw = Typewriter::new("", 30.0);
        assert!(tw.is_done());
        assert_eq!(tw.visible(), "");
    }

    #[test]
    fn test_lines_type_in_sequence_with_pause() {
        let mut d = OpeningDialog::new(vec![step(&["ab", "cd"])]);
        d.update(40.0);
        assert_eq!(d.view().unwrap().lines, vec!["ab"]);
        // Pause before the second line
        d.update(299.0);
        assert_eq!(d.view().unwrap().lines, vec!["ab"]);
        d.update(1.0);
        assert_eq!(d.view().unwrap().lines, vec!["ab", "c"]);
        d.update(40.0);
        assert!(!d.is_typing());
        let view = d.view().unwrap();
        assert_eq!(view.lines, vec!["ab", "cd"]);
        assert!(view.indicator);
        assert!(!view.start_button);
    }

    #[test]
    fn test_advance_skips_then_moves_on() {
        let mut d = OpeningDialog::new(vec![step(&["first line", "second"]), step(&["next"])]);
        assert!(d.advance());
        assert_eq!(d.step_index(), 0);
        assert_eq!(d.view().unwrap().lines, vec!["first line", "second"]);

        assert!(d.advance());
        assert_eq!(d.step_index(), 1);
        assert_eq!(d.view().unwrap().lines, vec!["n"]);

        d.advance();
        // Last step: nothing further
        assert!(!d.advance());
        assert_eq!(d.step_index(), 1);
    }

    #[test]
    fn test_delayed_reveals_and_start_button() {
        let mut last = step(&["Go!"]);
        last.show_start_button = true;
        last.name_reveal = true;
        last.show_map = true;
        let mut d = OpeningDialog::new(vec![last]);

        d.update(499.0);
        let view = d.view().unwrap();
        assert!(!view.show_map && !view.name_revealed);
        assert!(view.start_button);
        assert!(!view.indicator);

        d.update(1.0);
        assert!(d.view().unwrap().show_map);
        d.update(500.0);
        assert!(d.view().unwrap().name_revealed);
    }

    #[test]
    fn test_shipped_opening_ends_with_start_button() {
        let mut d = OpeningDialog::new(crate::tuning::Tuning::default().opening);
        while d.advance() {}
        assert!(d.view().unwrap().start_button);
    }
}
