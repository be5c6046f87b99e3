//! Birthday finale
//!
//! A timeline of cues: characters walk in one by one, the cake appears,
//! the player blows out the candles, then banner, confetti waves, the
//! message and the credits. [`Celebration::update`] returns the cues that
//! came due so the page can show them.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::tuning::CelebrationTuning;

/// Characters in entrance order
pub const CAST: [&str; 6] = ["nhu", "bulbasaur", "slowpoke", "psyduck", "pompompurin", "patrick"];

const FIRST_ENTRANCE_MS: f64 = 800.0;
const ENTRANCE_STAGGER_MS: f64 = 600.0;
const CAKE_AFTER_CAST_MS: f64 = 500.0;
const PROMPT_AFTER_CAKE_MS: f64 = 1200.0;
const PARTY_AFTER_LAST_CANDLE_MS: f64 = 600.0;
const CONFETTI_WAVE_MS: f64 = 3000.0;
const MESSAGE_AFTER_PARTY_MS: f64 = 1500.0;
const MESSAGE_LINE_MS: f64 = 1200.0;
const CREDITS_EXTRA_MS: f64 = 3000.0;

const STAR_COUNT: usize = 40;

const CONFETTI_COLORS: [&str; 8] = [
    "#ff6b6b", "#feca57", "#48dbfb", "#ff9ff3", "#54a0ff", "#5f27cd", "#00d2d3", "#ff9f43",
];

/// One confetti piece, described for a CSS fall animation
#[derive(Debug, Clone, PartialEq)]
pub struct ConfettiPiece {
    /// Horizontal start, percent of the screen width
    pub left_pct: f32,
    pub delay_s: f32,
    pub duration_s: f32,
    pub rotation_deg: f32,
    pub drift_px: f32,
    pub color: &'static str,
    pub width: f32,
    pub height: f32,
    pub round: bool,
}

impl ConfettiPiece {
    /// Inline CSS driving the fall animation
    pub fn style(&self) -> String {
        format!(
            "left:{:.1}%;width:{:.0}px;height:{:.0}px;background:{};border-radius:{};\
             animation-delay:{:.2}s;animation-duration:{:.2}s;--rot:{:.0}deg;--drift:{:.0}px",
            self.left_pct,
            self.width,
            self.height,
            self.color,
            if self.round { "50%" } else { "2px" },
            self.delay_s,
            self.duration_s,
            self.rotation_deg,
            self.drift_px,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    CharacterEnters(usize),
    CakeShown,
    BlowPrompt,
    /// Banner up, blow prompt gone
    Party,
    Confetti(Vec<ConfettiPiece>),
    MessageLine(usize),
    Credits,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Enter(usize),
    Cake,
    Prompt,
    Party,
    Wave(u32),
    Line(usize),
    Credits,
}

pub struct Celebration {
    tuning: CelebrationTuning,
    elapsed: f64,
    /// Scheduled cues, kept sorted by time
    timeline: Vec<(f64, Pending)>,
    cake_visible: bool,
    blown: Vec<bool>,
    rng: Pcg32,
}

impl Celebration {
    pub fn new(tuning: &CelebrationTuning, seed: u64) -> Self {
        let mut timeline: Vec<(f64, Pending)> = (0..CAST.len())
            .map(|i| (FIRST_ENTRANCE_MS + i as f64 * ENTRANCE_STAGGER_MS, Pending::Enter(i)))
            .collect();
        let cake_at = FIRST_ENTRANCE_MS + CAST.len() as f64 * ENTRANCE_STAGGER_MS + CAKE_AFTER_CAST_MS;
        timeline.push((cake_at, Pending::Cake));
        timeline.push((cake_at + PROMPT_AFTER_CAKE_MS, Pending::Prompt));

        Self {
            tuning: tuning.clone(),
            elapsed: 0.0,
            timeline,
            cake_visible: false,
            blown: vec![false; tuning.candles as usize],
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed
    }

    pub fn candles_blown(&self) -> usize {
        self.blown.iter().filter(|b| **b).count()
    }

    /// Banner text once all candles are out
    pub fn banner(name: &str) -> String {
        format!("HAPPY BIRTHDAY, {}!!! 🎉", name.to_uppercase())
    }

    fn schedule(&mut self, at: f64, cue: Pending) {
        let i = self.timeline.partition_point(|(t, _)| *t <= at);
        self.timeline.insert(i, (at, cue));
    }

    /// Blow out a candle. Returns `false` if it was already out, doesn't
    /// exist, or the cake isn't on screen yet.
    pub fn blow(&mut self, candle: usize) -> bool {
        if !self.cake_visible {
            return false;
        }
        match self.blown.get_mut(candle) {
            Some(b) if !*b => *b = true,
            _ => return false,
        }
        if self.blown.iter().all(|b| *b) {
            log::info!("All candles blown");
            self.schedule(self.elapsed + PARTY_AFTER_LAST_CANDLE_MS, Pending::Party);
        }
        true
    }

    /// Let `dt_ms` pass and return the cues that came due, in order
    pub fn update(&mut self, dt_ms: f64) -> Vec<Cue> {
        self.elapsed += dt_ms.max(0.0);
        let due = self.timeline.partition_point(|(t, _)| *t <= self.elapsed);
        let fired: Vec<(f64, Pending)> = self.timeline.drain(..due).collect();

        let mut cues = Vec::with_capacity(fired.len());
        for (at, pending) in fired {
            let cue = match pending {
                Pending::Enter(i) => Cue::CharacterEnters(i),
                Pending::Cake => {
                    self.cake_visible = true;
                    Cue::CakeShown
                }
                Pending::Prompt => Cue::BlowPrompt,
                Pending::Party => {
                    self.schedule(at, Pending::Wave(0));
                    for i in 0..self.tuning.message.len() {
                        let line_at = at + MESSAGE_AFTER_PARTY_MS + i as f64 * MESSAGE_LINE_MS;
                        self.schedule(line_at, Pending::Line(i));
                    }
                    let credits_at = at + self.tuning.message.len() as f64 * MESSAGE_LINE_MS + CREDITS_EXTRA_MS;
                    self.schedule(credits_at, Pending::Credits);
                    cues.push(Cue::Party);
                    // Cues scheduled at `at` itself fire on this call too
                    let more = self.update(0.0);
                    cues.extend(more);
                    continue;
                }
                Pending::Wave(n) => {
                    if n + 1 < self.tuning.confetti_waves {
                        self.schedule(at + CONFETTI_WAVE_MS, Pending::Wave(n + 1));
                    }
                    Cue::Confetti(self.confetti_wave())
                }
                Pending::Line(i) => Cue::MessageLine(i),
                Pending::Credits => Cue::Credits,
            };
            cues.push(cue);
        }
        cues
    }

    /// Inline styles for the twinkling star backdrop
    pub fn star_field(&mut self) -> Vec<String> {
        let rng = &mut self.rng;
        (0..STAR_COUNT)
            .map(|_| {
                format!(
                    "left:{:.1}%;top:{:.1}%;animation-delay:{:.2}s",
                    rng.random_range(0.0..100.0f32),
                    rng.random_range(0.0..60.0f32),
                    rng.random_range(0.0..3.0f32),
                )
            })
            .collect()
    }

    fn confetti_wave(&mut self) -> Vec<ConfettiPiece> {
        let rng = &mut self.rng;
        (0..self.tuning.confetti_per_wave)
            .map(|_| ConfettiPiece {
                left_pct: rng.random_range(0.0..100.0),
                delay_s: rng.random_range(0.0..1.0),
                duration_s: rng.random_range(2.0..5.0),
                rotation_deg: rng.random_range(0.0..720.0),
                drift_px: rng.random_range(-60.0..60.0),
                color: CONFETTI_COLORS[rng.random_range(0..CONFETTI_COLORS.len())],
                width: rng.random_range(6.0..14.0),
                height: rng.random_range(6.0..14.0),
                round: rng.random_bool(0.5),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(c: &mut Celebration, until_ms: f64) -> Vec<Cue> {
        let mut cues = Vec::new();
        while c.elapsed_ms() < until_ms {
            cues.extend(c.update(100.0));
        }
        cues
    }

    fn tuning() -> CelebrationTuning {
        CelebrationTuning {
            candles: 3,
            confetti_per_wave: 4,
            confetti_waves: 5,
            message: vec!["a".into(), "b".into()],
        }
    }

    #[test]
    fn test_intro_sequence() {
        let mut c = Celebration::new(&tuning(), 1);
        assert!(c.update(799.0).is_empty());
        assert_eq!(c.update(1.0), vec![Cue::CharacterEnters(0)]);

        let cues = run(&mut c, 6100.0);
        assert_eq!(cues.iter().filter(|c| matches!(c, Cue::CharacterEnters(_))).count(), 5);
        let cake = cues.iter().position(|c| *c == Cue::CakeShown).unwrap();
        let prompt = cues.iter().position(|c| *c == Cue::BlowPrompt).unwrap();
        assert!(cake < prompt);
    }

    #[test]
    fn test_candles_blow_once_and_only_with_cake() {
        let mut c = Celebration::new(&tuning(), 1);
        assert!(!c.blow(0));
        run(&mut c, 5000.0);
        assert!(c.blow(0));
        assert!(!c.blow(0));
        assert!(!c.blow(3));
        assert_eq!(c.candles_blown(), 1);
    }

    #[test]
    fn test_party_after_last_candle() {
        let mut c = Celebration::new(&tuning(), 1);
        run(&mut c, 5000.0);
        for i in 0..3 {
            assert!(c.blow(i));
        }
        assert!(c.update(599.0).iter().all(|cue| *cue != Cue::Party));
        let cues = c.update(1.0);
        assert_eq!(cues[0], Cue::Party);
        assert!(matches!(&cues[1], Cue::Confetti(p) if p.len() == 4));

        // Waves every 3 s, five in total; lines 1.2 s apart after 1.5 s;
        // credits after 2 * 1.2 + 3 s
        let until = c.elapsed_ms() + 20_000.0;
        let later = run(&mut c, until);
        let waves = later.iter().filter(|c| matches!(c, Cue::Confetti(_))).count();
        assert_eq!(waves, 4);
        assert_eq!(
            later
                .iter()
                .filter(|c| matches!(c, Cue::MessageLine(_) | Cue::Credits))
                .collect::<Vec<_>>(),
            vec![&Cue::MessageLine(0), &Cue::MessageLine(1), &Cue::Credits]
        );
    }

    #[test]
    fn test_confetti_style_and_star_field() {
        let mut c = Celebration::new(&tuning(), 4);
        let piece = &c.confetti_wave()[0];
        let style = piece.style();
        assert!(style.starts_with("left:"));
        assert!(style.contains(piece.color));
        assert_eq!(c.star_field().len(), 40);
    }

    #[test]
    fn test_banner_text() {
        assert_eq!(Celebration::banner("Như"), "HAPPY BIRTHDAY, NHƯ!!! 🎉");
    }
}
