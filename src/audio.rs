//! Sound effects and background music
//!
//! Procedurally generated chiptune - no external files needed! Each effect
//! and track is a short table of notes; the web build plays them through
//! Web Audio oscillators, everything else goes through [`AudioSink`].

use serde::{Deserialize, Serialize};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEffect {
    /// UI button press
    Click,
    Jump,
    /// Runner took a hit
    Hit,
    /// Berry picked up
    Collect,
    /// Level cleared / portal reached
    Victory,
    /// Quiz answer right
    Correct,
    /// Quiz answer wrong
    Wrong,
    /// Candle blown out
    Blow,
}

/// Looping background tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MusicTrack {
    Title,
    Opening,
    World1,
    World2,
    World3,
    Celebration,
}

impl MusicTrack {
    pub fn name(self) -> &'static str {
        match self {
            MusicTrack::Title => "title",
            MusicTrack::Opening => "opening",
            MusicTrack::World1 => "world1",
            MusicTrack::World2 => "world2",
            MusicTrack::World3 => "world3",
            MusicTrack::Celebration => "celebration",
        }
    }
}

/// Instrument a note is played on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    /// Two detuned squares
    Lead,
    /// Warm triangle
    Bass,
    /// Three detuned sines
    Pad,
    /// Short plucky square
    Arp,
    /// Soft triangle lead
    Bell,
    /// Square sweeping up an octave and a bit
    Chirp,
    Kick,
    Snare,
    Hihat,
}

/// One scheduled note. Times are seconds from the start of the pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub voice: Voice,
    /// Hz; unused by drums
    pub freq: f32,
    pub at: f64,
    pub dur: f64,
    pub vol: f32,
}

/// Frequency of a note name such as `"C4"`, `"F#4"` or `"Bb3"`
pub fn note_freq(name: &str) -> Option<f32> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    let base = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let (shift, octave) = match rest.chars().next()? {
        '#' => (1, &rest[1..]),
        'b' => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i32 = octave.parse().ok()?;
    let midi = (octave + 1) * 12 + base + shift;
    Some(440.0 * 2f32.powf((midi - 69) as f32 / 12.0))
}

/// A loopable sequence of notes
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub events: Vec<NoteEvent>,
    /// Seconds until the pattern repeats
    pub length: f64,
}

/// Helper for writing patterns in beats
struct Score {
    beat: f64,
    events: Vec<NoteEvent>,
}

impl Score {
    fn new(bpm: f64) -> Self {
        Self {
            beat: 60.0 / bpm,
            events: Vec::new(),
        }
    }

    fn push(&mut self, voice: Voice, note: &str, at: f64, beats: f64, vol: f32) {
        let Some(freq) = note_freq(note) else {
            log::warn!("Unknown note {note:?}");
            return;
        };
        self.events.push(NoteEvent {
            voice,
            freq,
            at: at * self.beat,
            dur: beats * self.beat,
            vol,
        });
    }

    /// Notes back to back, each held for `gate` of its length
    fn melody(&mut self, voice: Voice, notes: &[(&str, f64)], gate: f64, vol: f32) {
        let mut at = 0.0;
        for &(note, beats) in notes {
            self.push(voice, note, at, beats * gate, vol);
            at += beats;
        }
    }

    /// Evenly spaced notes starting at `from`
    fn line(&mut self, voice: Voice, notes: &[&str], from: f64, every: f64, beats: f64, vol: f32) {
        for (i, note) in notes.iter().enumerate() {
            self.push(voice, note, from + i as f64 * every, beats, vol);
        }
    }

    fn drum(&mut self, voice: Voice, at: f64, vol: f32) {
        self.events.push(NoteEvent {
            voice,
            freq: 0.0,
            at: at * self.beat,
            dur: 0.15,
            vol,
        });
    }

    fn finish(self, loop_beats: f64) -> Pattern {
        Pattern {
            length: loop_beats * self.beat,
            events: self.events,
        }
    }
}

impl MusicTrack {
    pub fn pattern(self) -> Pattern {
        match self {
            MusicTrack::Title => {
                let mut s = Score::new(95.0);
                s.line(
                    Voice::Arp,
                    &["E4", "G4", "B4", "E5", "B4", "G4", "D5", "G4", "B4", "D5", "B4", "G4", "C5", "E4", "G4", "C5"],
                    0.0,
                    0.5,
                    0.25,
                    0.04,
                );
                s.push(Voice::Pad, "E3", 0.0, 4.0, 0.03);
                s.push(Voice::Pad, "G3", 4.0, 4.0, 0.03);
                s.finish(8.0)
            }
            MusicTrack::Opening => {
                let mut s = Score::new(108.0);
                s.melody(
                    Voice::Lead,
                    &[
                        ("C4", 1.0), ("E4", 1.0), ("G4", 1.0), ("C5", 1.0), ("B4", 0.5), ("A4", 0.5), ("G4", 1.0), ("E4", 1.0),
                        ("F4", 1.0), ("A4", 1.0), ("C5", 1.0), ("A4", 1.0), ("G4", 0.5), ("F4", 0.5), ("E4", 1.0), ("D4", 1.0),
                    ],
                    0.9,
                    0.06,
                );
                s.line(Voice::Bass, &["C3", "C3", "F3", "F3", "G3", "G3", "C3", "G3"], 0.0, 2.0, 1.8, 0.12);
                for i in 0..8 {
                    s.drum(Voice::Kick, i as f64 * 2.0, 0.06);
                    s.drum(Voice::Hihat, i as f64 * 2.0 + 1.0, 0.02);
                }
                s.finish(16.0)
            }
            MusicTrack::World1 => {
                let mut s = Score::new(138.0);
                let eighths = [
                    "G4", "A4", "B4", "D5", "B4", "A4", "G4", "E4", "F#4", "A4", "D5", "A4", "B4", "G4", "A4", "B4",
                    "C5", "D5", "E5", "C5", "D5", "B4", "A4", "G4", "E4", "G4", "A4", "B4",
                ];
                let mut notes: Vec<(&str, f64)> = eighths.iter().map(|n| (*n, 0.5)).collect();
                notes.extend([("G4", 1.0), ("G4", 0.5), ("A4", 0.5)]);
                s.melody(Voice::Lead, &notes, 0.85, 0.055);
                s.line(
                    Voice::Bass,
                    &["G3", "G3", "C4", "C4", "D4", "D4", "G3", "G3", "C4", "C4", "E3", "E3", "D3", "D3", "G3", "G3"],
                    0.0,
                    1.0,
                    0.9,
                    0.1,
                );
                for i in 0..16 {
                    let voice = if i % 2 == 0 { Voice::Kick } else { Voice::Snare };
                    s.drum(voice, i as f64, if i % 2 == 0 { 0.1 } else { 0.05 });
                }
                for i in 0..32 {
                    s.drum(Voice::Hihat, i as f64 * 0.5, 0.02);
                }
                s.finish(16.0)
            }
            MusicTrack::World2 => {
                let mut s = Score::new(155.0);
                s.melody(
                    Voice::Lead,
                    &[
                        ("A4", 0.5), ("C5", 0.5), ("E5", 0.5), ("A4", 0.5), ("C5", 0.5), ("D5", 0.5), ("E5", 0.5), ("D5", 0.5),
                        ("C5", 0.5), ("A4", 0.5), ("G4", 0.5), ("A4", 0.5), ("C5", 1.0), ("A4", 0.5), ("G4", 0.5),
                        ("F4", 0.5), ("A4", 0.5), ("C5", 0.5), ("F4", 0.5), ("G4", 0.5), ("A4", 0.5), ("G4", 0.5), ("E4", 0.5),
                        ("A4", 0.5), ("C5", 0.5), ("D5", 0.5), ("E5", 0.5), ("D5", 0.5), ("C5", 0.5), ("A4", 0.5), ("A4", 0.5),
                    ],
                    0.8,
                    0.06,
                );
                s.line(
                    Voice::Bass,
                    &["A3", "A3", "A3", "A3", "F3", "F3", "F3", "F3", "G3", "G3", "G3", "G3", "A3", "A3", "E3", "E3"],
                    0.0,
                    1.0,
                    0.9,
                    0.1,
                );
                for i in 0..32 {
                    let at = i as f64 * 0.5;
                    match i % 4 {
                        0 => s.drum(Voice::Kick, at, 0.12),
                        2 => s.drum(Voice::Snare, at, 0.06),
                        _ => {}
                    }
                    s.drum(Voice::Hihat, at, 0.025);
                }
                s.finish(16.0)
            }
            MusicTrack::World3 => {
                let mut s = Score::new(115.0);
                s.melody(
                    Voice::Bell,
                    &[
                        ("E5", 1.0), ("D5", 0.5), ("C5", 0.5), ("E5", 1.0), ("G5", 1.0),
                        ("F5", 1.0), ("E5", 0.5), ("D5", 0.5), ("C5", 1.0), ("D5", 1.0),
                        ("E5", 1.0), ("C5", 0.5), ("D5", 0.5), ("E5", 1.0), ("F5", 1.0),
                        ("E5", 1.0), ("D5", 0.5), ("C5", 0.5), ("C5", 1.0), ("C5", 1.0),
                    ],
                    1.0,
                    0.07,
                );
                s.line(Voice::Bass, &["C3", "F3", "G3", "C3", "F3", "G3", "F3", "C3"], 0.0, 2.0, 1.8, 0.06);
                for (at, low, high) in [(0.0, "C4", "E4"), (4.0, "F4", "A4"), (8.0, "G3", "B3")] {
                    s.push(Voice::Pad, low, at, 4.0, 0.025);
                    s.push(Voice::Pad, high, at, 4.0, 0.02);
                }
                s.push(Voice::Pad, "C4", 12.0, 4.0, 0.025);
                for i in 0..8 {
                    s.drum(Voice::Kick, i as f64 * 2.0, 0.04);
                    s.drum(Voice::Hihat, i as f64 * 2.0 + 1.0, 0.015);
                }
                s.finish(16.0)
            }
            MusicTrack::Celebration => {
                let mut s = Score::new(105.0);
                let tonic = ["C4", "E4", "G4", "C5", "E5", "G5", "E5", "C5"];
                s.line(Voice::Arp, &tonic, 0.0, 0.5, 0.25, 0.04);
                s.line(Voice::Arp, &["F4", "A4", "C5", "F5", "A5", "F5", "C5", "A4"], 4.0, 0.5, 0.25, 0.04);
                s.line(Voice::Arp, &["G4", "B4", "D5", "G5", "B5", "G5", "D5", "B4"], 8.0, 0.5, 0.25, 0.04);
                s.line(Voice::Arp, &tonic, 12.0, 0.5, 0.25, 0.04);
                for (at, chord) in [
                    (0.0, &["C3", "E3", "G3"][..]),
                    (4.0, &["F3", "A3"][..]),
                    (8.0, &["G3", "B3"][..]),
                    (12.0, &["C3", "E3"][..]),
                ] {
                    for (i, note) in chord.iter().enumerate() {
                        s.push(Voice::Pad, note, at, 4.0, if i == 0 { 0.04 } else { 0.03 });
                    }
                }
                s.melody(
                    Voice::Lead,
                    &[
                        ("C5", 2.0), ("E5", 1.0), ("G5", 1.0), ("E5", 2.0), ("D5", 2.0),
                        ("F5", 1.0), ("A5", 1.0), ("G5", 2.0), ("E5", 2.0),
                    ],
                    0.9,
                    0.04,
                );
                s.finish(16.0)
            }
        }
    }
}

impl SoundEffect {
    pub fn name(self) -> &'static str {
        match self {
            SoundEffect::Click => "click",
            SoundEffect::Jump => "jump",
            SoundEffect::Hit => "hit",
            SoundEffect::Collect => "collect",
            SoundEffect::Victory => "victory",
            SoundEffect::Correct => "correct",
            SoundEffect::Wrong => "wrong",
            SoundEffect::Blow => "blow",
        }
    }

    /// Notes of the effect, in seconds
    pub fn pattern(self) -> Pattern {
        // 60 bpm: one beat per second
        let mut s = Score::new(60.0);
        match self {
            SoundEffect::Click => s.push(Voice::Arp, "G5", 0.0, 0.1, 0.04),
            SoundEffect::Jump => s.push(Voice::Chirp, "B3", 0.0, 0.15, 0.08),
            SoundEffect::Hit => {
                s.drum(Voice::Kick, 0.0, 0.12);
                s.drum(Voice::Snare, 0.0, 0.08);
            }
            SoundEffect::Collect => s.line(Voice::Arp, &["E5", "G5", "C6"], 0.0, 0.08, 0.12, 0.1),
            SoundEffect::Victory => s.line(Voice::Lead, &["C4", "E4", "G4", "C5", "E5", "G5"], 0.0, 0.1, 0.4, 0.07),
            SoundEffect::Correct => {
                s.push(Voice::Lead, "C5", 0.0, 0.15, 0.08);
                s.push(Voice::Lead, "E5", 0.12, 0.15, 0.08);
                s.push(Voice::Lead, "G5", 0.24, 0.25, 0.08);
            }
            SoundEffect::Wrong => {
                s.push(Voice::Lead, "E4", 0.0, 0.2, 0.06);
                s.push(Voice::Lead, "C4", 0.15, 0.25, 0.06);
            }
            SoundEffect::Blow => {
                s.drum(Voice::Snare, 0.0, 0.04);
                s.push(Voice::Pad, "C5", 0.05, 0.4, 0.04);
            }
        }
        let length = s.events.iter().map(|e| e.at + e.dur).fold(0.0, f64::max);
        Pattern {
            events: s.events,
            length,
        }
    }
}

/// Fire-and-forget audio output
pub trait AudioSink {
    fn play_sfx(&mut self, effect: SoundEffect);
    /// Start a looping track, replacing whatever is playing
    fn play_music(&mut self, track: MusicTrack);
    fn stop_music(&mut self);
    fn set_gains(&mut self, sfx: f32, music: f32);
    /// Keep looping music fed; called once per animation frame
    fn update(&mut self) {}
}

/// Audio output that only logs. Used natively and when Web Audio is missing.
#[derive(Debug, Default)]
pub struct NullAudio {
    pub current: Option<MusicTrack>,
    pub played: Vec<SoundEffect>,
}

impl AudioSink for NullAudio {
    fn play_sfx(&mut self, effect: SoundEffect) {
        log::trace!("sfx {}", effect.name());
        self.played.push(effect);
    }

    fn play_music(&mut self, track: MusicTrack) {
        log::debug!("music {}", track.name());
        self.current = Some(track);
    }

    fn stop_music(&mut self) {
        self.current = None;
    }

    fn set_gains(&mut self, _sfx: f32, _music: f32) {}
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, AudioNode, GainNode, OscillatorNode, OscillatorType};

    use super::{AudioSink, MusicTrack, NoteEvent, Pattern, SoundEffect, Voice};

    /// How far ahead of the audio clock music gets scheduled (seconds)
    const LOOKAHEAD: f64 = 0.25;

    struct Playing {
        track: MusicTrack,
        pattern: Pattern,
        next_loop_at: f64,
    }

    /// Web Audio output
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        sfx_bus: Option<GainNode>,
        music_bus: Option<GainNode>,
        sfx_gain: f32,
        music_gain: f32,
        playing: Option<Playing>,
    }

    impl AudioManager {
        pub fn new(sfx_gain: f32, music_gain: f32) -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            let mut manager = Self {
                ctx,
                sfx_bus: None,
                music_bus: None,
                sfx_gain,
                music_gain,
                playing: None,
            };
            manager.sfx_bus = manager.new_bus(sfx_gain);
            manager.music_bus = manager.new_bus(music_gain);
            manager
        }

        fn new_bus(&self, gain: f32) -> Option<GainNode> {
            let ctx = self.ctx.as_ref()?;
            let bus = ctx.create_gain().ok()?;
            bus.gain().set_value(gain);
            bus.connect_with_audio_node(&ctx.destination()).ok()?;
            Some(bus)
        }

        /// Resume audio context (required after user gesture)
        fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                if ctx.state() == web_sys::AudioContextState::Suspended {
                    let _ = ctx.resume();
                }
            }
        }

        /// Create an oscillator with gain envelope routed into `bus`
        fn create_osc(
            ctx: &AudioContext,
            bus: &AudioNode,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(bus).ok()?;

            Some((osc, gain))
        }

        fn schedule(ctx: &AudioContext, bus: &AudioNode, start: f64, pattern: &Pattern) {
            for note in &pattern.events {
                Self::play_note(ctx, bus, start + note.at, note);
            }
        }

        fn play_note(ctx: &AudioContext, bus: &AudioNode, t: f64, note: &NoteEvent) {
            let (dur, vol) = (note.dur, note.vol);
            match note.voice {
                Voice::Lead => {
                    for detune in [0.0, 3.0] {
                        let Some((osc, gain)) = Self::create_osc(ctx, bus, note.freq, OscillatorType::Square) else {
                            return;
                        };
                        osc.detune().set_value(detune);
                        gain.gain().set_value_at_time(0.0, t).ok();
                        gain.gain().linear_ramp_to_value_at_time(vol, t + 0.02).ok();
                        gain.gain().linear_ramp_to_value_at_time(vol * 0.7, t + 0.05).ok();
                        gain.gain()
                            .set_value_at_time(vol * 0.7, (t + dur - 0.05).max(t + 0.05))
                            .ok();
                        gain.gain().exponential_ramp_to_value_at_time(0.001, t + dur).ok();
                        osc.start_with_when(t).ok();
                        osc.stop_with_when(t + dur + 0.01).ok();
                    }
                }
                Voice::Bass | Voice::Bell => {
                    let Some((osc, gain)) = Self::create_osc(ctx, bus, note.freq, OscillatorType::Triangle) else {
                        return;
                    };
                    gain.gain().set_value_at_time(0.0, t).ok();
                    gain.gain().linear_ramp_to_value_at_time(vol, t + 0.02).ok();
                    gain.gain().set_value_at_time(vol * 0.8, t + dur * 0.7).ok();
                    gain.gain().exponential_ramp_to_value_at_time(0.001, t + dur).ok();
                    osc.start_with_when(t).ok();
                    osc.stop_with_when(t + dur + 0.01).ok();
                }
                Voice::Pad => {
                    for detune in [-5.0, 0.0, 5.0] {
                        let Some((osc, gain)) = Self::create_osc(ctx, bus, note.freq, OscillatorType::Sine) else {
                            return;
                        };
                        osc.detune().set_value(detune);
                        gain.gain().set_value_at_time(0.0, t).ok();
                        gain.gain().linear_ramp_to_value_at_time(vol, t + 0.1).ok();
                        gain.gain().set_value_at_time(vol, (t + dur - 0.2).max(t + 0.1)).ok();
                        gain.gain().linear_ramp_to_value_at_time(0.0, t + dur).ok();
                        osc.start_with_when(t).ok();
                        osc.stop_with_when(t + dur + 0.05).ok();
                    }
                }
                Voice::Arp => {
                    let Some((osc, gain)) = Self::create_osc(ctx, bus, note.freq, OscillatorType::Square) else {
                        return;
                    };
                    gain.gain().set_value_at_time(vol, t).ok();
                    gain.gain().exponential_ramp_to_value_at_time(0.001, t + 0.12).ok();
                    osc.start_with_when(t).ok();
                    osc.stop_with_when(t + 0.15).ok();
                }
                Voice::Chirp => {
                    let Some((osc, gain)) = Self::create_osc(ctx, bus, note.freq, OscillatorType::Square) else {
                        return;
                    };
                    osc.frequency().set_value_at_time(note.freq, t).ok();
                    osc.frequency()
                        .exponential_ramp_to_value_at_time(note.freq * 2.4, t + dur * 0.66)
                        .ok();
                    gain.gain().set_value_at_time(vol, t).ok();
                    gain.gain().exponential_ramp_to_value_at_time(0.001, t + dur).ok();
                    osc.start_with_when(t).ok();
                    osc.stop_with_when(t + dur + 0.05).ok();
                }
                Voice::Kick => {
                    let Some((osc, gain)) = Self::create_osc(ctx, bus, 150.0, OscillatorType::Sine) else {
                        return;
                    };
                    osc.frequency().set_value_at_time(150.0, t).ok();
                    osc.frequency().exponential_ramp_to_value_at_time(30.0, t + 0.12).ok();
                    gain.gain().set_value_at_time(vol, t).ok();
                    gain.gain().exponential_ramp_to_value_at_time(0.001, t + 0.15).ok();
                    osc.start_with_when(t).ok();
                    osc.stop_with_when(t + 0.2).ok();
                }
                Voice::Snare => {
                    // Buzzy body plus a high rattle
                    for (freq, kind, len) in [
                        (180.0, OscillatorType::Triangle, 0.1),
                        (3200.0, OscillatorType::Square, 0.08),
                    ] {
                        let Some((osc, gain)) = Self::create_osc(ctx, bus, freq, kind) else {
                            return;
                        };
                        gain.gain().set_value_at_time(vol, t).ok();
                        gain.gain().exponential_ramp_to_value_at_time(0.001, t + len).ok();
                        osc.start_with_when(t).ok();
                        osc.stop_with_when(t + len + 0.02).ok();
                    }
                }
                Voice::Hihat => {
                    let Some((osc, gain)) = Self::create_osc(ctx, bus, 8000.0, OscillatorType::Square) else {
                        return;
                    };
                    gain.gain().set_value_at_time(vol, t).ok();
                    gain.gain().exponential_ramp_to_value_at_time(0.001, t + 0.04).ok();
                    osc.start_with_when(t).ok();
                    osc.stop_with_when(t + 0.06).ok();
                }
            }
        }
    }

    impl AudioSink for AudioManager {
        fn play_sfx(&mut self, effect: SoundEffect) {
            if self.sfx_gain <= 0.0 {
                return;
            }
            self.resume();
            let (Some(ctx), Some(bus)) = (&self.ctx, &self.sfx_bus) else {
                return;
            };
            Self::schedule(ctx, bus, ctx.current_time(), &effect.pattern());
        }

        fn play_music(&mut self, track: MusicTrack) {
            if self.playing.as_ref().is_some_and(|p| p.track == track) {
                return;
            }
            self.stop_music();
            self.resume();
            let Some(ctx) = &self.ctx else { return };
            log::debug!("Music: {}", track.name());
            self.playing = Some(Playing {
                track,
                pattern: track.pattern(),
                next_loop_at: ctx.current_time() + 0.1,
            });
            self.update();
        }

        fn stop_music(&mut self) {
            self.playing = None;
            // Notes already queued on the old bus are cut with it
            if let Some(bus) = self.music_bus.take() {
                bus.disconnect().ok();
            }
            self.music_bus = self.new_bus(self.music_gain);
        }

        fn set_gains(&mut self, sfx: f32, music: f32) {
            self.sfx_gain = sfx;
            self.music_gain = music;
            if let Some(bus) = &self.sfx_bus {
                bus.gain().set_value(sfx);
            }
            if let Some(bus) = &self.music_bus {
                bus.gain().set_value(music);
            }
        }

        fn update(&mut self) {
            let (Some(ctx), Some(bus), Some(playing)) = (&self.ctx, &self.music_bus, &mut self.playing) else {
                return;
            };
            let horizon = ctx.current_time() + LOOKAHEAD;
            while playing.next_loop_at < horizon {
                Self::schedule(ctx, bus, playing.next_loop_at, &playing.pattern);
                playing.next_loop_at += playing.pattern.length;
            }
        }
    }
}
