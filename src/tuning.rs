//! Game balance and scripted text
//!
//! Everything the playthrough reads at the start of a screen: level
//! parameters, the runner's obstacle script, maze layouts, dialog, quiz and
//! the birthday message. The built-in [`Default`] is the shipped game;
//! [`Tuning::from_json`] loads an override and validates it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::runner::ObstacleKind;

/// Maze dimensions in tiles
pub const MAZE_COLS: usize = 20;
pub const MAZE_ROWS: usize = 25;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Collector needs at least one level")]
    NoLevels,

    #[error("Collector level {level}: {reason}")]
    InvalidLevel { level: usize, reason: String },

    #[error("Runner: {0}")]
    InvalidRunner(String),

    #[error("Celebration: {0}")]
    InvalidCelebration(String),

    #[error("Maze {maze}: {reason}")]
    InvalidMaze { maze: String, reason: String },

    #[error("Quiz question {index}: correct answer {correct} is not one of {options} options")]
    InvalidQuiz {
        index: usize,
        correct: usize,
        options: usize,
    },

    #[error("Expected {expected} entries for {field}, got {got}")]
    WrongCount {
        field: String,
        expected: usize,
        got: usize,
    },
}

/// One collector difficulty level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTuning {
    pub target: u32,
    pub time_limit_secs: f32,
    pub obstacle_count: u32,
    pub berry_speed: f32,
    pub berry_flee: bool,
    pub tall_grass: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorTuning {
    pub levels: Vec<LevelTuning>,
    pub player_speed: f32,
    /// Speed multiplier while standing in tall grass
    pub grass_slowdown: f32,
    /// Center-to-center pickup distance
    pub pickup_radius: f32,
    /// "Level complete" banner duration in frames
    pub banner_frames: f32,
    pub talk_radius: f32,
    pub bubble_frames: f32,
    pub slowpoke_messages: Vec<String>,
    pub psyduck_messages: Vec<String>,
}

/// One entry of the runner's obstacle script: a single obstacle or a tight
/// group, followed by `gap` frames before the next entry spawns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnEntry {
    pub kinds: Vec<ObstacleKind>,
    pub gap: f32,
}

impl SpawnEntry {
    fn new(kinds: &[ObstacleKind], gap: f32) -> Self {
        Self {
            kinds: kinds.to_vec(),
            gap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerTuning {
    pub lives: u32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub double_jump_velocity: f32,
    pub base_speed: f32,
    /// Frames of distance per +1 px/frame of scroll speed
    pub speed_ramp: f32,
    pub max_speed_bonus: f32,
    pub first_spawn_frames: f32,
    /// Spacing inside a pair
    pub double_inner_gap: f32,
    /// Spacing inside a group of three
    pub triple_inner_gap: f32,
    pub queue: Vec<SpawnEntry>,
    pub companion_messages: Vec<String>,
    /// Chance a companion cheers after a dodge
    pub cheer_chance: f64,
}

impl RunnerTuning {
    pub fn inner_gap(&self, group_len: usize) -> f32 {
        if group_len >= 3 {
            self.triple_inner_gap
        } else {
            self.double_inner_gap
        }
    }
}

/// Tile coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub col: u32,
    pub row: u32,
}

impl Cell {
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MazeTheme {
    Garden,
    Enchanted,
    Celebration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecorationKind {
    Flower,
    Bush,
    Stone,
    Mushroom,
    SparkleSpot,
    Balloon,
    Star,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    pub kind: DecorationKind,
    pub cell: Cell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MazeNpc {
    pub name: String,
    pub cell: Cell,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MazeTuning {
    pub name: String,
    pub theme: MazeTheme,
    /// Rows of `#` (wall) and `.` (floor)
    pub grid: Vec<String>,
    pub start: Cell,
    pub portal: Cell,
    pub npcs: Vec<MazeNpc>,
    pub decorations: Vec<Decoration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldText {
    pub intro: String,
    pub complete: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogStep {
    pub background: String,
    pub lines: Vec<String>,
    pub characters: Vec<String>,
    pub name_reveal: bool,
    pub show_map: bool,
    pub funny_moment: bool,
    pub show_start_button: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// `None` means every answer counts as correct
    pub correct: Option<usize>,
    pub fun_fact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelebrationTuning {
    pub candles: u32,
    pub confetti_per_wave: u32,
    pub confetti_waves: u32,
    pub message: Vec<String>,
}

/// Complete game data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub player_name: String,
    pub from: String,
    pub collector: CollectorTuning,
    pub runner: RunnerTuning,
    pub mazes: Vec<MazeTuning>,
    pub worlds: Vec<WorldText>,
    pub opening: Vec<DialogStep>,
    pub quiz: Vec<QuizQuestion>,
    pub celebration: CelebrationTuning,
}

impl Tuning {
    /// Parse and validate an override. Missing top-level sections fall back
    /// to the built-in data.
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if self.collector.levels.is_empty() {
            return Err(TuningError::NoLevels);
        }
        for (i, level) in self.collector.levels.iter().enumerate() {
            if level.target == 0 {
                return Err(TuningError::InvalidLevel {
                    level: i + 1,
                    reason: "target must be at least 1".into(),
                });
            }
            if level.time_limit_secs <= 0.0 {
                return Err(TuningError::InvalidLevel {
                    level: i + 1,
                    reason: "time limit must be positive".into(),
                });
            }
        }

        let runner = &self.runner;
        if runner.lives == 0 {
            return Err(TuningError::InvalidRunner("lives must be at least 1".into()));
        }
        if runner.queue.is_empty() {
            return Err(TuningError::InvalidRunner("obstacle queue is empty".into()));
        }
        if let Some(i) = runner.queue.iter().position(|e| e.kinds.is_empty()) {
            return Err(TuningError::InvalidRunner(format!("queue entry {i} has no obstacles")));
        }

        if self.mazes.len() != 3 {
            return Err(TuningError::WrongCount {
                field: "mazes".into(),
                expected: 3,
                got: self.mazes.len(),
            });
        }
        for maze in &self.mazes {
            validate_maze(maze)?;
        }

        if self.worlds.len() != 3 {
            return Err(TuningError::WrongCount {
                field: "worlds".into(),
                expected: 3,
                got: self.worlds.len(),
            });
        }

        for (index, q) in self.quiz.iter().enumerate() {
            if let Some(correct) = q.correct {
                if correct >= q.options.len() {
                    return Err(TuningError::InvalidQuiz {
                        index,
                        correct,
                        options: q.options.len(),
                    });
                }
            }
        }

        // The party only starts once every candle is out
        if self.celebration.candles == 0 {
            return Err(TuningError::InvalidCelebration("candles must be at least 1".into()));
        }
        if self.celebration.confetti_waves == 0 {
            return Err(TuningError::InvalidCelebration("confetti_waves must be at least 1".into()));
        }

        Ok(())
    }
}

fn validate_maze(maze: &MazeTuning) -> Result<(), TuningError> {
    let invalid = |reason: String| TuningError::InvalidMaze {
        maze: maze.name.clone(),
        reason,
    };
    if maze.grid.len() != MAZE_ROWS {
        return Err(invalid(format!("expected {MAZE_ROWS} rows, got {}", maze.grid.len())));
    }
    for (r, row) in maze.grid.iter().enumerate() {
        if row.chars().count() != MAZE_COLS {
            return Err(invalid(format!("row {r} is not {MAZE_COLS} tiles wide")));
        }
        if let Some(c) = row.chars().find(|c| *c != '#' && *c != '.') {
            return Err(invalid(format!("row {r} has unknown tile {c:?}")));
        }
    }
    for (what, cell) in [("start", maze.start), ("portal", maze.portal)] {
        let walkable = maze
            .grid
            .get(cell.row as usize)
            .and_then(|row| row.chars().nth(cell.col as usize))
            == Some('.');
        if !walkable {
            return Err(invalid(format!("{what} cell is not a floor tile")));
        }
    }
    Ok(())
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn decorations(items: &[(u32, u32, DecorationKind)]) -> Vec<Decoration> {
    items
        .iter()
        .map(|&(col, row, kind)| Decoration {
            kind,
            cell: Cell::new(col, row),
        })
        .collect()
}

impl Default for CollectorTuning {
    fn default() -> Self {
        let level = |target, time_limit_secs, obstacle_count, berry_speed, berry_flee, tall_grass| LevelTuning {
            target,
            time_limit_secs,
            obstacle_count,
            berry_speed,
            berry_flee,
            tall_grass,
        };
        Self {
            levels: vec![
                level(5, 60.0, 6, 0.4, false, false),
                level(7, 75.0, 10, 0.9, false, true),
                level(8, 90.0, 14, 1.4, true, true),
            ],
            player_speed: crate::consts::WALK_SPEED,
            grass_slowdown: 0.45,
            pickup_radius: 16.0,
            banner_frames: 150.0,
            talk_radius: 65.0,
            bubble_frames: 130.0,
            slowpoke_messages: lines(&[
                "You're doing great!",
                "Happy Birthday!",
                "Keep going!",
                "So many berries!",
                "Yaaawn... good job!",
                "Over there!",
                "Nice catch!",
            ]),
            psyduck_messages: lines(&[
                "Psy-yi-yi!",
                "Wow, so fast!",
                "Birthday berries!",
                "Psyduck believes in you!",
                "Quack quack!",
                "Look out!",
                "You're amazing!",
            ]),
        }
    }
}

impl Default for RunnerTuning {
    fn default() -> Self {
        use ObstacleKind::{Log, Rock, Stump};

        let mut queue = Vec::with_capacity(30);

        // Warm-up: alternating singles with wide gaps
        let warmup_gaps = [100.0, 90.0, 95.0, 100.0, 85.0, 90.0, 95.0, 100.0, 85.0, 90.0];
        for (i, gap) in warmup_gaps.into_iter().enumerate() {
            let kind = if i % 2 == 0 { Rock } else { Log };
            queue.push(SpawnEntry::new(&[kind], gap));
        }

        // Pairs and stumps
        queue.extend([
            SpawnEntry::new(&[Rock, Rock], 80.0),
            SpawnEntry::new(&[Stump], 90.0),
            SpawnEntry::new(&[Log, Rock], 75.0),
            SpawnEntry::new(&[Stump], 85.0),
            SpawnEntry::new(&[Rock, Stump], 80.0),
            SpawnEntry::new(&[Log], 70.0),
            SpawnEntry::new(&[Stump, Rock], 75.0),
            SpawnEntry::new(&[Stump], 80.0),
            SpawnEntry::new(&[Log, Stump], 70.0),
            SpawnEntry::new(&[Rock], 75.0),
        ]);

        // Triples, tight gaps
        queue.extend([
            SpawnEntry::new(&[Rock, Log, Rock], 70.0),
            SpawnEntry::new(&[Stump, Stump], 65.0),
            SpawnEntry::new(&[Log, Rock, Stump], 65.0),
            SpawnEntry::new(&[Rock, Stump], 60.0),
            SpawnEntry::new(&[Stump, Rock, Log], 60.0),
            SpawnEntry::new(&[Log, Log], 65.0),
            SpawnEntry::new(&[Rock, Stump, Rock], 58.0),
            SpawnEntry::new(&[Stump, Log], 60.0),
            SpawnEntry::new(&[Log, Stump, Log], 55.0),
            SpawnEntry::new(&[Rock, Rock], 60.0),
        ]);

        Self {
            lives: 5,
            gravity: 0.45,
            jump_velocity: -9.5,
            double_jump_velocity: -7.0,
            base_speed: 2.5,
            speed_ramp: 250.0,
            max_speed_bonus: 3.5,
            first_spawn_frames: 90.0,
            double_inner_gap: 18.0,
            triple_inner_gap: 16.0,
            queue,
            companion_messages: lines(&[
                "Jump!",
                "Watch out!",
                "You got this!",
                "Almost there!",
                "Keep running!",
                "Double jump!",
                "Nice dodge!",
            ]),
            cheer_chance: 0.45,
        }
    }
}

fn default_mazes() -> Vec<MazeTuning> {
    use DecorationKind::*;

    let garden = MazeTuning {
        name: "garden".into(),
        theme: MazeTheme::Garden,
        grid: lines(&[
            "########....########",
            "########....########",
            "##................##",
            "##................##",
            "##..############..##",
            "##..############..##",
            "##..........####..##",
            "##..........####..##",
            "##########..####..##",
            "##########..####..##",
            "######......##....##",
            "######......##....##",
            "######..######..####",
            "######..######..####",
            "##......####....####",
            "##......####....####",
            "##..########..######",
            "##..########..######",
            "##................##",
            "##................##",
            "########....########",
            "########....########",
            "########....########",
            "########....########",
            "########....########",
        ]),
        start: Cell::new(9, 24),
        portal: Cell::new(9, 0),
        npcs: vec![MazeNpc {
            name: "slowpoke".into(),
            cell: Cell::new(8, 18),
            messages: lines(&["This way!", "Almost there!", "The forest is ahead!", "So pretty here!"]),
        }],
        decorations: decorations(&[
            (4, 2, Flower),
            (10, 3, Flower),
            (15, 2, Flower),
            (3, 7, Flower),
            (8, 6, Flower),
            (7, 11, Flower),
            (3, 14, Flower),
            (13, 15, Flower),
            (6, 19, Flower),
            (14, 18, Flower),
            (12, 3, Bush),
            (5, 15, Bush),
            (9, 10, Stone),
            (10, 19, Stone),
        ]),
    };

    let enchanted = MazeTuning {
        name: "enchanted".into(),
        theme: MazeTheme::Enchanted,
        grid: lines(&[
            "####################",
            "#..................#",
            "#..................#",
            "#..##############..#",
            "#..##############..#",
            "#..................#",
            "#..................#",
            "################...#",
            "################...#",
            "#..................#",
            "#..................#",
            "#...################",
            "#...################",
            "#..................#",
            "#..................#",
            "################...#",
            "################...#",
            "#..................#",
            "#..................#",
            "#...################",
            "#...################",
            "#..................#",
            "#..................#",
            "##############.....#",
            "##############.....#",
        ]),
        start: Cell::new(16, 24),
        portal: Cell::new(2, 1),
        npcs: vec![MazeNpc {
            name: "psyduck".into(),
            cell: Cell::new(8, 13),
            messages: lines(&[
                "Watch your step!",
                "So magical here!",
                "Pompompurin is waiting!",
                "Psy-yi-yi!",
            ]),
        }],
        decorations: decorations(&[
            (5, 1, Mushroom),
            (12, 2, Mushroom),
            (7, 5, Mushroom),
            (14, 6, Mushroom),
            (3, 9, Mushroom),
            (10, 10, Mushroom),
            (7, 14, Mushroom),
            (5, 17, Mushroom),
            (12, 18, Mushroom),
            (2, 21, Mushroom),
            (8, 1, SparkleSpot),
            (3, 6, SparkleSpot),
            (17, 9, SparkleSpot),
            (2, 13, SparkleSpot),
            (11, 17, SparkleSpot),
            (2, 22, SparkleSpot),
        ]),
    };

    let celebration = MazeTuning {
        name: "celebration".into(),
        theme: MazeTheme::Celebration,
        grid: lines(&[
            "########....########",
            "########....########",
            "##................##",
            "##................##",
            "##..############..##",
            "##..############..##",
            "##................##",
            "##................##",
            "######........######",
            "######........######",
            "##................##",
            "##................##",
            "##..############..##",
            "##..############..##",
            "##................##",
            "##................##",
            "######........######",
            "######........######",
            "##................##",
            "##................##",
            "##..############..##",
            "##..############..##",
            "##................##",
            "##................##",
            "########....########",
        ]),
        start: Cell::new(9, 24),
        portal: Cell::new(9, 0),
        npcs: vec![
            MazeNpc {
                name: "slowpoke".into(),
                cell: Cell::new(5, 2),
                messages: lines(&[
                    "The surprise is close!",
                    "Almost there!",
                    "So exciting!",
                    "Yaawn... keep going!",
                ]),
            },
            MazeNpc {
                name: "psyduck".into(),
                cell: Cell::new(13, 2),
                messages: lines(&[
                    "Hurry! Hurry!",
                    "Best birthday ever!",
                    "Psy-yi-yi!",
                    "You're almost there!",
                ]),
            },
        ],
        decorations: decorations(&[
            (4, 3, Balloon),
            (15, 2, Balloon),
            (3, 6, Balloon),
            (14, 7, Balloon),
            (8, 8, Balloon),
            (12, 9, Balloon),
            (5, 11, Balloon),
            (14, 10, Balloon),
            (3, 14, Balloon),
            (13, 15, Balloon),
            (7, 18, Balloon),
            (15, 19, Balloon),
            (3, 22, Balloon),
            (12, 23, Balloon),
            (9, 3, Star),
            (10, 7, Star),
            (9, 11, Star),
            (8, 15, Star),
            (10, 19, Star),
            (9, 23, Star),
        ]),
    };

    vec![garden, enchanted, celebration]
}

fn default_opening() -> Vec<DialogStep> {
    let step = |background: &str, text: &[&str], characters: &[&str]| DialogStep {
        background: background.into(),
        lines: lines(text),
        characters: lines(characters),
        ..DialogStep::default()
    };
    let all = ["bulbasaur", "slowpoke", "psyduck"];
    let guide = ["bulbasaur"];

    vec![
        step("black", &["...", "... ... ...", "Can you hear me?"], &[]),
        step("meadow", &["Oh! There you are!"], &guide),
        step("meadow", &["Hello! My name is Bulbasaur!", "Welcome to our world!"], &guide),
        step(
            "meadow",
            &["These are my friends: Slowpoke and Psyduck!", "We've been waiting for you!"],
            &all,
        ),
        DialogStep {
            name_reveal: true,
            ..step("meadow", &["You must be...", "Như, right?"], &all)
        },
        step(
            "meadow",
            &["Như, today is a VERY important day...", "Do you know what day it is?"],
            &guide,
        ),
        step("meadow", &["It's... a secret!", "But I promise you'll find out soon!"], &guide),
        step(
            "meadow",
            &[
                "Right now, we need your help!",
                "A special surprise is being prepared...",
                "but the ingredients got scattered across different worlds!",
            ],
            &guide,
        ),
        DialogStep {
            show_map: true,
            ..step(
                "meadow",
                &[
                    "We'll need to travel through the Berry Garden,",
                    "cross the Enchanted Forest,",
                    "and visit Pompompurin's World!",
                ],
                &guide,
            )
        },
        step("meadow", &["Don't worry, we'll be with you", "every step of the way!"], &all),
        DialogStep {
            funny_moment: true,
            ..step(
                "meadow",
                &[
                    "Well... we'll TRY to keep up.",
                    "Slowpoke isn't exactly... fast.",
                    "And Psyduck gets confused sometimes.",
                ],
                &all,
            )
        },
        DialogStep {
            show_start_button: true,
            ..step("meadow", &["But together, we can do anything!", "Ready, Như?"], &all)
        },
    ]
}

fn default_quiz() -> Vec<QuizQuestion> {
    let q = |question: &str, options: &[&str], correct: Option<usize>, fun_fact: &str| QuizQuestion {
        question: question.into(),
        options: lines(options),
        correct,
        fun_fact: fun_fact.into(),
    };
    vec![
        q(
            "What is Như's favorite color?",
            &["Pink like Slowpoke's belly", "Yellow", "Green like Bulbasaur", "Blue like Psyduck's tears"],
            Some(1),
            "Golden like sunshine!",
        ),
        q(
            "What is Như's favorite Filipino food?",
            &["Adobo", "Sinigang", "Lechon", "Balut"],
            Some(1),
            "The best comfort food!",
        ),
        q(
            "What is Như's favorite song?",
            &["Never Gonna Give You Up", "Historia de un amor", "Baby Shark", "Despacito"],
            Some(1),
            "A timeless classic!",
        ),
        q(
            "Who's your pogiest boyfriend?",
            &["Bulbasaur", "Patrick", "Pompompurin", "Some random guy"],
            Some(1),
            "Obviously! The pogiest of them all!",
        ),
        q(
            "What's the best memory you had with Patrick?",
            &[
                "First date in Tagaytay",
                "Traveled to Dalat Vietnam",
                "Went hiking in Taiwan",
                "Travelling to Baguio",
            ],
            None,
            "Every moment with you is the best memory!",
        ),
    ]
}

impl Default for CelebrationTuning {
    fn default() -> Self {
        Self {
            candles: 3,
            confetti_per_wave: 80,
            confetti_waves: 5,
            message: lines(&[
                "Happy Birthday, Như!",
                "From the streets of Tagaytay to the hills of Dalat,",
                "every adventure is better with you by my side.",
                "Thank you for being my favorite person in the world.",
                "Here's to more memories, more laughter, and more love.",
                "Forever yours, Patrick",
            ]),
        }
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            player_name: "Như".into(),
            from: "Patrick".into(),
            collector: CollectorTuning::default(),
            runner: RunnerTuning::default(),
            mazes: default_mazes(),
            worlds: vec![
                WorldText {
                    intro: "The Berry Garden has gone wild! We need to collect special Birthday Berries for the surprise! Bulbasaur will follow you. Slowpoke and Psyduck are here to cheer you on!".into(),
                    complete: "Amazing! You got all the berries! But wait... we still need to reach the next world! Follow the path through the garden!".into(),
                },
                WorldText {
                    intro: "The forest path is full of obstacles! Stay sharp and jump over them! You can even double-jump! Bulbasaur, Slowpoke, and Psyduck will run with you. We need to reach the Pompompurin Portal!".into(),
                    complete: "We made it! Look, there's the portal! Pompompurin is waiting on the other side!".into(),
                },
                WorldText {
                    intro: "Welcome to my world, Như! Before the big surprise, I have a few fun questions for you... Let's see how well you know yourself and someone special!".into(),
                    complete: "You did wonderfully! Now close your eyes... the surprise is almost ready!".into(),
                },
            ],
            opening: default_opening(),
            quiz: default_quiz(),
            celebration: CelebrationTuning::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let tuning = Tuning::default();
        tuning.validate().unwrap();
        assert_eq!(tuning.runner.queue.len(), 30);
        assert_eq!(tuning.collector.levels.len(), 3);
    }

    #[test]
    fn test_json_round_trip_of_default() {
        let json = serde_json::to_string(&Tuning::default()).unwrap();
        let parsed = Tuning::from_json(&json).unwrap();
        assert_eq!(parsed, Tuning::default());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let json = r#"{ "player_name": "Alex" }"#;
        let tuning = Tuning::from_json(json).unwrap();
        assert_eq!(tuning.player_name, "Alex");
        assert_eq!(tuning.mazes.len(), 3);
    }

    #[test]
    fn test_rejects_bad_maze() {
        let mut tuning = Tuning::default();
        tuning.mazes[0].grid.pop();
        assert!(matches!(tuning.validate(), Err(TuningError::InvalidMaze { .. })));

        let mut tuning = Tuning::default();
        // Start on a wall
        tuning.mazes[1].start = Cell::new(0, 0);
        assert!(matches!(tuning.validate(), Err(TuningError::InvalidMaze { .. })));
    }

    #[test]
    fn test_rejects_empty_levels_and_bad_quiz() {
        let mut tuning = Tuning::default();
        tuning.collector.levels.clear();
        assert!(matches!(tuning.validate(), Err(TuningError::NoLevels)));

        let mut tuning = Tuning::default();
        tuning.quiz[0].correct = Some(9);
        assert!(matches!(tuning.validate(), Err(TuningError::InvalidQuiz { index: 0, .. })));
    }

    #[test]
    fn test_rejects_celebration_without_candles_or_confetti() {
        let mut tuning = Tuning::default();
        tuning.celebration.candles = 0;
        assert!(matches!(tuning.validate(), Err(TuningError::InvalidCelebration(_))));

        let mut tuning = Tuning::default();
        tuning.celebration.confetti_waves = 0;
        assert!(matches!(tuning.validate(), Err(TuningError::InvalidCelebration(_))));

        let json = r#"{ "celebration": { "candles": 0, "confetti_per_wave": 10, "confetti_waves": 2, "message": [] } }"#;
        assert!(matches!(Tuning::from_json(json), Err(TuningError::InvalidCelebration(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(Tuning::from_json("{ nope"), Err(TuningError::Parse(_))));
    }
}
