//! Pixel-art sprite tables
//!
//! Each sprite is a grid of palette keys, one string per row. `.` is
//! transparent. Blitting merges horizontal runs of one color into a single
//! rectangle.

use glam::Vec2;

use crate::platform::{Color, RenderTarget, rgb};
use crate::tuning::DecorationKind;

pub struct Sprite {
    pub rows: &'static [&'static str],
    pub palette: &'static [(u8, Color)],
}

impl Sprite {
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    fn color(&self, key: u8) -> Option<Color> {
        self.palette.iter().find(|(k, _)| *k == key).map(|(_, c)| *c)
    }
}

/// Draw `sprite` with its top-left at `pos` (snapped to whole pixels),
/// each sprite pixel `scale` screen pixels wide. `flip` mirrors it.
pub fn blit(target: &mut impl RenderTarget, sprite: &Sprite, pos: Vec2, scale: f32, flip: bool) {
    let origin = pos.round();
    let width = sprite.width();
    for (row, line) in sprite.rows.iter().enumerate() {
        let keys: Vec<u8> = if flip {
            line.bytes().rev().collect()
        } else {
            line.bytes().collect()
        };
        let y = origin.y + row as f32 * scale;
        let mut col = 0;
        while col < width.min(keys.len()) {
            let key = keys[col];
            let start = col;
            while col < keys.len() && keys[col] == key {
                col += 1;
            }
            if let Some(color) = sprite.color(key) {
                target.fill_rect(
                    origin.x + start as f32 * scale,
                    y,
                    (col - start) as f32 * scale,
                    scale,
                    color,
                );
            }
        }
    }
}

const OUTLINE: Color = rgb(0x282828);
const WHITE: Color = rgb(0xffffff);

const NHU_PALETTE: &[(u8, Color)] = &[
    (b'h', rgb(0x4a2c20)),
    (b's', rgb(0xf5c8a0)),
    (b'e', OUTLINE),
    (b'p', rgb(0xff8fb1)),
    (b'b', rgb(0xe0607e)),
];

pub static NHU: [Sprite; 2] = [
    Sprite {
        rows: &[
            "..hhhh..", //
            ".hhhhhh.",
            ".hsssshh",
            ".seseseh",
            "..ssss..",
            ".pppppp.",
            "..pbbp..",
            "..s..s..",
        ],
        palette: NHU_PALETTE,
    },
    Sprite {
        rows: &[
            "..hhhh..", //
            ".hhhhhh.",
            ".hsssshh",
            ".seseseh",
            "..ssss..",
            ".pppppp.",
            "..pbbp..",
            ".s....s.",
        ],
        palette: NHU_PALETTE,
    },
];

const BULBASAUR_PALETTE: &[(u8, Color)] = &[
    (b'g', rgb(0x509030)),
    (b'G', rgb(0x88c840)),
    (b't', rgb(0x68b8a0)),
    (b'd', rgb(0x386858)),
    (b'e', rgb(0xd83028)),
    (b'm', rgb(0xc04040)),
];

pub static BULBASAUR: [Sprite; 2] = [
    Sprite {
        rows: &[
            "...gg...", //
            "..gGGg..",
            ".tgGGgt.",
            "tttttttt",
            "tettette",
            "tttmmttt",
            ".tddddt.",
            ".t.t.t..",
        ],
        palette: BULBASAUR_PALETTE,
    },
    Sprite {
        rows: &[
            "...gg...", //
            "..gGGg..",
            ".tgGGgt.",
            "tttttttt",
            "tettette",
            "tttmmttt",
            ".tddddt.",
            "..t.t.t.",
        ],
        palette: BULBASAUR_PALETTE,
    },
];

const CRITTER_ROWS: &[&str] = &[
    "..bbbb..", //
    ".bbbbbb.",
    "bwkbbwkb",
    "bbbbbbbb",
    "bmmmmmmb",
    ".bbbbbb.",
    "..bbbb..",
    ".bb..bb.",
];

pub static SLOWPOKE: Sprite = Sprite {
    rows: CRITTER_ROWS,
    palette: &[(b'b', rgb(0xf08888)), (b'w', WHITE), (b'k', OUTLINE), (b'm', rgb(0xc8a878))],
};

pub static PSYDUCK: Sprite = Sprite {
    rows: CRITTER_ROWS,
    palette: &[(b'b', rgb(0xf0b020)), (b'w', WHITE), (b'k', OUTLINE), (b'm', rgb(0xf8e0a0))],
};

pub static POMPOMPURIN: Sprite = Sprite {
    rows: CRITTER_ROWS,
    palette: &[(b'b', rgb(0xffe58a)), (b'w', WHITE), (b'k', OUTLINE), (b'm', rgb(0x8b5a2b))],
};

/// Sprite for a named character, with a fallback for unknown names
pub fn character(name: &str) -> &'static Sprite {
    match name {
        "bulbasaur" => &BULBASAUR[0],
        "psyduck" => &PSYDUCK,
        "pompompurin" => &POMPOMPURIN,
        "nhu" | "patrick" => &NHU[0],
        _ => &SLOWPOKE,
    }
}

const BERRY_ROWS: &[&str] = &[
    ".gg.", //
    "bbbb",
    "bwbb",
    ".bb.",
];

pub static BERRIES: [Sprite; 4] = [
    Sprite {
        rows: BERRY_ROWS,
        palette: &[(b'g', rgb(0x4caf50)), (b'b', rgb(0xe53935)), (b'w', WHITE)],
    },
    Sprite {
        rows: BERRY_ROWS,
        palette: &[(b'g', rgb(0x4caf50)), (b'b', rgb(0x3949ab)), (b'w', WHITE)],
    },
    Sprite {
        rows: BERRY_ROWS,
        palette: &[(b'g', rgb(0x4caf50)), (b'b', rgb(0x8e24aa)), (b'w', WHITE)],
    },
    Sprite {
        rows: BERRY_ROWS,
        palette: &[(b'g', rgb(0x4caf50)), (b'b', rgb(0xfb8c00)), (b'w', WHITE)],
    },
];

pub static FLOWER: Sprite = Sprite {
    rows: &[
        "........", //
        "...pp...",
        "..pyyp..",
        "...pp...",
        "...g....",
        "..gg.g..",
        "...ggg..",
        "...g....",
    ],
    palette: &[(b'p', rgb(0xff8fb1)), (b'y', rgb(0xffeb3b)), (b'g', rgb(0x43a047))],
};

pub static BUSH: Sprite = Sprite {
    rows: &[
        "........", //
        "..gggg..",
        ".gGGggg.",
        "gGGggggg",
        "gggggrgg",
        "ggrggggg",
        ".gggggg.",
        "........",
    ],
    palette: &[(b'g', rgb(0x2e7d32)), (b'G', rgb(0x66bb6a)), (b'r', rgb(0xe53935))],
};

pub static STONE: Sprite = Sprite {
    rows: &[
        "........", //
        "........",
        "...ss...",
        "..sSss..",
        ".sSsssd.",
        ".ssssdd.",
        "..dddd..",
        "........",
    ],
    palette: &[(b's', rgb(0x9e9e9e)), (b'S', rgb(0xcfcfcf)), (b'd', rgb(0x616161))],
};

pub static MUSHROOM: Sprite = Sprite {
    rows: &[
        "........", //
        "..rrrr..",
        ".rwrrwr.",
        "rrrrrrrr",
        "...cc...",
        "...cc...",
        "..cccc..",
        "........",
    ],
    palette: &[(b'r', rgb(0xd32f2f)), (b'w', WHITE), (b'c', rgb(0xfff3e0))],
};

pub static BALLOON: Sprite = Sprite {
    rows: &[
        "..rrrr..", //
        ".rwrrrr.",
        ".rrrrrr.",
        ".rrrrrr.",
        "..rrrr..",
        "...rr...",
        "....s...",
        "...s....",
    ],
    palette: &[(b'r', rgb(0xff4081)), (b'w', WHITE), (b's', rgb(0x757575))],
};

pub static STAR: Sprite = Sprite {
    rows: &[
        "...y....", //
        "...y....",
        "yyyyyyy.",
        ".yyyyy..",
        "..yyy...",
        ".yy.yy..",
        ".y...y..",
        "........",
    ],
    palette: &[(b'y', rgb(0xffd54f))],
};

/// `None` for decorations that only mark a spot
pub fn decoration(kind: DecorationKind) -> Option<&'static Sprite> {
    match kind {
        DecorationKind::Flower => Some(&FLOWER),
        DecorationKind::Bush => Some(&BUSH),
        DecorationKind::Stone => Some(&STONE),
        DecorationKind::Mushroom => Some(&MUSHROOM),
        DecorationKind::Balloon => Some(&BALLOON),
        DecorationKind::Star => Some(&STAR),
        DecorationKind::SparkleSpot => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{DrawOp, Recorder};

    const TEST: Sprite = Sprite {
        rows: &["aab."],
        palette: &[(b'a', [1.0, 0.0, 0.0, 1.0]), (b'b', [0.0, 0.0, 1.0, 1.0])],
    };

    fn rects(r: &Recorder) -> Vec<(f32, f32, f32)> {
        r.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Rect { x, y, w, .. } => Some((*x, *y, *w)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_blit_merges_runs_at_integer_offsets() {
        let mut r = Recorder::default();
        blit(&mut r, &TEST, Vec2::new(10.4, 20.6), 2.0, false);
        assert_eq!(rects(&r), vec![(10.0, 21.0, 4.0), (14.0, 21.0, 2.0)]);
    }

    #[test]
    fn test_blit_flip_mirrors() {
        let mut r = Recorder::default();
        blit(&mut r, &TEST, Vec2::ZERO, 1.0, true);
        // ".baa"
        assert_eq!(rects(&r), vec![(1.0, 0.0, 1.0), (2.0, 0.0, 2.0)]);
    }

    #[test]
    fn test_sprite_tables_are_rectangular() {
        let all = [
            &NHU[0], &NHU[1], &BULBASAUR[0], &BULBASAUR[1], &SLOWPOKE, &BERRIES[0], &FLOWER, &BUSH, &STONE,
            &MUSHROOM, &BALLOON, &STAR,
        ];
        for sprite in all {
            let w = sprite.width();
            assert!(sprite.rows.iter().all(|r| r.len() == w));
            for key in sprite.rows.iter().flat_map(|r| r.bytes()) {
                assert!(key == b'.' || sprite.color(key).is_some(), "unmapped key {}", key as char);
            }
        }
    }
}
