//! Per-controller scene drawing

use glam::Vec2;

use super::sprites::{self, Sprite, blit};
use crate::consts::{CANVAS_H, CANVAS_W};
use crate::platform::{Color, RenderTarget, rgb, with_alpha};
use crate::settings::Settings;
use crate::sim::collector::{CollectorPhase, SceneryKind};
use crate::sim::entity::{Particle, SpeechBubble};
use crate::sim::maze::{Heading, TILE};
use crate::sim::runner::{GROUND_LINE, PLAYER_HEIGHT, PLAYER_X};
use crate::sim::{Collector, Controller, ControllerKind, Facing, MazeWalker, ObstacleKind, Runner};
use crate::tuning::MazeTheme;

/// Particle palette, indexed by `Particle::color`
const SPARKLE_COLORS: [Color; 4] = [rgb(0xfff176), rgb(0xff8fb1), rgb(0x80deea), rgb(0xffffff)];

const BLACK: Color = rgb(0x000000);
const WHITE: Color = rgb(0xffffff);
const INK: Color = rgb(0x282828);

/// Canvas element each mini-game draws on
pub fn canvas_id(kind: ControllerKind) -> &'static str {
    match kind {
        ControllerKind::Collector => "world1-canvas",
        ControllerKind::Runner => "world2-canvas",
        ControllerKind::Maze(_) => "maze-canvas",
    }
}

/// Draw one frame of the active mini-game
pub fn draw(controller: &Controller, target: &mut impl RenderTarget, settings: &Settings) {
    match controller {
        Controller::Collector(c) => draw_collector(c, target, settings),
        Controller::Runner(r) => draw_runner(r, target, settings),
        Controller::Maze(m) => draw_maze(m, target, settings),
    }
}

pub fn draw_fps(target: &mut impl RenderTarget, fps: u32) {
    target.fill_rect(CANVAS_W - 44.0, 2.0, 42.0, 12.0, with_alpha(BLACK, 0.5));
    target.fill_text(&format!("{fps} fps"), Vec2::new(CANVAS_W - 23.0, 8.0), 8.0, WHITE);
}

/// Camera shake applied to a scene, zero when motion is reduced
pub fn shake_offset(offset: Vec2, settings: &Settings) -> Vec2 {
    if settings.effective_screen_shake() {
        offset
    } else {
        Vec2::ZERO
    }
}

fn walk_frame<'a>(frames: &'a [Sprite; 2], frame: u8) -> &'a Sprite {
    &frames[usize::from(frame) % 2]
}

/// Draw a sprite so it is `size` pixels tall
fn blit_sized(target: &mut impl RenderTarget, sprite: &Sprite, pos: Vec2, size: f32, flip: bool) {
    let scale = (size / sprite.height().max(1) as f32).max(1.0);
    blit(target, sprite, pos, scale, flip);
}

fn draw_particles(target: &mut impl RenderTarget, particles: &[Particle], offset: Vec2, settings: &Settings) {
    if !settings.particles {
        return;
    }
    for p in particles {
        let color = SPARKLE_COLORS[usize::from(p.color) % SPARKLE_COLORS.len()];
        let pos = (p.pos - offset).round();
        target.fill_rect(pos.x, pos.y, 3.0, 3.0, with_alpha(color, p.alpha()));
    }
}

fn draw_bubble(target: &mut impl RenderTarget, bubble: &SpeechBubble, offset: Vec2) {
    let w = (bubble.text.chars().count() as f32 * 6.0 + 12.0).min(CANVAS_W - 8.0);
    let h = 18.0;
    let anchor = bubble.anchor - offset;
    let x = (anchor.x - w / 2.0).clamp(4.0, CANVAS_W - w - 4.0);
    let y = (anchor.y - h - 6.0).clamp(4.0, CANVAS_H - h - 4.0);
    target.fill_rect(x - 1.0, y - 1.0, w + 2.0, h + 2.0, INK);
    target.fill_rect(x, y, w, h, WHITE);
    target.fill_text(&bubble.text, Vec2::new(x + w / 2.0, y + h / 2.0), 8.0, INK);
}

fn draw_banner(target: &mut impl RenderTarget, text: &str) {
    target.fill_rect(0.0, CANVAS_H / 2.0 - 24.0, CANVAS_W, 48.0, with_alpha(BLACK, 0.6));
    target.fill_text(text, Vec2::new(CANVAS_W / 2.0, CANVAS_H / 2.0), 12.0, rgb(0xffeb3b));
}

fn draw_collector(c: &Collector, target: &mut impl RenderTarget, settings: &Settings) {
    target.clear(rgb(0x7ec850));

    for g in &c.grass {
        target.fill_rect(g.x, g.y, g.w, g.h, rgb(0x5a9e3c));
        // Tufts
        let mut x = g.x + 2.0;
        while x < g.right() - 2.0 {
            target.fill_rect(x, g.y - 3.0, 2.0, 5.0, rgb(0x3f7d2a));
            x += 7.0;
        }
    }

    for s in &c.obstacles {
        match s.kind {
            SceneryKind::Rock => {
                target.fill_rect(s.rect.x, s.rect.y, s.rect.w, s.rect.h, rgb(0x8a8a8a));
                target.fill_rect(s.rect.x + 3.0, s.rect.y + 3.0, s.rect.w / 3.0, s.rect.h / 4.0, rgb(0xbdbdbd));
            }
            SceneryKind::Bush => blit_sized(target, &sprites::BUSH, Vec2::new(s.rect.x, s.rect.y), s.rect.h, false),
        }
    }

    for b in &c.berries {
        let bob = b.bob.sin() * 2.0;
        let sprite = &sprites::BERRIES[usize::from(b.variant) % sprites::BERRIES.len()];
        blit(target, sprite, b.body.pos + Vec2::new(0.0, bob), 2.0, false);
    }

    for npc in &c.npcs {
        let flip = npc.facing.facing == Facing::Left;
        blit_sized(target, sprites::character(&npc.name), npc.body.pos, 32.0, flip);
    }

    let companion = &c.companion;
    blit_sized(
        target,
        walk_frame(&sprites::BULBASAUR, companion.body.anim.frame),
        companion.body.pos,
        32.0,
        companion.facing.facing == Facing::Left,
    );

    let player = &c.player;
    blit_sized(
        target,
        walk_frame(&sprites::NHU, player.anim.frame),
        player.pos,
        32.0,
        player.vel.x < 0.0,
    );

    draw_particles(target, &c.sparkles, Vec2::ZERO, settings);

    if let Some(bubble) = &c.speech.bubble {
        draw_bubble(target, bubble, Vec2::ZERO);
    }

    if matches!(c.phase, CollectorPhase::LevelComplete { .. }) {
        draw_banner(target, &c.banner);
    }
}

fn draw_runner(r: &Runner, target: &mut impl RenderTarget, settings: &Settings) {
    target.clear(rgb(0x9fd8ef));
    let offset = -shake_offset(r.shake_offset, settings);

    for tree in &r.trees {
        let (trunk, leaves) = if tree.far {
            (rgb(0x6d7f6a), rgb(0x7fa87a))
        } else {
            (rgb(0x6d4c41), rgb(0x388e3c))
        };
        let x = tree.x - offset.x;
        let top = GROUND_LINE - tree.h - offset.y;
        target.fill_rect(x + tree.w * 0.4, top + tree.h * 0.5, tree.w * 0.2, tree.h * 0.5, trunk);
        target.fill_circle(Vec2::new(x + tree.w / 2.0, top + tree.h * 0.35), tree.w / 2.0, leaves);
    }

    target.fill_rect(0.0, GROUND_LINE - offset.y, CANVAS_W, CANVAS_H - GROUND_LINE, rgb(0x6b8e3a));
    let stripe = 24.0;
    let mut x = -(r.ground_scroll % stripe);
    while x < CANVAS_W {
        target.fill_rect(x - offset.x, GROUND_LINE + 6.0 - offset.y, 10.0, 3.0, rgb(0x557a2c));
        x += stripe;
    }

    for o in &r.obstacles {
        let rect = o.rect;
        let (x, y) = (rect.x - offset.x, rect.y - offset.y);
        match o.kind {
            ObstacleKind::Rock => {
                target.fill_rect(x, y, rect.w, rect.h, rgb(0x8a8a8a));
                target.fill_rect(x + 4.0, y + 3.0, rect.w / 3.0, 4.0, rgb(0xbdbdbd));
            }
            ObstacleKind::Log => {
                target.fill_rect(x, y, rect.w, rect.h, rgb(0x8d6e63));
                target.fill_circle(Vec2::new(x + rect.w - 4.0, y + rect.h / 2.0), rect.h / 2.0 - 2.0, rgb(0xd7b899));
            }
            ObstacleKind::Stump => {
                target.fill_rect(x, y, rect.w, rect.h, rgb(0x6d4c41));
                target.fill_rect(x, y, rect.w, 4.0, rgb(0xd7b899));
            }
        }
    }

    for e in &r.escorts {
        let pos = Vec2::new(e.x, e.jumper.y) - offset;
        let sprite = match e.name.as_str() {
            "bulbasaur" => walk_frame(&sprites::BULBASAUR, e.anim.frame),
            name => sprites::character(name),
        };
        blit_sized(target, sprite, pos, e.jumper.height, false);
    }

    // Blink while the hit flash runs
    let hidden = settings.effective_flash() && r.flash > 0.0 && (r.flash as i32 / 4) % 2 == 1;
    if !hidden {
        blit_sized(
            target,
            walk_frame(&sprites::NHU, r.anim.frame),
            Vec2::new(PLAYER_X, r.player.y) - offset,
            PLAYER_HEIGHT,
            false,
        );
    }

    draw_particles(target, &r.stars, offset, settings);

    if let Some(bubble) = &r.cheer.bubble {
        draw_bubble(target, bubble, offset);
    }
}

fn maze_colors(theme: MazeTheme) -> (Color, Color) {
    match theme {
        MazeTheme::Garden => (rgb(0x9ccc65), rgb(0x33691e)),
        MazeTheme::Enchanted => (rgb(0x4a3f6b), rgb(0x1f1535)),
        MazeTheme::Celebration => (rgb(0xffe0ec), rgb(0xd81b60)),
    }
}

fn draw_maze(m: &MazeWalker, target: &mut impl RenderTarget, settings: &Settings) {
    target.clear(rgb(0x1a1a2e));
    let cam = m.camera.round();
    let (floor, wall) = maze_colors(m.theme);

    let first_col = (cam.x / TILE).floor() as i32;
    let first_row = (cam.y / TILE).floor() as i32;
    let last_col = ((cam.x + CANVAS_W) / TILE).ceil() as i32;
    let last_row = ((cam.y + CANVAS_H) / TILE).ceil() as i32;
    for row in first_row.max(0)..last_row.min(m.grid.rows() as i32) {
        for col in first_col.max(0)..last_col.min(m.grid.cols() as i32) {
            let color = if m.grid.is_wall(col, row) { wall } else { floor };
            target.fill_rect(col as f32 * TILE - cam.x, row as f32 * TILE - cam.y, TILE, TILE, color);
        }
    }

    for (i, d) in m.decorations.iter().enumerate() {
        let Some(sprite) = sprites::decoration(d.kind) else {
            continue;
        };
        let bob = (m.decor_phase + i as f32).sin() * 2.0;
        let pos = Vec2::new(d.cell.col as f32, d.cell.row as f32) * TILE - cam + Vec2::new(0.0, bob);
        blit_sized(target, sprite, pos, TILE, false);
    }

    let portal = m.portal.center() - cam;
    let pulse = m.portal_pulse.sin() * 3.0;
    target.fill_circle(portal, 14.0 + pulse, with_alpha(rgb(0xb388ff), 0.6));
    target.fill_circle(portal, 8.0 + pulse / 2.0, rgb(0xe1bee7));

    for npc in &m.npcs {
        let flip = npc.facing == Facing::Left;
        blit_sized(target, sprites::character(&npc.name), npc.pos - cam, TILE, flip);
    }

    let companion = &m.companion;
    blit_sized(
        target,
        walk_frame(&sprites::BULBASAUR, companion.body.anim.frame),
        companion.body.pos - cam,
        TILE,
        companion.facing.facing == Facing::Left,
    );
    blit_sized(
        target,
        walk_frame(&sprites::NHU, m.player.anim.frame),
        m.player.pos - cam,
        TILE,
        m.heading == Heading::Left,
    );

    draw_particles(target, &m.particles, cam, settings);

    if let Some(bubble) = &m.speech.bubble {
        draw_bubble(target, bubble, cam);
    }

    if m.fade > 0.0 {
        target.fill_rect(0.0, 0.0, CANVAS_W, CANVAS_H, with_alpha(BLACK, m.fade));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{DrawOp, Recorder};
    use crate::sim::InputState;
    use crate::tuning::Tuning;

    fn frame(controller: &Controller, settings: &Settings) -> Recorder {
        let mut r = Recorder::default();
        draw(controller, &mut r, settings);
        r
    }

    #[test]
    fn test_canvas_ids() {
        assert_eq!(canvas_id(ControllerKind::Collector), "world1-canvas");
        assert_eq!(canvas_id(ControllerKind::Maze(2)), "maze-canvas");
    }

    #[test]
    fn test_every_controller_draws_a_fresh_frame() {
        let tuning = Tuning::default();
        let settings = Settings::default();
        for kind in [ControllerKind::Collector, ControllerKind::Runner, ControllerKind::Maze(0)] {
            let mut controller = Controller::start(kind, &tuning, 3).unwrap();
            controller.tick(&InputState::new(), 1.0);
            let r = frame(&controller, &settings);
            assert!(matches!(r.ops.first(), Some(DrawOp::Clear(_))), "{kind:?}");
            assert!(r.ops.len() > 10, "{kind:?}");
        }
    }

    #[test]
    fn test_maze_starts_faded_in() {
        let tuning = Tuning::default();
        let controller = Controller::start(ControllerKind::Maze(1), &tuning, 3).unwrap();
        let Controller::Maze(m) = &controller else {
            unreachable!()
        };
        assert!(m.fade > 0.0);
        let r = frame(&controller, &Settings::default());
        let Some(DrawOp::Rect { w, h, color, .. }) = r.ops.last() else {
            panic!("expected fade overlay");
        };
        assert_eq!((*w, *h), (CANVAS_W, CANVAS_H));
        assert!((color[3] - m.fade).abs() < 1e-6);
    }

    #[test]
    fn test_particles_respect_settings() {
        let tuning = Tuning::default();
        let mut controller = Controller::start(ControllerKind::Maze(1), &tuning, 3).unwrap();
        controller.tick(&InputState::new(), 1.0);
        let on = frame(&controller, &Settings::default()).ops.len();
        let off = frame(
            &controller,
            &Settings {
                particles: false,
                ..Settings::default()
            },
        )
        .ops
        .len();
        assert!(off < on);
    }

    #[test]
    fn test_reduced_motion_disables_shake() {
        let offset = Vec2::new(3.0, -2.0);
        assert_eq!(shake_offset(offset, &Settings::default()), offset);
        let calm = Settings {
            reduced_motion: true,
            ..Settings::default()
        };
        assert_eq!(shake_offset(offset, &calm), Vec2::ZERO);
    }

    #[test]
    fn test_fps_overlay() {
        let mut r = Recorder::default();
        draw_fps(&mut r, 59);
        assert_eq!(r.texts().collect::<Vec<_>>(), vec!["59 fps"]);
    }
}
