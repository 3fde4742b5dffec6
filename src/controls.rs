use ::rand as external_rand;
use external_rand::Rng;
use glam::Vec2;
use macroquad::prelude::{
    is_key_down, is_key_pressed, is_mouse_button_pressed, mouse_position, vec2, Camera2D, KeyCode,
    MouseButton,
};

use crate::simulation::Simulation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    Continue,
    Quit,
}

fn cursor_world(camera: &Camera2D) -> Vec2 {
    let (mx, my) = mouse_position();
    let p = camera.screen_to_world(vec2(mx, my));
    Vec2::new(p.x, p.y)
}

pub fn handle_controls<R: Rng>(
    sim: &mut Simulation,
    rng: &mut R,
    camera: &Camera2D,
) -> ControlAction {
    let shift_held = is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift);

    if is_key_pressed(KeyCode::Escape) {
        if sim.help_popup_visible {
            sim.help_popup_visible = false;
        } else {
            return ControlAction::Quit;
        }
    }

    if is_key_pressed(KeyCode::Space) {
        sim.toggle_pause();
    }

    if is_key_pressed(KeyCode::R) {
        sim.reset(rng);
    }

    if is_key_pressed(KeyCode::G) {
        sim.toggle_gradients();
    }

    if is_key_pressed(KeyCode::P) {
        // Set flag to take screenshot at end of frame
        sim.take_screenshot = true;
    }

    if is_key_pressed(KeyCode::F1) {
        sim.toggle_help_popup();
    }

    if shift_held {
        if is_key_pressed(KeyCode::Right) {
            sim.increase_speed();
        }
        if is_key_pressed(KeyCode::Left) {
            sim.decrease_speed();
        }
    }
    if is_key_pressed(KeyCode::Key0) {
        sim.reset_speed();
    }

    // Spawning: right = growth tip, left = resource
    if is_mouse_button_pressed(MouseButton::Right) {
        let p = cursor_world(camera);
        if sim.config.contains(p) {
            sim.spawn_tip_at(rng, p);
        }
    }
    if is_mouse_button_pressed(MouseButton::Left) {
        let p = cursor_world(camera);
        if sim.config.contains(p) {
            sim.spawn_resource_at(p);
        }
    }

    ControlAction::Continue
}
