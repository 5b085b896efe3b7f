//! Camera-control input state machine.
//!
//! Raw pointer events in, camera/target transform deltas out. Per move event,
//! highest priority first:
//!
//! | buttons pressed on canvas            | motion |
//! |--------------------------------------|--------|
//! | left + right, or left with shift     | dolly  |
//! | left with ctrl, or right             | pan    |
//! | left                                 | orbit  |
//!
//! A press only counts when it lands strictly inside the canvas; the tag
//! stays for the whole drag and is cleared on release.

use glam::{Vec3, Vec4};

use crate::scene::SceneGraph;
use crate::util::degrees_to_radians;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
}

/// Modifier keys sampled at move time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

/// Canvas rectangle in the same coordinates as pointer events.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Strict containment: points on the border are outside.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x > self.left && x < self.right() && y > self.top && y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Pressed { button: PointerButton, x: f32, y: f32 },
    Released { button: PointerButton },
    Moved { x: f32, y: f32, modifiers: Modifiers },
}

/// Transform change produced by a move event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMotion {
    Dolly,
    Pan,
    Orbit,
}

/// Input sensitivities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlScalars {
    /// World units per pixel for dolly and pan.
    pub translate: f32,
    /// Degrees per pixel for orbit.
    pub rotate: f32,
}

impl Default for ControlScalars {
    fn default() -> Self {
        Self { translate: 0.01, rotate: 0.25 }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ButtonState {
    down: bool,
    on_canvas: bool,
}

/// Pointer bookkeeping for one canvas.
#[derive(Debug, Clone, Default)]
pub struct CameraControls {
    scalars: ControlScalars,
    canvas: CanvasRect,
    cursor: (f32, f32),
    left: ButtonState,
    right: ButtonState,
}

impl CameraControls {
    pub fn new(scalars: ControlScalars) -> Self {
        Self { scalars, ..Default::default() }
    }

    pub fn scalars(&self) -> ControlScalars {
        self.scalars
    }

    pub fn set_scalars(&mut self, scalars: ControlScalars) {
        self.scalars = scalars;
    }

    pub fn canvas(&self) -> CanvasRect {
        self.canvas
    }

    pub fn set_canvas(&mut self, canvas: CanvasRect) {
        self.canvas = canvas;
    }

    pub fn cursor(&self) -> (f32, f32) {
        self.cursor
    }

    /// Any button down, wherever it was pressed. Accumulation pauses while
    /// this holds.
    pub fn buttons_held(&self) -> bool {
        self.left.down || self.right.down
    }

    fn button_mut(&mut self, button: PointerButton) -> &mut ButtonState {
        match button {
            PointerButton::Left => &mut self.left,
            PointerButton::Right => &mut self.right,
        }
    }

    /// Feed one event. Returns the motion applied to `scene`, if any; the
    /// caller must reset accumulation when this is `Some`.
    pub fn handle(&mut self, event: PointerEvent, scene: Option<&mut SceneGraph>) -> Option<CameraMotion> {
        match event {
            PointerEvent::Pressed { button, x, y } => {
                self.cursor = (x, y);
                let on_canvas = self.canvas.contains(x, y);
                *self.button_mut(button) = ButtonState { down: true, on_canvas };
                None
            }
            PointerEvent::Released { button } => {
                *self.button_mut(button) = ButtonState::default();
                None
            }
            PointerEvent::Moved { x, y, modifiers } => {
                let scene = scene?;
                let motion = self.apply_move(scene, x, y, modifiers);
                self.cursor = (x, y);
                motion
            }
        }
    }

    fn apply_move(&self, scene: &mut SceneGraph, x: f32, y: f32, modifiers: Modifiers) -> Option<CameraMotion> {
        let left = self.left.on_canvas;
        let right = self.right.on_canvas;
        let (px, py) = self.cursor;
        let moved = x != px || y != py;
        let (camera, target) = (scene.camera(), scene.target());
        let s = self.scalars;

        if (left && right) || (left && modifiers.shift) {
            if y == py {
                return None;
            }
            scene.nodes_mut().translate(camera, Vec3::new(0.0, (py - y) * s.translate, 0.0));
            Some(CameraMotion::Dolly)
        } else if (left && modifiers.ctrl) || right {
            if !moved {
                return None;
            }
            let dx = (px - x) * s.translate;
            let dz = (y - py) * s.translate;
            let nodes = scene.nodes_mut();
            let dv = nodes.map_pos(camera, Vec4::new(dx, 0.0, dz, 0.0), target);
            nodes.translate(target, dv.truncate());
            Some(CameraMotion::Pan)
        } else if left {
            if !moved {
                return None;
            }
            let nodes = scene.nodes_mut();
            // Yaw the target about its own Z, then pitch the camera about the target's X.
            nodes.rotate_z(target, degrees_to_radians((px - x) * s.rotate), None);
            nodes.rotate_x(camera, degrees_to_radians((py - y) * s.rotate), Some(target));
            Some(CameraMotion::Orbit)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::load_scene_from_str;

    const QUAD: &str = "v -1 -1 0\nv 1 -1 0\nv 1 1 0\nv -1 1 0\nf 1 2 3 4\n";

    fn setup() -> (CameraControls, SceneGraph) {
        let mut controls = CameraControls::new(ControlScalars::default());
        controls.set_canvas(CanvasRect::new(0.0, 0.0, 100.0, 100.0));
        (controls, load_scene_from_str(QUAD, None).unwrap())
    }

    fn press(c: &mut CameraControls, s: &mut SceneGraph, button: PointerButton, x: f32, y: f32) {
        assert_eq!(c.handle(PointerEvent::Pressed { button, x, y }, Some(s)), None);
    }

    fn drag(c: &mut CameraControls, s: &mut SceneGraph, x: f32, y: f32, modifiers: Modifiers) -> Option<CameraMotion> {
        c.handle(PointerEvent::Moved { x, y, modifiers }, Some(s))
    }

    #[test]
    fn test_canvas_contains_is_strict() {
        let r = CanvasRect::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains(15.0, 15.0));
        assert!(!r.contains(10.0, 15.0));
        assert!(!r.contains(15.0, 30.0));
    }

    #[test]
    fn test_left_drag_orbits() {
        let (mut c, mut s) = setup();
        let before = s.nodes().world_position(s.camera());
        let target_before = s.nodes().world_position(s.target());
        press(&mut c, &mut s, PointerButton::Left, 50.0, 50.0);
        assert_eq!(drag(&mut c, &mut s, 60.0, 45.0, Modifiers::default()), Some(CameraMotion::Orbit));

        let after = s.nodes().world_position(s.camera());
        assert!((after - before).length() > 1e-4);
        // Orbit keeps the camera's distance to the target.
        let d0 = (before - target_before).length();
        let d1 = (after - s.nodes().world_position(s.target())).length();
        assert!((d0 - d1).abs() < 1e-4);
    }

    #[test]
    fn test_shift_or_both_buttons_dolly_on_vertical_motion() {
        let (mut c, mut s) = setup();
        press(&mut c, &mut s, PointerButton::Left, 50.0, 50.0);
        let shift = Modifiers { shift: true, ctrl: false };
        assert_eq!(drag(&mut c, &mut s, 70.0, 50.0, shift), None);
        let before = s.nodes().get(s.camera()).position;
        assert_eq!(drag(&mut c, &mut s, 70.0, 40.0, shift), Some(CameraMotion::Dolly));
        let after = s.nodes().get(s.camera()).position;
        assert!((after.y - before.y - 0.1).abs() < 1e-5);

        press(&mut c, &mut s, PointerButton::Right, 70.0, 40.0);
        assert_eq!(drag(&mut c, &mut s, 70.0, 45.0, Modifiers::default()), Some(CameraMotion::Dolly));
    }

    #[test]
    fn test_right_or_ctrl_drag_pans_target() {
        let (mut c, mut s) = setup();
        press(&mut c, &mut s, PointerButton::Right, 50.0, 50.0);
        let before = s.nodes().world_position(s.target());
        assert_eq!(drag(&mut c, &mut s, 40.0, 50.0, Modifiers::default()), Some(CameraMotion::Pan));
        let after = s.nodes().world_position(s.target());
        // Dragging left moves the target along the camera's +X.
        assert!((after - before - Vec3::new(0.1, 0.0, 0.0)).length() < 1e-5);

        c.handle(PointerEvent::Released { button: PointerButton::Right }, Some(&mut s));
        press(&mut c, &mut s, PointerButton::Left, 40.0, 50.0);
        let ctrl = Modifiers { shift: false, ctrl: true };
        assert_eq!(drag(&mut c, &mut s, 40.0, 60.0, ctrl), Some(CameraMotion::Pan));
    }

    #[test]
    fn test_press_outside_canvas_is_ignored() {
        let (mut c, mut s) = setup();
        press(&mut c, &mut s, PointerButton::Left, 150.0, 50.0);
        assert!(c.buttons_held());
        assert_eq!(drag(&mut c, &mut s, 50.0, 50.0, Modifiers::default()), None);

        c.handle(PointerEvent::Released { button: PointerButton::Left }, Some(&mut s));
        assert!(!c.buttons_held());
        assert_eq!(drag(&mut c, &mut s, 60.0, 60.0, Modifiers::default()), None);
    }

    #[test]
    fn test_move_without_scene_keeps_cursor() {
        let mut c = CameraControls::new(ControlScalars::default());
        c.set_canvas(CanvasRect::new(0.0, 0.0, 100.0, 100.0));
        c.handle(PointerEvent::Pressed { button: PointerButton::Left, x: 5.0, y: 5.0 }, None);
        c.handle(PointerEvent::Moved { x: 9.0, y: 9.0, modifiers: Modifiers::default() }, None);
        assert_eq!(c.cursor(), (5.0, 5.0));
    }
}
