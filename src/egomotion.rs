// src/egomotion.rs
//
// Projects known vehicle egomotion into image space: world velocity is
// rotated into the body frame, rescaled into a screen-space velocity
// proxy, and used to bias the focus point (center of expansion) that the
// radial sampling fans out from.

use crate::sampling::DependencyAxis;
use crate::types::{EgomotionConfig, RotationOrder, VehicleState};
use nalgebra::{Matrix3, Vector3};
use tracing::debug;

/// Egomotion projected for one frame pair.
#[derive(Debug, Clone)]
pub struct EgomotionSolution {
    pub vel_body: Vector3<f64>,
    /// Body velocity divided by the clamped forward component
    pub vel_screen: Vector3<f64>,
    /// Center of expansion, clamped strictly inside the margin rectangle
    pub focus: (f32, f32),
}

impl EgomotionSolution {
    /// Step-scaling factor for a line of the given dependency axis.
    /// Magnitude is clamped to at least 1 with the sign kept, so slow
    /// flight never collapses the search step to zero.
    pub fn speed_factor(&self, dependency: DependencyAxis) -> f64 {
        let component = match dependency {
            DependencyAxis::Forward => self.vel_body.x,
            DependencyAxis::Lateral => self.vel_body.y,
        };
        clamp_away_from_zero(component)
    }
}

pub struct EgomotionProjector {
    config: EgomotionConfig,
    frame_width: usize,
    frame_height: usize,
}

impl EgomotionProjector {
    pub fn new(config: EgomotionConfig, frame_width: usize, frame_height: usize) -> Self {
        Self {
            config,
            frame_width,
            frame_height,
        }
    }

    pub fn project(&self, state: &VehicleState) -> EgomotionSolution {
        let rotation = self.rotation_world_to_body(state.roll, state.pitch, state.yaw);
        let vel_body = rotation * state.vel_world;

        let reference = clamp_away_from_zero(vel_body.x);
        let vel_screen = vel_body / reference;

        let focus = self.focus_point(&vel_screen);

        debug!(
            vx = vel_body.x,
            vy = vel_body.y,
            vz = vel_body.z,
            focus_x = focus.0,
            focus_y = focus.1,
            "egomotion projected"
        );

        EgomotionSolution {
            vel_body,
            vel_screen,
            focus,
        }
    }

    /// World-to-body rotation as three chained axis rotations. The
    /// composition order is configuration: both conventions seen in
    /// earlier versions of this algorithm are available, and the right
    /// one for a log should be confirmed against a known trajectory.
    fn rotation_world_to_body(&self, roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
        match self.config.rotation_order {
            RotationOrder::Zyx => rot_z(yaw) * rot_y(pitch) * rot_x(roll),
            RotationOrder::Xyz => rot_x(yaw) * rot_y(pitch) * rot_z(roll),
        }
    }

    /// Bias the image center by the lateral and vertical screen-velocity
    /// components, then clamp into the interior rectangle so the focus
    /// point never reaches the border.
    fn focus_point(&self, vel_screen: &Vector3<f64>) -> (f32, f32) {
        let center_x = self.frame_width as f32 / 2.0;
        let center_y = self.frame_height as f32 / 2.0;

        let x = center_x + self.config.focus_gain * vel_screen.y as f32;
        let y = center_y + self.config.focus_gain * vel_screen.z as f32;

        (
            bound(
                x,
                self.config.focus_margin_x,
                self.frame_width as f32 - self.config.focus_margin_x,
            ),
            bound(
                y,
                self.config.focus_margin_y,
                self.frame_height as f32 - self.config.focus_margin_y,
            ),
        )
    }
}

fn rot_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, c, -s, //
        0.0, s, c,
    )
}

fn rot_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, 0.0, s, //
        0.0, 1.0, 0.0, //
        -s, 0.0, c,
    )
}

fn rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, -s, 0.0, //
        s, c, 0.0, //
        0.0, 0.0, 1.0,
    )
}

/// Keep the sign, force the magnitude to at least 1. Guards the
/// screen-velocity division against near-hover blow-up.
fn clamp_away_from_zero(value: f64) -> f64 {
    if value.abs() < 1.0 {
        if value.is_sign_negative() {
            -1.0
        } else {
            1.0
        }
    } else {
        value
    }
}

fn bound(value: f32, lower: f32, upper: f32) -> f32 {
    value.max(lower).min(upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EgomotionConfig;
    use approx::assert_relative_eq;

    fn state(roll: f64, pitch: f64, yaw: f64, vel: [f64; 3]) -> VehicleState {
        VehicleState {
            roll,
            pitch,
            yaw,
            vel_world: Vector3::new(vel[0], vel[1], vel[2]),
            timestamp_s: 0.0,
        }
    }

    fn projector() -> EgomotionProjector {
        EgomotionProjector::new(EgomotionConfig::default(), 520, 240)
    }

    #[test]
    fn zero_attitude_keeps_world_velocity() {
        let solution = projector().project(&state(0.0, 0.0, 0.0, [2.0, 0.5, -0.3]));
        assert_relative_eq!(solution.vel_body.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(solution.vel_body.y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(solution.vel_body.z, -0.3, epsilon = 1e-12);
    }

    #[test]
    fn quarter_yaw_swaps_axes() {
        let solution = projector().project(&state(
            0.0,
            0.0,
            std::f64::consts::FRAC_PI_2,
            [1.0, 0.0, 0.0],
        ));
        // Rz(90 deg) maps world x onto body y
        assert_relative_eq!(solution.vel_body.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(solution.vel_body.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn slow_forward_velocity_is_clamped() {
        let solution = projector().project(&state(0.0, 0.0, 0.0, [0.01, 0.4, 0.0]));
        // Reference forced to 1, so screen velocity equals body velocity
        assert_relative_eq!(solution.vel_screen.y, 0.4, epsilon = 1e-12);

        let backwards = projector().project(&state(0.0, 0.0, 0.0, [-0.01, 0.4, 0.0]));
        assert_relative_eq!(backwards.vel_screen.y, -0.4, epsilon = 1e-12);
    }

    #[test]
    fn extreme_velocity_keeps_focus_inside_margins() {
        let config = EgomotionConfig::default();
        let solution = projector().project(&state(0.0, 0.0, 0.0, [1.0, 1000.0, -1000.0]));

        assert!(solution.focus.0 >= config.focus_margin_x);
        assert!(solution.focus.0 <= 520.0 - config.focus_margin_x);
        assert!(solution.focus.1 >= config.focus_margin_y);
        assert!(solution.focus.1 <= 240.0 - config.focus_margin_y);
    }

    #[test]
    fn speed_factor_selects_dependency_axis() {
        let solution = projector().project(&state(0.0, 0.0, 0.0, [3.0, -2.0, 0.0]));
        assert_relative_eq!(
            solution.speed_factor(DependencyAxis::Forward),
            3.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            solution.speed_factor(DependencyAxis::Lateral),
            -2.0,
            epsilon = 1e-12
        );

        let hover = projector().project(&state(0.0, 0.0, 0.0, [0.2, -0.2, 0.0]));
        assert_relative_eq!(
            hover.speed_factor(DependencyAxis::Forward),
            1.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            hover.speed_factor(DependencyAxis::Lateral),
            -1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn rotation_orders_differ_for_nonzero_attitude() {
        let zyx = EgomotionProjector::new(EgomotionConfig::default(), 520, 240);
        let xyz = EgomotionProjector::new(
            EgomotionConfig {
                rotation_order: RotationOrder::Xyz,
                ..EgomotionConfig::default()
            },
            520,
            240,
        );
        let s = state(0.3, -0.2, 1.1, [1.5, 0.5, 0.1]);
        let a = zyx.project(&s).vel_body;
        let b = xyz.project(&s).vel_body;
        assert!((a - b).norm() > 1e-6);
    }
}
