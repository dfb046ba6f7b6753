// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing curves for tween interpolation.
//!
//! Every curve maps an elapsed-time fraction in `[0, 1]` to an eased
//! progress fraction, with `0 -> 0` and `1 -> 1`. Bounce curves overshoot
//! nothing but hit `1.0` several times on the way in or out.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

const BOUNCE_SCALE: f32 = 7.5625;
const BOUNCE_SPAN: f32 = 2.75;

/// Easing curve applied to a tween
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Easing {
    /// No easing
    #[default]
    Linear,
    /// Quadratic, slow start
    QuadIn,
    /// Quadratic, slow end
    QuadOut,
    /// Quadratic, slow start and end
    QuadInOut,
    /// Cubic, slow start
    CubicIn,
    /// Cubic, slow end
    CubicOut,
    /// Cubic, slow start and end
    CubicInOut,
    /// Sine, slow start
    SineIn,
    /// Sine, slow end
    SineOut,
    /// Sine, slow start and end
    SineInOut,
    /// Bounces at the start
    BounceIn,
    /// Bounces at the end, like an object landing on the floor
    BounceOut,
    /// Bounces at both ends
    BounceInOut,
}

impl Easing {
    /// Evaluate the curve at `t`. Input is clamped to `[0, 1]`.
    #[inline]
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => {
                let omt = 1.0 - t;
                1.0 - omt * omt
            }
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u / 2.0
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let omt = 1.0 - t;
                1.0 - omt * omt * omt
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
            Easing::SineIn => 1.0 - (t * PI / 2.0).cos(),
            Easing::SineOut => (t * PI / 2.0).sin(),
            Easing::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Easing::BounceIn => 1.0 - bounce_out(1.0 - t),
            Easing::BounceOut => bounce_out(t),
            Easing::BounceInOut => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Easing::Linear => "Linear",
            Easing::QuadIn => "Quad In",
            Easing::QuadOut => "Quad Out",
            Easing::QuadInOut => "Quad In-Out",
            Easing::CubicIn => "Cubic In",
            Easing::CubicOut => "Cubic Out",
            Easing::CubicInOut => "Cubic In-Out",
            Easing::SineIn => "Sine In",
            Easing::SineOut => "Sine Out",
            Easing::SineInOut => "Sine In-Out",
            Easing::BounceIn => "Bounce In",
            Easing::BounceOut => "Bounce Out",
            Easing::BounceInOut => "Bounce In-Out",
        }
    }
}

/// Piecewise-parabolic bounce, four arcs landing at 1.0
fn bounce_out(t: f32) -> f32 {
    if t < 1.0 / BOUNCE_SPAN {
        BOUNCE_SCALE * t * t
    } else if t < 2.0 / BOUNCE_SPAN {
        let t = t - 1.5 / BOUNCE_SPAN;
        BOUNCE_SCALE * t * t + 0.75
    } else if t < 2.5 / BOUNCE_SPAN {
        let t = t - 2.25 / BOUNCE_SPAN;
        BOUNCE_SCALE * t * t + 0.9375
    } else {
        let t = t - 2.625 / BOUNCE_SPAN;
        BOUNCE_SCALE * t * t + 0.984375
    }
}
