//! Planar motion messages.

use crate::standard::Header;

crate::message! {
    /// Planar velocity: linear `vx`/`vy` in m/s, angular `wz` in rad/s.
    pub struct Twist2D {
        pub vx: f64,
        pub vy: f64,
        pub wz: f64,
    }
}

impl Twist2D {
    pub fn new(vx: f64, vy: f64, wz: f64) -> Self {
        Self { vx, vy, wz }
    }

    /// True when every component is zero.
    pub fn is_stop(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0 && self.wz == 0.0
    }
}

crate::message! {
    pub struct Twist2DStamped {
        pub header: Header,
        pub twist: Twist2D,
    }
}

impl Twist2DStamped {
    /// A zero twist with an empty header.
    pub fn stop() -> Self {
        Self::default()
    }
}

crate::message! {
    /// Planar pose: position in meters, heading in radians.
    pub struct Pose2D {
        pub x: f64,
        pub y: f64,
        pub theta: f64,
    }
}

crate::message! {
    pub struct Path2D {
        pub header: Header,
        pub poses: Vec<Pose2D>,
    }
}
