//! Axis remapping between file space and the caller's coordinate system.

use std::fmt;
use std::str::FromStr;

/// Which file axis becomes the caller's up axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    XUp,
    #[default]
    YUp,
    ZUp,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" | "x-up" | "xup" => Ok(Orientation::XUp),
            "y" | "y-up" | "yup" => Ok(Orientation::YUp),
            "z" | "z-up" | "zup" => Ok(Orientation::ZUp),
            other => Err(format!("unknown orientation '{other}' (expected x, y or z)")),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::XUp => "x-up",
            Orientation::YUp => "y-up",
            Orientation::ZUp => "z-up",
        })
    }
}

/// Applied to vertex positions and centroids on decode, inverted on encode.
/// Normals, UVs and radii are never transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisTransform {
    pub orientation: Orientation,
    /// Negate X before the axes are permuted.
    pub negate_x: bool,
}

impl AxisTransform {
    pub fn new(orientation: Orientation, negate_x: bool) -> Self {
        Self {
            orientation,
            negate_x,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.orientation == Orientation::YUp && !self.negate_x
    }

    /// File space to caller space.
    pub fn apply(&self, [x, y, z]: [f32; 3]) -> [f32; 3] {
        let x = if self.negate_x { -x } else { x };
        match self.orientation {
            Orientation::XUp => [y, x, z],
            Orientation::YUp => [x, y, z],
            Orientation::ZUp => [x, z, y],
        }
    }

    /// Caller space back to file space.
    pub fn invert(&self, [a, b, c]: [f32; 3]) -> [f32; 3] {
        let [x, y, z] = match self.orientation {
            Orientation::XUp => [b, a, c],
            Orientation::YUp => [a, b, c],
            Orientation::ZUp => [a, c, b],
        };
        [if self.negate_x { -x } else { x }, y, z]
    }
}
