//! Core value types shared across the crate

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-axis physical voxel size in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution([f64; 3]);

impl Resolution {
    /// Minimum resolution accepted by the segmentation pipeline
    pub const DEFAULT_FLOOR: Self = Self([0.5, 0.5, 0.5]);

    /// Create a new resolution from per-axis sizes
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }

    /// Same size along every axis
    pub fn isotropic(size: f64) -> Self {
        Self([size; 3])
    }

    /// Size along one axis (0, 1 or 2)
    pub fn get(&self, axis: usize) -> f64 {
        self.0[axis]
    }

    /// Check that every axis is a finite, strictly positive length
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|v| v.is_finite() && *v > 0.0)
    }

    /// True if any axis is strictly finer than the same axis of `floor`
    pub fn is_finer_than(&self, floor: &Resolution) -> bool {
        self.0.iter().zip(floor.0.iter()).any(|(s, f)| s < f)
    }

    /// Per-axis maximum of `self` and `floor`
    pub fn coarsened_to(&self, floor: &Resolution) -> Resolution {
        let mut out = self.0;
        for (o, f) in out.iter_mut().zip(floor.0.iter()) {
            *o = o.max(*f);
        }
        Self(out)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::DEFAULT_FLOOR
    }
}

impl From<[f64; 3]> for Resolution {
    fn from(value: [f64; 3]) -> Self {
        Self(value)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{} mm", self.0[0], self.0[1], self.0[2])
    }
}

/// Container engine the printed command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ContainerEngine {
    Docker,
    Singularity,
}

impl ContainerEngine {
    /// Banner printed above the command
    pub fn banner(&self) -> &'static str {
        match self {
            ContainerEngine::Docker => {
                "======================== Docker Command ========================"
            }
            ContainerEngine::Singularity => {
                "===================== Singularity Command ======================"
            }
        }
    }
}

impl fmt::Display for ContainerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// BIDS-App analysis level
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AnalysisLevel {
    Participant,
    Group,
}
