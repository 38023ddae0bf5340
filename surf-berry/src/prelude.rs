//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, Label};

pub use crate::config::InterpolationConfig;
pub use crate::consts::{ISO_VALUE, MIN_CONTOURS, PLANE_TOLERANCE};

pub use crate::geometry::{AffineTransform, PlaneGeometry, Point3, Vec3, VolumeGeometry};
pub use crate::volume::{LabelMask, ReferenceVolume, VolumeError, VoxelData};

pub use crate::contour::{Contour, ContourRecord, ContourStore, SlotChange};
pub use crate::mesh::Surface;

pub use crate::controller::{
    ControllerState, InterpolationEvent, InterpolationObserver, ObserverId,
    SurfaceInterpolationController,
};
pub use crate::memory::{FixedMemory, MemoryInfo};
