//! Camera hardware descriptors.

use std::collections::BTreeSet;

/// The lens role of a physical camera at one facing position.
///
/// Ordering follows the lens selector layout: ultra-wide, wide, telephoto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CameraRole {
    UltraWide,
    Wide,
    Telephoto,
}

/// The overall camera system available at a facing position, derived from
/// the set of lens roles present. Ordered by capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CameraSystem {
    /// Single wide camera only.
    Wide,
    /// Wide plus telephoto.
    Dual,
    /// Wide plus ultra-wide.
    DualWide,
    /// Ultra-wide, wide, and telephoto.
    Triple,
}

impl CameraSystem {
    /// Classify a set of available roles. A wide camera is assumed present;
    /// an empty set still classifies as `Wide` so callers degrade gracefully.
    pub fn from_roles(roles: &BTreeSet<CameraRole>) -> Self {
        let has_ultra_wide = roles.contains(&CameraRole::UltraWide);
        let has_telephoto = roles.contains(&CameraRole::Telephoto);
        match (has_ultra_wide, has_telephoto) {
            (true, true) => CameraSystem::Triple,
            (true, false) => CameraSystem::DualWide,
            (false, true) => CameraSystem::Dual,
            (false, false) => CameraSystem::Wide,
        }
    }

    /// Whether the system contains an ultra-wide lens. Systems with one use
    /// a 0.5 visible-zoom multiplier so the wide lens presents as 1x.
    pub fn includes_ultra_wide(self) -> bool {
        matches!(self, CameraSystem::DualWide | CameraSystem::Triple)
    }
}

/// Which side of the device a camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacingPosition {
    Front,
    Back,
}

impl FacingPosition {
    pub fn toggled(self) -> Self {
        match self {
            FacingPosition::Front => FacingPosition::Back,
            FacingPosition::Back => FacingPosition::Front,
        }
    }
}

/// Flash behavior for still photos; doubles as the torch request for video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlashMode {
    Off,
    Auto,
    On,
}

impl FlashMode {
    /// Cycle through auto, on, off.
    pub fn toggled(self) -> Self {
        match self {
            FlashMode::Auto => FlashMode::On,
            FlashMode::On => FlashMode::Off,
            FlashMode::Off => FlashMode::Auto,
        }
    }

    pub fn torch_mode(self) -> TorchMode {
        match self {
            FlashMode::Off => TorchMode::Off,
            FlashMode::Auto => TorchMode::Auto,
            FlashMode::On => TorchMode::On,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TorchMode {
    Off,
    On,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusMode {
    Locked,
    Auto,
    ContinuousAuto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExposureMode {
    Locked,
    Auto,
    ContinuousAuto,
}

/// Device orientation used to tag captured media.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl Orientation {
    pub fn is_landscape(self) -> bool {
        matches!(self, Orientation::LandscapeLeft | Orientation::LandscapeRight)
    }
}
