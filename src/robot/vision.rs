// Optional vision subsystem adapter
//
// The external tracker is expensive to hold open, so it only exists
// between enable and disable. State is a sum type rather than a nullable
// handle: queries while disabled are an ordinary "no data" answer, and
// the session is released exactly once no matter how disable is reached.

use std::mem;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::hardware::Result;

/// Field-relative robot pose reported by the position tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldPosition {
    pub x_in: f64,
    pub y_in: f64,
    pub z_in: f64,
    pub heading_deg: f64,
}

/// Which lane the gold mineral was seen in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoldPosition {
    Left,
    Center,
    Right,
}

/// One mineral detection attempt result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MineralSample {
    pub gold: GoldPosition,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraView {
    Rear,
    Side,
}

/// Tracker configuration handed to the backend on every enable
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub license_key: String,
    pub rear_camera: String,
    pub side_camera: String,
    pub forward_offset_in: f32,
    pub left_offset_mm: f32,
    pub vertical_offset_in: f32,
    pub rotational_offset_deg: f32,
}

impl VisionConfig {
    pub fn from_constants() -> Self {
        use crate::config;
        Self {
            license_key: config::VISION_KEY.to_string(),
            rear_camera: config::POSITION_CAMERA.to_string(),
            side_camera: config::MINERAL_CAMERA.to_string(),
            forward_offset_in: config::CAM_FORWARD_OFFSET_IN,
            left_offset_mm: config::CAM_LEFT_OFFSET_MM,
            vertical_offset_in: config::CAM_VERTICAL_OFFSET_IN,
            rotational_offset_deg: config::CAM_ROTATIONAL_OFFSET_DEG,
        }
    }
}

/// A running tracker session
pub trait VisionSession: Send {
    fn select_camera(&mut self, view: CameraView) -> Result<()>;

    /// Latest field position, if the tracker currently sees a target
    fn field_position(&mut self) -> Option<FieldPosition>;

    /// One non-blocking detection attempt; at most one result per call
    fn try_sample(&mut self) -> Option<MineralSample>;

    fn stop(&mut self);
}

/// Creates tracker sessions; the pipeline behind it is out of scope
pub trait VisionBackend: Send {
    fn start(&mut self, config: &VisionConfig) -> Result<Box<dyn VisionSession>>;
}

enum VisionState {
    Disabled,
    Active(Box<dyn VisionSession>),
}

pub struct Vision {
    backend: Box<dyn VisionBackend>,
    config: VisionConfig,
    state: VisionState,
}

impl Vision {
    pub fn new(backend: Box<dyn VisionBackend>, config: VisionConfig) -> Self {
        Self {
            backend,
            config,
            state: VisionState::Disabled,
        }
    }

    /// Start a fresh session. An already-active session is torn down
    /// first so the external tracker handle cannot leak.
    pub fn enable(&mut self) -> Result<()> {
        self.disable();
        info!("starting vision tracker");
        let session = self.backend.start(&self.config)?;
        self.state = VisionState::Active(session);
        Ok(())
    }

    /// Stop and release the session. Safe to call repeatedly.
    pub fn disable(&mut self) {
        if let VisionState::Active(mut session) = mem::replace(&mut self.state, VisionState::Disabled)
        {
            info!("stopping vision tracker");
            session.stop();
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, VisionState::Active(_))
    }

    /// Camera selection is a no-op while disabled
    pub fn select_camera(&mut self, view: CameraView) -> Result<()> {
        match &mut self.state {
            VisionState::Active(session) => session.select_camera(view),
            VisionState::Disabled => Ok(()),
        }
    }

    pub fn field_position(&mut self) -> Option<FieldPosition> {
        match &mut self.state {
            VisionState::Active(session) => session.field_position(),
            VisionState::Disabled => None,
        }
    }

    pub fn try_sample(&mut self) -> Option<MineralSample> {
        match &mut self.state {
            VisionState::Active(session) => session.try_sample(),
            VisionState::Disabled => None,
        }
    }
}

impl Drop for Vision {
    fn drop(&mut self) {
        self.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::SimVision;

    fn vision() -> (Vision, std::sync::Arc<std::sync::Mutex<crate::hardware::sim::VisionStats>>) {
        let backend = SimVision::new()
            .with_position(FieldPosition {
                x_in: 12.0,
                y_in: -24.0,
                z_in: 0.0,
                heading_deg: 90.0,
            })
            .with_sample(MineralSample {
                gold: GoldPosition::Center,
                confidence: 0.8,
            });
        let stats = backend.stats();
        (
            Vision::new(Box::new(backend), VisionConfig::from_constants()),
            stats,
        )
    }

    #[test]
    fn disabled_queries_return_no_data() {
        let (mut v, _stats) = vision();
        assert!(v.field_position().is_none());
        assert!(v.try_sample().is_none());
        assert!(v.select_camera(CameraView::Side).is_ok());
    }

    #[test]
    fn active_session_answers_queries() {
        let (mut v, _stats) = vision();
        v.enable().unwrap();
        assert!(v.is_active());
        assert_eq!(v.field_position().unwrap().heading_deg, 90.0);
        assert_eq!(v.try_sample().unwrap().gold, GoldPosition::Center);
    }

    #[test]
    fn disable_releases_exactly_once() {
        let (mut v, stats) = vision();
        v.enable().unwrap();
        v.disable();
        v.disable();
        let s = stats.lock().unwrap();
        assert_eq!(s.started, 1);
        assert_eq!(s.stopped, 1);
    }

    #[test]
    fn queries_go_dark_after_disable() {
        let (mut v, _stats) = vision();
        v.enable().unwrap();
        v.disable();
        assert!(v.try_sample().is_none());
        assert!(v.field_position().is_none());
    }

    #[test]
    fn reenable_creates_a_fresh_session() {
        let (mut v, stats) = vision();
        v.enable().unwrap();
        v.disable();
        v.enable().unwrap();
        assert!(v.try_sample().is_some());
        assert_eq!(stats.lock().unwrap().started, 2);
    }

    #[test]
    fn enable_while_active_tears_down_the_old_session() {
        let (mut v, stats) = vision();
        v.enable().unwrap();
        v.enable().unwrap();
        let s = stats.lock().unwrap();
        assert_eq!(s.started, 2);
        assert_eq!(s.stopped, 1);
    }

    #[test]
    fn drop_stops_an_active_session() {
        let (mut v, stats) = vision();
        v.enable().unwrap();
        drop(v);
        assert_eq!(stats.lock().unwrap().stopped, 1);
    }
}
