//! Concurrently readable progress reporting and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use stereo_sgm_core::Point2;

/// Pipeline stage currently executing on one aggregation side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SgmPhase {
    #[default]
    NotRun,
    Census,
    PathsInit,
    SweepTopDown,
    SweepBottomUp,
    Disparities,
    Done,
}

#[derive(Clone, Copy, Debug, Default)]
struct Progress {
    phase: SgmPhase,
    pixel: Point2,
}

fn render(progress: &Progress) -> String {
    match progress.phase {
        SgmPhase::NotRun => "not run".to_string(),
        SgmPhase::Census => format!("census transform at {}", progress.pixel),
        SgmPhase::PathsInit => "preparing paths".to_string(),
        SgmPhase::SweepTopDown => format!("top-down sweep at {}", progress.pixel),
        SgmPhase::SweepBottomUp => format!("bottom-up sweep at {}", progress.pixel),
        SgmPhase::Disparities => format!("selecting disparities at {}", progress.pixel),
        SgmPhase::Done => "done".to_string(),
    }
}

/// Lock-protected progress record, written by worker tasks and rendered by
/// the control thread.
#[derive(Debug, Default)]
pub struct StatusSlot {
    inner: Mutex<Progress>,
}

impl StatusSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_phase(&self, phase: SgmPhase) {
        let mut progress = self.inner.lock().expect("status lock poisoned");
        progress.phase = phase;
        progress.pixel = Point2::default();
    }

    pub fn set_pixel(&self, pixel: Point2) {
        self.inner.lock().expect("status lock poisoned").pixel = pixel;
    }

    pub fn render(&self) -> String {
        render(&self.inner.lock().expect("status lock poisoned"))
    }

    pub fn reset(&self) {
        self.set_phase(SgmPhase::NotRun);
    }
}

/// Shared cooperative cancellation flag.
///
/// Set by `terminate`, polled between pixels by every pipeline stage.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_phase_and_pixel() {
        let slot = StatusSlot::new();
        assert_eq!(slot.render(), "not run");

        slot.set_phase(SgmPhase::SweepTopDown);
        slot.set_pixel(Point2::new(3, 11));
        assert_eq!(slot.render(), "top-down sweep at (3, 11)");

        slot.set_phase(SgmPhase::Done);
        assert_eq!(slot.render(), "done");
    }

    #[test]
    fn phase_change_resets_pixel() {
        let slot = StatusSlot::new();
        slot.set_phase(SgmPhase::Census);
        slot.set_pixel(Point2::new(5, 5));
        slot.set_phase(SgmPhase::Disparities);
        assert_eq!(slot.render(), "selecting disparities at (0, 0)");
    }

    #[test]
    fn cancel_flag_round_trip() {
        let flag = CancelFlag::new();
        assert!(!flag.is_set());
        let clone = flag.clone();
        clone.set();
        assert!(flag.is_set());
        flag.clear();
        assert!(!clone.is_set());
    }
}
