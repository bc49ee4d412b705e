/// Tracks visibility of the trailing marker below the list.
///
/// Only a hidden-to-visible transition counts as intent to load more; a
/// marker that merely stays in view is not a new request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sentinel {
    visible: bool,
}

impl Sentinel {
    pub fn new() -> Self {
        Sentinel::default()
    }

    /// Records a visibility report; returns true on a rising edge.
    pub fn observe(&mut self, visible: bool) -> bool {
        let rising = visible && !self.visible;
        self.visible = visible;
        rising
    }

    /// Forget the last report. Called once a page lands and pushes the marker
    /// down, so a marker that is still in view fires again.
    pub fn rearm(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}
