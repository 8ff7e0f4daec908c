/// Distance from the tail at which a pending scroll counts as fulfilled.
const TAIL_REACHED_THRESHOLD: f32 = 24.0;

/// Tracks scroll-to-newest requests independent from message content.
///
/// Offsets are reported by the renderer in content units, growing downward;
/// `max_offset` is the offset at which the newest entry is fully visible.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrollManager {
    pending_scroll_to_bottom: bool,
    generation: u64,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending_scroll(&self) -> bool {
        self.pending_scroll_to_bottom
    }

    /// Bumped on every explicit request; renderers scroll when it changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request_scroll_to_bottom(&mut self) {
        self.pending_scroll_to_bottom = true;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn reset(&mut self) {
        self.request_scroll_to_bottom();
    }

    /// Folds one renderer scroll report in; reaching the tail settles a pending request.
    pub fn observe(&mut self, offset: f32, max_offset: f32) {
        let at_tail = max_offset <= 0.0 || (max_offset - offset).abs() <= TAIL_REACHED_THRESHOLD;
        if self.pending_scroll_to_bottom && at_tail {
            self.pending_scroll_to_bottom = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_bumps_generation_until_renderer_reaches_tail() {
        let mut scroll = ScrollManager::new();
        scroll.request_scroll_to_bottom();
        assert_eq!(scroll.generation(), 1);
        assert!(scroll.has_pending_scroll());

        scroll.observe(0.0, 600.0);
        assert!(scroll.has_pending_scroll());

        scroll.observe(590.0, 600.0);
        assert!(!scroll.has_pending_scroll());
        assert_eq!(scroll.generation(), 1);
    }

    #[test]
    fn reset_requests_a_fresh_scroll() {
        let mut scroll = ScrollManager::new();
        scroll.observe(0.0, 0.0);
        assert!(!scroll.has_pending_scroll());

        scroll.reset();
        assert!(scroll.has_pending_scroll());
        assert_eq!(scroll.generation(), 1);
    }
}
