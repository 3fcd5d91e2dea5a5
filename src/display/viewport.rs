//! Scroll position over the rendered transcript

/// Line offset into the transcript, or pinned to its bottom
///
/// The renderer calls [`Viewport::fit`] with the current content and window
/// height before drawing; scroll commands are resolved against the last fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    offset: usize,
    following: bool,
    max_offset: usize,
    height: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: 0,
            following: true,
            max_offset: 0,
            height: 0,
        }
    }
}

impl Viewport {
    /// Record content and window size; returns the offset to draw from
    pub fn fit(&mut self, total_lines: usize, height: usize) -> usize {
        self.height = height;
        self.max_offset = total_lines.saturating_sub(height);
        if self.following {
            self.offset = self.max_offset;
        } else {
            self.offset = self.offset.min(self.max_offset);
        }
        self.offset
    }

    #[cfg(test)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[cfg(test)]
    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn follow(&mut self) {
        self.following = true;
        self.offset = self.max_offset;
    }

    /// Stop following and stay at the current offset
    pub fn hold(&mut self) {
        self.following = false;
    }

    fn set(&mut self, offset: usize) {
        self.offset = offset.min(self.max_offset);
        self.following = self.offset == self.max_offset;
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.set(self.offset.saturating_sub(lines));
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.set(self.offset.saturating_add(lines));
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.height / 2).max(1));
    }

    pub fn half_page_down(&mut self) {
        self.scroll_down((self.height / 2).max(1));
    }

    pub fn top(&mut self) {
        self.set(0);
    }

    pub fn bottom(&mut self) {
        self.follow();
    }

    /// Scroll position as a percentage, 100 when everything fits
    pub fn percent(&self) -> usize {
        if self.max_offset == 0 {
            100
        } else {
            self.offset * 100 / self.max_offset
        }
    }
}
