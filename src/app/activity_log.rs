// Activity log shown under the download form.
// - Collects one line per stage, subprocess command, and outcome.
// - Scrolls and pages like a pager and keeps following the tail until the
//   user scrolls up.
use std::cell::Cell;

#[derive(Debug, Clone)]
pub(crate) struct ActivityLog {
    lines: Vec<String>,
    scroll: Cell<usize>,
    last_max_scroll_top: Cell<usize>,
    follow_tail: bool,
}

impl ActivityLog {
    const PAGE_STEP: usize = 12;
    const MAX_LINES: usize = 5_000;

    pub(crate) fn empty() -> Self {
        Self {
            lines: Vec::new(),
            scroll: Cell::new(0),
            last_max_scroll_top: Cell::new(0),
            follow_tail: true,
        }
    }

    /// Starts a new block for a load or download. Older blocks stay visible
    /// above it.
    pub(crate) fn begin_section(&mut self, title: &str) {
        if !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.follow_tail = true;
        self.push(format!("== {title} =="));
    }

    pub(crate) fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
        self.trim_old_lines_if_needed();
        if self.follow_tail {
            self.scroll.set(self.lines.len().saturating_sub(1));
        }
    }

    pub(crate) fn push_error(&mut self, message: &str) {
        self.push(format!("error: {message}"));
    }

    pub(crate) fn scroll_down(&mut self) {
        self.scroll_to(self.scroll.get() + 1);
    }

    pub(crate) fn scroll_up(&mut self) {
        self.scroll.set(self.scroll.get().saturating_sub(1));
        self.follow_tail = false;
    }

    pub(crate) fn page_down(&mut self) {
        self.scroll_to(self.scroll.get() + Self::PAGE_STEP);
    }

    pub(crate) fn page_up(&mut self) {
        self.scroll
            .set(self.scroll.get().saturating_sub(Self::PAGE_STEP));
        self.follow_tail = false;
    }

    pub(crate) fn lines(&self) -> &[String] {
        &self.lines
    }

    pub(crate) fn scroll(&self) -> usize {
        self.scroll.get()
    }

    pub(crate) fn clamped_scroll_for_viewport(&self, visible_line_count: usize) -> usize {
        let visible_line_count = visible_line_count.max(1);
        let max_scroll_top = self.lines.len().saturating_sub(visible_line_count);
        self.last_max_scroll_top.set(max_scroll_top);
        let clamped = if self.follow_tail {
            max_scroll_top
        } else {
            self.scroll().min(max_scroll_top)
        };
        self.scroll.set(clamped);
        clamped
    }

    fn scroll_to(&mut self, target: usize) {
        let max_scroll = self.last_max_scroll_top.get();
        let next = target.min(max_scroll);
        self.scroll.set(next);
        if next >= max_scroll {
            self.follow_tail = true;
        }
    }

    fn trim_old_lines_if_needed(&mut self) {
        if self.lines.len() <= Self::MAX_LINES {
            return;
        }

        let overflow = self.lines.len() - Self::MAX_LINES;
        self.lines.drain(0..overflow);
        self.scroll.set(self.scroll.get().saturating_sub(overflow));
    }
}
