//! Cross-view search state machine.
//!
//! Every view kind exposes its rows through [`SearchTarget`]; the engine
//! walks candidates from the last match (or from the selection, inclusive, on
//! the first step) and reports a [`SearchState`].
//!
//! # Producer-backed targets
//!
//! When a forward search runs off the end of the rows in memory and the
//! target can still grow, the engine asks for more data and returns
//! `Continue`. The event loop calls [`SearchEngine::resume`] again after new
//! rows arrive; the walk restarts at the first unexamined candidate. Forward
//! search wraps to the top only once nothing more can arrive. Reverse search
//! never wraps.

use regex::Regex;

/// Result of a search step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchState {
    /// Pattern set, no step taken.
    #[default]
    Waiting,
    /// Waiting for a producer to deliver more rows.
    Continue,
    /// A match was found.
    Complete,
    /// No row matches.
    NoMatch,
    /// Moving to the end of a list that is still loading.
    ForEnd,
}

/// Direction of a search step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDirection {
    /// Towards higher indices (older commits, later lines).
    #[default]
    Forward,
    /// Towards index 0.
    Reverse,
}

impl SearchDirection {
    /// The opposite direction.
    pub fn flip(self) -> Self {
        match self {
            SearchDirection::Forward => SearchDirection::Reverse,
            SearchDirection::Reverse => SearchDirection::Forward,
        }
    }
}

/// Something searchable row by row.
pub trait SearchTarget {
    /// Rows currently available.
    fn len(&self) -> usize;

    /// Whether no rows are available.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether row `index` matches.
    fn is_match(&mut self, index: usize, pattern: &Regex) -> bool;

    /// Whether the row count is final.
    fn exhausted(&self) -> bool {
        true
    }

    /// Ask for more rows. Returns `false` if nothing more can come.
    fn request_more(&mut self) -> bool {
        false
    }
}

/// Search cursor and compiled pattern for one view.
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    pattern: Option<Regex>,
    /// Direction the search was started in.
    initial: SearchDirection,
    /// Absolute direction of the last step.
    direction: SearchDirection,
    state: SearchState,
    matched: Option<usize>,
    /// Next candidate when a step is suspended in `Continue`.
    pending: Option<usize>,
    /// Where the current forward pass began, for full-cycle detection.
    pass_start: usize,
    wrapped: bool,
}

impl SearchEngine {
    /// Engine with no pattern.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a new pattern and reset the cursor.
    pub fn init(&mut self, pattern: Regex, direction: SearchDirection) {
        *self = Self {
            pattern: Some(pattern),
            initial: direction,
            direction,
            ..Self::default()
        };
    }

    /// Forget the pattern.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The compiled pattern, if any.
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Current state.
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Direction of the last step.
    pub fn direction(&self) -> SearchDirection {
        self.direction
    }

    /// Index of the last match.
    pub fn matched(&self) -> Option<usize> {
        self.matched
    }

    /// Whether a step is waiting on the producer (`Continue` or `ForEnd`).
    pub fn is_suspended(&self) -> bool {
        matches!(self.state, SearchState::Continue | SearchState::ForEnd)
    }

    /// Take one search step.
    ///
    /// `direction` is relative to the search's initial direction, so
    /// `Forward` repeats it and `Reverse` flips it (the `n` / `N` keys).
    /// `origin` is the current selection, searched inclusively on the first
    /// step only.
    pub fn next<T: SearchTarget + ?Sized>(
        &mut self,
        target: &mut T,
        direction: SearchDirection,
        origin: usize,
    ) -> SearchState {
        let Some(pattern) = self.pattern.clone() else {
            return SearchState::NoMatch;
        };
        let absolute = match self.initial {
            SearchDirection::Forward => direction,
            SearchDirection::Reverse => direction.flip(),
        };
        let start = match (self.matched, absolute) {
            (None, _) => Some(origin),
            (Some(m), SearchDirection::Forward) => Some(m + 1),
            (Some(m), SearchDirection::Reverse) => m.checked_sub(1),
        };
        self.direction = absolute;
        self.pending = None;
        self.wrapped = false;
        let Some(start) = start else {
            self.state = SearchState::NoMatch;
            return self.state;
        };
        self.pass_start = start;
        match absolute {
            SearchDirection::Forward => self.scan_forward(target, &pattern, start),
            SearchDirection::Reverse => self.scan_reverse(target, &pattern, start),
        }
    }

    /// Resume a step suspended in `Continue` or `ForEnd` after new rows arrived.
    pub fn resume<T: SearchTarget + ?Sized>(&mut self, target: &mut T) -> SearchState {
        match self.state {
            SearchState::Continue => {
                let (Some(pattern), Some(at)) = (self.pattern.clone(), self.pending) else {
                    self.state = SearchState::NoMatch;
                    return self.state;
                };
                self.scan_forward(target, &pattern, at)
            }
            SearchState::ForEnd => self.for_end(target),
            other => other,
        }
    }

    /// Drive to the last row of a list that may still be loading.
    ///
    /// Returns `ForEnd` while rows are still coming, then `Complete` once the
    /// row count is final (`NoMatch` for an empty list). The search match is
    /// left untouched.
    pub fn for_end<T: SearchTarget + ?Sized>(&mut self, target: &mut T) -> SearchState {
        if !target.exhausted() && target.request_more() {
            self.state = SearchState::ForEnd;
            return self.state;
        }
        self.state = if target.is_empty() {
            SearchState::NoMatch
        } else {
            SearchState::Complete
        };
        self.state
    }

    /// Cancel a suspended step.
    pub fn abort(&mut self) {
        if self.is_suspended() {
            self.pending = None;
            self.state = SearchState::Waiting;
        }
    }

    fn scan_forward<T: SearchTarget + ?Sized>(
        &mut self,
        target: &mut T,
        pattern: &Regex,
        mut idx: usize,
    ) -> SearchState {
        loop {
            if self.wrapped && idx >= self.pass_start {
                self.state = SearchState::NoMatch;
                return self.state;
            }
            if idx >= target.len() {
                if !target.exhausted() && target.request_more() {
                    self.pending = Some(idx);
                    self.state = SearchState::Continue;
                    return self.state;
                }
                if self.wrapped || self.pass_start == 0 {
                    self.state = SearchState::NoMatch;
                    return self.state;
                }
                self.wrapped = true;
                idx = 0;
                continue;
            }
            if target.is_match(idx, pattern) {
                self.matched = Some(idx);
                self.pending = None;
                self.state = SearchState::Complete;
                return self.state;
            }
            idx += 1;
        }
    }

    fn scan_reverse<T: SearchTarget + ?Sized>(
        &mut self,
        target: &mut T,
        pattern: &Regex,
        start: usize,
    ) -> SearchState {
        let last = target.len().checked_sub(1);
        let Some(mut idx) = last.map(|last| start.min(last)) else {
            self.state = SearchState::NoMatch;
            return self.state;
        };
        loop {
            if target.is_match(idx, pattern) {
                self.matched = Some(idx);
                self.state = SearchState::Complete;
                return self.state;
            }
            if idx == 0 {
                self.state = SearchState::NoMatch;
                return self.state;
            }
            idx -= 1;
        }
    }
}

/// Rows held fully in memory.
impl SearchTarget for [String] {
    fn len(&self) -> usize {
        <[String]>::len(self)
    }

    fn is_match(&mut self, index: usize, pattern: &Regex) -> bool {
        self.get(index).is_some_and(|row| pattern.is_match(row))
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
