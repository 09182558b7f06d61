pub const INITIAL_STAGE: usize = 1;

/// Tracks the active stage of a multi-stage page. Stages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageNavigator {
    current: usize,
    count: usize,
}

impl StageNavigator {
    pub fn new(count: usize) -> StageNavigator {
        StageNavigator {
            current: INITIAL_STAGE,
            count,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Moves to `stage`, clamped to `[1, count]`, and returns the new stage.
    /// Pages without stage labels stay on stage 1.
    pub fn update_current_stage(&mut self, stage: i64) -> usize {
        let max = self.count.max(INITIAL_STAGE) as i64;
        self.current = stage.max(INITIAL_STAGE as i64).min(max) as usize;
        self.current
    }

    pub fn previous(&mut self) -> usize {
        self.update_current_stage(self.current as i64 - 1)
    }

    pub fn next(&mut self) -> usize {
        self.update_current_stage(self.current as i64 + 1)
    }
}
