/// Where a callback lands in a hook's dispatch order.
///
/// Higher priorities fire first. `Min` and `Max` are resolved against the
/// callbacks already registered at the moment of insertion and never move
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Explicit(i32),
    /// One below the current lowest priority, or -100 on an empty hook.
    Min,
    /// One above the current highest priority, or 100 on an empty hook.
    Max,
    #[default]
    Normal,
}

impl Priority {
    pub const DEFAULT_MIN: i32 = -100;
    pub const DEFAULT_MAX: i32 = 100;

    /// Turns the priority into a concrete value given the priorities
    /// currently registered.
    pub fn resolve(self, existing: impl IntoIterator<Item = i32>) -> i32 {
        match self {
            Priority::Explicit(value) => value,
            Priority::Normal => 0,
            Priority::Min => existing
                .into_iter()
                .min()
                .map(|p| p.saturating_sub(1))
                .unwrap_or(Self::DEFAULT_MIN),
            Priority::Max => existing
                .into_iter()
                .max()
                .map(|p| p.saturating_add(1))
                .unwrap_or(Self::DEFAULT_MAX),
        }
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Priority::Explicit(value)
    }
}
