/// A spawn trigger from any input source (UI button, key binding, or a
/// future controller event). All sources funnel through this one union so
/// every embodiment shares the same entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SpawnSphere,
    SpawnBox,
    /// Spawn several boxes at once (the debug panel's bulk button).
    SpawnBoxBurst(u32),
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_are_comparable() {
        assert_eq!(Action::SpawnSphere, Action::SpawnSphere);
        assert_ne!(Action::SpawnBox, Action::Reset);
        assert!(matches!(Action::SpawnBoxBurst(10), Action::SpawnBoxBurst(_)));
    }
}
