//! Local and global click totals.

/// Click totals mirrored from the server.
///
/// The server is authoritative for both values: `local` is overwritten by
/// every acknowledgement and `global` is only ever set from a reported total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickCounters {
    local: u64,
    global: Option<u64>,
}

impl ClickCounters {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            local: 0,
            global: None,
        }
    }

    /// Clicks made by this client, as last acknowledged by the server.
    #[must_use]
    pub const fn local(&self) -> u64 {
        self.local
    }

    /// Total clicks across all clients, once the server has reported one.
    #[must_use]
    pub const fn global(&self) -> Option<u64> {
        self.global
    }

    /// Returns `true` if the value changed.
    pub const fn set_local(&mut self, count: u64) -> bool {
        let changed = self.local != count;
        self.local = count;
        changed
    }

    /// Returns `true` if the value changed.
    pub const fn set_global(&mut self, count: u64) -> bool {
        let changed = !matches!(self.global, Some(x) if x == count);
        self.global = Some(count);
        changed
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn test_starts_with_zero_local_and_unknown_global() {
        let counters = ClickCounters::new();

        assert_eq!(counters.local(), 0);
        assert_eq!(counters.global(), None);
    }

    #[test_log::test]
    fn test_set_local_reports_changes_only() {
        let mut counters = ClickCounters::new();

        assert!(!counters.set_local(0));
        assert!(counters.set_local(7));
        assert!(!counters.set_local(7));
        assert_eq!(counters.local(), 7);
    }

    #[test_log::test]
    fn test_first_global_value_is_a_change_even_when_zero() {
        let mut counters = ClickCounters::new();

        assert!(counters.set_global(0));
        assert!(!counters.set_global(0));
        assert!(counters.set_global(142));
        assert_eq!(counters.global(), Some(142));
    }
}
