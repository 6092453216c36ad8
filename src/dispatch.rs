//! # Dispatch
//!
//! Caller-owned table mapping flag predicates to handlers. A hook invocation
//! collects the active flags (persisted plus those derived from the event),
//! asks the dispatcher which rules hold, and runs their handlers in table
//! order. The reconciler itself knows nothing about this table.

use std::collections::BTreeSet;

/// Flags active for one invocation
pub type ActiveFlags = BTreeSet<String>;

/// A handler guarded by flag predicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<H> {
    pub handler: H,
    requires: Vec<String>,
    forbids: Vec<String>,
}

impl<H> Rule<H> {
    fn matches(&self, active: &ActiveFlags) -> bool {
        self.requires.iter().all(|flag| active.contains(flag))
            && !self.forbids.iter().any(|flag| active.contains(flag))
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher<H> {
    rules: Vec<Rule<H>>,
}

impl<H> Default for Dispatcher<H> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<H> Dispatcher<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `handler` when every flag in `requires` is set
    #[must_use]
    pub fn when(self, requires: &[&str], handler: H) -> Self {
        self.when_not(requires, &[], handler)
    }

    /// Run `handler` when every flag in `requires` is set and none in `forbids` is
    #[must_use]
    pub fn when_not(mut self, requires: &[&str], forbids: &[&str], handler: H) -> Self {
        self.rules.push(Rule {
            handler,
            requires: requires.iter().map(ToString::to_string).collect(),
            forbids: forbids.iter().map(ToString::to_string).collect(),
        });
        self
    }

    /// Handlers whose predicates hold, in registration order
    pub fn ready<'a>(&'a self, active: &'a ActiveFlags) -> impl Iterator<Item = &'a H> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.matches(active))
            .map(|rule| &rule.handler)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Handler {
        Configure,
        WaitForDatabase,
    }

    fn dispatcher() -> Dispatcher<Handler> {
        Dispatcher::new()
            .when(&["ols.configured", "db.master.available"], Handler::Configure)
            .when_not(&["ols.configured"], &["db.master.available"], Handler::WaitForDatabase)
    }

    fn flags(names: &[&str]) -> ActiveFlags {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_all_required_flags_must_be_set() {
        let dispatcher = dispatcher();
        let active = flags(&["ols.configured", "db.master.available"]);
        let ready: Vec<_> = dispatcher.ready(&active).copied().collect();
        assert_eq!(ready, vec![Handler::Configure]);

        let active = flags(&["db.master.available"]);
        assert_eq!(dispatcher.ready(&active).count(), 0);
    }

    #[test]
    fn test_forbidden_flag_blocks_rule() {
        let dispatcher = dispatcher();
        let active = flags(&["ols.configured"]);
        let ready: Vec<_> = dispatcher.ready(&active).copied().collect();
        assert_eq!(ready, vec![Handler::WaitForDatabase]);
    }

    #[test]
    fn test_empty_dispatcher() {
        let dispatcher: Dispatcher<Handler> = Dispatcher::new();
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.ready(&flags(&["x"])).count(), 0);
    }
}
