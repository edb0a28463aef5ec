/// Tracks which sub-agent is currently active during a multi-agent turn,
/// and every agent seen so far in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct AgentTracker {
    active: Option<String>,
    seen: Vec<String>,
}

impl AgentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, name: &str) {
        self.active = Some(name.to_string());
        if !self.seen.iter().any(|seen| seen == name) {
            self.seen.push(name.to_string());
        }
    }

    pub fn end(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn seen(&self) -> &[String] {
        &self.seen
    }

    /// Close out the turn, yielding the attribution list.
    pub fn finish_turn(&mut self) -> Vec<String> {
        self.active = None;
        std::mem::take(&mut self.seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seen_agents_are_ordered_and_deduplicated() {
        let mut tracker = AgentTracker::new();
        tracker.start("math_expert");
        tracker.end();
        tracker.start("research_expert");
        tracker.end();
        tracker.start("math_expert");
        tracker.end();

        assert_eq!(tracker.seen(), ["math_expert", "research_expert"]);
    }

    #[test]
    fn active_agent_clears_on_end() {
        let mut tracker = AgentTracker::new();
        tracker.start("math_expert");
        assert_eq!(tracker.active(), Some("math_expert"));

        tracker.end();
        assert_eq!(tracker.active(), None);
    }

    #[test]
    fn finish_turn_drains_state() {
        let mut tracker = AgentTracker::new();
        tracker.start("math_expert");

        let used = tracker.finish_turn();
        assert_eq!(used, vec!["math_expert".to_string()]);
        assert_eq!(tracker.active(), None);
        assert!(tracker.seen().is_empty());
    }
}
