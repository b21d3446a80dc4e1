use crate::alerts::Alert;
use crate::config::{AlertRule, StatisticRule};
use crate::store::{StatusSource, TargetInfo, TargetSnapshot};

/// Minimum terminal width required (columns)
pub(super) const MIN_TERMINAL_WIDTH: u16 = 100;
/// Minimum terminal height required (rows)
pub(super) const MIN_TERMINAL_HEIGHT: u16 = 32;
/// Statistic rules shown side by side on a page.
const MAX_SIDES: usize = 2;

pub(super) struct SideView {
    pub(super) rule: StatisticRule,
    pub(super) snapshot: Option<TargetSnapshot>,
}

pub(super) struct PageView {
    pub(super) url: String,
    pub(super) sides: Vec<SideView>,
    pub(super) alert_rule: AlertRule,
    pub(super) alerts: Vec<Alert>,
    pub(super) is_down: bool,
}

pub(super) struct DashboardState {
    pub(super) targets: Vec<TargetInfo>,
    pub(super) current: usize,
    pub(super) page: Option<PageView>,
    pub(super) last_error: Option<String>,
    pub(super) should_quit: bool,
}

impl DashboardState {
    pub(super) fn new(targets: Vec<TargetInfo>) -> Self {
        Self {
            targets,
            current: 0,
            page: None,
            last_error: None,
            should_quit: false,
        }
    }

    pub(super) fn page_count(&self) -> usize {
        self.targets.len()
    }

    /// Moves to the next page, wrapping around. Returns whether the page changed.
    pub(super) fn next_page(&mut self) -> bool {
        let total = self.page_count();
        if total < 2 {
            return false;
        }
        self.current = (self.current + 1) % total;
        true
    }

    pub(super) fn prev_page(&mut self) -> bool {
        let total = self.page_count();
        if total < 2 {
            return false;
        }
        self.current = if self.current == 0 {
            total - 1
        } else {
            self.current - 1
        };
        true
    }

    /// Queries every side of the current page. Sides follow the statistic rules
    /// the source advertised for the target. A failed query leaves that side
    /// without data and keeps the error for the footer.
    pub(super) fn refresh<S: StatusSource>(&mut self, source: &S) {
        let Some(target) = self.targets.get(self.current) else {
            self.page = None;
            return;
        };
        let url = target.url.clone();
        let alert_rule = target.alerts;
        let mut last_error = None;

        let mut sides = Vec::with_capacity(MAX_SIDES);
        for rule in target.statistics.iter().take(MAX_SIDES) {
            let snapshot = match source.query(&url, rule.timespan) {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    last_error = Some(err.to_string());
                    None
                }
            };
            sides.push(SideView {
                rule: *rule,
                snapshot,
            });
        }

        // Alerts are per target, so any snapshot carries them.
        let (alerts, is_down) = match sides.iter().find_map(|side| side.snapshot.as_ref()) {
            Some(snapshot) => (snapshot.alerts.clone(), snapshot.is_down),
            None => match source.query(&url, alert_rule.timespan) {
                Ok(snapshot) => (snapshot.alerts, snapshot.is_down),
                Err(err) => {
                    last_error = Some(err.to_string());
                    (Vec::new(), false)
                }
            },
        };

        self.page = Some(PageView {
            url,
            sides,
            alert_rule,
            alerts,
            is_down,
        });
        self.last_error = last_error;
    }
}
