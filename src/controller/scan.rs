use crate::config::config::ControllerConfig;
use crate::controller::controller::{PresentationShell, TargetId};
use crate::modules::blink::EyeActivity;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Continue,
    /// A sustained left wink ended the session; the caller returns to the
    /// dashboard.
    Exit,
}

/// ScanController rotates a highlight through the scan surface's targets and
/// turns sustained eyelid gestures into activation, speed boost and exit.
/// All timing is measured against the caller-supplied clock.
#[derive(Debug)]
pub struct ScanController {
    config: ControllerConfig,
    order: Vec<TargetId>,
    index: usize,
    last_advance: Instant,
    boost: bool,
    /// The boost toggle rearms only after both eyes fully reopen, so one
    /// long wink cannot toggle twice.
    boost_armed: bool,
    blink_since: Option<Instant>,
    click_fired: bool,
    boost_since: Option<Instant>,
    escape_since: Option<Instant>,
}

impl ScanController {
    pub fn new(config: ControllerConfig) -> Self {
        ScanController {
            config,
            order: Vec::new(),
            index: 0,
            last_advance: Instant::now(),
            boost: false,
            boost_armed: true,
            blink_since: None,
            click_fired: false,
            boost_since: None,
            escape_since: None,
        }
    }

    /// enter starts a scan session over the shell's current target order.
    /// Returns false when there is nothing to scan.
    pub fn enter<S: PresentationShell>(&mut self, now: Instant, shell: &mut S) -> bool {
        self.order = shell.scan_targets();
        if self.order.is_empty() {
            return false;
        }
        self.index = 0;
        self.last_advance = now;
        self.boost = false;
        self.boost_armed = true;
        self.blink_since = None;
        self.click_fired = false;
        self.boost_since = None;
        self.escape_since = None;
        shell.highlight(Some(self.order[0]));
        true
    }

    pub fn is_boosted(&self) -> bool {
        self.boost
    }

    /// tick runs one scan step for the given frame activity.
    pub fn tick<S: PresentationShell>(
        &mut self,
        now: Instant,
        activity: EyeActivity,
        shell: &mut S,
    ) -> ScanOutcome {
        if self.order.is_empty() {
            return ScanOutcome::Exit;
        }

        // Exit gesture: sustained left wink.
        if activity == EyeActivity::Escape {
            let since = *self.escape_since.get_or_insert(now);
            if now.duration_since(since) >= self.config.escape_hold {
                return ScanOutcome::Exit;
            }
        } else {
            self.escape_since = None;
        }

        // Speed toggle: sustained right wink, once per closure.
        if activity == EyeActivity::Boost {
            let since = *self.boost_since.get_or_insert(now);
            if self.boost_armed && now.duration_since(since) >= self.config.boost_hold {
                self.boost = !self.boost;
                self.boost_armed = false;
                info!(boost = self.boost, "scan speed toggled");
            }
        } else {
            self.boost_since = None;
            if activity == EyeActivity::Open {
                self.boost_armed = true;
            }
        }

        // Activation: a blink pauses the highlight, and holding it past the
        // pre-dwell plus confirm window fires the highlighted target once.
        if activity == EyeActivity::Blink {
            let since = *self.blink_since.get_or_insert(now);
            let held = now.duration_since(since);
            if !self.click_fired
                && held >= self.config.scan_pre_dwell + self.config.scan_click_confirm
            {
                self.click_fired = true;
                debug!(target = self.order[self.index].0, "scan target activated");
                shell.invoke_target(self.order[self.index]);
            }
            return ScanOutcome::Continue;
        }
        if self.blink_since.take().is_some() {
            // The suspension paused the advancement timer; restart it so the
            // highlight does not jump the moment the eyes reopen.
            self.click_fired = false;
            self.last_advance = now;
        }

        let interval = if self.boost {
            self.config.boost_scan_interval
        } else {
            self.config.scan_interval
        };
        if now.duration_since(self.last_advance) >= interval {
            self.index = (self.index + 1) % self.order.len();
            self.last_advance = now;
            shell.highlight(Some(self.order[self.index]));
        }
        ScanOutcome::Continue
    }
}
