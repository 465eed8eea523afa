use crate::config::config::ControllerConfig;
use crate::controller::scan::{ScanController, ScanOutcome};
use crate::modules::blink::EyeActivity;
use crate::pipeline::shared::SharedState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub u32);

/// What activating a target means to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// A normal clickable control.
    Action,
    /// A region whose activation switches the controller into scan mode.
    ScanSurface,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusTarget {
    pub id: TargetId,
    pub kind: TargetKind,
    pub bounds: Rect,
}

/// PresentationShell is the controller's only view of the surrounding UI
/// and input stack. The dashboard, the OS cursor and the scan surface all
/// live behind it, which keeps every timing rule testable with a mock.
pub trait PresentationShell {
    /// Focusable dashboard targets, in no particular order.
    fn targets(&self) -> Vec<FocusTarget>;
    /// Activation order for the scan surface's targets.
    fn scan_targets(&self) -> Vec<TargetId>;
    fn move_cursor(&mut self, x: f64, y: f64);
    fn synthesize_click(&mut self, x: f64, y: f64);
    /// Directly activates a scan target, bypassing the cursor.
    fn invoke_target(&mut self, id: TargetId);
    /// Moves the scan highlight; `None` clears it.
    fn highlight(&mut self, id: Option<TargetId>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Dashboard,
    Scan,
}

/// GazeController turns the worker's gaze samples and eyelid activity into
/// cursor motion and clicks, ticked at a fixed period with an explicit
/// clock so every timing rule is deterministic under test.
pub struct GazeController {
    config: ControllerConfig,
    shared: SharedState,
    mode: Mode,
    scan: ScanController,
    cursor: Option<(f64, f64)>,
    snapped: Option<TargetId>,
    stable_anchor: Option<(f64, f64, Instant)>,
    blink_since: Option<Instant>,
    click_fired: bool,
    cooldown_until: Option<Instant>,
}

impl GazeController {
    pub fn new(config: ControllerConfig, shared: SharedState) -> Self {
        GazeController {
            scan: ScanController::new(config.clone()),
            config,
            shared,
            mode: Mode::Dashboard,
            cursor: None,
            snapped: None,
            stable_anchor: None,
            blink_since: None,
            click_fired: false,
            cooldown_until: None,
        }
    }

    /// tick runs one control step against the latest shared sample.
    pub fn tick<S: PresentationShell>(&mut self, now: Instant, shell: &mut S) {
        let activity = self.shared.activity();

        if self.mode == Mode::Scan {
            if self.scan.tick(now, activity, shell) == ScanOutcome::Exit {
                info!("leaving scan mode");
                shell.highlight(None);
                self.mode = Mode::Dashboard;
                self.blink_since = None;
                self.click_fired = false;
                self.cooldown_until = Some(now + self.config.post_click_cooldown);
            }
            return;
        }

        if let Some(until) = self.cooldown_until {
            if now < until {
                return;
            }
            self.cooldown_until = None;
        }

        if !self.shared.face_detected() {
            self.blink_since = None;
            self.click_fired = false;
            return;
        }

        self.track_click(now, shell);
        if self.mode == Mode::Scan {
            return;
        }

        // A confirmed blink in progress freezes the cursor where it was.
        if self.blink_since.is_some() {
            return;
        }

        let Some(sample) = self.shared.latest_sample() else {
            return;
        };
        self.track_motion(now, sample.screen_x, sample.screen_y, shell);
    }

    fn track_click<S: PresentationShell>(&mut self, now: Instant, shell: &mut S) {
        if self.shared.activity() != EyeActivity::Blink {
            self.blink_since = None;
            self.click_fired = false;
            return;
        }
        let since = *self.blink_since.get_or_insert(now);
        if self.click_fired || now.duration_since(since) < self.config.click_confirm {
            return;
        }
        self.click_fired = true;
        self.cooldown_until = Some(now + self.config.post_click_cooldown);

        let Some((x, y)) = self.cursor else {
            debug!("click confirmed before any cursor position, ignored");
            return;
        };
        let under = shell
            .targets()
            .into_iter()
            .find(|t| t.bounds.contains(x, y));
        match under {
            Some(t) if t.kind == TargetKind::ScanSurface => {
                info!("entering scan mode");
                if self.scan.enter(now, shell) {
                    self.mode = Mode::Scan;
                } else {
                    debug!("scan surface has no targets, staying on dashboard");
                }
            }
            Some(_) => shell.synthesize_click(x, y),
            None => debug!("blink confirmed with no target under the cursor, ignored"),
        }
    }

    /// track_motion snaps onto a nearby target once per target change, and
    /// otherwise free-moves only after the gaze point has settled.
    fn track_motion<S: PresentationShell>(&mut self, now: Instant, x: f64, y: f64, shell: &mut S) {
        let nearest = shell
            .targets()
            .into_iter()
            .map(|t| {
                let (cx, cy) = t.bounds.center();
                (t, ((cx - x).powi(2) + (cy - y).powi(2)).sqrt())
            })
            .filter(|(_, d)| *d <= self.config.snap_radius_px)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((target, _)) = nearest {
            if self.snapped != Some(target.id) {
                let (cx, cy) = target.bounds.center();
                shell.move_cursor(cx, cy);
                shell.highlight(Some(target.id));
                self.cursor = Some((cx, cy));
                self.snapped = Some(target.id);
                self.stable_anchor = None;
            }
            return;
        }
        if self.snapped.take().is_some() {
            shell.highlight(None);
        }

        match self.stable_anchor {
            Some((ax, ay, since)) => {
                let drift = ((ax - x).powi(2) + (ay - y).powi(2)).sqrt();
                if drift > self.config.stability_tolerance_px {
                    self.stable_anchor = Some((x, y, now));
                } else if now.duration_since(since) >= self.config.stability_dwell {
                    shell.move_cursor(x, y);
                    self.cursor = Some((x, y));
                }
            }
            None => self.stable_anchor = Some((x, y, now)),
        }
    }
}


/// run_loop drives the controller on the foreground tokio runtime until the
/// flag is cleared.
pub async fn run_loop<S: PresentationShell>(
    mut controller: GazeController,
    mut shell: S,
    running: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(controller.config.tick_interval);
    while running.load(Ordering::SeqCst) {
        ticker.tick().await;
        controller.tick(Instant::now(), &mut shell);
    }
}
