//! The sync scheduler: one continuous loop, one suspension point.
//!
//! Each cycle runs fetch, decide, render, present strictly in sequence.
//! Every steady-state failure is absorbed here: fetch failures back off,
//! render failures become placeholder frames, hardware failures degrade but
//! never stop the loop. Only startup config errors are allowed to kill the
//! process, and those never reach this type.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use tokio::sync::watch;

use inkview_api::{ApiError, ContentPayload, ContentSource, DateRange, FetchClass, ViewType};
use inkview_panel::PanelDriver;

use crate::config::DeviceConfig;
use crate::render::{self, RenderedFrame};
use crate::sync::diagnostics::{CycleOutcome, CycleReport, Diagnostics};
use crate::sync::engine::{backoff_seconds, decide_present, PresentedMarker};

pub struct Scheduler<S> {
    config: Arc<DeviceConfig>,
    source: S,
    panel: Box<dyn PanelDriver>,
    diagnostics: Diagnostics,
    /// Exactly one last-presented frame marker is retained at a time.
    last_presented: Option<PresentedMarker>,
    consecutive_failures: u32,
    /// The disconnected frame is presented once per failure streak.
    disconnected_shown: bool,
    /// Local view, possibly overridden by the server mid-run.
    effective_view: ViewType,
}

impl<S: ContentSource> Scheduler<S> {
    pub fn new(
        config: Arc<DeviceConfig>,
        source: S,
        panel: Box<dyn PanelDriver>,
        diagnostics: Diagnostics,
    ) -> Self {
        let effective_view = config.view_type;
        Self {
            config,
            source,
            panel,
            diagnostics,
            last_presented: None,
            consecutive_failures: 0,
            disconnected_shown: false,
            effective_view,
        }
    }

    /// Run until the shutdown channel flips. The wait between cycles is the
    /// sole suspension point and is interrupted immediately on shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Sync loop starting (poll interval {}s, view {:?})",
            self.config.poll_interval_secs, self.effective_view
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            let wait_secs = self.run_cycle().await;
            debug!("Next cycle in {}s", wait_secs);

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(wait_secs)) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Sync loop stopping");
        if let Err(err) = self.panel.sleep().await {
            warn!("Panel sleep on shutdown failed: {}", err);
        }
    }

    /// One poll cycle. Returns the wait before the next one.
    pub async fn run_cycle(&mut self) -> u64 {
        let started = Instant::now();
        let now = Utc::now();
        let today = now.date_naive();

        let payload = match self.fetch_effective(today).await {
            Ok(payload) => payload,
            Err(err) => return self.handle_fetch_error(err, started).await,
        };
        self.consecutive_failures = 0;
        self.disconnected_shown = false;

        // The picture depends on the date and view as well as the content,
        // so a date rollover re-renders even an unchanged payload.
        let content_hash = payload.content_hash();
        let effective_hash = format!("{}|{}|{:?}", content_hash, today, self.effective_view);

        let forced = chrono::Duration::seconds(self.config.full_refresh_interval_secs as i64);
        let outcome = match decide_present(&effective_hash, self.last_presented.as_ref(), forced, now)
        {
            None => {
                debug!("Content unchanged (hash {}), skipping refresh", content_hash);
                CycleOutcome::Skipped
            }
            Some(reason) => {
                let caps = self.panel.capabilities();
                let frame = render::render(&payload, self.effective_view, &caps, today);
                debug!("Presenting frame ({:?}, hash {})", reason, frame.content_hash);
                let presented = self.present_frame(&frame).await;
                // The marker advances even when the present fails: a
                // hardware fault must not pin future comparisons to content
                // the panel never showed, or recovery would stall.
                self.last_presented = Some(PresentedMarker {
                    hash: effective_hash,
                    at: now,
                });
                match presented {
                    Ok(()) => CycleOutcome::Presented,
                    Err(err) => {
                        warn!("Panel present failed, continuing degraded: {}", err);
                        CycleOutcome::Degraded
                    }
                }
            }
        };

        let wait_secs = self.config.poll_interval_secs;
        self.diagnostics.record(CycleReport {
            outcome,
            at: now,
            duration_ms: started.elapsed().as_millis() as i64,
            next_wait_secs: wait_secs,
            consecutive_failures: 0,
        });
        wait_secs
    }

    /// Fetch with the range the effective view needs. The server may switch
    /// the view mid-run; when it does, refetch once with the corrected range.
    async fn fetch_effective(&mut self, today: NaiveDate) -> inkview_api::Result<ContentPayload> {
        let range = DateRange::for_view(self.effective_view, today);
        let payload = self.source.fetch_view(&self.config.token, range).await?;

        let server_view = payload.config.view_type.unwrap_or(self.config.view_type);
        if server_view == self.effective_view {
            return Ok(payload);
        }
        info!(
            "Server changed view {:?} -> {:?}, refetching range",
            self.effective_view, server_view
        );
        self.effective_view = server_view;
        let range = DateRange::for_view(server_view, today);
        self.source.fetch_view(&self.config.token, range).await
    }

    async fn handle_fetch_error(&mut self, err: ApiError, started: Instant) -> u64 {
        let now = Utc::now();
        let (outcome, wait_secs) = match err.fetch_class() {
            FetchClass::Unauthorized => {
                warn!(
                    "Fetch unauthorized, token presumed revoked; re-checking in {}s: {}",
                    self.config.unauthorized_retry_secs, err
                );
                (CycleOutcome::Unauthorized, self.config.unauthorized_retry_secs)
            }
            class => {
                self.consecutive_failures += 1;
                let wait_secs = backoff_seconds(
                    self.config.poll_interval_secs,
                    self.consecutive_failures,
                    self.config.backoff_ceiling_secs,
                );
                warn!(
                    "Fetch failed ({} consecutive), backing off {}s: {}",
                    self.consecutive_failures, wait_secs, err
                );
                let outcome = if class == FetchClass::Network {
                    CycleOutcome::Network
                } else {
                    CycleOutcome::Protocol
                };
                (outcome, wait_secs)
            }
        };

        if self.consecutive_failures >= self.config.disconnected_after_failures
            && !self.disconnected_shown
        {
            self.show_disconnected(now).await;
        }

        self.diagnostics.record(CycleReport {
            outcome,
            at: now,
            duration_ms: started.elapsed().as_millis() as i64,
            next_wait_secs: wait_secs,
            consecutive_failures: self.consecutive_failures,
        });
        wait_secs
    }

    /// Replace stale content with an explicit problem frame, once per streak.
    async fn show_disconnected(&mut self, now: chrono::DateTime<Utc>) {
        let caps = self.panel.capabilities();
        let last_success = self.diagnostics.snapshot().last_success_at;
        let frame = render::disconnected(&caps, last_success, self.consecutive_failures);
        info!("Presenting disconnected frame after {} failures", self.consecutive_failures);
        if let Err(err) = self.present_frame(&frame).await {
            warn!("Disconnected frame present failed: {}", err);
        }
        self.last_presented = Some(PresentedMarker {
            hash: frame.content_hash.clone(),
            at: now,
        });
        self.disconnected_shown = true;
    }

    async fn present_frame(&mut self, frame: &RenderedFrame) -> inkview_panel::Result<()> {
        let caps = self.panel.capabilities();
        let packed = frame.canvas.pack(caps.depth);
        self.panel.wake().await?;
        let result = self.panel.present(&packed).await;
        if let Err(err) = self.panel.sleep().await {
            warn!("Panel sleep failed: {}", err);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use inkview_api::{ContentItem, RemoteConfig};
    use inkview_panel::{FramePayload, PanelCapabilities, PanelDepth, PanelError};

    struct MockSource {
        responses: Mutex<VecDeque<inkview_api::Result<ContentPayload>>>,
        ranges: Arc<Mutex<Vec<DateRange>>>,
    }

    impl MockSource {
        fn scripted(responses: Vec<inkview_api::Result<ContentPayload>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ranges: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl ContentSource for MockSource {
        async fn fetch_view(
            &self,
            _token: &str,
            range: DateRange,
        ) -> inkview_api::Result<ContentPayload> {
            self.ranges.lock().unwrap().push(range);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ContentPayload::default()))
        }
    }

    struct MockPanel {
        presents: Arc<Mutex<Vec<FramePayload>>>,
        fail_present: bool,
    }

    impl MockPanel {
        fn new() -> (Box<Self>, Arc<Mutex<Vec<FramePayload>>>) {
            let presents = Arc::new(Mutex::new(Vec::new()));
            (
                Box::new(Self {
                    presents: Arc::clone(&presents),
                    fail_present: false,
                }),
                presents,
            )
        }

        fn failing() -> (Box<Self>, Arc<Mutex<Vec<FramePayload>>>) {
            let presents = Arc::new(Mutex::new(Vec::new()));
            (
                Box::new(Self {
                    presents: Arc::clone(&presents),
                    fail_present: true,
                }),
                presents,
            )
        }
    }

    #[async_trait]
    impl PanelDriver for MockPanel {
        fn capabilities(&self) -> PanelCapabilities {
            PanelCapabilities {
                width: 800,
                height: 480,
                depth: PanelDepth::Gray4,
                supports_partial: false,
            }
        }

        async fn present(&mut self, frame: &FramePayload) -> inkview_panel::Result<()> {
            self.presents.lock().unwrap().push(frame.clone());
            if self.fail_present {
                return Err(PanelError::hardware("spi write failed"));
            }
            Ok(())
        }

        async fn sleep(&mut self) -> inkview_panel::Result<()> {
            Ok(())
        }

        async fn wake(&mut self) -> inkview_panel::Result<()> {
            Ok(())
        }
    }

    fn config() -> DeviceConfig {
        DeviceConfig {
            token: "tok".to_string(),
            api_url: "https://cal.example.org".to_string(),
            poll_interval_secs: 60,
            view_type: ViewType::Weekly,
            display_mode: crate::config::DisplayMode::Gray4,
            full_refresh_interval_secs: 6 * 60 * 60,
            backoff_ceiling_secs: 480,
            unauthorized_retry_secs: 900,
            disconnected_after_failures: 10,
            frame_output_path: "/tmp/frame.pgm".to_string(),
        }
    }

    fn payload(version: &str) -> ContentPayload {
        ContentPayload {
            version: Some(version.to_string()),
            ..Default::default()
        }
    }

    fn scheduler(
        config: DeviceConfig,
        responses: Vec<inkview_api::Result<ContentPayload>>,
        panel: Box<MockPanel>,
    ) -> Scheduler<MockSource> {
        Scheduler::new(
            Arc::new(config),
            MockSource::scripted(responses),
            panel,
            Diagnostics::new(),
        )
    }

    #[tokio::test]
    async fn unchanged_hash_presents_once_then_skips() {
        let (panel, presents) = MockPanel::new();
        let mut scheduler = scheduler(
            config(),
            vec![Ok(payload("h1")), Ok(payload("h1"))],
            panel,
        );

        assert_eq!(scheduler.run_cycle().await, 60);
        assert_eq!(presents.lock().unwrap().len(), 1);

        assert_eq!(scheduler.run_cycle().await, 60);
        assert_eq!(presents.lock().unwrap().len(), 1, "second cycle must skip");
        let state = scheduler.diagnostics.snapshot();
        assert_eq!(state.last_outcome, Some(CycleOutcome::Skipped));
        assert!(state.last_success_at.is_some());
    }

    #[tokio::test]
    async fn changed_hash_presents_again() {
        let (panel, presents) = MockPanel::new();
        let mut scheduler = scheduler(
            config(),
            vec![Ok(payload("h1")), Ok(payload("h2"))],
            panel,
        );
        scheduler.run_cycle().await;
        scheduler.run_cycle().await;
        assert_eq!(presents.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn forced_refresh_interval_zero_always_presents() {
        let mut cfg = config();
        cfg.full_refresh_interval_secs = 0;
        let (panel, presents) = MockPanel::new();
        let mut scheduler = scheduler(cfg, vec![Ok(payload("h1")), Ok(payload("h1"))], panel);
        scheduler.run_cycle().await;
        scheduler.run_cycle().await;
        assert_eq!(presents.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn network_failures_back_off_exponentially_to_ceiling() {
        let (panel, _presents) = MockPanel::new();
        let mut scheduler = scheduler(
            config(),
            vec![
                Err(ApiError::api(503, "down")),
                Err(ApiError::api(503, "down")),
                Err(ApiError::api(503, "down")),
                Err(ApiError::api(503, "down")),
                Ok(payload("h1")),
            ],
            panel,
        );

        assert_eq!(scheduler.run_cycle().await, 60);
        assert_eq!(scheduler.run_cycle().await, 120);
        assert_eq!(scheduler.run_cycle().await, 240);
        assert_eq!(scheduler.run_cycle().await, 480);
        assert_eq!(scheduler.consecutive_failures, 4);

        // One success resets both the counter and the cadence.
        assert_eq!(scheduler.run_cycle().await, 60);
        assert_eq!(scheduler.consecutive_failures, 0);
        assert_eq!(scheduler.diagnostics.snapshot().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn unauthorized_uses_fixed_interval_and_skips_backoff_counter() {
        let (panel, presents) = MockPanel::new();
        let mut scheduler = scheduler(
            config(),
            vec![
                Err(ApiError::api(401, "revoked")),
                Err(ApiError::api(401, "revoked")),
            ],
            panel,
        );

        assert_eq!(scheduler.run_cycle().await, 900);
        assert_eq!(scheduler.run_cycle().await, 900);
        assert_eq!(scheduler.consecutive_failures, 0);
        assert!(presents.lock().unwrap().is_empty());

        let state = scheduler.diagnostics.snapshot();
        assert!(state.unauthorized);
        assert_eq!(state.last_outcome, Some(CycleOutcome::Unauthorized));
    }

    #[tokio::test]
    async fn incompatible_payload_presents_placeholder_as_success() {
        let undated = ContentPayload {
            items: vec![ContentItem {
                title: "No date".to_string(),
                start_date: None,
                start_time: Some("09:00".to_string()),
                end_time: None,
                all_day: false,
                shared_by: None,
            }],
            version: Some("h1".to_string()),
            ..Default::default()
        };
        let (panel, presents) = MockPanel::new();
        let mut scheduler = scheduler(config(), vec![Ok(undated)], panel);

        assert_eq!(scheduler.run_cycle().await, 60);
        assert_eq!(presents.lock().unwrap().len(), 1);
        assert_eq!(
            scheduler.diagnostics.snapshot().last_outcome,
            Some(CycleOutcome::Presented)
        );
    }

    #[tokio::test]
    async fn hardware_failure_degrades_but_keeps_normal_cadence() {
        let (panel, presents) = MockPanel::failing();
        let mut scheduler = scheduler(
            config(),
            vec![Ok(payload("h1")), Ok(payload("h1"))],
            panel,
        );

        assert_eq!(scheduler.run_cycle().await, 60, "hardware-local, no backoff");
        assert_eq!(presents.lock().unwrap().len(), 1);
        assert_eq!(
            scheduler.diagnostics.snapshot().last_outcome,
            Some(CycleOutcome::Degraded)
        );

        // Marker advanced despite the failure: unchanged content skips.
        scheduler.run_cycle().await;
        assert_eq!(presents.lock().unwrap().len(), 1);
        assert_eq!(
            scheduler.diagnostics.snapshot().last_outcome,
            Some(CycleOutcome::Skipped)
        );
    }

    #[tokio::test]
    async fn disconnected_frame_shown_once_per_failure_streak() {
        let mut cfg = config();
        cfg.disconnected_after_failures = 2;
        let (panel, presents) = MockPanel::new();
        let mut scheduler = scheduler(
            cfg,
            vec![
                Err(ApiError::api(503, "down")),
                Err(ApiError::api(503, "down")),
                Err(ApiError::api(503, "down")),
                Ok(payload("h1")),
            ],
            panel,
        );

        scheduler.run_cycle().await;
        assert!(presents.lock().unwrap().is_empty());
        scheduler.run_cycle().await;
        assert_eq!(presents.lock().unwrap().len(), 1, "threshold reached");
        scheduler.run_cycle().await;
        assert_eq!(presents.lock().unwrap().len(), 1, "once per streak");

        // Recovery presents real content again.
        scheduler.run_cycle().await;
        assert_eq!(presents.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn server_view_override_triggers_refetch_with_new_range() {
        let monthly_payload = ContentPayload {
            config: RemoteConfig {
                view_type: Some(ViewType::Monthly),
                device_name: None,
            },
            version: Some("h1".to_string()),
            ..Default::default()
        };
        let source = MockSource::scripted(vec![
            Ok(monthly_payload.clone()),
            Ok(monthly_payload.clone()),
        ]);
        let ranges = Arc::clone(&source.ranges);
        let (panel, _presents) = MockPanel::new();
        let mut scheduler =
            Scheduler::new(Arc::new(config()), source, panel, Diagnostics::new());

        scheduler.run_cycle().await;
        assert_eq!(scheduler.effective_view, ViewType::Monthly);

        let seen = ranges.lock().unwrap();
        assert_eq!(seen.len(), 2, "view switch refetches once");
        let today = Utc::now().date_naive();
        assert_eq!(seen[0], DateRange::for_view(ViewType::Weekly, today));
        assert_eq!(seen[1], DateRange::for_view(ViewType::Monthly, today));
    }

    #[tokio::test]
    async fn run_exits_promptly_on_shutdown() {
        let (panel, _presents) = MockPanel::new();
        let scheduler = scheduler(config(), vec![Ok(payload("h1"))], panel);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(scheduler.run(rx));
        tx.send(true).expect("receiver alive");
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop must stop without waiting out the interval")
            .expect("loop task must not panic");
    }
}
