use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ScrubberConfig;
use crate::error::{Result, ScrubError};
use crate::geometry::{Point, Rect};
use crate::layout::{HostLayout, StripGeometry};
use crate::media::{FfmpegMediaBackend, FrameImage, MediaBackend, VideoAsset};
use crate::range::ScrubRange;
use crate::sampler::{ThumbnailSampler, ThumbnailStrip};
use crate::time::FrameTime;
use crate::worker::{
    FrameCompletion, FrameRequest, FrameWorker, RequestKind, RequestToken, WorkerEvent,
};

/// Pointer input accepted by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrubCommand {
    PointerDown { at: Point },
    PointerMove { at: Point },
    PointerUp,
    Unload,
}

/// Signals for the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrubEvent {
    LoadStarted {
        frame_count: usize,
    },
    StripReady(StripSnapshot),
    /// `percent` is `None` while the range is degenerate.
    ThumbMoved {
        position: f64,
        percent: Option<f64>,
    },
    DragStarted {
        zoom_scale: f64,
    },
    DragEnded {
        zoom_scale: f64,
    },
    PositionImageChanged {
        percent: f64,
        image: FrameImage,
    },
    SnapshotReady {
        seconds: f64,
        image: FrameImage,
    },
    SnapshotFailed {
        seconds: f64,
        message: String,
    },
    Unloaded,
}

/// Strip contents and thumb geometry published once sampling finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct StripSnapshot {
    pub strip: ThumbnailStrip,
    pub geometry: StripGeometry,
    pub thumb_rect: Rect,
}

/// Coarse lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Loading,
    Ready,
}

type PositionImageObserver = Box<dyn FnMut(&FrameImage)>;

/// Drag state machine and throttled thumb refresh for one scrubber.
///
/// All methods are called from the owning (UI) thread. Frame extraction runs on
/// a per-load worker thread; its results are applied only when the owner calls
/// [`ScrubController::pump`] or [`ScrubController::wait_for_event`].
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use std::time::Duration;
///
/// use scrubber::{HostLayout, Point, ScrubController, ScrubberConfig, Size};
///
/// let config = ScrubberConfig::default();
/// let mut controller = ScrubController::with_ffmpeg(config.clone()).expect("valid config");
/// controller.set_on_position_image_changed(|image| println!("{}x{}", image.width, image.height));
///
/// let asset = controller.open_asset(Path::new("demo.mp4")).expect("probe");
/// let layout = HostLayout::with_insets(Size::new(325.0, 60.0), &config);
/// controller.load_video(&asset, &layout).expect("load");
/// controller.wait_for_event(Duration::from_secs(10)).expect("strip sampled");
///
/// controller.pointer_down(Point::new(30.0, 20.0));
/// controller.pointer_move(Point::new(120.0, 20.0));
/// controller.pointer_up();
/// ```
pub struct ScrubController<M: MediaBackend> {
    media: M,
    config: ScrubberConfig,
    session: Session,
    observer: Option<PositionImageObserver>,
}

enum Session {
    Idle,
    Loading(LoadingSession),
    Ready(ReadySession),
}

struct LoadingSession {
    worker: FrameWorker,
    geometry: StripGeometry,
    duration_seconds: f64,
}

struct ReadySession {
    worker: FrameWorker,
    geometry: StripGeometry,
    duration_seconds: f64,
    range: ScrubRange,
    strip: ThumbnailStrip,
    thumb_image: Option<FrameImage>,
    in_flight: Option<RequestToken>,
    /// Latest refresh that found the request queue full, sent on the next completion.
    pending_percent: Option<f64>,
    next_token: u64,
}

impl<M> ScrubController<M>
where
    M: MediaBackend,
{
    /// Creates an idle controller with the default configuration.
    pub fn new(media: M) -> Self {
        Self {
            media,
            config: ScrubberConfig::default(),
            session: Session::Idle,
            observer: None,
        }
    }

    /// Creates an idle controller after validating `config`.
    pub fn with_config(media: M, config: ScrubberConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(media)
        })
    }

    pub fn config(&self) -> &ScrubberConfig {
        &self.config
    }

    /// Registers the callback invoked with every settled thumb image.
    ///
    /// Replaces any previous callback. The callback survives unloads.
    pub fn set_on_position_image_changed<F>(&mut self, observer: F)
    where
        F: FnMut(&FrameImage) + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    /// Probes `path` through the media backend.
    pub fn open_asset(&self, path: &Path) -> Result<VideoAsset> {
        self.media.open_asset(path)
    }

    /// Applies one pointer command and returns emitted events.
    pub fn handle_command(&mut self, command: ScrubCommand) -> Vec<ScrubEvent> {
        match command {
            ScrubCommand::PointerDown { at } => self.pointer_down(at),
            ScrubCommand::PointerMove { at } => self.pointer_move(at),
            ScrubCommand::PointerUp => self.pointer_up(),
            ScrubCommand::Unload => self.unload(),
        }
    }

    /// Starts loading `asset` into the strip described by `layout`.
    ///
    /// Does nothing while a video is loading or loaded. Structural problems
    /// (no video track, unusable layout, extractor bind failure) are returned
    /// and leave the controller idle. Sampling continues on the worker; the
    /// controller becomes ready when [`ScrubEvent::StripReady`] is pumped.
    pub fn load_video(
        &mut self,
        asset: &VideoAsset,
        layout: &HostLayout,
    ) -> Result<Vec<ScrubEvent>> {
        if !matches!(self.session, Session::Idle) {
            debug!(path = ?asset.path, "load ignored, a video is already loading or loaded");
            return Ok(Vec::new());
        }

        let natural_size = asset.video_track_natural_size()?;
        let strip_size = layout.strip_size()?;
        let plan = ThumbnailSampler::plan(
            asset.duration(),
            natural_size,
            strip_size.width,
            strip_size.height,
        )?;
        let geometry = StripGeometry::new(layout, &plan);
        let extractor = self.media.bind_asset(asset)?;

        let frame_count = plan.timestamps.len();
        info!(
            path = ?asset.path,
            duration_seconds = asset.duration(),
            frame_count,
            degenerate = geometry.is_degenerate(),
            "loading video"
        );
        let worker = FrameWorker::spawn(extractor, plan);
        self.session = Session::Loading(LoadingSession {
            worker,
            geometry,
            duration_seconds: asset.duration(),
        });

        Ok(vec![ScrubEvent::LoadStarted { frame_count }])
    }

    /// Releases the strip and the thumb and returns to idle.
    ///
    /// Pending extractions are abandoned; their results are never delivered.
    pub fn unload(&mut self) -> Vec<ScrubEvent> {
        if !matches!(self.session, Session::Ready(_)) {
            return Vec::new();
        }

        self.session = Session::Idle;
        info!("video unloaded");
        vec![ScrubEvent::Unloaded]
    }

    /// Starts a drag when `at` hits the thumb.
    pub fn pointer_down(&mut self, at: Point) -> Vec<ScrubEvent> {
        let Session::Ready(session) = &mut self.session else {
            return Vec::new();
        };
        if session.range.is_dragging() {
            return Vec::new();
        }

        let thumb = session.thumb_rect();
        if !thumb.contains(at) {
            return Vec::new();
        }

        session
            .range
            .begin_drag(at.x, session.range.current_position());
        debug!(x = at.x, thumb = session.range.current_position(), "drag started");

        if self.config.emphasizes_drag() {
            vec![ScrubEvent::DragStarted {
                zoom_scale: self.config.zoom_scale,
            }]
        } else {
            Vec::new()
        }
    }

    /// Moves the thumb with the pointer and requests a refresh if none is pending.
    pub fn pointer_move(&mut self, at: Point) -> Vec<ScrubEvent> {
        let Session::Ready(session) = &mut self.session else {
            return Vec::new();
        };
        if !session.range.is_dragging() {
            return Vec::new();
        }

        let position = session.range.update_position(at.x);
        let events = vec![ScrubEvent::ThumbMoved {
            position,
            percent: session.range.percent().ok(),
        }];
        session.refresh(false);
        events
    }

    /// Ends the drag, always forcing a refresh of the final position.
    pub fn pointer_up(&mut self) -> Vec<ScrubEvent> {
        let Session::Ready(session) = &mut self.session else {
            return Vec::new();
        };
        if !session.range.is_dragging() {
            return Vec::new();
        }

        session.refresh(true);
        session.range.end_drag();
        debug!(position = session.range.current_position(), "drag ended");

        if self.config.emphasizes_drag() {
            vec![ScrubEvent::DragEnded {
                zoom_scale: self.config.zoom_scale,
            }]
        } else {
            Vec::new()
        }
    }

    /// Requests a one-off frame at `seconds`, outside the refresh throttle.
    ///
    /// The result arrives as [`ScrubEvent::SnapshotReady`] or
    /// [`ScrubEvent::SnapshotFailed`] and does not change the thumb.
    pub fn request_snapshot(&mut self, seconds: f64) -> Result<()> {
        let Session::Ready(session) = &mut self.session else {
            return Err(ScrubError::VideoNotLoaded);
        };
        let token = session.allocate_token();
        session.worker.request(FrameRequest {
            token,
            time: FrameTime::from_seconds(seconds),
            kind: RequestKind::Snapshot,
        })
    }

    /// Applies every completion the worker has posted so far.
    pub fn pump(&mut self) -> Result<Vec<ScrubEvent>> {
        let mut events = Vec::new();
        loop {
            let next = match self.worker() {
                Some(worker) => worker.try_next(),
                None => return Ok(events),
            };
            match next {
                Ok(Some(event)) => events.extend(self.apply_worker_event(event)),
                Ok(None) => return Ok(events),
                Err(error) => {
                    self.handle_worker_loss();
                    return Err(error);
                }
            }
        }
    }

    /// Blocks until the worker posts something, then applies all pending completions.
    pub fn wait_for_event(&mut self, timeout: Duration) -> Result<Vec<ScrubEvent>> {
        let first = match self.worker() {
            Some(worker) => worker.next_timeout(timeout),
            None => return Ok(Vec::new()),
        };
        let first = match first {
            Ok(event) => event,
            Err(ScrubError::WorkerTimeout) => return Err(ScrubError::WorkerTimeout),
            Err(error) => {
                self.handle_worker_loss();
                return Err(error);
            }
        };

        let mut events = self.apply_worker_event(first);
        events.extend(self.pump()?);
        Ok(events)
    }

    pub fn state(&self) -> ControllerState {
        match self.session {
            Session::Idle => ControllerState::Idle,
            Session::Loading(_) => ControllerState::Loading,
            Session::Ready(_) => ControllerState::Ready,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.ready().is_some_and(|session| session.range.is_dragging())
    }

    /// True while a thumb refresh is outstanding or waiting for queue space.
    pub fn refresh_in_flight(&self) -> bool {
        self.ready().is_some_and(|session| {
            session.in_flight.is_some() || session.pending_percent.is_some()
        })
    }

    /// Current selection, `None` when not ready or the range is degenerate.
    pub fn percent(&self) -> Option<f64> {
        self.ready()
            .and_then(|session| session.range.percent().ok())
    }

    pub fn thumb_position(&self) -> Option<f64> {
        self.ready()
            .map(|session| session.range.current_position())
    }

    pub fn thumb_rect(&self) -> Option<Rect> {
        self.ready().map(ReadySession::thumb_rect)
    }

    pub fn thumb_image(&self) -> Option<&FrameImage> {
        self.ready()
            .and_then(|session| session.thumb_image.as_ref())
    }

    pub fn strip(&self) -> Option<&ThumbnailStrip> {
        self.ready().map(|session| &session.strip)
    }

    /// Timeline position of the current selection in seconds.
    pub fn selected_seconds(&self) -> Option<f64> {
        let session = self.ready()?;
        let percent = session.range.percent().ok()?;
        Some(session.duration_seconds * percent)
    }

    fn ready(&self) -> Option<&ReadySession> {
        match &self.session {
            Session::Ready(session) => Some(session),
            _ => None,
        }
    }

    fn worker(&self) -> Option<&FrameWorker> {
        match &self.session {
            Session::Idle => None,
            Session::Loading(session) => Some(&session.worker),
            Session::Ready(session) => Some(&session.worker),
        }
    }

    fn apply_worker_event(&mut self, event: WorkerEvent) -> Vec<ScrubEvent> {
        match event {
            WorkerEvent::StripSampled(strip) => self.finish_loading(strip),
            WorkerEvent::FrameExtracted(completion) => self.apply_completion(completion),
        }
    }

    fn finish_loading(&mut self, strip: ThumbnailStrip) -> Vec<ScrubEvent> {
        let loading = match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Loading(loading) => loading,
            other => {
                self.session = other;
                warn!("strip sampled outside of a load, ignoring");
                return Vec::new();
            }
        };

        let LoadingSession {
            worker,
            geometry,
            duration_seconds,
        } = loading;
        let mut range = ScrubRange::new(geometry.lower_bound, geometry.upper_bound);
        range.set_percent(0.0);
        let mut session = ReadySession {
            worker,
            geometry,
            duration_seconds,
            range,
            thumb_image: strip.preview_image().cloned(),
            strip,
            in_flight: None,
            pending_percent: None,
            next_token: 1,
        };

        info!(
            frames = session.strip.len(),
            holes = session.strip.holes(),
            "thumbnail strip ready"
        );
        let events = vec![
            ScrubEvent::StripReady(StripSnapshot {
                strip: session.strip.clone(),
                geometry: session.geometry,
                thumb_rect: session.thumb_rect(),
            }),
            ScrubEvent::ThumbMoved {
                position: session.range.current_position(),
                percent: session.range.percent().ok(),
            },
        ];
        session.refresh(true);
        self.session = Session::Ready(session);
        events
    }

    fn apply_completion(&mut self, completion: FrameCompletion) -> Vec<ScrubEvent> {
        let events = self.resolve_completion(completion);
        // Every completion frees a queue slot.
        if let Session::Ready(session) = &mut self.session {
            session.flush_pending();
        }
        events
    }

    fn resolve_completion(&mut self, completion: FrameCompletion) -> Vec<ScrubEvent> {
        let Session::Ready(session) = &mut self.session else {
            return Vec::new();
        };
        let seconds = completion.time.seconds();

        let percent = match completion.kind {
            RequestKind::Snapshot => {
                return match completion.result {
                    Ok(image) => vec![ScrubEvent::SnapshotReady { seconds, image }],
                    Err(error) => vec![ScrubEvent::SnapshotFailed {
                        seconds,
                        message: error.to_string(),
                    }],
                };
            }
            RequestKind::Refresh { percent } => percent,
        };

        if session.in_flight != Some(completion.token) {
            debug!(
                token = completion.token.0,
                seconds, "discarding stale refresh"
            );
            return Vec::new();
        }
        session.in_flight = None;

        match completion.result {
            Ok(image) => {
                session.thumb_image = Some(image.clone());
                if let Some(observer) = self.observer.as_mut() {
                    observer(&image);
                }
                vec![ScrubEvent::PositionImageChanged { percent, image }]
            }
            Err(error) => {
                debug!(seconds, %error, "refresh extraction failed, keeping previous image");
                Vec::new()
            }
        }
    }

    fn handle_worker_loss(&mut self) {
        if matches!(self.session, Session::Loading(_)) {
            warn!("frame worker stopped while loading");
            self.session = Session::Idle;
            return;
        }
        if let Session::Ready(session) = &mut self.session {
            warn!("frame worker stopped, thumb refresh disabled");
            session.in_flight = None;
            session.pending_percent = None;
        }
    }
}

impl ReadySession {
    fn thumb_rect(&self) -> Rect {
        self.geometry.thumb_rect(self.range.current_position())
    }

    fn allocate_token(&mut self) -> RequestToken {
        let token = RequestToken(self.next_token);
        self.next_token += 1;
        token
    }

    /// Requests the frame for the current selection.
    ///
    /// Without `override_in_flight` the call is dropped while a refresh is
    /// outstanding. The guard is cleared before the degenerate-range check so a
    /// forced refresh always releases it. A full request queue parks the
    /// refresh in `pending_percent`, replacing any older parked one.
    fn refresh(&mut self, override_in_flight: bool) -> Option<RequestToken> {
        if self.in_flight.is_some() && !override_in_flight {
            debug!("refresh dropped, one is already in flight");
            return None;
        }
        self.in_flight = None;

        let percent = match self.range.percent() {
            Ok(percent) => percent,
            Err(error) => {
                debug!(%error, "refresh skipped");
                return None;
            }
        };

        self.dispatch(percent)
    }

    /// Sends a pending refresh once nothing is in flight.
    fn flush_pending(&mut self) {
        if self.in_flight.is_some() {
            return;
        }
        if let Some(percent) = self.pending_percent.take() {
            self.dispatch(percent);
        }
    }

    fn dispatch(&mut self, percent: f64) -> Option<RequestToken> {
        let token = self.allocate_token();
        let time = FrameTime::from_seconds(self.duration_seconds * percent);
        match self.worker.request(FrameRequest {
            token,
            time,
            kind: RequestKind::Refresh { percent },
        }) {
            Ok(()) => {
                self.pending_percent = None;
                self.in_flight = Some(token);
                Some(token)
            }
            Err(ScrubError::WorkerBusy) => {
                debug!(percent, "request queue full, refresh kept pending");
                self.pending_percent = Some(percent);
                None
            }
            Err(error) => {
                warn!(%error, "refresh request not dispatched");
                self.pending_percent = None;
                None
            }
        }
    }
}

impl<M> Debug for ScrubController<M>
where
    M: MediaBackend + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrubController")
            .field("media", &self.media)
            .field("config", &self.config)
            .field("state", &self.state())
            .field("has_observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl ScrubController<FfmpegMediaBackend> {
    /// Creates a controller wired to the FFmpeg backend.
    pub fn with_ffmpeg(config: ScrubberConfig) -> Result<Self> {
        Self::with_config(FfmpegMediaBackend, config)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::config::ScrubberConfig;
    use crate::error::{Result, ScrubError};
    use crate::geometry::{EdgeInsets, Point, Size};
    use crate::layout::HostLayout;
    use crate::media::{FrameExtractor, FrameImage, MediaBackend, VideoAsset, VideoTrack};
    use crate::time::FrameTime;

    use super::{ControllerState, ScrubCommand, ScrubController, ScrubEvent};

    const WAIT: Duration = Duration::from_secs(2);

    // 316x76 host with 8px insets: a 300x60 strip of five square 60px frames.
    // The thumb center travels from 38 to 278.
    fn sample_layout() -> HostLayout {
        HostLayout::new(Size::new(316.0, 76.0), EdgeInsets::uniform(8.0))
    }

    fn sample_asset() -> VideoAsset {
        VideoAsset {
            path: PathBuf::from("demo.mp4"),
            duration_seconds: 10.0,
            video: Some(VideoTrack {
                natural_width: 640.0,
                natural_height: 640.0,
                stream: None,
            }),
        }
    }

    fn load_sample(controller: &mut ScrubController<MockBackend>) -> Vec<ScrubEvent> {
        controller
            .load_video(&sample_asset(), &sample_layout())
            .expect("load should start");
        let events = controller.wait_for_event(WAIT).expect("strip sampled");
        assert!(matches!(events[0], ScrubEvent::StripReady(_)));
        events
    }

    fn ready_controller(backend: MockBackend) -> ScrubController<MockBackend> {
        let mut controller = ScrubController::new(backend);
        load_sample(&mut controller);
        controller
    }

    /// Applies worker events until no refresh is outstanding.
    fn settle(controller: &mut ScrubController<MockBackend>) -> Vec<ScrubEvent> {
        let mut collected = Vec::new();
        for _ in 0..10 {
            if !controller.refresh_in_flight() {
                return collected;
            }
            collected.extend(controller.wait_for_event(WAIT).expect("worker event"));
        }
        panic!("refresh still in flight after 10 worker events");
    }

    fn image_percents(events: &[ScrubEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|event| match event {
                ScrubEvent::PositionImageChanged { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn load_samples_strip_and_refreshes_at_zero() {
        let backend = MockBackend::default();
        let calls = backend.calls();
        let mut controller = ScrubController::new(backend);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let observed = Rc::clone(&seen);
        controller.set_on_position_image_changed(move |image| {
            observed.borrow_mut().push(image.rgba[0]);
        });

        let started = controller
            .load_video(&sample_asset(), &sample_layout())
            .expect("load should start");
        assert_eq!(started, vec![ScrubEvent::LoadStarted { frame_count: 5 }]);
        assert_eq!(controller.state(), ControllerState::Loading);

        let events = controller.wait_for_event(WAIT).expect("strip sampled");
        let ScrubEvent::StripReady(snapshot) = &events[0] else {
            panic!("first event must be StripReady");
        };
        assert_eq!(snapshot.strip.len(), 5);
        assert_eq!(snapshot.geometry.lower_bound, 38.0);
        assert_eq!(snapshot.geometry.upper_bound, 278.0);
        assert_eq!(
            events[1],
            ScrubEvent::ThumbMoved {
                position: 38.0,
                percent: Some(0.0)
            }
        );
        assert_eq!(controller.state(), ControllerState::Ready);
        assert!(controller.thumb_image().is_some());

        let mut applied = events;
        applied.extend(settle(&mut controller));
        assert_eq!(image_percents(&applied), vec![0.0]);
        assert!(!controller.refresh_in_flight());
        assert_eq!(*seen.borrow(), vec![0]);

        let calls = calls.lock().expect("lock calls");
        let ticks: Vec<i64> = calls.iter().map(|time| time.ticks).collect();
        assert_eq!(ticks, vec![0, 120, 240, 360, 480, 0]);
    }

    #[test]
    fn load_is_ignored_while_loading_or_ready() {
        let mut controller = ScrubController::new(MockBackend::default());
        controller
            .load_video(&sample_asset(), &sample_layout())
            .expect("load should start");

        let again = controller
            .load_video(&sample_asset(), &sample_layout())
            .expect("second load is a no-op");
        assert!(again.is_empty());

        controller.wait_for_event(WAIT).expect("strip sampled");
        let again = controller
            .load_video(&sample_asset(), &sample_layout())
            .expect("load while ready is a no-op");
        assert!(again.is_empty());
        assert_eq!(controller.state(), ControllerState::Ready);
    }

    #[test]
    fn load_without_video_track_fails_and_stays_idle() {
        let mut controller = ScrubController::new(MockBackend::default());
        let mut asset = sample_asset();
        asset.video = None;

        let error = controller
            .load_video(&asset, &sample_layout())
            .expect_err("no video track");

        assert!(matches!(error, ScrubError::NoVideoTrack(_)));
        assert_eq!(controller.state(), ControllerState::Idle);
        controller
            .load_video(&sample_asset(), &sample_layout())
            .expect("a later load still works");
    }

    #[test]
    fn load_with_unusable_layout_fails_and_stays_idle() {
        let mut controller = ScrubController::new(MockBackend::default());
        let layout = HostLayout::new(Size::new(12.0, 76.0), EdgeInsets::uniform(8.0));

        let error = controller
            .load_video(&sample_asset(), &layout)
            .expect_err("strip has no width");

        assert!(matches!(error, ScrubError::InvalidLayout { .. }));
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn pointer_events_are_ignored_until_ready() {
        let mut controller = ScrubController::new(MockBackend::default());

        assert!(controller.pointer_down(Point::new(38.0, 20.0)).is_empty());
        assert!(controller.pointer_move(Point::new(90.0, 20.0)).is_empty());
        assert!(controller.pointer_up().is_empty());
        assert!(controller.unload().is_empty());
        assert!(matches!(
            controller.request_snapshot(1.0),
            Err(ScrubError::VideoNotLoaded)
        ));
    }

    #[test]
    fn pointer_down_outside_the_thumb_does_not_start_a_drag() {
        let mut controller = ready_controller(MockBackend::default());
        settle(&mut controller);

        assert!(controller.pointer_down(Point::new(150.0, 20.0)).is_empty());
        assert!(!controller.is_dragging());
        assert!(controller.pointer_move(Point::new(200.0, 20.0)).is_empty());
        assert_eq!(controller.thumb_position(), Some(38.0));
    }

    #[test]
    fn moves_are_dropped_while_a_refresh_is_in_flight_and_release_forces_the_final_frame() {
        let (backend, gate) = MockBackend::gated_after(5);
        let calls = backend.calls();
        let mut controller = ready_controller(backend);
        assert!(controller.refresh_in_flight());

        let started = controller.pointer_down(Point::new(38.0, 20.0));
        assert_eq!(started, vec![ScrubEvent::DragStarted { zoom_scale: 1.5 }]);
        for x in (48..=138).step_by(10) {
            let events = controller.pointer_move(Point::new(f64::from(x), 20.0));
            assert!(matches!(events[0], ScrubEvent::ThumbMoved { .. }));
        }
        assert!(controller.refresh_in_flight());

        gate.send(()).expect("release initial refresh");
        let events = settle(&mut controller);
        assert_eq!(image_percents(&events), vec![0.0]);
        assert!(!controller.refresh_in_flight());

        controller.pointer_move(Point::new(158.0, 20.0));
        assert_eq!(controller.thumb_position(), Some(158.0));
        assert!(controller.refresh_in_flight());
        controller.pointer_move(Point::new(200.0, 20.0));

        let ended = controller.pointer_up();
        assert_eq!(ended, vec![ScrubEvent::DragEnded { zoom_scale: 1.5 }]);
        assert!(!controller.is_dragging());
        assert_eq!(controller.thumb_position(), Some(200.0));

        gate.send(()).expect("release stale refresh");
        gate.send(()).expect("release final refresh");
        let events = settle(&mut controller);
        assert_eq!(image_percents(&events), vec![0.675]);
        assert!(!controller.refresh_in_flight());
        assert_eq!(controller.thumb_image().map(|image| image.rgba[0]), Some(6));

        let calls = calls.lock().expect("lock calls");
        let ticks: Vec<i64> = calls.iter().map(|time| time.ticks).collect();
        assert_eq!(ticks, vec![0, 120, 240, 360, 480, 0, 300, 405]);
    }

    #[test]
    fn release_with_a_full_request_queue_still_delivers_the_released_frame() {
        let (backend, gate) = MockBackend::gated_after(5);
        let calls = backend.calls();
        let mut controller = ready_controller(backend);
        assert!(controller.refresh_in_flight());

        for _ in 0..6 {
            let position = controller.thumb_position().expect("ready");
            controller.pointer_down(Point::new(position, 20.0));
            controller.pointer_move(Point::new(position + 20.0, 20.0));
            controller.pointer_up();
        }
        assert_eq!(controller.thumb_position(), Some(158.0));
        assert!(controller.refresh_in_flight());

        for _ in 0..12 {
            gate.send(()).expect("release extraction");
        }
        let events = settle(&mut controller);

        assert_eq!(image_percents(&events), vec![0.5]);
        assert!(!controller.refresh_in_flight());
        assert_eq!(controller.thumb_image().map(|image| image.rgba[0]), Some(5));
        let calls = calls.lock().expect("lock calls");
        assert_eq!(calls.last(), Some(&FrameTime::from_seconds(5.0)));
    }

    #[test]
    fn release_without_pending_refresh_requests_exactly_one_frame() {
        let backend = MockBackend::default();
        let calls = backend.calls();
        let mut controller = ready_controller(backend);
        settle(&mut controller);

        controller.pointer_down(Point::new(40.0, 20.0));
        controller.pointer_move(Point::new(280.0, 20.0));
        settle(&mut controller);
        controller.pointer_up();
        let events = settle(&mut controller);

        assert_eq!(image_percents(&events), vec![1.0]);
        let calls = calls.lock().expect("lock calls");
        assert_eq!(calls.len(), 5 + 3);
        assert_eq!(calls[7], FrameTime::from_seconds(10.0));
    }

    #[test]
    fn failed_refresh_clears_the_guard_and_keeps_the_previous_image() {
        let backend = MockBackend::default();
        backend.fail_at(FrameTime::from_seconds(5.0));
        let mut controller = ScrubController::new(backend);
        let count = Rc::new(RefCell::new(0));
        let observed = Rc::clone(&count);
        controller.set_on_position_image_changed(move |_| *observed.borrow_mut() += 1);
        load_sample(&mut controller);
        settle(&mut controller);
        let before = controller.thumb_image().cloned();

        controller.pointer_down(Point::new(38.0, 20.0));
        controller.pointer_move(Point::new(158.0, 20.0));
        let events = controller.wait_for_event(WAIT).expect("failed completion");

        assert!(image_percents(&events).is_empty());
        assert!(!controller.refresh_in_flight());
        assert_eq!(controller.thumb_image().cloned(), before);

        controller.pointer_move(Point::new(218.0, 20.0));
        assert!(controller.refresh_in_flight());
        let events = settle(&mut controller);
        assert_eq!(image_percents(&events), vec![0.75]);
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn degenerate_range_skips_refreshes_without_sticking_the_guard() {
        let mut controller = ScrubController::new(MockBackend::default());
        let layout = HostLayout::new(Size::new(66.0, 76.0), EdgeInsets::uniform(8.0));
        controller
            .load_video(&sample_asset(), &layout)
            .expect("load should start");

        let events = controller.wait_for_event(WAIT).expect("strip sampled");

        assert!(matches!(
            events[1],
            ScrubEvent::ThumbMoved { percent: None, .. }
        ));
        assert_eq!(controller.state(), ControllerState::Ready);
        assert!(!controller.refresh_in_flight());
        assert_eq!(controller.percent(), None);

        let position = controller.thumb_position().expect("ready");
        controller.pointer_down(Point::new(position, 20.0));
        assert!(controller.is_dragging());
        controller.pointer_move(Point::new(position + 30.0, 20.0));
        controller.pointer_up();
        assert!(!controller.refresh_in_flight());
        assert_eq!(controller.thumb_position(), Some(position));
    }

    #[test]
    fn unit_zoom_scale_suppresses_drag_signals() {
        let config = ScrubberConfig {
            zoom_scale: 1.0,
            ..ScrubberConfig::default()
        };
        let mut controller =
            ScrubController::with_config(MockBackend::default(), config).expect("valid config");
        controller
            .load_video(&sample_asset(), &sample_layout())
            .expect("load should start");
        controller.wait_for_event(WAIT).expect("strip sampled");

        assert!(controller.pointer_down(Point::new(38.0, 20.0)).is_empty());
        assert!(controller.is_dragging());
        assert!(controller.pointer_up().is_empty());
    }

    #[test]
    fn unload_releases_the_strip_and_discards_pending_results() {
        let (backend, gate) = MockBackend::gated_after(5);
        let mut controller = ready_controller(backend);
        let count = Rc::new(RefCell::new(0));
        let observed = Rc::clone(&count);
        controller.set_on_position_image_changed(move |_| *observed.borrow_mut() += 1);
        assert!(controller.refresh_in_flight());

        let events = controller.handle_command(ScrubCommand::Unload);
        assert_eq!(events, vec![ScrubEvent::Unloaded]);
        drop(gate);

        assert_eq!(controller.state(), ControllerState::Idle);
        assert!(controller.strip().is_none());
        assert!(controller.thumb_image().is_none());
        assert!(controller.pump().expect("nothing to pump").is_empty());
        assert_eq!(*count.borrow(), 0);

        controller
            .load_video(&sample_asset(), &sample_layout())
            .expect("reload after unload");
        assert_eq!(controller.state(), ControllerState::Loading);
    }

    #[test]
    fn unload_while_loading_is_ignored() {
        let mut controller = ScrubController::new(MockBackend::default());
        controller
            .load_video(&sample_asset(), &sample_layout())
            .expect("load should start");

        assert!(controller.unload().is_empty());
        assert_eq!(controller.state(), ControllerState::Loading);
    }

    #[test]
    fn zero_duration_video_loads_an_empty_strip() {
        let mut controller = ScrubController::new(MockBackend::default());
        let mut asset = sample_asset();
        asset.duration_seconds = 0.0;

        let started = controller
            .load_video(&asset, &sample_layout())
            .expect("load should start");
        assert_eq!(started, vec![ScrubEvent::LoadStarted { frame_count: 0 }]);
        let events = controller.wait_for_event(WAIT).expect("strip sampled");

        let ScrubEvent::StripReady(snapshot) = &events[0] else {
            panic!("first event must be StripReady");
        };
        assert!(snapshot.strip.is_empty());
        assert_eq!(controller.state(), ControllerState::Ready);
    }

    #[test]
    fn snapshot_bypasses_the_refresh_guard() {
        let mut controller = ready_controller(MockBackend::default());
        settle(&mut controller);

        controller.request_snapshot(3.0).expect("snapshot queued");
        assert!(!controller.refresh_in_flight());
        let events = controller.wait_for_event(WAIT).expect("snapshot completion");

        let ScrubEvent::SnapshotReady { seconds, image } = &events[0] else {
            panic!("expected SnapshotReady");
        };
        assert_eq!(*seconds, 3.0);
        assert_eq!(image.rgba[0], 3);
        assert_eq!(controller.thumb_image().map(|image| image.rgba[0]), Some(0));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ScrubberConfig {
            shade_alpha: 2.0,
            ..ScrubberConfig::default()
        };
        assert!(ScrubController::with_config(MockBackend::default(), config).is_err());
    }

    #[derive(Clone, Default)]
    struct MockBackend {
        calls: Arc<Mutex<Vec<FrameTime>>>,
        failing: Arc<Mutex<Vec<FrameTime>>>,
        gate: Arc<Mutex<Option<(usize, mpsc::Receiver<()>)>>>,
    }

    impl MockBackend {
        /// Every extraction after the first `ungated` blocks until the test releases it.
        fn gated_after(ungated: usize) -> (Self, mpsc::Sender<()>) {
            let (gate_tx, gate_rx) = mpsc::channel();
            let backend = Self::default();
            *backend.gate.lock().expect("lock gate") = Some((ungated, gate_rx));
            (backend, gate_tx)
        }

        fn calls(&self) -> Arc<Mutex<Vec<FrameTime>>> {
            Arc::clone(&self.calls)
        }

        fn fail_at(&self, time: FrameTime) {
            self.failing.lock().expect("lock failing").push(time);
        }
    }

    impl MediaBackend for MockBackend {
        type Extractor = MockExtractor;

        fn open_asset(&self, path: &Path) -> Result<VideoAsset> {
            Ok(VideoAsset {
                path: path.to_path_buf(),
                ..sample_asset()
            })
        }

        fn bind_asset(&self, _asset: &VideoAsset) -> Result<Self::Extractor> {
            Ok(MockExtractor {
                calls: Arc::clone(&self.calls),
                failing: self.failing.lock().expect("lock failing").clone(),
                gate: self.gate.lock().expect("lock gate").take(),
            })
        }
    }

    struct MockExtractor {
        calls: Arc<Mutex<Vec<FrameTime>>>,
        failing: Vec<FrameTime>,
        gate: Option<(usize, mpsc::Receiver<()>)>,
    }

    impl FrameExtractor for MockExtractor {
        fn extract_frame(&mut self, at: FrameTime) -> Result<FrameImage> {
            let served = {
                let mut calls = self.calls.lock().expect("lock calls");
                calls.push(at);
                calls.len()
            };
            if let Some((ungated, gate)) = &self.gate {
                if served > *ungated {
                    let _ = gate.recv();
                }
            }
            if self.failing.contains(&at) {
                return Err(ScrubError::extraction_failed(at.seconds(), "mock failure"));
            }
            Ok(FrameImage {
                width: 1,
                height: 1,
                rgba: Arc::from(vec![(at.ticks / 60) as u8; 4]),
            })
        }
    }
}
