//! Capture sequencer shared by the control thread and the frame producer.
//!
//! The control thread calls one of the `start_*` functions, which positions
//! the working camera, arms the session and blocks on a condition variable.
//! The render thread checks [`ScreenshotController::should_take_shot`] on
//! every present and hands grabbed frames to `store_grabbed_shot` or
//! `store_bokeh_grabbed_shot`. Those only store, step the camera and signal;
//! encoding and disk I/O happen on the control thread once the wait returns.

use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::blend::{BlendPolicy, BokehBlend, FrameAccumulator, Gamma};
use crate::camera::{Camera, LiveCamera};
use crate::capture::geometry::panorama_geometry;
use crate::capture::session::{CaptureSession, ControllerState, ShotType, WaitOutcome, WaitPolicy};
use crate::notify::Notifier;
use crate::output::{create_destination_directory, ImageWriter, ScreenshotFileType};

/// Settings that may only change while no session is active.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub root_folder: PathBuf,
    /// Presents to let pass after each camera step before grabbing.
    pub frames_to_wait_between_steps: u32,
    pub movement_speed: f32,
    pub rotation_speed: f32,
    pub buffer_width: u32,
    pub buffer_height: u32,
    pub file_type: ScreenshotFileType,
    pub wait_policy: WaitPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            root_folder: crate::paths::default_screenshots_dir(),
            frames_to_wait_between_steps: 1,
            movement_speed: crate::camera::DEFAULT_MOVEMENT_SPEED,
            rotation_speed: crate::camera::DEFAULT_ROTATION_SPEED,
            buffer_width: 0,
            buffer_height: 0,
            file_type: ScreenshotFileType::default(),
            wait_policy: WaitPolicy::default(),
        }
    }
}

struct Inner {
    state: ControllerState,
    config: ControllerConfig,
    session: CaptureSession,
    camera: Camera,
    accumulator: FrameAccumulator,
    /// Bokeh samples the composite is averaged over.
    shots_to_take: u32,
}

impl Inner {
    /// Starts a fresh session, dropping any frames of the previous one.
    fn begin(&mut self, shot_type: ShotType, total_steps: u32, step_size: f32, is_test_run: bool) -> u64 {
        self.accumulator.clear();
        self.state = ControllerState::Off;
        self.session.restart(shot_type, total_steps, step_size, is_test_run)
    }

    /// Moves the working camera one step in `direction`, or to the start of
    /// the sequence when `to_start` is set. Returns false for shot types that
    /// do not move.
    fn move_camera(&mut self, direction: f32, to_start: bool) -> bool {
        self.camera.reset_movement();
        let mut distance = direction * self.session.step_size;
        if to_start {
            distance *= 0.5 * self.session.total_steps as f32;
        }
        // divide out the speed the camera multiplies back in
        match self.session.shot_type {
            ShotType::HorizontalPanorama => {
                self.camera.yaw(distance / non_zero(self.config.rotation_speed));
                true
            }
            ShotType::Lightfield => {
                self.camera.move_right(distance / non_zero(self.config.movement_speed));
                true
            }
            ShotType::Single | ShotType::Bokeh => false,
        }
    }

    fn writer(&self) -> ImageWriter {
        ImageWriter::new(
            self.config.file_type,
            self.config.buffer_width,
            self.config.buffer_height,
        )
    }
}

fn non_zero(speed: f32) -> f32 {
    if speed > 0.0 { speed } else { 1.0 }
}

/// What the control thread needs to persist a finished session.
struct PersistJob {
    session_id: u64,
    is_test_run: bool,
    root_folder: PathBuf,
    started_at: DateTime<Local>,
    writer: ImageWriter,
}

/// Drives single, panorama, lightfield and bokeh captures.
///
/// Share it as `Arc<ScreenshotController>` between the control thread and
/// the frame producer.
pub struct ScreenshotController {
    inner: Mutex<Inner>,
    wait_completion: Condvar,
    live_camera: Arc<dyn LiveCamera>,
    notifier: Arc<dyn Notifier>,
}

impl ScreenshotController {
    pub fn new(live_camera: Arc<dyn LiveCamera>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(ControllerConfig::default(), live_camera, notifier)
    }

    pub fn with_config(
        config: ControllerConfig,
        live_camera: Arc<dyn LiveCamera>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ControllerState::Off,
                config,
                session: CaptureSession::default(),
                camera: Camera::default(),
                accumulator: FrameAccumulator::new(),
                shots_to_take: 0,
            }),
            wait_completion: Condvar::new(),
            live_camera,
            notifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` to the configuration unless a session is active.
    fn update_config(&self, change: impl FnOnce(&mut ControllerConfig)) -> bool {
        let mut inner = self.lock();
        if inner.state != ControllerState::Off {
            debug!("Configuration change ignored: capture in progress");
            return false;
        }
        change(&mut inner.config);
        true
    }

    /// Sets output folder, settle frames and the speeds used to make steps
    /// speed-independent. Ignored while a session is active.
    pub fn configure(
        &self,
        root_folder: impl Into<PathBuf>,
        frames_to_wait_between_steps: u32,
        movement_speed: f32,
        rotation_speed: f32,
    ) -> bool {
        let root_folder = root_folder.into();
        self.update_config(|config| {
            config.root_folder = root_folder;
            config.frames_to_wait_between_steps = frames_to_wait_between_steps;
            config.movement_speed = movement_speed;
            config.rotation_speed = rotation_speed;
        })
    }

    /// Sets the frame buffer dimensions. Ignored while a session is active.
    pub fn set_buffer_size(&self, width: u32, height: u32) -> bool {
        self.update_config(|config| {
            config.buffer_width = width;
            config.buffer_height = height;
        })
    }

    pub fn set_file_type(&self, file_type: ScreenshotFileType) -> bool {
        self.update_config(|config| config.file_type = file_type)
    }

    pub fn set_wait_policy(&self, wait_policy: WaitPolicy) -> bool {
        self.update_config(|config| config.wait_policy = wait_policy)
    }

    pub fn config(&self) -> ControllerConfig {
        self.lock().config.clone()
    }

    pub fn state(&self) -> ControllerState {
        self.lock().state
    }

    pub fn shot_type(&self) -> ShotType {
        self.lock().session.shot_type
    }

    /// Frames kept so far and frames the session keeps in total.
    pub fn progress(&self) -> (u32, u32) {
        let inner = self.lock();
        (inner.accumulator.frame_count() as u32, inner.session.total_steps)
    }

    /// Bokeh samples announced by [`ScreenshotController::prepare_bokeh`].
    pub fn shots_to_take(&self) -> u32 {
        self.lock().shots_to_take
    }

    /// Snapshot of the working camera the sequencer moves.
    pub fn working_camera(&self) -> Camera {
        self.lock().camera.clone()
    }

    /// True when the producer should grab the frame it is about to present.
    pub fn should_take_shot(&self) -> bool {
        let inner = self.lock();
        inner.session.frames_to_wait == 0 && inner.state == ControllerState::Grabbing
    }

    pub fn is_bokeh_shot(&self) -> bool {
        self.lock().session.shot_type == ShotType::Bokeh
    }

    /// Called by the producer once per present; counts down settle frames.
    pub fn present_called(&self) {
        let mut inner = self.lock();
        if inner.session.frames_to_wait > 0 {
            inner.session.frames_to_wait -= 1;
        }
    }

    /// Grabs one frame and writes it.
    pub fn start_single(&self) {
        debug!("start_single start");
        let session_id = {
            let mut inner = self.lock();
            let id = inner.begin(ShotType::Single, 1, 0.0, false);
            inner.state = ControllerState::Grabbing;
            id
        };
        if self.wait_for_shots(session_id) != WaitOutcome::Completed {
            return;
        }
        self.notifier.notify("Single screenshot taken. Writing to disk...");
        self.save_grabbed_shots();
        self.notifier.notify("Single screenshot done.");
    }

    /// Sweeps `camera` horizontally over `total_fov` radians.
    ///
    /// The center of the screen starts half the sweep to the left and ends
    /// half the sweep to the right, so every pair of neighbouring shots
    /// overlaps by `overlap_percent` of `current_fov`.
    pub fn start_horizontal_panorama(
        &self,
        camera: Camera,
        total_fov: f32,
        overlap_percent: f32,
        current_fov: f32,
        is_test_run: bool,
    ) {
        let geometry = panorama_geometry(total_fov, overlap_percent, current_fov);
        info!(
            "Panorama: {} shots, {:.4} rad per step, test run: {}",
            geometry.shot_count, geometry.angle_per_step, is_test_run
        );
        let session_id = self.arm_multi_shot(
            camera,
            ShotType::HorizontalPanorama,
            geometry.shot_count,
            geometry.angle_per_step,
            is_test_run,
        );
        if self.wait_for_shots(session_id) != WaitOutcome::Completed {
            return;
        }
        self.notifier
            .notify("All Panorama shots have been taken. Writing shots to disk...");
        self.save_grabbed_shots();
        self.notifier.notify("Panorama done.");
    }

    /// Moves `camera` sideways in `shot_count` steps of `distance_per_step`.
    pub fn start_lightfield(
        &self,
        camera: Camera,
        distance_per_step: f32,
        shot_count: u32,
        is_test_run: bool,
    ) {
        debug!("start_lightfield start. test run: {}", is_test_run);
        let session_id = self.arm_multi_shot(
            camera,
            ShotType::Lightfield,
            shot_count,
            distance_per_step,
            is_test_run,
        );
        if self.wait_for_shots(session_id) != WaitOutcome::Completed {
            return;
        }
        self.notifier
            .notify("All Lightfield shots have been taken. Writing shots to disk...");
        self.save_grabbed_shots();
        self.notifier.notify("Lightfield done.");
    }

    fn arm_multi_shot(
        &self,
        camera: Camera,
        shot_type: ShotType,
        total_steps: u32,
        step_size: f32,
        is_test_run: bool,
    ) -> u64 {
        let mut inner = self.lock();
        let id = inner.begin(shot_type, total_steps, step_size, is_test_run);
        inner.camera = camera;
        let (movement_speed, rotation_speed) = (inner.config.movement_speed, inner.config.rotation_speed);
        inner.camera.set_speeds(non_zero(movement_speed), non_zero(rotation_speed));
        inner.move_camera(-1.0, true);
        self.live_camera.apply(&inner.camera);
        inner.session.frames_to_wait = inner.config.frames_to_wait_between_steps;
        inner.state = ControllerState::Grabbing;
        id
    }

    /// Starts a bokeh composite averaged over `total_samples` samples.
    ///
    /// Call before the first `start_bokeh(false)`. Ignored while a session is
    /// active.
    pub fn prepare_bokeh(&self, total_samples: u32, policy: BlendPolicy, gamma: Gamma) -> bool {
        let mut inner = self.lock();
        if inner.state != ControllerState::Off {
            debug!("prepare_bokeh ignored: capture in progress");
            return false;
        }
        inner.begin(ShotType::Bokeh, total_samples, 0.0, false);
        inner.shots_to_take = total_samples;
        inner.accumulator.start_composite(BokehBlend { policy, gamma, total_samples });
        true
    }

    /// `false` arms the producer for one bokeh sample and blocks until it is
    /// blended in; `true` writes the composite and ends the bokeh session.
    ///
    /// Anything but [`WaitOutcome::Completed`] means the bokeh session is
    /// gone (cancelled, timed out or never prepared) and the caller should
    /// stop stepping through samples.
    pub fn start_bokeh(&self, last_shot_taken: bool) -> WaitOutcome {
        if last_shot_taken {
            self.notifier.notify("Bokeh screenshot taken. Writing to disk...");
            self.save_bokeh_grabbed_shots();
            self.notifier.notify("Bokeh screenshot done.");
            return WaitOutcome::Completed;
        }

        let session_id = {
            let mut inner = self.lock();
            if inner.session.shot_type != ShotType::Bokeh || inner.accumulator.blend().is_none() {
                warn!("Bokeh sample requested without a prepared bokeh session");
                return WaitOutcome::Cancelled;
            }
            inner.session.frames_to_wait = 0;
            inner.state = ControllerState::Grabbing;
            inner.session.id
        };
        let outcome = self.wait_for_shots(session_id);
        if outcome == WaitOutcome::Completed {
            let mut inner = self.lock();
            if inner.session.id == session_id {
                inner.state = ControllerState::Off;
            }
        }
        outcome
    }

    /// Stores a grabbed RGBA8 frame.
    ///
    /// Empty frames and frames arriving while not grabbing are dropped. The
    /// delivery that pushes the count past the session total completes the
    /// session and is not kept; earlier ones are kept and step the camera.
    pub fn store_grabbed_shot(&self, frame: Vec<u8>) {
        if frame.is_empty() {
            return;
        }
        let mut inner = self.lock();
        if inner.state != ControllerState::Grabbing || inner.session.shot_type == ShotType::Bokeh {
            debug!("Frame dropped: no frame-by-frame capture armed");
            return;
        }

        inner.session.shot_counter += 1;
        if inner.session.is_complete() {
            inner.state = ControllerState::SavingShots;
            self.wait_completion.notify_all();
            return;
        }

        inner.accumulator.push_frame(frame);
        if inner.session.step_index() < inner.session.total_steps && inner.move_camera(1.0, false) {
            self.live_camera.apply(&inner.camera);
        }
        inner.session.frames_to_wait = inner.config.frames_to_wait_between_steps;
    }

    /// Blends a grabbed RGBA8 frame into the bokeh composite and completes
    /// the armed sample. Empty frames are dropped.
    pub fn store_bokeh_grabbed_shot(&self, frame: Vec<u8>) {
        if frame.is_empty() {
            return;
        }
        let mut inner = self.lock();
        if inner.state != ControllerState::Grabbing || inner.session.shot_type != ShotType::Bokeh {
            debug!("Bokeh sample dropped: no sample armed");
            return;
        }
        if !inner.accumulator.add_bokeh_sample(&frame) {
            warn!("Bokeh sample of {} bytes rejected, skipped", frame.len());
        }
        inner.session.shot_counter += 1;
        inner.state = ControllerState::SavingShots;
        self.wait_completion.notify_all();
    }

    /// Drops the active session and wakes its waiter, which returns without
    /// writing anything.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        if inner.state == ControllerState::Off && !inner.accumulator.has_composite() {
            return;
        }
        info!("Capture cancelled ({}, state {})", inner.session.shot_type, inner.state);
        inner.accumulator.clear();
        inner.session.restart(ShotType::Single, 0, 0.0, false);
        inner.state = ControllerState::Off;
        self.wait_completion.notify_all();
    }

    /// Blocks until the producer signals `SavingShots` for `session_id`.
    fn wait_for_shots(&self, session_id: u64) -> WaitOutcome {
        let mut inner = self.lock();
        let deadline = match inner.config.wait_policy {
            WaitPolicy::Indefinite => None,
            WaitPolicy::Timeout(timeout) => Some(Instant::now() + timeout),
        };
        loop {
            if inner.session.id != session_id {
                return WaitOutcome::Cancelled;
            }
            if inner.state == ControllerState::SavingShots {
                return WaitOutcome::Completed;
            }
            match deadline {
                None => {
                    inner = self
                        .wait_completion
                        .wait(inner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!("Timed out waiting for frames ({})", inner.session.shot_type);
                        inner.accumulator.clear();
                        inner.session.restart(ShotType::Single, 0, 0.0, false);
                        inner.state = ControllerState::Off;
                        drop(inner);
                        self.notifier.notify("Screenshot failed: no frames were delivered in time.");
                        return WaitOutcome::TimedOut;
                    }
                    inner = self
                        .wait_completion
                        .wait_timeout(inner, deadline - now)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|e| e.into_inner().0);
                }
            }
        }
    }

    fn persist_job(inner: &Inner) -> PersistJob {
        PersistJob {
            session_id: inner.session.id,
            is_test_run: inner.session.is_test_run,
            root_folder: inner.config.root_folder.clone(),
            started_at: inner.session.started_at,
            writer: inner.writer(),
        }
    }

    /// Turns the controller off unless the session was replaced meanwhile.
    fn finish(&self, session_id: u64) {
        let mut inner = self.lock();
        if inner.session.id == session_id {
            inner.accumulator.clear();
            inner.state = ControllerState::Off;
        }
    }

    fn save_grabbed_shots(&self) {
        let (frames, job) = {
            let mut inner = self.lock();
            (inner.accumulator.take_frames(), Self::persist_job(&inner))
        };
        if !frames.is_empty() && !job.is_test_run {
            let destination = create_destination_directory(&job.root_folder, &job.started_at);
            let written = job.writer.save_all(&destination, &frames);
            info!(
                "Wrote {}/{} shots to {}",
                written,
                frames.len(),
                destination.display()
            );
        }
        self.finish(job.session_id);
    }

    fn save_bokeh_grabbed_shots(&self) {
        let (frame, job) = {
            let inner = self.lock();
            (inner.accumulator.composite_to_frame(), Self::persist_job(&inner))
        };
        match frame {
            Some(frame) if !job.is_test_run => {
                let destination = create_destination_directory(&job.root_folder, &job.started_at);
                match job.writer.save_shot_to_file(&destination, &frame, 0) {
                    Ok(path) => info!("Wrote bokeh shot to {}", path.display()),
                    Err(e) => warn!("Failed to write bokeh shot: {}", e),
                }
            }
            Some(_) => {}
            None => debug!("No bokeh samples to write"),
        }
        self.finish(job.session_id);
    }
}
