use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::input::{ActionStates, EdgeLatch};
use super::metrics::MetricsAccumulator;
use super::scene::SceneRuntime;
use super::{InputAction, InputSnapshot, MetricsHandle, OverlayData, Renderer, Scene, SceneCommand};

pub const SLOW_FRAME_ENV_VAR: &str = "DUNGEON_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
    /// Initial visibility of the F3 debug overlay.
    pub debug_overlay: bool,
    /// Directory holding `sprites/`.
    pub asset_root: PathBuf,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Dungeon".to_string(),
            window_width: 960,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
            debug_overlay: false,
            asset_root: PathBuf::from("assets"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    run_app_with_metrics(config, scene, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let mut runtime = SceneRuntime::new(scene);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window), config.asset_root.clone())
        .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let render_fps_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(render_fps_cap);
    let size = window.inner_size();
    let mut input_collector = InputCollector::new(size.width, size.height);

    runtime.load();
    runtime.apply_pending();
    info!(
        entity_count = runtime.world().entity_count(),
        "scene_loaded"
    );
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(render_fps_cap),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;
    let mut overlay_visible = config.debug_overlay;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input_collector.set_cursor_position_px(position.x as f32, position.y as f32);
                }
                WindowEvent::CursorLeft { .. } => input_collector.clear_cursor_position(),
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if input_collector.overlay_toggle.take() {
                        overlay_visible = !overlay_visible;
                        info!(overlay_visible, "overlay_toggled");
                    }

                    if slow_frame_delay > Duration::ZERO {
                        // Debug perturbation only; not the FPS cap.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;
                    accumulator =
                        accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        let command = runtime.update(fixed_dt_seconds, &input_snapshot);
                        runtime.apply_pending();
                        metrics_accumulator.record_tick();

                        match command {
                            SceneCommand::None => {}
                            SceneCommand::HardReset => {
                                runtime.hard_reset();
                                info!(
                                    entity_count = runtime.world().entity_count(),
                                    "scene_reset"
                                );
                            }
                            SceneCommand::Quit => {
                                info!(reason = "scene_request", "shutdown_requested");
                                window_target.exit();
                                break;
                            }
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    let cap_sleep = compute_cap_sleep(
                        Instant::now().saturating_duration_since(last_present_instant),
                        render_frame_target,
                    );
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    let hud = runtime.hud();
                    let overlay = overlay_visible.then(|| OverlayData {
                        metrics: metrics_handle.snapshot(),
                        render_fps_cap,
                        slow_frame_delay_ms: slow_frame_delay.as_millis() as u64,
                        entity_count: runtime.world().entity_count(),
                    });
                    if let Err(error) =
                        renderer.render_world(runtime.world(), hud.as_ref(), overlay.as_ref())
                    {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = runtime.debug_title();
                    if next_title != last_applied_title {
                        window.set_title(next_title.as_deref().unwrap_or(&config.window_title));
                        last_applied_title = next_title;
                    }

                    metrics_accumulator.record_frame(raw_frame_dt);
                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            entity_count = runtime.world().entity_count(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => {
                runtime.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    interact: EdgeLatch,
    attack: EdgeLatch,
    restart: EdgeLatch,
    overlay_toggle: EdgeLatch,
    cursor_position_px: Option<super::Vec2>,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.handle_physical_key(key_event.physical_key, is_pressed);
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        match code {
            KeyCode::KeyW | KeyCode::ArrowUp => {
                self.action_states.set(InputAction::MoveUp, is_pressed);
            }
            KeyCode::KeyS | KeyCode::ArrowDown => {
                self.action_states.set(InputAction::MoveDown, is_pressed);
            }
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.action_states.set(InputAction::MoveLeft, is_pressed);
            }
            KeyCode::KeyD | KeyCode::ArrowRight => {
                self.action_states.set(InputAction::MoveRight, is_pressed);
            }
            KeyCode::Space => self.interact.update(is_pressed),
            KeyCode::KeyR => self.restart.update(is_pressed),
            KeyCode::F3 => self.overlay_toggle.update(is_pressed),
            KeyCode::Escape => {
                self.action_states.set(InputAction::Quit, is_pressed);
                if is_pressed {
                    self.mark_quit_requested();
                }
            }
            _ => {}
        }
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left {
            self.attack.update(state == ElementState::Pressed);
        }
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    fn set_cursor_position_px(&mut self, x: f32, y: f32) {
        self.cursor_position_px = Some(super::Vec2 { x, y });
    }

    fn clear_cursor_position(&mut self) {
        self.cursor_position_px = None;
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            self.cursor_position_px,
            self.interact.take(),
            self.attack.take(),
            self.restart.take(),
            self.window_width,
            self.window_height,
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(mut accumulator: Duration, fixed_dt: Duration, max_ticks_per_frame: u32) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator -= fixed_dt;
        ticks_to_run += 1;
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) => frame_target.saturating_sub(elapsed),
        None => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    cap.map(|value| value.to_string())
        .unwrap_or_else(|| "off".to_string())
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    let fallback = Duration::from_millis(config_slow_frame_ms);
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                fallback
            }
        },
        Err(env::VarError::NotPresent) => fallback,
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_keeps_remainder() {
        let result = plan_sim_steps(Duration::from_millis(40), Duration::from_millis(16), 5);

        assert_eq!(result.ticks_to_run, 2);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(8));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let result = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn interact_edge_lasts_one_tick() {
        let mut input = InputCollector::new(960, 720);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Space), true);

        assert!(input.snapshot_for_tick().interact_pressed());
        assert!(!input.snapshot_for_tick().interact_pressed());
    }

    #[test]
    fn held_interact_does_not_repeat() {
        let mut input = InputCollector::new(960, 720);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Space), true);
        let first = input.snapshot_for_tick();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Space), true);
        let second = input.snapshot_for_tick();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Space), false);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Space), true);
        let third = input.snapshot_for_tick();

        assert!(first.interact_pressed());
        assert!(!second.interact_pressed());
        assert!(third.interact_pressed());
    }

    #[test]
    fn wasd_and_arrow_keys_map_to_actions() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyW), true);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::ArrowLeft), true);

        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::MoveUp));
        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(!snapshot.is_down(InputAction::MoveRight));
    }

    #[test]
    fn key_release_clears_action_state() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyD), true);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyD), false);
        assert!(!input.snapshot_for_tick().is_down(InputAction::MoveRight));
    }

    #[test]
    fn left_click_is_attack_edge() {
        let mut input = InputCollector::new(960, 720);
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);

        assert!(input.snapshot_for_tick().attack_pressed());
        assert!(!input.snapshot_for_tick().attack_pressed());
    }

    #[test]
    fn restart_and_overlay_keys_are_edge_triggered() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyR), true);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::F3), true);

        assert!(input.overlay_toggle.take());
        assert!(!input.overlay_toggle.take());
        assert!(input.snapshot_for_tick().restart_pressed());
        assert!(!input.snapshot_for_tick().restart_pressed());
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Escape), true);
        assert!(input.quit_requested);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn snapshot_carries_cursor_and_window_size() {
        let mut input = InputCollector::new(960, 720);
        input.set_cursor_position_px(100.0, 200.0);
        let snapshot = input.snapshot_for_tick();

        assert_eq!(snapshot.window_size(), (960, 720));
        let cursor = snapshot.cursor_position_px().expect("cursor");
        assert!((cursor.x - 100.0).abs() < 0.0001);
        assert!((cursor.y - 200.0).abs() < 0.0001);

        input.clear_cursor_position();
        assert!(input.snapshot_for_tick().cursor_position_px().is_none());
    }

    #[test]
    fn cap_sleep_fills_remaining_budget() {
        let target = target_frame_duration(Some(50));
        let sleep = compute_cap_sleep(Duration::from_millis(5), target);
        assert!(sleep > Duration::from_millis(14) && sleep <= Duration::from_millis(15));
        assert_eq!(compute_cap_sleep(Duration::from_millis(30), target), Duration::ZERO);
        assert_eq!(compute_cap_sleep(Duration::from_millis(5), None), Duration::ZERO);
    }

    #[test]
    fn normalize_render_fps_cap_disables_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(60)), Some(60));
        assert_eq!(format_render_cap(None), "off");
    }
}
