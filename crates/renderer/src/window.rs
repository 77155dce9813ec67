use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use tracing::{debug, info, trace};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::display::{FpsDisplay, LogSink, StatusSink};
use crate::error::HarnessError;
use crate::feed::{ControlEdit, ControlField};
use crate::gpu::WgpuDevice;
use crate::harness::{Harness, HarnessPorts, ProgramBindings};
use crate::schedule::TickScheduler;
use crate::timing::SystemClock;
use crate::types::{HarnessConfig, SurfaceSize};

/// Requests the next tick as a redraw. With a Fifo swapchain the redraw
/// blocks on the display, so ticks follow the refresh rate.
struct WindowScheduler {
    window: Arc<Window>,
}

impl TickScheduler for WindowScheduler {
    fn schedule_next(&mut self) {
        self.window.request_redraw();
    }
}

/// Status sink writing into the window title, next to the control text.
/// Readouts are also forwarded to `echo` when set.
struct WindowStatus {
    window: Arc<Window>,
    field: ControlField,
    echo: Option<LogSink>,
    last: String,
}

impl WindowStatus {
    fn redraw_title(&self) {
        self.window
            .set_title(&status_title(&self.last, &self.field.text()));
    }
}

impl StatusSink for WindowStatus {
    fn show(&mut self, text: &str) {
        if let Some(echo) = self.echo.as_mut() {
            echo.show(text);
        }
        self.last.clear();
        self.last.push_str(text);
        self.redraw_title();
    }
}

/// A display connection or window that cannot be opened means there is no
/// surface to render into, which halts start-up like a missing context.
fn surface_unavailable(what: &str, err: impl Display) -> anyhow::Error {
    HarnessError::ContextUnavailable {
        reason: format!("{what}: {err}"),
    }
    .into()
}

fn status_title(status: &str, control: &str) -> String {
    format!("{status} | bounces: {control}")
}

/// Maps a pressed key to edits of the bounce-count field.
fn control_edits(key: &Key) -> Vec<ControlEdit> {
    match key {
        Key::Character(text) => text.chars().map(ControlEdit::Insert).collect(),
        Key::Named(NamedKey::Space) => vec![ControlEdit::Insert(' ')],
        Key::Named(NamedKey::Backspace) => vec![ControlEdit::Backspace],
        Key::Named(NamedKey::Escape) => vec![ControlEdit::Clear],
        Key::Named(NamedKey::ArrowUp) => vec![ControlEdit::StepUp],
        Key::Named(NamedKey::ArrowDown) => vec![ControlEdit::StepDown],
        _ => Vec::new(),
    }
}

/// Everything the event loop owns. Field order matters: the harness (and
/// its surface) drops before the window it was created from.
struct WindowHost {
    harness: Harness<WgpuDevice>,
    display: FpsDisplay<WindowStatus>,
    scheduler: WindowScheduler,
    field: ControlField,
    window: Arc<Window>,
}

/// Opens the window, initialises the harness against it and runs the frame
/// loop until the window closes.
///
/// Initialisation failures are returned as [`crate::HarnessError`] inside the
/// `anyhow` error so callers can tell an unavailable context apart.
pub fn run(config: HarnessConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| surface_unavailable("failed to create event loop", err))?;

    let requested = PhysicalSize::new(config.surface_size.width, config.surface_size.height);
    let window = WindowBuilder::new()
        .with_title(&config.title)
        .with_inner_size(requested)
        .with_resizable(false)
        .build(&event_loop)
        .map_err(|err| surface_unavailable("failed to create window", err))?;
    let window = Arc::new(window);

    let inner = window.inner_size();
    let surface_size = SurfaceSize::new(inner.width, inner.height);
    if surface_size != config.surface_size {
        debug!(
            requested = ?config.surface_size,
            actual = ?surface_size,
            "window manager changed the surface size"
        );
    }

    let field = ControlField::new(&config.initial_bounces);
    let ports = HarnessPorts {
        clock: Box::new(SystemClock::new()),
        control: Box::new(field.clone()),
    };
    let bindings = ProgramBindings {
        position_attribute: config.position_attribute.clone(),
        bounce_uniform: config.bounce_uniform.clone(),
    };
    let harness = Harness::initialize(
        || WgpuDevice::new(window.as_ref(), surface_size, config.gpu_power, config.vsync),
        &config.sources,
        ports,
        &bindings,
    )?;

    let status = WindowStatus {
        window: window.clone(),
        field: field.clone(),
        echo: config.echo_status.then_some(LogSink),
        last: String::new(),
    };
    let mut display = FpsDisplay::new(
        status,
        harness.fps(),
        config.display_interval,
        Instant::now(),
    );
    display.refresh();

    let mut host = WindowHost {
        harness,
        display,
        scheduler: WindowScheduler {
            window: window.clone(),
        },
        field,
        window,
    };
    host.harness.start(&mut host.scheduler);
    let cancel = host.harness.cancellation();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == host.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        info!(frames = host.harness.frames(), "window closed; stopping");
                        cancel.cancel();
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state != ElementState::Pressed {
                            return;
                        }
                        let mut changed = false;
                        for edit in control_edits(&event.logical_key) {
                            changed |= host.field.apply(edit);
                        }
                        if changed {
                            trace!(control = %host.field.text(), "control edited");
                            host.display.sink_mut().redraw_title();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        host.harness.tick(&mut host.scheduler);
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                host.display.poll(Instant::now());
                elwt.set_control_flow(ControlFlow::WaitUntil(host.display.next_deadline()));
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_pairs_status_with_control_text() {
        assert_eq!(
            status_title("FPS: 60.0 fps", "3"),
            "FPS: 60.0 fps | bounces: 3"
        );
    }

    #[test]
    fn missing_display_is_reported_as_unavailable_context() {
        let err = surface_unavailable(
            "failed to create event loop",
            "neither WAYLAND_DISPLAY nor DISPLAY is set",
        );
        let harness_err = err
            .downcast_ref::<HarnessError>()
            .expect("harness error inside anyhow");
        assert!(harness_err.is_context_unavailable());
        assert!(harness_err.to_string().contains("DISPLAY is set"));
    }

    #[test]
    fn keys_map_to_field_edits() {
        assert_eq!(
            control_edits(&Key::Character("12".into())),
            vec![ControlEdit::Insert('1'), ControlEdit::Insert('2')]
        );
        assert_eq!(
            control_edits(&Key::Named(NamedKey::Backspace)),
            vec![ControlEdit::Backspace]
        );
        assert_eq!(
            control_edits(&Key::Named(NamedKey::Escape)),
            vec![ControlEdit::Clear]
        );
        assert_eq!(
            control_edits(&Key::Named(NamedKey::ArrowUp)),
            vec![ControlEdit::StepUp]
        );
        assert_eq!(
            control_edits(&Key::Named(NamedKey::ArrowDown)),
            vec![ControlEdit::StepDown]
        );
        assert!(control_edits(&Key::Named(NamedKey::Shift)).is_empty());
    }
}
