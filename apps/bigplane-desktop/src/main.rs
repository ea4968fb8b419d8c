use anyhow::Result;
use bigplane_mesh::{DEFAULT_GRID_SIZE, FillStrategy, GridConfig, GridMesh, generate_plane};
use bigplane_render::{FrameWindow, RenderError, RenderLoop};
use bigplane_render_wgpu::{BackendOptions, WgpuBackend};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "bigplane-desktop", about = "Render a huge rotating plane and report FPS")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Vertices per side of the grid
    #[arg(short = 'n', long, default_value_t = DEFAULT_GRID_SIZE)]
    grid_size: u32,

    /// Inset of the plane from the window edge, in NDC units
    #[arg(long, default_value_t = 0.1)]
    margin: f32,

    /// Constant z of the plane
    #[arg(long, default_value_t = 0.0)]
    depth: f32,

    /// Generate on one thread instead of the rayon pool
    #[arg(long)]
    serial: bool,

    /// Refuse to generate buffers larger than this many MiB
    #[arg(long)]
    memory_budget_mib: Option<u64>,

    /// Window width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Sync presents to the display refresh
    #[arg(long)]
    vsync: bool,
}

impl Cli {
    fn grid_config(&self) -> GridConfig {
        GridConfig {
            grid_size: self.grid_size,
            margin: self.margin,
            depth: self.depth,
            fill: if self.serial {
                FillStrategy::Serial
            } else {
                FillStrategy::Parallel
            },
            memory_budget: self
                .memory_budget_mib
                .map(|mib| mib.saturating_mul(1024 * 1024)),
        }
    }
}

/// The winit window as seen by the render loop.
struct DesktopWindow {
    window: Arc<Window>,
    close_requested: bool,
}

impl FrameWindow for DesktopWindow {
    fn should_close(&self) -> bool {
        self.close_requested
    }

    // winit delivers events between redraws; asking for the next redraw keeps
    // the loop spinning.
    fn poll_events(&mut self) {
        self.window.request_redraw();
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }
}

struct PlaneApp {
    /// Host copy of the mesh, released once it is on the GPU.
    mesh: Option<GridMesh>,
    options: BackendOptions,
    title: String,
    window: Option<DesktopWindow>,
    render_loop: Option<RenderLoop<WgpuBackend>>,
    error: Option<RenderError>,
}

impl PlaneApp {
    fn new(mesh: GridMesh, options: BackendOptions) -> Self {
        let title = format!(
            "Plane with {}M Triangles",
            mesh.triangle_count() / 1_000_000
        );
        Self {
            mesh: Some(mesh),
            options,
            title,
            window: None,
            render_loop: None,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RenderError> {
        let attrs = Window::default_attributes()
            .with_title(self.title.as_str())
            .with_inner_size(PhysicalSize::new(self.options.width, self.options.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| RenderError::Initialization(format!("create window: {e}")))?,
        );

        let size = window.inner_size();
        let options = BackendOptions {
            width: size.width,
            height: size.height,
            ..self.options
        };
        let backend = WgpuBackend::new(window.clone(), options)?;
        for diagnostic in backend.diagnostics() {
            tracing::warn!("rendering continues despite: {diagnostic}");
        }

        let Some(mesh) = self.mesh.take() else {
            return Err(RenderError::Initialization("mesh already consumed".into()));
        };
        let render_loop = RenderLoop::new(backend, &mesh, Instant::now())?;
        drop(mesh);

        window.request_redraw();
        self.window = Some(DesktopWindow {
            window,
            close_requested: false,
        });
        self.render_loop = Some(render_loop);
        Ok(())
    }
}

impl ApplicationHandler for PlaneApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.error.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            tracing::error!("{e}");
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(window) = &mut self.window {
                    window.close_requested = true;
                }
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(render_loop) = &mut self.render_loop {
                    render_loop
                        .backend_mut()
                        .resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let (Some(render_loop), Some(window)) = (&mut self.render_loop, &mut self.window)
                else {
                    return;
                };
                if window.should_close() {
                    return;
                }
                render_loop.frame(window, Instant::now());
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("bigplane-desktop starting");

    let config = cli.grid_config();
    config.validate()?;
    tracing::info!("generate plane begin");
    let mesh = generate_plane(&config)?;
    tracing::info!("generate plane done");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let options = BackendOptions {
        width: cli.width,
        height: cli.height,
        vsync: cli.vsync,
    };
    let mut app = PlaneApp::new(mesh, options);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.error {
        return Err(err.into());
    }
    if let Some(render_loop) = &app.render_loop {
        let summary = render_loop.summary();
        tracing::info!(
            frames = summary.frames,
            elapsed = ?summary.elapsed,
            average_fps = summary.average_fps(),
            "session finished"
        );
    }

    Ok(())
}
