use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};

use ppgscope::acquisition::{PortInfo, list_ports};
use ppgscope::config::{PpgConfig, RefreshInterval};
use ppgscope::diagnostics::{DiagnosticSink, LogSink};
use ppgscope::render::{RenderTick, Ticker, Trace};
use ppgscope::session::Session;

#[derive(Parser, Debug)]
#[command(name = "ppgscope_gui")]
#[command(about = "Live PPG waveform monitor - GUI", long_about = None)]
struct Args {
    /// Serial port to open at startup
    #[arg(short = 'p', long)]
    port: Option<String>,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Render interval (e.g. "50ms", "20hz")
    #[arg(short = 'r', long)]
    refresh: Option<RefreshInterval>,

    /// Use a synthetic device instead of a serial port
    #[cfg(feature = "simulation")]
    #[arg(long)]
    simulate: bool,

    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

const MAX_LOG_LINES: usize = 1000;
const RED_TRACE: egui::Color32 = egui::Color32::from_rgb(230, 60, 60);
const INFRARED_TRACE: egui::Color32 = egui::Color32::from_rgb(70, 120, 230);

struct GuiLogger {
    tx: Sender<String>,
    max_level: log::LevelFilter,
}

impl log::Log for GuiLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let msg = format!("[{}] {}", record.level(), record.args());
            let _ = self.tx.send(msg);
        }
    }

    fn flush(&self) {}
}

struct PpgGuiApp {
    config: PpgConfig,
    sink: Arc<dyn DiagnosticSink>,
    session: Option<Session>,
    render: RenderTick,
    ticker: Ticker,
    log_rx: Receiver<String>,
    log_lines: VecDeque<String>,
    ports: Vec<PortInfo>,
    selected_port: Option<usize>,
}

impl PpgGuiApp {
    fn new(
        _cc: &eframe::CreationContext<'_>,
        config: PpgConfig,
        session: Option<Session>,
        log_rx: Receiver<String>,
    ) -> ppgscope::Result<Self> {
        let sink: Arc<dyn DiagnosticSink> = Arc::new(LogSink);
        let render = RenderTick::new(&config, Arc::clone(&sink))?;
        let ticker = Ticker::new(config.display.refresh.as_duration(), Instant::now());
        let ports = list_ports().unwrap_or_else(|e| {
            log::warn!("{}", e);
            Vec::new()
        });

        Ok(Self {
            config,
            sink,
            session,
            render,
            ticker,
            log_rx,
            log_lines: VecDeque::new(),
            selected_port: if ports.is_empty() { None } else { Some(0) },
            ports,
        })
    }

    fn connect(&mut self) {
        let Some(port) = self.selected_port.and_then(|i| self.ports.get(i)) else {
            log::error!("No port selected");
            return;
        };
        let name = port.name.clone();
        self.disconnect();
        match Session::open_serial(&name, &self.config, Arc::clone(&self.sink), None) {
            Ok(session) => {
                // Fresh display for the new device
                match RenderTick::new(&self.config, Arc::clone(&self.sink)) {
                    Ok(render) => self.render = render,
                    Err(e) => log::error!("{}", e),
                }
                self.session = Some(session);
            }
            Err(e) => log::error!("Connect failed: {}", e),
        }
    }

    fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
    }

    fn refresh_ports(&mut self) {
        match list_ports() {
            Ok(ports) => {
                self.selected_port = if ports.is_empty() { None } else { Some(0) };
                self.ports = ports;
            }
            Err(e) => log::error!("{}", e),
        }
    }

    fn drain_logs(&mut self) {
        while let Ok(msg) = self.log_rx.try_recv() {
            self.log_lines.push_back(msg);
            while self.log_lines.len() > MAX_LOG_LINES {
                self.log_lines.pop_front();
            }
        }
    }

    fn draw_trace(
        ui: &mut egui::Ui,
        id: &str,
        title: &str,
        trace: &Trace,
        color: egui::Color32,
        height: f32,
    ) {
        ui.label(
            egui::RichText::new(title)
                .color(egui::Color32::LIGHT_GRAY)
                .small(),
        );

        let points: PlotPoints = trace.points.iter().copied().collect();
        let mut plot = Plot::new(id)
            .height(height)
            .y_axis_label("counts")
            .y_axis_min_width(60.0)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false);
        if let Some((x0, x1)) = trace.x_range {
            plot = plot.include_x(x0).include_x(x1);
        }
        if let Some((y0, y1)) = trace.y_range {
            plot = plot.include_y(y0).include_y(y1);
        }

        plot.show(ui, |plot_ui| {
            plot_ui.line(Line::new(title, points).color(color).width(1.5));
        });
    }

    fn draw_plots(&self, ui: &mut egui::Ui) {
        let display = self.render.display();
        let plot_height = ((ui.available_height() - 60.0) / 2.0).max(120.0);

        ui.columns(2, |cols| {
            Self::draw_trace(
                &mut cols[0],
                "raw_red",
                "Red (raw)",
                &display.raw_red,
                RED_TRACE,
                plot_height,
            );
            Self::draw_trace(
                &mut cols[0],
                "raw_infrared",
                "Infrared (raw)",
                &display.raw_infrared,
                INFRARED_TRACE,
                plot_height,
            );
            Self::draw_trace(
                &mut cols[1],
                "filtered_red",
                "Red (filtered)",
                &display.filtered_red,
                RED_TRACE,
                plot_height,
            );
            Self::draw_trace(
                &mut cols[1],
                "filtered_infrared",
                "Infrared (filtered)",
                &display.filtered_infrared,
                INFRARED_TRACE,
                plot_height,
            );
        });
    }

    fn draw_status(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let connected = self.session.as_ref().is_some_and(|s| s.is_connected());

            if connected {
                ui.label(
                    egui::RichText::new("CONNECTED")
                        .color(egui::Color32::from_rgb(100, 255, 100))
                        .strong(),
                );
            } else {
                ui.label(
                    egui::RichText::new("DISCONNECTED")
                        .color(egui::Color32::from_rgb(255, 80, 80))
                        .strong(),
                );
            }
            ui.separator();

            if let Some(session) = &self.session {
                ui.label(egui::RichText::new(session.device()).color(egui::Color32::WHITE));
                ui.separator();
            }

            let display = self.render.display();
            ui.label(egui::RichText::new("Samples:").color(egui::Color32::LIGHT_GRAY));
            ui.label(
                egui::RichText::new(format!("{:>4}", display.samples))
                    .monospace()
                    .color(egui::Color32::WHITE),
            );
            ui.label(egui::RichText::new("Seq:").color(egui::Color32::LIGHT_GRAY));
            let seq = display
                .last_sequence
                .map_or("---".to_string(), |s| s.to_string());
            ui.label(
                egui::RichText::new(seq)
                    .monospace()
                    .color(egui::Color32::WHITE),
            );
            ui.separator();

            if connected {
                if ui.button("Disconnect").clicked() {
                    self.disconnect();
                }
            } else {
                let selected_text = self
                    .selected_port
                    .and_then(|i| self.ports.get(i))
                    .map_or("(no ports)".to_string(), |p| {
                        format!("{} - {}", p.name, p.description)
                    });
                egui::ComboBox::from_id_salt("port_select")
                    .selected_text(selected_text)
                    .show_ui(ui, |ui| {
                        for (i, port) in self.ports.iter().enumerate() {
                            ui.selectable_value(
                                &mut self.selected_port,
                                Some(i),
                                format!("{} - {}", port.name, port.description),
                            );
                        }
                    });
                if ui.button("\u{21bb}").clicked() {
                    self.refresh_ports();
                }
                if ui
                    .add_enabled(self.selected_port.is_some(), egui::Button::new("Connect"))
                    .clicked()
                {
                    self.connect();
                }
            }
        });
    }
}

impl eframe::App for PpgGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_logs();

        let now = Instant::now();
        if self.ticker.poll(now) {
            if let Some(session) = &self.session {
                self.render.tick(&session.state(), session.buffer());
            }
        }
        ctx.request_repaint_after(self.ticker.time_until_next(Instant::now()));

        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::TopBottomPanel::top("status_bar").show(ctx, |ui| {
            self.draw_status(ui);
        });

        egui::TopBottomPanel::bottom("debug_log")
            .resizable(true)
            .default_height(120.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("Log")
                            .color(egui::Color32::LIGHT_GRAY)
                            .strong(),
                    );
                    if ui.small_button("Clear").clicked() {
                        self.log_lines.clear();
                    }
                });
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in &self.log_lines {
                            ui.label(
                                egui::RichText::new(line)
                                    .font(egui::FontId::monospace(11.0))
                                    .color(egui::Color32::from_rgb(180, 180, 180)),
                            );
                        }
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_plots(ui);
        });
    }
}

impl Drop for PpgGuiApp {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(feature = "simulation")]
fn initial_session(
    args: &Args,
    config: &PpgConfig,
    sink: Arc<dyn DiagnosticSink>,
) -> anyhow::Result<Option<Session>> {
    if args.simulate {
        use ppgscope::simulation::{SimulatedSource, SimulationConfig};
        let sim = SimulationConfig {
            sample_rate_hz: config.filter.sample_rate_hz,
            ..SimulationConfig::default()
        };
        let source = SimulatedSource::new(sim)?;
        return Ok(Some(Session::start(Box::new(source), config, sink, None)?));
    }
    serial_session(args, config, sink)
}

#[cfg(not(feature = "simulation"))]
fn initial_session(
    args: &Args,
    config: &PpgConfig,
    sink: Arc<dyn DiagnosticSink>,
) -> anyhow::Result<Option<Session>> {
    serial_session(args, config, sink)
}

fn serial_session(
    args: &Args,
    config: &PpgConfig,
    sink: Arc<dyn DiagnosticSink>,
) -> anyhow::Result<Option<Session>> {
    match &args.port {
        Some(port) => Ok(Some(Session::open_serial(port, config, sink, None)?)),
        None => Ok(None),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let (tx, rx) = crossbeam_channel::unbounded::<String>();

    let logger = GuiLogger {
        tx,
        max_level: log_level,
    };
    log::set_boxed_logger(Box::new(logger)).ok();
    log::set_max_level(log_level);

    let mut config = match &args.config {
        Some(path) => PpgConfig::from_toml_file(path)?,
        None => PpgConfig::default(),
    };
    if let Some(refresh) = args.refresh {
        config.display.refresh = refresh;
    }
    config.validate()?;

    let session = initial_session(&args, &config, Arc::new(LogSink))?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([800.0, 500.0])
            .with_title("PPG waveform monitor"),
        ..Default::default()
    };

    eframe::run_native(
        "ppgscope",
        native_options,
        Box::new(move |cc| {
            let app = PpgGuiApp::new(cc, config, session, rx)?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}
