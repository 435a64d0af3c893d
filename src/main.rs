use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::Receiver;

use ppgscope::PpgError;
use ppgscope::acquisition::{PortInfo, list_ports, prompt_for_port};
use ppgscope::config::{PpgConfig, RefreshInterval};
use ppgscope::diagnostics::{Diagnostic, DiagnosticSink, LogSink};
use ppgscope::output::{OutputFormat, TickSummary, create_formatter};
use ppgscope::render::{RenderTick, TickOutcome, Ticker};
use ppgscope::session::Session;

#[derive(Parser, Debug)]
#[command(name = "ppgscope")]
#[command(about = "Live PPG acquisition and smoothing - terminal output", long_about = None)]
struct Args {
    /// Serial port to open (prompts with a numbered list when omitted)
    #[arg(short = 'p', long)]
    port: Option<String>,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Baud rate
    #[arg(short = 'b', long)]
    baud: Option<u32>,

    /// Samples kept in the rolling buffer
    #[arg(long)]
    capacity: Option<usize>,

    /// Render interval (e.g. "50ms", "20hz")
    #[arg(short = 'r', long)]
    refresh: Option<RefreshInterval>,

    /// Low-pass cutoff in Hz
    #[arg(long)]
    cutoff: Option<f64>,

    /// Low-pass filter order
    #[arg(long)]
    order: Option<usize>,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Print every line received from the device
    #[arg(short = 'e', long)]
    echo: bool,

    /// Stop after this many seconds
    #[arg(short = 'd', long, value_parser = parse_duration_secs)]
    duration: Option<Duration>,

    /// Use a synthetic device instead of a serial port
    #[cfg(feature = "simulation")]
    #[arg(long)]
    simulate: bool,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_duration_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {}", s))?;
    if secs.is_nan() || secs <= 0.0 {
        return Err("duration must be a positive number of seconds".to_string());
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration {}: {}", s, e))
}

fn load_config(args: &Args) -> anyhow::Result<PpgConfig> {
    let mut config = match &args.config {
        Some(path) => PpgConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => PpgConfig::default(),
    };

    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(capacity) = args.capacity {
        config.buffer.capacity = capacity;
    }
    if let Some(refresh) = args.refresh {
        config.display.refresh = refresh;
    }
    if let Some(cutoff) = args.cutoff {
        config.filter.cutoff_hz = cutoff;
    }
    if let Some(order) = args.order {
        config.filter.order = order;
    }

    config.validate()?;
    Ok(config)
}

fn print_ports(ports: &[PortInfo]) {
    println!("Available serial ports:");
    for (i, port) in ports.iter().enumerate() {
        println!("{}: {} - {}", i + 1, port.name, port.description);
    }
}

fn choose_port(sink: &dyn DiagnosticSink) -> anyhow::Result<String> {
    let report = |e: &PpgError| {
        sink.report(Diagnostic::Setup {
            message: e.to_string(),
        })
    };
    let ports = list_ports().inspect_err(report)?;
    let port = prompt_for_port(&ports, &mut io::stdin().lock(), &mut io::stdout())
        .inspect_err(report)?;
    Ok(port.name)
}

/// Print every echoed line waiting in `rx`
fn drain_echo<W: Write>(rx: Option<&Receiver<String>>, out: &mut W) -> io::Result<usize> {
    let Some(rx) = rx else {
        return Ok(0);
    };
    let mut count = 0;
    for line in rx.try_iter() {
        writeln!(out, "{}", line)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(feature = "simulation")]
fn open_session(
    args: &Args,
    config: &PpgConfig,
    sink: Arc<dyn DiagnosticSink>,
    echo: Option<crossbeam_channel::Sender<String>>,
) -> anyhow::Result<Session> {
    if args.simulate {
        use ppgscope::simulation::{SimulatedSource, SimulationConfig};
        let sim = SimulationConfig {
            sample_rate_hz: config.filter.sample_rate_hz,
            ..SimulationConfig::default()
        };
        let source = SimulatedSource::new(sim)?;
        return Ok(Session::start(Box::new(source), config, sink, echo)?);
    }
    open_serial_session(args, config, sink, echo)
}

#[cfg(not(feature = "simulation"))]
fn open_session(
    args: &Args,
    config: &PpgConfig,
    sink: Arc<dyn DiagnosticSink>,
    echo: Option<crossbeam_channel::Sender<String>>,
) -> anyhow::Result<Session> {
    open_serial_session(args, config, sink, echo)
}

fn open_serial_session(
    args: &Args,
    config: &PpgConfig,
    sink: Arc<dyn DiagnosticSink>,
    echo: Option<crossbeam_channel::Sender<String>>,
) -> anyhow::Result<Session> {
    let port = match &args.port {
        Some(port) => port.clone(),
        None => choose_port(sink.as_ref())?,
    };
    println!(
        "Connecting to {} at {} baud...",
        port, config.serial.baud_rate
    );
    Session::open_serial(&port, config, sink, echo)
        .with_context(|| format!("Failed to open {}", port))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    if args.list_ports {
        let ports = list_ports()?;
        if ports.is_empty() {
            eprintln!("No serial ports found.");
        } else {
            print_ports(&ports);
        }
        return Ok(());
    }

    let config = load_config(&args)?;
    let sink: Arc<dyn DiagnosticSink> = Arc::new(LogSink);

    let (echo_tx, echo_rx) = if args.echo {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };

    let mut session = open_session(&args, &config, Arc::clone(&sink), echo_tx)?;
    let mut render = RenderTick::new(&config, sink)?;

    log::info!(
        "Buffer {} samples, low-pass {} Hz order {}, refresh {}",
        config.buffer.capacity,
        config.filter.cutoff_hz,
        config.filter.order,
        config.display.refresh
    );

    let result = run_display_loop(&args, &config, &session, &mut render, echo_rx.as_ref());

    if let Some(stats) = session.stop() {
        println!(
            "Closed {}: {} lines, {} samples, {} parse errors",
            session.device(),
            stats.lines,
            stats.samples,
            stats.parse_errors
        );
    }

    result
}

fn run_display_loop(
    args: &Args,
    config: &PpgConfig,
    session: &Session,
    render: &mut RenderTick,
    echo_rx: Option<&Receiver<String>>,
) -> anyhow::Result<()> {
    let formatter = create_formatter(args.format, args.verbose > 0);
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }

    let state = session.state();
    let started = Instant::now();
    let mut ticker = Ticker::new(config.display.refresh.as_duration(), started);

    loop {
        let now = Instant::now();
        if args.duration.is_some_and(|d| now.duration_since(started) >= d) {
            break;
        }

        drain_echo(echo_rx, &mut io::stdout().lock())?;

        if ticker.poll(now) {
            if let TickOutcome::Updated { .. } = render.tick(&state, session.buffer()) {
                println!("{}", formatter.format(&TickSummary::from_display(render.display())));
            }
        }

        if !state.is_connected() {
            // Lines read just before the device went away
            drain_echo(echo_rx, &mut io::stdout().lock())?;
            eprintln!("Acquisition stopped; device disconnected.");
            break;
        }

        thread::sleep(ticker.time_until_next(Instant::now()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_secs() {
        assert_eq!(parse_duration_secs("2.5"), Ok(Duration::from_millis(2500)));
        assert!(parse_duration_secs("-1").is_err());
        assert!(parse_duration_secs("0").is_err());
        assert!(parse_duration_secs("NaN").is_err());
        assert!(parse_duration_secs("inf").is_err());
        assert!(parse_duration_secs("soon").is_err());
    }

    #[test]
    fn test_duration_flag_rejects_negative() {
        assert!(Args::try_parse_from(["ppgscope", "--duration=-1"]).is_err());
        let args = Args::try_parse_from(["ppgscope", "--duration", "3"]).unwrap();
        assert_eq!(args.duration, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_drain_echo_empties_channel() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send("PPG_RAW,1,2,3".to_string()).unwrap();
        tx.send("PPG_RAW,2,3,4".to_string()).unwrap();
        drop(tx);

        let mut out: Vec<u8> = Vec::new();
        assert_eq!(drain_echo(Some(&rx), &mut out).unwrap(), 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "PPG_RAW,1,2,3\nPPG_RAW,2,3,4\n"
        );
        assert_eq!(drain_echo(Some(&rx), &mut Vec::<u8>::new()).unwrap(), 0);
        assert_eq!(drain_echo(None, &mut Vec::<u8>::new()).unwrap(), 0);
    }
}
