use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use c32_app::{AppResult, Engine, EngineConfig, load_yaml};
use c32_blocks::opcode;
use c32_core::MonotonicClock;
use c32_link::{MessageType, ResponseHeader, Transport, decode_report};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "c32")]
#[command(about = "Function block controller runtime", long_about = None)]
struct Cli {
    /// Engine configuration YAML (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sine demo circuit
    Run {
        /// Number of task runs before exiting (0 runs forever)
        #[arg(long, default_value_t = 10)]
        ticks: u32,
        /// Task interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u32,
    },
    /// List the function catalog
    Catalog,
    /// Print the effective configuration as YAML
    Config,
}

/// Transport that traces every outbound frame.
#[derive(Debug, Default)]
struct LogTransport {
    frames: u64,
}

impl Transport for LogTransport {
    fn send_bytes(&mut self, bytes: &[u8]) {
        self.frames += 1;
        let Ok((header, body)) = ResponseHeader::decode(bytes) else {
            return;
        };
        let kind = MessageType::from_u32(header.msg_type).map_or("?", MessageType::name);
        if header.msg_type == MessageType::MonitoringReport.as_u32() {
            if let Ok(items) = decode_report(body) {
                for item in items {
                    debug!(function = format_args!("{:#010x}", item.function), values = ?item.values, "monitoring");
                }
            }
        } else {
            debug!(
                msg = kind,
                request_id = header.request_id,
                ok = header.success(),
                len = bytes.len(),
                "frame out"
            );
        }
    }
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { ticks, interval_ms } => cmd_run(&config, ticks, interval_ms),
        Commands::Catalog => cmd_catalog(),
        Commands::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> AppResult<EngineConfig> {
    match path {
        Some(path) => load_yaml(path),
        None => Ok(EngineConfig::default()),
    }
}

fn cmd_run(config: &EngineConfig, ticks: u32, interval_ms: u32) -> AppResult<()> {
    let mut engine = Engine::new(config, LogTransport::default(), MonotonicClock::new())?;
    let mut inbox = engine.inbox();
    if let Some(inbox) = inbox.as_mut() {
        inbox.connected();
    }
    let demo = engine.install_sine_demo(interval_ms)?;
    engine.controller_mut().graph_mut().enable_monitoring(demo.gain, false)?;
    info!(task = %demo.task, circuit = %demo.circuit, interval_ms, "demo installed");

    if ticks == 0 {
        let stop = AtomicBool::new(false);
        engine.run_until(&stop);
        return Ok(());
    }

    let mut seen = 0;
    while seen < ticks {
        let sleep = engine.run_once();
        let runs = engine
            .controller()
            .task(demo.task)
            .map_or(0, |t| t.stats().run_count);
        if runs > seen {
            seen = runs;
            if let Some(out) = demo.output(engine.controller()) {
                info!(n = runs, output = out, "circuit output");
            }
        }
        std::thread::sleep(sleep);
    }
    engine.controller().log_summary();
    println!(
        "✓ {} runs, {} frames sent",
        seen,
        engine.link().transport().frames
    );
    Ok(())
}

fn cmd_catalog() -> AppResult<()> {
    let factory = c32_library::standard_factory()?;
    for library in factory.libraries() {
        println!("{} (library {})", library.name(), library.id());
        for (function, name) in library.function_names().iter().enumerate() {
            let function = function as u8;
            println!("  {:#06x}  {}", opcode(library.id(), function), name);
        }
    }
    Ok(())
}

fn cmd_config(config: &EngineConfig) -> AppResult<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}
