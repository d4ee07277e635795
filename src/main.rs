//! Powerstage host simulator.
//!
//! Runs one board controller against the simulated plant on the host.
//! Standard input is the serial transport, standard output carries the
//! replies, and logs go to stderr.
//!
//! ```text
//! ┌──────────────┐  RX_CHANNEL (u8)  ┌──────────────────────────────┐
//! │ stdin thread │─────────────────▶│  control loop (block_on)     │
//! └──────────────┘                   │   Ticker ─▶ tick + advance   │
//!                                    │   byte   ─▶ on_serial_byte   │
//!                                    └──────────────┬───────────────┘
//!                                                   ▼ stdout
//! ```
//!
//! Usage: `powerstage [--board converter|panel|supply] [--config file.json] [--ticks N]`
#![deny(unused_must_use)]

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Ticker};
use futures_lite::future;
use log::{info, warn};

use powerstage::adapters::sim::{PlantParams, SimBoard};
use powerstage::boards::converter;
use powerstage::comms::Transport;
use powerstage::comms::parse::Command;
use powerstage::control::{ControlMode, OutputMode};
use powerstage::{BoardConfig, BoardController, BoardKind};

/// Bytes buffered between the stdin reader and the control loop.
const RX_DEPTH: usize = 64;

/// Serial receive path: stdin thread → control loop.
static RX_CHANNEL: Channel<CriticalSectionRawMutex, u8, RX_DEPTH> = Channel::new();

/// Ticks between status lines.
const STATUS_EVERY: u64 = 1000;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    board: Option<BoardKind>,
    ticks: Option<u64>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = || it.next().with_context(|| format!("{arg} needs a value"));
        match arg.as_str() {
            "--config" => args.config = Some(PathBuf::from(value()?)),
            "--board" => {
                args.board = Some(match value()?.as_str() {
                    "converter" => BoardKind::Converter,
                    "panel" => BoardKind::Panel,
                    "supply" => BoardKind::Supply,
                    other => bail!("unknown board {other:?}"),
                });
            }
            "--ticks" => args.ticks = Some(value()?.parse().context("--ticks")?),
            other => bail!("unknown argument {other:?}"),
        }
    }
    Ok(args)
}

fn load_config(args: &Args) -> Result<BoardConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => BoardConfig::default(),
    };
    if let Some(board) = args.board {
        config.board = board;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Simulator keys, handled through the extension callback path.
///
/// `SCV2:<mV>` / `SCC2:<mA>` regulate port 2, `SMOD:<0|1>` selects
/// gradient or classical control, `SHLD:<0|1|2>` sets the drive signal.
fn sim_commands(board: &mut BoardController<SimBoard>, cmd: &Command, transport: Transport) {
    let value = cmd.int_value();
    match cmd.key() {
        "SCV2" => board.set_regulation(OutputMode::CV2, value),
        "SCC2" => board.set_regulation(OutputMode::CC2, value),
        "SMOD" => board.set_control_mode(if value == 0 {
            ControlMode::Gradient
        } else {
            ControlMode::Classical
        }),
        "SHLD" => match value {
            1 | 2 => board.apply_hold_high(value as u8),
            _ => board.remove_hold(),
        },
        _ => return,
    }
    board.reply(transport, &format!("{}:={}", cmd.key(), value));
}

fn spawn_stdin_reader() {
    std::thread::spawn(|| {
        for byte in std::io::stdin().lock().bytes() {
            match byte {
                Ok(b) => future::block_on(RX_CHANNEL.send(b)),
                Err(e) => {
                    warn!("stdin: {e}");
                    break;
                }
            }
        }
    });
}

enum Wake {
    Tick,
    Byte(u8),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("powerstage simulator v{}", env!("CARGO_PKG_VERSION"));

    let args = parse_args()?;
    let config = load_config(&args)?;
    let hw = match config.board {
        BoardKind::Converter => SimBoard::new(PlantParams::default()),
        BoardKind::Panel | BoardKind::Supply => SimBoard::bench(PlantParams::default()),
    };
    let mut board = BoardController::new(&config, hw).context("board init failed")?;
    if !board.register_callback(sim_commands) {
        warn!("simulator commands unavailable");
    }
    if board.profile().power_stage.is_some() {
        board.start_pwm();
    }

    spawn_stdin_reader();
    future::block_on(run(&mut board, config.tick_period_us, args.ticks))
}

/// Control loop: one tick per period, bytes dispatched as they arrive.
async fn run(
    board: &mut BoardController<SimBoard>,
    period_us: u32,
    tick_limit: Option<u64>,
) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut ticker = Ticker::every(Duration::from_micros(u64::from(period_us)));
    let converter_board = board.profile().kind == BoardKind::Converter;
    loop {
        let wake = future::or(
            async {
                ticker.next().await;
                Wake::Tick
            },
            async { Wake::Byte(RX_CHANNEL.receive().await) },
        )
        .await;

        match wake {
            Wake::Tick => {
                board.tick();
                board.hw_mut().advance(period_us);
                let n = board.tick_count();
                if converter_board && n % STATUS_EVERY == 0 {
                    info!(
                        "tick {n}: V2 {} mV, I2 {} mA, duty {}%, sdc {}",
                        board.millivolts(converter::V2),
                        board.milliamps(converter::I2),
                        board.duty().percent(),
                        board.shutdown_code()
                    );
                }
                if tick_limit.is_some_and(|limit| n >= limit) {
                    info!("tick limit reached");
                    return Ok(());
                }
            }
            Wake::Byte(b) => board.on_serial_byte(b),
        }

        let tx = board.hw_mut().take_tx();
        if !tx.is_empty() {
            stdout.write_all(&tx)?;
            stdout.flush()?;
        }
    }
}
