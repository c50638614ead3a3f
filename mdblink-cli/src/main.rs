// mdblink -- operator console for MDB cashless readers.
//
// Sends named commands to the MDB daemon or raw hex bytes to a serial
// port, one at a time, and shows the formatted response.
//
// Usage:
//   mdblink send "CashlessReset(1)"
//   mdblink --address 2 send cashless_reset
//   mdblink --port /dev/ttyUSB0 send "10"
//   mdblink --port /dev/ttyUSB0 --mdb-master --read-timeout-ms 500 send "11 00"
//   mdblink --daemon 192.168.1.20:5127 shell

mod shell;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use mdblink::{
    DEFAULT_DAEMON_ADDR, DataBits, DispatchRequest, Dispatcher, FlowControl, MdbClientBuilder,
    Parity, SerialConfig, StopBits,
};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Default serial port path.
const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// mdblink -- send commands to an MDB cashless reader.
#[derive(Parser, Debug)]
#[command(name = "mdblink", version, about)]
struct Cli {
    /// Serial port for raw byte commands (e.g. /dev/ttyUSB0, COM3).
    #[arg(long, default_value = DEFAULT_PORT)]
    port: String,

    /// Cashless device address used by named commands (0-255).
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    address: f64,

    /// MDB daemon address (host:port).
    #[arg(long, default_value = DEFAULT_DAEMON_ADDR)]
    daemon: String,

    /// Give up on the daemon after this many milliseconds (0 waits forever).
    #[arg(long, default_value_t = 5000)]
    daemon_timeout_ms: u64,

    /// Quiet period that ends a serial response, in milliseconds.
    #[arg(long, default_value_t = 300)]
    read_timeout_ms: u64,

    /// Stop reading a serial response after this many bytes.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    expected_len: Option<u16>,

    /// Override the baud rate.
    #[arg(long)]
    baud: Option<u32>,

    /// Override the number of data bits.
    #[arg(long, value_enum)]
    data_bits: Option<DataBitsArg>,

    /// Override the parity mode.
    #[arg(long, value_enum)]
    parity: Option<ParityArg>,

    /// Override the number of stop bits.
    #[arg(long, value_enum)]
    stop_bits: Option<StopBitsArg>,

    /// Override the flow control mode.
    #[arg(long, value_enum)]
    flow_control: Option<FlowControlArg>,

    /// Send raw bytes exactly as typed, without appending the MDB checksum.
    #[arg(long)]
    no_checksum: bool,

    /// Start from MDB master interface settings (115200 8N1, RTS/CTS)
    /// instead of 9600 8E1.
    #[arg(long)]
    mdb_master: bool,

    /// Log more (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dispatch one command and print the response.
    Send {
        /// Named command (e.g. CashlessReset(1)) or hex bytes (e.g. "10 00").
        text: String,
    },

    /// Read commands from stdin, one per line (:help for shell commands).
    Shell,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DataBitsArg {
    #[value(name = "5")]
    Five,
    #[value(name = "6")]
    Six,
    #[value(name = "7")]
    Seven,
    #[value(name = "8")]
    Eight,
}

impl From<DataBitsArg> for DataBits {
    fn from(arg: DataBitsArg) -> Self {
        match arg {
            DataBitsArg::Five => DataBits::Five,
            DataBitsArg::Six => DataBits::Six,
            DataBitsArg::Seven => DataBits::Seven,
            DataBitsArg::Eight => DataBits::Eight,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ParityArg {
    None,
    Odd,
    Even,
}

impl From<ParityArg> for Parity {
    fn from(arg: ParityArg) -> Self {
        match arg {
            ParityArg::None => Parity::None,
            ParityArg::Odd => Parity::Odd,
            ParityArg::Even => Parity::Even,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StopBitsArg {
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
}

impl From<StopBitsArg> for StopBits {
    fn from(arg: StopBitsArg) -> Self {
        match arg {
            StopBitsArg::One => StopBits::One,
            StopBitsArg::Two => StopBits::Two,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FlowControlArg {
    None,
    Software,
    Hardware,
}

impl From<FlowControlArg> for FlowControl {
    fn from(arg: FlowControlArg) -> Self {
        match arg {
            FlowControlArg::None => FlowControl::None,
            FlowControlArg::Software => FlowControl::Software,
            FlowControlArg::Hardware => FlowControl::Hardware,
        }
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Serial settings: the chosen preset with any explicit overrides applied.
fn serial_config(cli: &Cli) -> SerialConfig {
    let mut config = if cli.mdb_master {
        SerialConfig::mdb_master()
    } else {
        SerialConfig::default()
    };
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    if let Some(bits) = cli.data_bits {
        config.data_bits = bits.into();
    }
    if let Some(parity) = cli.parity {
        config.parity = parity.into();
    }
    if let Some(bits) = cli.stop_bits {
        config.stop_bits = bits.into();
    }
    if let Some(flow) = cli.flow_control {
        config.flow_control = flow.into();
    }
    config
}

fn builder(cli: &Cli) -> MdbClientBuilder {
    let daemon_timeout = match cli.daemon_timeout_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };

    MdbClientBuilder::new()
        .daemon_addr(&cli.daemon)
        .daemon_timeout(daemon_timeout)
        .serial_config(serial_config(cli))
        .serial_read_timeout(Duration::from_millis(cli.read_timeout_ms))
        .expected_len(cli.expected_len.map(usize::from))
        .append_checksum(!cli.no_checksum)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_send(bridge: &Dispatcher, cli: &Cli, text: &str) -> Result<bool> {
    let outcome = bridge
        .dispatch(DispatchRequest::new(text, cli.address, cli.port.as_str()))
        .await;
    println!("{}", outcome.display);
    Ok(outcome.is_ok())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let bridge = builder(&cli)
        .build()
        .context("failed to configure the MDB bridge")?;

    match &cli.command {
        Command::Send { text } => {
            if !cmd_send(&bridge, &cli, text).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Shell => {
            let session = shell::Session::new(cli.port.clone(), cli.address);
            shell::run(&bridge, session).await
        }
    }
}
