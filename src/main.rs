use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use meterbridge_rs::kaskad::frame::{checksum, parse_frame, unstuff};
use meterbridge_rs::logging::init_logger_with_level;
use meterbridge_rs::util::hex::{decode_hex, format_hex_compact};
use meterbridge_rs::{
    decode_record, log_info, BridgeConfig, Command, CycleOutcome, DeviceType, MeterPoller,
    MeterState,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "meterbridge")]
#[command(about = "Poll a Kaskad meter over a serial link")]
struct Cli {
    /// JSON configuration file; flags below override its fields
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    port: Option<String>,

    #[arg(short, long, global = true)]
    baudrate: Option<u32>,

    /// Meter address on the bus
    #[arg(short, long, global = true)]
    address: Option<u16>,

    #[arg(short, long, global = true, value_enum)]
    model: Option<DeviceType>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the channel and report whether the meter answers
    Ping,
    /// Read serial number and release date
    Identity,
    /// Run one full polling cycle and print the meter state
    Once,
    /// Poll periodically and print the state after each cycle
    Poll {
        /// Stop after this many cycles
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },
    /// Run a single exchange, by name (`tariffs-data`) or id (`0x0005`)
    Send { command: Command },
    /// Decode a captured response frame given as hex
    Decode {
        frame: String,
        /// Command the frame answers; guessed from the header when omitted
        #[arg(long)]
        command: Option<Command>,
    },
}

impl Cli {
    fn bridge_config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)?,
            None => BridgeConfig::default(),
        };
        if let Some(port) = &self.port {
            config.port = port.clone();
        }
        if let Some(baudrate) = self.baudrate {
            config.baudrate = baudrate;
        }
        if let Some(address) = self.address {
            config.device_address = address;
        }
        if let Some(model) = self.model {
            config.device_type = model;
        }
        config.validate()?;
        Ok(config)
    }
}

fn print_state(state: &MeterState) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(state)?);
    Ok(())
}

fn decode_frame(hex: &str, command: Option<Command>) -> Result<()> {
    let raw = decode_hex(hex).context("invalid hex frame")?;
    let frame = unstuff(&raw)?;
    let packet = parse_frame(&frame)?;
    let calculated = checksum(&frame);

    let command = command.or_else(|| {
        Command::ALL
            .iter()
            .copied()
            .find(|c| c.code() == packet.header.command && c.sub_command().is_none())
    });
    let record = match command {
        Some(command) => Some(decode_record(command, &packet.payload)?),
        None => None,
    };

    let out = json!({
        "address_from": packet.header.address_from,
        "address_to": packet.header.address_to,
        "command": format!("0x{:02X}", packet.header.command),
        "status": packet.status_code(),
        "payload": format_hex_compact(&packet.payload),
        "checksum_ok": calculated == packet.checksum,
        "record": record,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger_with_level("info");

    let cli = Cli::parse();
    if let Commands::Decode { frame, command } = &cli.command {
        return decode_frame(frame, *command);
    }

    let mut config = cli.bridge_config()?;
    let mut poller = MeterPoller::open(&mut config)
        .with_context(|| format!("opening {}", config.port))?;
    log_info(&format!(
        "Polling {} at address {} on {}",
        config.device_type, config.device_address, config.port
    ));

    match cli.command {
        Commands::Ping => match poller.ping().await {
            Ok(()) => println!("meter {} answered", config.device_address),
            Err(e) => bail!("meter {} did not answer: {e}", config.device_address),
        },
        Commands::Identity => {
            poller.fetch_identity().await;
            print_state(poller.state())?;
        }
        Commands::Once => {
            if let CycleOutcome::NoResponse(e) = poller.poll_once().await? {
                bail!("meter did not answer: {e}");
            }
            print_state(poller.state())?;
        }
        Commands::Poll { count } => {
            let mut done = 0u64;
            poller
                .run(config.poll_interval(), |outcome, state| {
                    if let CycleOutcome::NoResponse(e) = outcome {
                        eprintln!("no response: {e}");
                    } else if let Ok(text) = serde_json::to_string(state) {
                        println!("{text}");
                    }
                    done += 1;
                    count.map_or(true, |n| done < n)
                })
                .await?;
        }
        Commands::Send { command } => {
            let packet = poller.session_mut().exchange(command).await?;
            let record = decode_record(command, &packet.payload)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Decode { frame, command } => decode_frame(&frame, command)?,
    }

    Ok(())
}
