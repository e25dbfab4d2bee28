//! Live duplex processing with an interactive control prompt.
//!
//! The audio callbacks only run the committed route. Everything typed at the
//! prompt goes through a [`ControlSession`] on the main thread, and each edit
//! publishes a new route that the callback picks up on its next block.

use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;

use clap::Args;
use crossbeam_channel::{Receiver, Sender, select, tick, unbounded};
use rack_io::{CpalBackend, DuplexStream, StreamConfig, StreamStats, default_device};

use super::common::{ChainArgs, build_chain, build_registry, load_config, print_chain};
use super::control::{ControlCommand, ControlSession, Flow, parse_command};

/// Interval between underrun checks.
const HEALTH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Args)]
pub struct RealtimeArgs {
    #[command(flatten)]
    chain: ChainArgs,

    /// Input device (index or partial name)
    #[arg(long)]
    input_device: Option<String>,

    /// Output device (index or partial name)
    #[arg(long)]
    output_device: Option<String>,

    /// Sample rate (defaults to the config value)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Buffer size in frames (defaults to the config block size)
    #[arg(long)]
    buffer_size: Option<u32>,
}

enum Event {
    Line(String),
    Eof,
    Interrupt,
}

pub fn run(args: RealtimeArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let sample_rate = args.sample_rate.unwrap_or(config.audio.sample_rate);
    let buffer_size = match args.buffer_size {
        Some(frames) => frames,
        None => u32::try_from(config.audio.block_size)?,
    };
    if buffer_size == 0 {
        anyhow::bail!("--buffer-size must be greater than zero");
    }

    let registry = build_registry(&config, &args.chain.scan)?;
    let chain = build_chain(
        &registry,
        &args.chain,
        &config,
        sample_rate as f32,
        buffer_size as usize,
    )?;
    let processor = chain.processor();
    let mut session = ControlSession { chain, registry };

    let stream_config = StreamConfig {
        sample_rate,
        buffer_size,
        input_device: args.input_device.or(config.audio.input_device.clone()),
        output_device: args.output_device.or(config.audio.output_device.clone()),
    };

    let (default_input, default_output) = default_device()?;
    let device_label = |chosen: &Option<String>, fallback: Option<rack_io::AudioDevice>| {
        chosen
            .clone()
            .or(fallback.map(|d| d.name))
            .unwrap_or_else(|| "none".to_string())
    };
    println!("Real-time processing");
    println!(
        "  Input:  {}",
        device_label(&stream_config.input_device, default_input)
    );
    println!(
        "  Output: {}",
        device_label(&stream_config.output_device, default_output)
    );
    println!("  Sample rate: {sample_rate} Hz");
    println!("  Buffer size: {buffer_size} frames");
    print_chain(&session.chain);

    let backend = CpalBackend::new();
    let stream = DuplexStream::start(&backend, &stream_config, processor)?;
    println!(
        "  Channels: {} in, {} out",
        stream.input_channels(),
        stream.output_channels()
    );
    println!("\nType 'help' for commands, Ctrl+C to stop.\n");

    let (tx, events) = unbounded();
    let interrupt = tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt.send(Event::Interrupt);
    })?;
    spawn_stdin_reader(tx)?;

    control_loop(&mut session, &stream, &events);

    println!("\nStopping...");
    print_stats(stream.stats());
    drop(stream);
    println!("Done!");
    Ok(())
}

fn spawn_stdin_reader(tx: Sender<Event>) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("rack-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(Event::Line(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(Event::Eof);
        })?;
    Ok(())
}

fn control_loop(session: &mut ControlSession, stream: &DuplexStream, events: &Receiver<Event>) {
    let health = tick(HEALTH_INTERVAL);
    let mut reported_underruns = 0;
    prompt();

    loop {
        select! {
            recv(events) -> event => match event {
                Ok(Event::Line(line)) => {
                    match parse_command(&line) {
                        Ok(Some(ControlCommand::Stats)) => print_stats(stream.stats()),
                        Ok(Some(command)) => match session.handle(command) {
                            Ok(Flow::Quit) => return,
                            Ok(Flow::Continue) => {}
                            Err(e) => println!("error: {e:#}"),
                        },
                        Ok(None) => {}
                        Err(e) => println!("error: {e:#}"),
                    }
                    prompt();
                }
                Ok(Event::Eof) => {
                    tracing::debug!("stdin closed, streaming until interrupted");
                }
                Ok(Event::Interrupt) | Err(_) => return,
            },
            recv(health) -> _ => {
                session.chain.release_retired();
                let underruns = stream.stats().underruns();
                if underruns > reported_underruns {
                    tracing::warn!(
                        underruns,
                        new = underruns - reported_underruns,
                        "output ran ahead of input"
                    );
                    reported_underruns = underruns;
                }
            }
        }
    }
}

fn prompt() {
    print!("rack> ");
    let _ = std::io::stdout().flush();
}

fn print_stats(stats: &StreamStats) {
    println!(
        "blocks {}, underruns {}, dropped inputs {}, errors {}",
        stats.blocks(),
        stats.underruns(),
        stats.dropped_inputs(),
        stats.errors()
    );
}
