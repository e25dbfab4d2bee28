//! Offline file rendering command.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rack_core::gain_to_db;
use rack_io::{BitDepth, StereoSamples, WavSpec, read_wav_stereo, render_offline, write_wav_stereo};

use super::common::{ChainArgs, build_chain, build_registry, load_config, print_chain};

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    chain: ChainArgs,

    /// Processing block size (defaults to the config value)
    #[arg(long)]
    block_size: Option<usize>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,

    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
}

pub fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let bit_depth = BitDepth::from_bits(args.bit_depth)?;
    let block_size = args.block_size.unwrap_or(config.audio.block_size);
    if block_size == 0 {
        anyhow::bail!("--block-size must be greater than zero");
    }

    println!("Reading {}...", args.input.display());
    let (input, sample_rate) = read_wav_stereo(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    println!(
        "  {} frames, {} Hz, {:.2}s",
        input.len(),
        sample_rate,
        input.len() as f64 / f64::from(sample_rate)
    );

    let registry = build_registry(&config, &args.chain.scan)?;
    let chain = build_chain(
        &registry,
        &args.chain,
        &config,
        sample_rate as f32,
        block_size,
    )?;
    print_chain(&chain);

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(input.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let mut processor = chain.processor();
    let output = render_offline(&mut processor, &input, block_size, |done| {
        pb.set_position(done as u64);
    });
    pb.finish_and_clear();

    print_levels("Input", &input);
    print_levels("Output", &output);

    println!("\nWriting {} ({bit_depth})...", args.output.display());
    write_wav_stereo(
        &args.output,
        &output,
        WavSpec {
            sample_rate,
            bit_depth,
        },
    )
    .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("Done!");

    Ok(())
}

fn print_levels(label: &str, samples: &StereoSamples) {
    let frames = samples.len().max(1) as f32;
    let energy: f32 = samples
        .left
        .iter()
        .chain(samples.right.iter())
        .map(|s| s * s)
        .sum();
    let rms = (energy / (2.0 * frames)).sqrt();
    println!(
        "  {label:6} RMS {:.1} dB, Peak {:.1} dB",
        gain_to_db(rms),
        gain_to_db(samples.peak())
    );
}
