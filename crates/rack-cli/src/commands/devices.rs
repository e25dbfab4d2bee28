//! Audio device listing command.

use clap::{Args, Subcommand};
use rack_io::{AudioDevice, default_device, list_devices};

#[derive(Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    command: Option<DevicesCommand>,
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List all available audio devices
    List,

    /// Show default device information
    Info,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    match args.command.unwrap_or(DevicesCommand::List) {
        DevicesCommand::List => {
            let devices = list_devices()?;
            if devices.is_empty() {
                println!("No audio devices found.");
                return Ok(());
            }

            println!("Available Audio Devices");
            println!("=======================\n");

            let inputs: Vec<&AudioDevice> = devices.iter().filter(|d| d.is_input).collect();
            let outputs: Vec<&AudioDevice> = devices.iter().filter(|d| d.is_output).collect();
            print_section("Input Devices:", &inputs, |d| d.is_output, " (also output)");
            print_section("Output Devices:", &outputs, |d| d.is_input, " (also input)");

            println!("Total: {} input(s), {} output(s)", inputs.len(), outputs.len());
            println!();
            println!("Tip: select devices by index or partial name:");
            println!("  rack realtime --input-device 0 --output-device 0 --chain gain");
            println!("  rack realtime --input-device \"USB\" --output-device \"USB\"");
        }

        DevicesCommand::Info => {
            let (input, output) = default_device()?;

            println!("Default Audio Devices");
            println!("=====================\n");
            print_default("Input", input.as_ref());
            println!();
            print_default("Output", output.as_ref());
        }
    }

    Ok(())
}

fn print_section(
    title: &str,
    devices: &[&AudioDevice],
    other_direction: impl Fn(&AudioDevice) -> bool,
    other_label: &str,
) {
    if devices.is_empty() {
        return;
    }
    println!("{title}");
    for (idx, device) in devices.iter().enumerate() {
        let also = if other_direction(device) { other_label } else { "" };
        println!(
            "  [{idx}] {} ({} Hz){also}",
            device.name, device.default_sample_rate
        );
    }
    println!();
}

fn print_default(direction: &str, device: Option<&AudioDevice>) {
    match device {
        Some(device) => {
            println!("Default {direction}:");
            println!("  Name: {}", device.name);
            println!("  Sample Rate: {} Hz", device.default_sample_rate);
        }
        None => println!("Default {direction}: None"),
    }
}
