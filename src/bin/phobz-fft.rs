//! Command line front end: transform a sample stream on the GPU.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use phobz_fft::{describe_plan, run_transform, DataFormat, GpuContext, PipelineConfig};

#[derive(Parser)]
#[command(name = "phobz-fft", version, about = "Multi-axis FFT on the GPU")]
struct Cli {
    /// Samples along X
    #[arg(short = 'x')]
    x: Option<u32>,
    /// Samples along Y
    #[arg(short = 'y')]
    y: Option<u32>,
    /// Samples along Z
    #[arg(short = 'z')]
    z: Option<u32>,
    /// Run the inverse transform
    #[arg(long)]
    inverse: bool,
    /// Input encoding (raw, ascii, png)
    #[arg(long)]
    input: Option<DataFormat>,
    /// Output encoding (raw, ascii, png)
    #[arg(long)]
    output: Option<DataFormat>,
    /// Read samples from a file instead of stdin
    #[arg(long)]
    input_file: Option<PathBuf>,
    /// Write samples to a file instead of stdout
    #[arg(long)]
    output_file: Option<PathBuf>,
    /// Adapter index as printed by --list-devices
    #[arg(long)]
    device: Option<usize>,
    /// Print the available adapters and exit
    #[arg(long)]
    list_devices: bool,
    /// Give up on GPU work after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Use the CPU transform
    #[arg(long)]
    cpu: bool,
    /// Print the plan as JSON and exit
    #[arg(long)]
    describe: bool,
    /// JSON configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        for (axis, size) in [self.x, self.y, self.z].into_iter().enumerate() {
            if let Some(size) = size {
                config.sizes[axis] = size;
            }
        }
        config.inverse |= self.inverse;
        if let Some(format) = self.input {
            config.input_format = format;
        }
        if let Some(format) = self.output {
            config.output_format = format;
        }
        if self.device.is_some() {
            config.device = self.device;
        }
        if self.timeout_ms.is_some() {
            config.timeout_ms = self.timeout_ms;
        }
        if self.cpu {
            config.use_gpu = false;
        }
        Ok(config)
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.list_devices {
        for (index, info) in GpuContext::list_adapters().await.iter().enumerate() {
            println!(
                "{}: {} ({:?}, {:?})",
                index, info.name, info.backend, info.device_type
            );
        }
        return Ok(());
    }

    let config = cli.pipeline_config()?;
    if cli.describe {
        let summary = describe_plan(&config)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let mut reader: Box<dyn Read> = match &cli.input_file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let mut writer: Box<dyn Write> = match &cli.output_file {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    run_transform(&config, &mut reader, &mut writer).await?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    pollster::block_on(run(Cli::parse()))
}
