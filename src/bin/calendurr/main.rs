//! Command line front end: reads sessions from the device, a recording or a
//! simulated device, or draws a coordinate capture directly.

use calendurr::{
    args::{CalendurrArgs, CommandTask},
    chunk_source::{ChunkSource, ReplaySource, SerialSource},
    config::CalendurrConfig,
    coordinate_file::read_coordinates,
    dummy_device::DummyDevice,
    pipeline::drive,
    session_writer::SessionWriter,
    PointRasterizer, StreamSessionParser,
};

use clap::Parser;
use log::{info, warn};
use std::{error::Error, io, path::Path, time::Duration};

// Example:
// cargo run --bin calendurr --
//                           --diameter 4
//                           simulate
//                           --points   120
//                           --month    6 --day 15
//                           --out-dir  sessions

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CalendurrArgs::parse();

    let mut config = match &args.config {
        Some(path) => CalendurrConfig::from_path(path)?,
        None => CalendurrConfig::default(),
    };
    args.raster.apply(&mut config);
    config.validate()?;
    let rasterizer = PointRasterizer::new(config.raster)?;

    match args.command {
        CommandTask::Ports => {
            for port in SerialSource::available_ports()? {
                println!("{}", port.display());
            }
        }

        CommandTask::Listen(cmd) => {
            let port = match cmd.port {
                Some(port) => port,
                None => prompt_for_port()?,
            };
            let source = SerialSource::open(port.trim(), cmd.baud)?;
            run(source, &config, rasterizer, &cmd.out_dir)?;
        }

        CommandTask::Replay(cmd) => {
            let source = ReplaySource::from_path(&cmd.capture, cmd.chunk_size)?;
            run(source, &config, rasterizer, &cmd.out_dir)?;
        }

        CommandTask::Simulate(cmd) => {
            let device = DummyDevice::builder()
                .num_points(cmd.points)
                .seed(cmd.seed)
                .date(cmd.month, cmd.day)
                .build();
            let source = device
                .into_source(cmd.chunk_size)
                .paced(Duration::from_millis(cmd.pace_ms));
            run(source, &config, rasterizer, &cmd.out_dir)?;
        }

        CommandTask::Render(cmd) => {
            let mut samples = read_coordinates(&cmd.coords)?;
            if samples.is_empty() {
                warn!("No coordinates found in {}", cmd.coords.display());
            }
            if let Some(range) = &config.normalize {
                samples = range.normalize(&samples)?;
            }

            let bitmap = rasterizer.render(&samples);
            bitmap.save_bmp(&cmd.out)?;
            if let Some(preview) = &cmd.preview {
                bitmap.save_preview(preview, config.raster.preview_quality)?;
            }
            info!(
                "Drew {} samples onto a {}x{} canvas",
                samples.len(),
                bitmap.width(),
                bitmap.height()
            );
        }
    }

    Ok(())
}

fn run<S: ChunkSource>(
    source: S,
    config: &CalendurrConfig,
    rasterizer: PointRasterizer,
    out_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    let mut parser = StreamSessionParser::new(config.parser);
    let mut writer = SessionWriter::new(out_dir, rasterizer, config.normalize)?;
    let summaries = drive(source, &mut parser, &mut writer)?;
    for summary in &summaries {
        println!(
            "session {:03}: {} samples, {}",
            summary.index,
            summary.samples,
            summary
                .date
                .map_or_else(|| "no date".to_owned(), |d| d.to_string())
        );
    }
    Ok(())
}

/// Ask the user for the device name
fn prompt_for_port() -> io::Result<String> {
    println!("Available devices:");
    for port in SerialSource::available_ports()? {
        println!("\t{}", port.display());
    }
    println!("Enter the device name: ");
    let mut device_name = String::new();
    io::stdin().read_line(&mut device_name)?;
    Ok(device_name.trim().to_owned())
}
