use std::{fs::File, path::PathBuf, process::ExitCode};

use asagi_layout::{ConvertOptions, Conversion, DEFAULT_CHUNK_SIZE};
use asagi_netcdf::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Convert gridded material files between the SeisSol/ASAGI and the Paraview layout
#[derive(Parser, Debug)]
#[command(name = "asagi2paraview", version)]
#[command(about = "Convert netCDF files between the ASAGI (compound) and Paraview (scalar) layout")]
struct Cli {
    /// Input file
    input: PathBuf,

    /// Output file. Defaults to the input name with a "_s.nc" or "_p.nc" suffix.
    output: Option<PathBuf>,

    /// Chunk size for the new netCDF file, 0 disables chunking
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Write a JSON report of the conversion to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "asagi2paraview=info,asagi_layout=info,asagi_netcdf=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let source = asagi_netcdf::open(&cli.input)?;
    let conversion = Conversion::prepare(&source)?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| conversion.default_output(&cli.input));
    info!("Writing {}", output.display());
    let sink = asagi_netcdf::create(&output)?;
    let options = ConvertOptions {
        chunk_size: cli.chunk_size,
    };
    conversion.run(&source, sink, &options)?;

    if let Some(path) = &cli.report {
        serde_json::to_writer_pretty(File::create(path)?, conversion.report())?;
    }
    info!("Finished");

    Ok(())
}
