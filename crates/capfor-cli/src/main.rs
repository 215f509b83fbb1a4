use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use capfor_cli::{Cli, Commands};
use capfor_core::CapforConfig;
use capfor_forecast::{find_capfact_columns, ForecastData, ForecastSummary, QuantileForecaster};
use capfor_geo::build_regional_dataset;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            CapforConfig::load(path)?
        }
        None => CapforConfig::default(),
    };

    match &cli.command {
        Commands::Aggregate => {
            if build_regional_dataset(&config)? {
                println!(
                    "Regional weather dataset written to {}",
                    config.paths.regional_weather.display()
                );
            } else {
                println!(
                    "Regional weather dataset already exists at {}; nothing to do",
                    config.paths.regional_weather.display()
                );
            }
        }
        Commands::Forecast { grid_search } => {
            let data = ForecastData::open(&config)?;
            let summary = forecast(&config, &data, *grid_search)?;
            print_summary(&summary);
        }
        Commands::Run { grid_search } => {
            if build_regional_dataset(&config)? {
                info!(
                    "regional weather dataset written to {}",
                    config.paths.regional_weather.display()
                );
            }
            let data = ForecastData::open(&config)?;
            let summary = forecast(&config, &data, *grid_search)?;
            print_summary(&summary);
        }
        Commands::Columns { pattern } => {
            let matches = find_capfact_columns(&config, pattern)?;
            println!("Columns matching '{pattern}': {}", matches.len());
            for name in matches {
                println!("  {name}");
            }
        }
    }
    Ok(())
}

fn forecast(
    config: &CapforConfig,
    data: &ForecastData,
    grid_search: bool,
) -> Result<ForecastSummary> {
    let forecaster = QuantileForecaster::new(config);
    if grid_search {
        info!("running forecast with grid-search tuning");
        forecaster.run_grid_search(data)
    } else {
        forecaster.run(data)
    }
}

fn print_summary(summary: &ForecastSummary) {
    println!("Forecast summary:");
    println!("  Processed : {}", summary.processed.len());
    println!("  Skipped   : {}", summary.skipped.len());
    println!("  Failed    : {}", summary.failed.len());
    for failure in &summary.failed {
        println!("    {} - {}", failure.column, failure.reason);
    }
    println!("  Tables    : {}", summary.tables.len());
    for table in &summary.tables {
        println!("    {}", table.display());
    }
}
