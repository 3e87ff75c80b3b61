//! Unified pricing rules CLI.
//!
//! This tool provides commands for:
//! - Validating settings files
//! - Resolving the price rules a provider yields for a set of ad unit paths
//! - Computing dynamic floor prices from previous CPMs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use unified_pricing_common::floor_price::{DynamicFloorPrices, FloorPriceStrategy};
use unified_pricing_common::types::{Device, PriceRule};

mod config;
mod error;
mod fetch;
mod floor;
mod rules;

use error::CliError;

#[derive(Parser)]
#[command(name = "uprcli")]
#[command(about = "Unified pricing rules CLI for config and floor price diagnostics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Settings file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Price rule lookups
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Dynamic floor prices
    Floor {
        #[command(subcommand)]
        action: FloorAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a settings file, merged with UPR__ environment variables
    Validate {
        /// Path to the TOML (or JSON) settings file
        #[arg(long, short)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// Load the price rules and print the rule resolved for every path
    Fetch {
        /// Path to the TOML (or JSON) settings file
        #[arg(long, short)]
        file: PathBuf,

        /// Device the rules are requested for
        #[arg(long, default_value = "desktop")]
        device: Device,

        /// Ad unit path, may contain `{variable}` placeholders
        #[arg(long = "path", required = true)]
        paths: Vec<String>,

        /// Ad unit path variable as key=value
        #[arg(long = "var", value_parser = rules::parse_variable)]
        variables: Vec<(String, String)>,
    },
}

#[derive(Subcommand)]
enum FloorAction {
    /// Compute the rule a main-cohort slot gets from previous CPMs
    Calculate {
        /// Floor price strategy (max, min, second-highest)
        #[arg(long)]
        strategy: FloorPriceStrategy,

        /// Previous bid CPM
        #[arg(long = "cpm", allow_negative_numbers = true)]
        cpms: Vec<f64>,

        /// Rounding step in cents
        #[arg(long, default_value_t = 1)]
        rounding_steps: u32,

        /// Upper bound of the computed rule in cents
        #[arg(long)]
        max: Option<u32>,

        /// Lower bound of the computed rule in cents (accepted, not applied)
        #[arg(long)]
        min: Option<u32>,

        /// Id of the standard rule returned when no CPM is usable
        #[arg(long, default_value_t = 0)]
        price_rule_id: u64,

        /// Floor price of the standard rule
        #[arg(long, default_value_t = 0.0)]
        floorprice: f64,
    },
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let result = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stderr())
        .apply();

    if let Err(e) = result {
        eprintln!("Failed to initialize logger: {}", e);
    }
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Validate { file } => config::validate(&file, cli.verbose),
        },
        Commands::Rules { action } => match action {
            RulesAction::Fetch {
                file,
                device,
                paths,
                variables,
            } => rules::fetch(&file, device, paths, variables, cli.verbose),
        },
        Commands::Floor { action } => match action {
            FloorAction::Calculate {
                strategy,
                cpms,
                rounding_steps,
                max,
                min,
                price_rule_id,
                floorprice,
            } => {
                let floor_prices = DynamicFloorPrices {
                    strategy,
                    rounding_steps_in_cents: rounding_steps,
                    max_price_rule_in_cents: max,
                    min_price_rule_in_cents: min,
                };
                let standard_rule = PriceRule {
                    price_rule_id,
                    floorprice,
                    model: None,
                    main: true,
                };
                floor::print(&floor_prices, &cpms, &standard_rule, cli.verbose)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_validate() {
        let cli = Cli::try_parse_from(["uprcli", "config", "validate", "-f", "settings.toml"])
            .expect("should parse");
        assert!(!cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Validate { .. }
            }
        ));
    }

    #[test]
    fn test_parse_rules_fetch() {
        let cli = Cli::try_parse_from([
            "uprcli",
            "rules",
            "fetch",
            "-f",
            "settings.toml",
            "--device",
            "mobile",
            "--path",
            "/1234/{domain}/{device}/top",
            "--path",
            "/1234/static/footer",
            "--var",
            "domain=example.com",
            "--verbose",
        ])
        .expect("should parse");

        assert!(cli.verbose);
        match cli.command {
            Commands::Rules {
                action:
                    RulesAction::Fetch {
                        device,
                        paths,
                        variables,
                        ..
                    },
            } => {
                assert_eq!(device, Device::Mobile);
                assert_eq!(paths.len(), 2);
                assert_eq!(
                    variables,
                    vec![("domain".to_string(), "example.com".to_string())]
                );
            }
            _ => panic!("expected rules fetch"),
        }
    }

    #[test]
    fn test_parse_rules_fetch_requires_path() {
        let result = Cli::try_parse_from(["uprcli", "rules", "fetch", "-f", "settings.toml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rules_fetch_rejects_bad_variable() {
        let result = Cli::try_parse_from([
            "uprcli",
            "rules",
            "fetch",
            "-f",
            "settings.toml",
            "--path",
            "/1234/top",
            "--var",
            "domain",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_floor_calculate() {
        let cli = Cli::try_parse_from([
            "uprcli",
            "floor",
            "calculate",
            "--strategy",
            "second-highest",
            "--cpm",
            "1.2",
            "--cpm",
            "-0.5",
            "--rounding-steps",
            "10",
            "--max",
            "500",
        ])
        .expect("should parse");

        match cli.command {
            Commands::Floor {
                action:
                    FloorAction::Calculate {
                        strategy,
                        cpms,
                        rounding_steps,
                        max,
                        min,
                        ..
                    },
            } => {
                assert_eq!(strategy, FloorPriceStrategy::SecondHighest);
                assert_eq!(cpms, vec![1.2, -0.5]);
                assert_eq!(rounding_steps, 10);
                assert_eq!(max, Some(500));
                assert_eq!(min, None);
            }
            _ => panic!("expected floor calculate"),
        }
    }

    #[test]
    fn test_parse_floor_rejects_unknown_strategy() {
        let result =
            Cli::try_parse_from(["uprcli", "floor", "calculate", "--strategy", "median"]);
        assert!(result.is_err());
    }
}
