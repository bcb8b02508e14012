//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers configuration, creates the tokio
//! runtime, dispatches to a command handler and prints every error itself.

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands::{self, GarmentSource};
use crate::{CliArgs, Config, ConfigError, ExitCode, Session, TryOnError};
use tryon_utils::logging::init_tracing;

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after printing the error; main.rs only exits.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        provider: cli.provider.clone(),
        model: cli.model.clone(),
        provider_timeout_secs: cli.timeout,
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report(&config_error(err))),
    };

    let result = match cli.command {
        Commands::Presets { json } => commands::list_presets(&config, json),
        Commands::Config { json } => commands::show_config(&config, json),
        Commands::Compose {
            person,
            garment,
            garment_prompt,
            output,
        } => {
            let garment = match (garment, garment_prompt) {
                (Some(source), _) => GarmentSource::Existing(source),
                (None, Some(prompt)) => GarmentSource::Prompt(prompt),
                // clap enforces one of the two
                (None, None) => return Err(ExitCode::CLI_ARGS),
            };
            with_session(&config, |session, rt| {
                rt.block_on(commands::compose(session, &person, garment, output))
            })
        }
        Commands::Garment { prompt, output } => with_session(&config, |session, rt| {
            rt.block_on(commands::generate_garment(session, &prompt, output))
        }),
    };

    result.map_err(|err| report(&err))
}

fn with_session(
    config: &Config,
    f: impl FnOnce(&Session, &tokio::runtime::Runtime) -> Result<(), TryOnError>,
) -> Result<(), TryOnError> {
    let rt = tokio::runtime::Runtime::new()?;
    let session = Session::from_config(config)?;
    f(&session, &rt)
}

/// `Config::discover` reports through anyhow; recover the typed error when there is one
fn config_error(err: anyhow::Error) -> TryOnError {
    match err.downcast::<ConfigError>() {
        Ok(config_err) => TryOnError::Config(config_err),
        Err(other) => TryOnError::Config(ConfigError::DiscoveryFailed {
            reason: format!("{other:#}"),
        }),
    }
}

fn report(err: &TryOnError) -> ExitCode {
    tracing::debug!(error = %err, "Command failed");
    eprintln!("{}", err.display_for_user());
    err.to_exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_recovered_from_anyhow() {
        let err = anyhow::Error::new(ConfigError::MissingRequired("provider.model".to_string()));
        assert!(matches!(
            config_error(err),
            TryOnError::Config(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_other_discovery_errors_become_discovery_failed() {
        let err = anyhow::anyhow!("permission denied").context("reading .tryon/config.toml");
        match config_error(err) {
            TryOnError::Config(ConfigError::DiscoveryFailed { reason }) => {
                assert!(reason.contains("reading .tryon/config.toml"));
                assert!(reason.contains("permission denied"));
            }
            other => panic!("expected DiscoveryFailed, got {other:?}"),
        }
    }
}
