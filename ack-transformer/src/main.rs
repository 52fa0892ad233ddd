use std::{io::Write as _, path::PathBuf};

use ack_transformer::{
    ConfigLoader, DEFAULT_CONFIG_PATH, ObjectRestoreTransformer,
    logging::{self, LogFormat},
};
use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(version, about)]
struct Args {
    /// Path of the transformation config.
    #[clap(long, env = "TRANSFORM_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,
    #[clap(long, value_enum, default_value_t, global = true)]
    log_format: LogFormat,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transform the objects in FILE (or stdin) and print them as YAML.
    Execute { file: Option<PathBuf> },
    /// Check that the config file parses.
    CheckConfig,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::setup_logging(args.log_format)?;

    let loader = ConfigLoader::new(args.config);
    match args.command {
        Command::Execute { file } => {
            let objects = match file {
                Some(path) => ack_transformer::load_objects(path)?,
                None => {
                    let input = std::io::read_to_string(std::io::stdin()).context("reading stdin")?;
                    ack_transformer::yaml::from_documents(&input).context("parsing stdin")?
                }
            };

            let mut transformer = ObjectRestoreTransformer::new(loader);
            let restored = ack_transformer::restore_all(&mut transformer, objects);

            let mut stdout = std::io::stdout().lock();
            ack_transformer::yaml::to_writer(&mut stdout, &restored)?;
            stdout.flush()?;
        }
        Command::CheckConfig => match loader.load() {
            Ok(Some(config)) => println!("{}: {config}", loader.path().display()),
            Ok(None) => println!(
                "{}: no config, nothing will be transformed",
                loader.path().display()
            ),
            Err(err) => return Err(anyhow::Error::new(err).context("checking config")),
        },
    }

    Ok(())
}
