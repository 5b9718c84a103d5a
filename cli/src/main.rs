//! nerfed - run a command with chmod and mknod family calls turned into
//! successful no-ops.

mod embed;
mod error;
mod native_spawn;
mod spawn;

use std::ffi::OsString;
use std::process::{Command, ExitCode};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::{debug, warn};
use nerfed_protocol::Family;

use error::LaunchError;
use spawn::{Artifact, PreloadEnv};

#[derive(Parser, Debug)]
#[command(name = "nerfed")]
#[command(
    about = "Overloads chosen libc functions using LD_PRELOAD and runs command.",
    long_about = "Overloads chosen libc functions using LD_PRELOAD and runs command.\n\
                  Nerfing means to have the functions not do anything, and return success."
)]
struct Cli {
    /// Nerf chmod, fchmodat
    #[arg(short = 'c', long = "chmod")]
    chmod: bool,

    /// Nerf mknod, mknodat
    #[arg(short = 'n', long = "mknod", short_alias = 'm')]
    mknod: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Command to run, followed by its arguments
    #[arg(trailing_var_arg = true, required = true, value_name = "COMMAND")]
    command: Vec<OsString>,
}

impl Cli {
    fn families(&self) -> Vec<Family> {
        let mut families = Vec::new();
        if self.chmod {
            families.push(Family::Chmod);
        }
        if self.mknod {
            families.push(Family::Mknod);
        }
        families
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help included: usage goes to stderr and nothing runs.
            eprint!("{}", err.render());
            return ExitCode::from(LaunchError::from(err).exit_code());
        }
    };

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("nerfed: {}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

/// Prepare the environment and run the command, returning the exit code the
/// launcher should terminate with.
fn run(cli: Cli) -> Result<u8, LaunchError> {
    // The command stays one list so nothing after its first word is parsed.
    let Some((program, args)) = cli.command.split_first() else {
        return Err(Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "no command given")
            .into());
    };

    let mut env = PreloadEnv::default();
    for family in cli.families() {
        env.nerf(family)?;
    }

    let artifact = spawn::resolve_artifact()?;
    env.preload(artifact.path())?;

    let mut command = Command::new(program);
    command.args(args);
    env.apply(&mut command);

    match artifact {
        Artifact::Fixed(path) => {
            debug!("Shim at {}, exec without supervision", path.display());
            Err(native_spawn::exec_replace(&mut command))
        }
        Artifact::Temporary(temp) => {
            let waited = native_spawn::fork_exec_wait(&mut command);

            let temp_path = temp.to_path_buf();
            if let Err(e) = temp.close() {
                warn!("Failed to remove {}: {}", temp_path.display(), e);
            } else {
                debug!("Removed {}", temp_path.display());
            }

            Ok(native_spawn::exit_code(waited?))
        }
    }
}
