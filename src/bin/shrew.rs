use clap::Parser;
use shrew::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    shrew::errors::set_color_mode(cli.color);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        Commands::Build {
            file,
            output,
            stdout,
        } => shrew::commands::build::run(&file, output.as_deref(), stdout),
        Commands::Check { paths } => shrew::commands::check::run(&paths),
        Commands::Inspect { inspect_type, file } => {
            shrew::commands::inspect::run(inspect_type, &file)
        }
    };
    std::process::exit(code);
}
