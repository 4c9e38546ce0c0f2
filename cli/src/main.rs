use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use brine_sbe::{decode_to_json, PrimitiveType};
use brine_sbe_compiler::error::SbeError;
use brine_sbe_compiler::{compile_schema, parse_schema, ValidationPolicy};

#[derive(Parser)]
#[command(name = "brine-sbe-cli")]
#[command(about = "Compile SBE XML schemas to binary IR, or decode IR to JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct PolicyArgs {
    /// Abort on the first schema error
    #[arg(long)]
    stop_on_error: bool,

    /// Treat schema warnings as errors
    #[arg(long)]
    warnings_fatal: bool,

    /// Do not log errors and warnings as they are found
    #[arg(long)]
    suppress_output: bool,
}

impl From<PolicyArgs> for ValidationPolicy {
    fn from(args: PolicyArgs) -> ValidationPolicy {
        ValidationPolicy {
            stop_on_error:   args.stop_on_error,
            warnings_fatal:  args.warnings_fatal,
            suppress_output: args.suppress_output,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an SBE XML schema to a binary `.sbeir` file
    Compile {
        /// Input schema `.xml` file
        #[arg(short, long)]
        input: PathBuf,

        /// Output `.sbeir` file (defaults to same name + `.sbeir`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Namespace recorded in the IR (defaults to the package name)
        #[arg(long)]
        namespace: Option<String>,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Decode a `.sbeir` file to JSON (printed to stdout)
    Decode {
        /// Input `.sbeir` file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Parse and validate an SBE XML schema without writing anything
    Validate {
        /// Input schema `.xml` file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,
    },
}

fn main() -> Result<(), SbeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Compile { input, output, namespace, policy } => {
            let xml = fs::read_to_string(input).map_err(SbeError::Io)?;
            let (ir, bin) = compile_schema(&xml, (*policy).into(), namespace.as_deref())?;

            let out_path = if let Some(o) = output {
                o.clone()
            } else {
                let mut p = input.clone();
                p.set_extension("sbeir");
                p
            };

            fs::write(&out_path, &bin).map_err(SbeError::Io)?;
            tracing::info!("{} message(s), {} type(s), {} bytes", ir.messages().count(), ir.types().count(), bin.len());
            println!("Compiled {} → {}", input.display(), out_path.display());
            Ok(())
        }

        Commands::Decode { input } => {
            let data = fs::read(input).map_err(SbeError::Io)?;
            tracing::debug!("decoding {} bytes from {}", data.len(), input.display());
            let json = decode_to_json(&data)?;
            println!("{}", json);
            Ok(())
        }

        Commands::Validate { input, policy } => {
            let xml = fs::read_to_string(input).map_err(SbeError::Io)?;
            let schema = parse_schema(&xml, (*policy).into())?;
            let declared_types = schema.types.keys().filter(|n| PrimitiveType::from_name(n).is_none()).count();
            println!(
                "{} is valid: package {}, {} message(s), {} type(s)",
                input.display(),
                schema.package_name,
                schema.messages().count(),
                declared_types
            );
            Ok(())
        }
    }
}
