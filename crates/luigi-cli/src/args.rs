use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "luigi")]
#[command(bin_name = "luigi")]
#[command(version, about, long_about = None)]
pub struct LuigiCliArgs {
    #[command(subcommand)]
    pub cmd: LuigiCliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum LuigiCliCommand {
    /// Compile and execute a Luigi script.
    Run(RunCommand),
    /// Compile a Luigi script and print its bytecode.
    Dump(DumpCommand),
}

#[derive(Debug, Clone, Args)]
pub struct RunCommand {
    /// The path of the Luigi script to run.
    pub path: String,
    /// Deepest allowed nesting of function calls.
    #[arg(long, default_value_t = 1024)]
    pub max_call_depth: usize,
}

#[derive(Debug, Clone, Args)]
pub struct DumpCommand {
    /// The path of the Luigi script to compile.
    pub path: String,
}
