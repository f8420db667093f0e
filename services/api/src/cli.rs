use crate::demo::{run_cost_sheet, run_demo, CostSheetArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use salesdesk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Salesdesk Pipeline",
    about = "Demonstrate and run the lead-to-booking pipeline from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Price a unit from the standard rate table without touching any state
    CostSheet(CostSheetArgs),
    /// Run an end-to-end CLI demo from lead intake through booking
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::CostSheet(args) => run_cost_sheet(args),
        Command::Demo(args) => run_demo(args),
    }
}
