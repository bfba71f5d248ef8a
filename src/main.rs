use std::env;
use std::fs::File;
use std::path::PathBuf;

use clap::Parser;

use archivador::core::{
    DEFAULT_DATA_DIR, EXPORT_FILE_NAME, FileStore, ScheduleSource, SimulationSession,
    write_schedule_csv,
};

#[derive(Parser, Debug)]
#[command(
    name = "export",
    about = "Writes the active amortization schedule to a CSV file"
)]
struct ExportCli {
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    #[arg(long, help = "Output path; defaults to the fixed download filename")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            init_tracing();
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            let data_dir = raw_args
                .get(3)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
            if let Err(e) = archivador::api::run_http_server(port, data_dir).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Some("export") => {
            let cli = ExportCli::parse_from(&raw_args[1..]);
            if let Err(e) = run_export(cli) {
                eprintln!("Export error: {e}");
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Usage: cargo run -- serve [port] [data-dir]");
            eprintln!("       cargo run -- export [--data-dir DIR] [--output FILE]");
            std::process::exit(1);
        }
    }
}

fn run_export(cli: ExportCli) -> Result<(), String> {
    let mut session = SimulationSession::new(FileStore::new(cli.data_dir));
    session.initialize();

    if session.source() == ScheduleSource::Empty {
        return Err("nothing to export; no schedule has been saved".to_string());
    }

    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
    let file = File::create(&output)
        .map_err(|e| format!("cannot create {}: {e}", output.display()))?;
    write_schedule_csv(file, session.schedule()).map_err(|e| e.to_string())?;

    println!("Wrote {} rows to {}", session.schedule().len(), output.display());
    Ok(())
}

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("subscriber is installed once at startup");
}
