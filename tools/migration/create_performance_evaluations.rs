/// Create the performance_evaluations table
///
/// Submits table, index and row level security statements through the
/// `exec_sql` remote procedure, falling back to one `exec` call per
/// statement. If both fail the SQL is printed for manual application.
///
/// Requires SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY.

use std::path::PathBuf;

use clap::Parser;
use staffops::config::Settings;
use staffops::constants::EXIT_FAILURE;
use staffops::provision;
use staffops::rest::RestClient;
use staffops::schema::{load_sql_file, performance_evaluations};
use staffops::telemetry::{init_tracing, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "create-performance-evaluations")]
#[command(
    about = "Create the performance_evaluations table, indexes and RLS policies",
    long_about = None
)]
struct Args {
    /// Settings file (defaults to ./staffops.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Submit this SQL file instead of the built-in schema
    #[arg(long)]
    sql_file: Option<PathBuf>,

    /// Print the SQL and exit without connecting
    #[arg(long, default_value_t = false)]
    print_sql: bool,
}

fn main() {
    let args = Args::parse();

    let _guard = match init_tracing(TelemetryConfig::default()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("⚠️  Logging disabled: {}", e);
            None
        }
    };

    let sql = match &args.sql_file {
        Some(path) => match load_sql_file(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(EXIT_FAILURE);
            }
        },
        None => performance_evaluations().render(),
    };

    if args.print_sql {
        println!("{}", sql);
        return;
    }

    let settings = match Settings::load(args.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    let mut stdout = std::io::stdout();
    let result = provision::run(
        |name| std::env::var(name).ok(),
        RestClient::connect,
        &settings.provision,
        &sql,
        &mut stdout,
    );

    match result {
        Ok(report) if report.succeeded() => {
            println!("\n✅ Setup complete, performance evaluations can now be saved.");
        }
        Ok(_) => std::process::exit(EXIT_FAILURE),
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(e.exit_code());
        }
    }
}
