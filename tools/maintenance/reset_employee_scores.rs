/// Delete test history and reset scores of specific employees
///
/// Looks employees up by name pattern, deletes their `employee_history`
/// rows, resets `pontuacao` to the target score and prints the final state.
///
/// Requires SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY.

use std::path::PathBuf;

use clap::Parser;
use staffops::config::Settings;
use staffops::constants::EXIT_FAILURE;
use staffops::maintenance::{self, MaintenancePlan, PlanOverrides};
use staffops::rest::RestClient;
use staffops::telemetry::{init_tracing, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "reset-employee-scores")]
#[command(
    about = "Delete history rows and reset the score of employees matched by name",
    long_about = None
)]
struct Args {
    /// Settings file (defaults to ./staffops.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQL LIKE pattern on the full name; repeat to match several people
    #[arg(long = "pattern")]
    patterns: Vec<String>,

    /// Score every matched employee is reset to
    #[arg(long)]
    score: Option<i64>,

    /// Match names case-sensitively
    #[arg(long, default_value_t = false)]
    case_sensitive: bool,

    /// Only look employees up and print what would change
    #[arg(long, default_value_t = false)]
    dry_run: bool,
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

    let settings = match Settings::load(args.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    let overrides = PlanOverrides {
        patterns: args.patterns,
        score: args.score,
        case_sensitive: args.case_sensitive,
        dry_run: args.dry_run,
    };
    let plan = MaintenancePlan::with_overrides(&settings.maintenance, &overrides);

    if plan.filter.is_empty() {
        eprintln!("❌ No name pattern given");
        std::process::exit(EXIT_FAILURE);
    }

    let mut stdout = std::io::stdout();
    let result = maintenance::run(
        |name| std::env::var(name).ok(),
        RestClient::connect,
        &plan,
        &mut stdout,
    );

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(e.exit_code());
    }
}
