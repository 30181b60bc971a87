//! Schema provisioning
//!
//! Submits one multi-statement block through a remote procedure. When the
//! backend does not have that procedure, the block is split on `;` and each
//! piece goes through a second procedure. If that fails too, the full text
//! is printed so an operator can apply it by hand.
//!
//! ```text
//! Start -> PrimarySubmit -> Done
//!                        -> FallbackSplit -> Done
//!                                         -> ManualRecoveryPrinted -> Failed
//!                        -> ManualRecoveryPrinted -> Failed   (SQL rejected)
//! ```

use std::io::Write;

use tracing::{info, warn};

use crate::config::{Credentials, ProvisionSettings};
use crate::error::{ConfigError, ProvisionError, StoreError};
use crate::store::{ProcedureCall, SqlGateway};
use crate::telemetry::truncate_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    Start,
    PrimarySubmit,
    FallbackSplit,
    ManualRecoveryPrinted,
    Done,
    Failed,
}

/// Result of the single whole-block submission
#[derive(Debug)]
pub enum PrimaryOutcome {
    Accepted,
    /// The procedure itself does not exist on the backend
    Unavailable(StoreError),
    /// The procedure ran and the backend refused the SQL
    Rejected(StoreError),
}

/// Result of the statement-by-statement submission
#[derive(Debug)]
pub enum FallbackOutcome {
    AllSucceeded { statements: usize },
    Failed {
        index: usize,
        statement: String,
        error: StoreError,
    },
}

#[derive(Debug)]
pub struct ProvisionReport {
    pub trail: Vec<ProvisionState>,
    pub primary: PrimaryOutcome,
    pub fallback: Option<FallbackOutcome>,
}

impl ProvisionReport {
    pub fn state(&self) -> ProvisionState {
        self.trail.last().copied().unwrap_or(ProvisionState::Start)
    }

    pub fn succeeded(&self) -> bool {
        self.state() == ProvisionState::Done
    }

    /// Error that ended the run, if it failed
    pub fn failure(&self) -> Option<&StoreError> {
        match (&self.primary, &self.fallback) {
            (PrimaryOutcome::Rejected(e), _) => Some(e),
            (_, Some(FallbackOutcome::Failed { error, .. })) => Some(error),
            _ => None,
        }
    }
}

/// Non-empty, trimmed pieces of `sql` split on `;`
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn submit_primary<G: SqlGateway>(
    gateway: &G,
    call: &ProcedureCall,
    sql: &str,
) -> PrimaryOutcome {
    match gateway.execute(call, sql) {
        Ok(()) => PrimaryOutcome::Accepted,
        Err(e) if e.is_unavailable() => PrimaryOutcome::Unavailable(e),
        Err(e) => PrimaryOutcome::Rejected(e),
    }
}

/// Submit statements in order, stopping at the first failure
pub fn submit_fallback<G: SqlGateway>(
    gateway: &G,
    call: &ProcedureCall,
    sql: &str,
) -> FallbackOutcome {
    let statements = split_statements(sql);
    for (index, statement) in statements.iter().enumerate() {
        info!(
            index,
            total = statements.len(),
            statement = %truncate_text(statement, 60),
            "Submitting statement"
        );
        if let Err(error) = gateway.execute(call, statement) {
            return FallbackOutcome::Failed {
                index,
                statement: statement.to_string(),
                error,
            };
        }
    }
    FallbackOutcome::AllSucceeded {
        statements: statements.len(),
    }
}

/// Drive the state machine to `Done` or `ManualRecoveryPrinted`. The caller
/// prints the recovery text and moves to `Failed`.
pub fn provision<G: SqlGateway>(
    gateway: &G,
    settings: &ProvisionSettings,
    sql: &str,
) -> ProvisionReport {
    let primary_call = ProcedureCall::new(&settings.procedure, &settings.procedure_argument);
    let fallback_call =
        ProcedureCall::new(&settings.fallback_procedure, &settings.fallback_argument);

    let mut trail = vec![ProvisionState::Start, ProvisionState::PrimarySubmit];

    let primary = submit_primary(gateway, &primary_call, sql);
    let fallback = match &primary {
        PrimaryOutcome::Accepted => {
            trail.push(ProvisionState::Done);
            None
        }
        PrimaryOutcome::Rejected(_) => {
            trail.push(ProvisionState::ManualRecoveryPrinted);
            None
        }
        PrimaryOutcome::Unavailable(e) => {
            warn!(
                error = %e,
                fallback = %fallback_call.name,
                "Primary procedure unavailable"
            );
            trail.push(ProvisionState::FallbackSplit);
            let outcome = submit_fallback(gateway, &fallback_call, sql);
            trail.push(match outcome {
                FallbackOutcome::AllSucceeded { .. } => ProvisionState::Done,
                FallbackOutcome::Failed { .. } => ProvisionState::ManualRecoveryPrinted,
            });
            Some(outcome)
        }
    };

    ProvisionReport {
        trail,
        primary,
        fallback,
    }
}

/// Full tool run: credentials, connect, submit, report.
///
/// `connect` is only invoked once credentials are present.
pub fn run<L, C, G, W>(
    lookup: L,
    connect: C,
    settings: &ProvisionSettings,
    sql: &str,
    out: &mut W,
) -> Result<ProvisionReport, ProvisionError>
where
    L: Fn(&str) -> Option<String>,
    C: FnOnce(&Credentials) -> Result<G, StoreError>,
    G: SqlGateway,
    W: Write,
{
    let credentials = Credentials::from_lookup(lookup).map_err(|e: ConfigError| {
        warn!(error = %e, "Missing credentials");
        e
    })?;
    let gateway = connect(&credentials).map_err(ProvisionError::Connect)?;

    writeln!(out, "🔄 Submitting schema ({} statements)...", split_statements(sql).len())?;
    let mut report = provision(&gateway, settings, sql);

    if let PrimaryOutcome::Unavailable(_) = &report.primary {
        writeln!(
            out,
            "⚠️  Procedure `{}` not available, submitting statements one by one through `{}`...",
            settings.procedure, settings.fallback_procedure
        )?;
    }

    if report.succeeded() {
        match &report.fallback {
            Some(FallbackOutcome::AllSucceeded { statements }) => {
                writeln!(out, "✅ Schema applied ({} statements)", statements)?;
            }
            _ => {
                writeln!(out, "✅ Schema applied")?;
            }
        }
        writeln!(out, "   ✅ Table created")?;
        writeln!(out, "   ✅ Indexes created")?;
        writeln!(out, "   ✅ Row level security enabled")?;
        writeln!(out, "   ✅ Policies configured")?;
        return Ok(report);
    }

    if let Some(FallbackOutcome::Failed { index, statement, error }) = &report.fallback {
        writeln!(out, "❌ Statement {} failed: {}", index + 1, error)?;
        writeln!(out, "   {}", truncate_text(statement, 80))?;
    } else if let PrimaryOutcome::Rejected(error) = &report.primary {
        writeln!(out, "❌ Schema rejected: {}", error)?;
    }

    print_manual_recovery(out, sql)?;
    report.trail.push(ProvisionState::Failed);
    Ok(report)
}

/// Print the unsplit schema text for manual application
pub fn print_manual_recovery<W: Write>(out: &mut W, sql: &str) -> std::io::Result<()> {
    writeln!(out, "\n📋 Run this SQL manually in the Supabase SQL editor:")?;
    writeln!(out, "\n{}", sql)?;
    Ok(())
}
