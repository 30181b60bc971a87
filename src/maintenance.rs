//! Record maintenance
//!
//! Lookup → history cleanup → score reset → verification. Only an empty or
//! failed lookup aborts; the cleanup and each score update are best effort
//! and their outcomes are collected in the report.

use std::io::Write;

use tracing::{info, warn};

use crate::config::{Credentials, MaintenanceSettings};
use crate::error::{MaintenanceError, StoreError};
use crate::name_pattern::NameFilter;
use crate::store::{Employee, EmployeeId, EmployeeStore};
use crate::telemetry::truncate_list;

/// What to match and what to reset it to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenancePlan {
    pub filter: NameFilter,
    pub target_score: i64,
    /// Stop after the lookup and only print what would change
    pub dry_run: bool,
}

/// Command-line adjustments applied on top of the configured plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOverrides {
    /// Replaces the configured patterns when non-empty
    pub patterns: Vec<String>,
    pub score: Option<i64>,
    /// Can only switch case-sensitive matching on, never off
    pub case_sensitive: bool,
    pub dry_run: bool,
}

impl MaintenancePlan {
    pub fn from_settings(settings: &MaintenanceSettings) -> Self {
        Self::with_overrides(settings, &PlanOverrides::default())
    }

    pub fn with_overrides(settings: &MaintenanceSettings, overrides: &PlanOverrides) -> Self {
        let patterns = if overrides.patterns.is_empty() {
            &settings.patterns
        } else {
            &overrides.patterns
        };
        let case_sensitive = settings.case_sensitive || overrides.case_sensitive;
        Self {
            filter: NameFilter::new(patterns.iter().cloned(), case_sensitive),
            target_score: overrides.score.unwrap_or(settings.target_score),
            dry_run: overrides.dry_run,
        }
    }
}

/// Outcome of one score update
#[derive(Debug)]
pub struct UpdateOutcome {
    pub id: EmployeeId,
    pub result: Result<(), StoreError>,
}

#[derive(Debug)]
pub struct MaintenanceReport {
    pub matched: Vec<Employee>,
    /// `None` on dry runs
    pub history_cleanup: Option<Result<(), StoreError>>,
    pub updates: Vec<UpdateOutcome>,
    /// `None` on dry runs
    pub verification: Option<Result<Vec<Employee>, StoreError>>,
}

impl MaintenanceReport {
    pub fn ids(&self) -> Vec<EmployeeId> {
        self.matched.iter().map(|e| e.id.clone()).collect()
    }

    pub fn succeeded_updates(&self) -> usize {
        self.updates.iter().filter(|u| u.result.is_ok()).count()
    }

    pub fn failed_updates(&self) -> Vec<&UpdateOutcome> {
        self.updates.iter().filter(|u| u.result.is_err()).collect()
    }
}

/// Step 1. An empty result is `NoMatches`.
pub fn lookup<S: EmployeeStore>(
    store: &S,
    filter: &NameFilter,
) -> Result<Vec<Employee>, MaintenanceError> {
    let matched = store.find_by_name(filter).map_err(MaintenanceError::Lookup)?;
    if matched.is_empty() {
        return Err(MaintenanceError::NoMatches);
    }
    Ok(matched)
}

/// Step 2. One bulk delete for all ids.
pub fn clear_history<S: EmployeeStore>(
    store: &S,
    ids: &[EmployeeId],
) -> Result<(), StoreError> {
    store.delete_history(ids)
}

/// Step 3. Every id is attempted regardless of earlier failures.
pub fn reset_scores<S: EmployeeStore>(
    store: &S,
    ids: &[EmployeeId],
    score: i64,
) -> Vec<UpdateOutcome> {
    ids.iter()
        .map(|id| {
            let result = store.set_score(id, score);
            if let Err(e) = &result {
                warn!(id = %id, error = %e, "Score reset failed");
            }
            UpdateOutcome {
                id: id.clone(),
                result,
            }
        })
        .collect()
}

/// Step 4.
pub fn verify<S: EmployeeStore>(
    store: &S,
    ids: &[EmployeeId],
) -> Result<Vec<Employee>, StoreError> {
    store.fetch_by_ids(ids)
}

/// Run all four steps against `store`, writing progress lines to `out`.
pub fn execute<S, W>(
    store: &S,
    plan: &MaintenancePlan,
    out: &mut W,
) -> Result<MaintenanceReport, MaintenanceError>
where
    S: EmployeeStore,
    W: Write,
{
    writeln!(out, "\n📋 Looking up employees...")?;
    let matched = match lookup(store, &plan.filter) {
        Ok(m) => m,
        Err(e) => {
            match &e {
                MaintenanceError::NoMatches => {
                    writeln!(out, "❌ No employee found matching {:?}", plan.filter.patterns())?
                }
                other => writeln!(out, "❌ {}", other)?,
            }
            return Err(e);
        }
    };

    writeln!(out, "✅ Found {} employees:", matched.len())?;
    for emp in &matched {
        writeln!(
            out,
            "   - {} (ID: {}, Score: {})",
            emp.name,
            emp.id,
            emp.display_score()
        )?;
    }

    let ids: Vec<EmployeeId> = matched.iter().map(|e| e.id.clone()).collect();
    info!(count = ids.len(), ids = %truncate_list(&ids, 10), "Employees matched");

    if plan.dry_run {
        writeln!(out, "\n🔍 Dry run, nothing changed. A real run would:")?;
        writeln!(out, "   - delete history rows of {} employees", ids.len())?;
        writeln!(out, "   - reset their score to {}", plan.target_score)?;
        return Ok(MaintenanceReport {
            matched,
            history_cleanup: None,
            updates: Vec::new(),
            verification: None,
        });
    }

    writeln!(out, "\n🗑️  Deleting history rows...")?;
    let history_cleanup = clear_history(store, &ids);
    match &history_cleanup {
        Ok(()) => writeln!(out, "✅ History deleted")?,
        Err(e) => {
            warn!(error = %e, "History cleanup failed, continuing");
            writeln!(out, "⚠️  Warning while deleting history: {}", e)?;
        }
    }

    writeln!(out, "\n🔄 Resetting score to {}...", plan.target_score)?;
    let updates = reset_scores(store, &ids, plan.target_score);
    for update in &updates {
        match &update.result {
            Ok(()) => writeln!(out, "✅ Score reset for employee ID {}", update.id)?,
            Err(e) => writeln!(
                out,
                "❌ Failed to reset score for employee ID {}: {}",
                update.id, e
            )?,
        }
    }

    writeln!(out, "\n📊 Verifying final state...")?;
    let verification = verify(store, &ids);
    match &verification {
        Ok(rows) => {
            writeln!(out, "\n✅ Final state:")?;
            for emp in rows {
                writeln!(out, "   - {}: {} points", emp.name, emp.display_score())?;
            }
        }
        Err(e) => {
            warn!(error = %e, "Verification read failed");
            writeln!(out, "⚠️  Could not read back final state: {}", e)?;
        }
    }

    let report = MaintenanceReport {
        matched,
        history_cleanup: Some(history_cleanup),
        updates,
        verification: Some(verification),
    };

    writeln!(
        out,
        "\n✨ Done: {} of {} scores reset, {} failed",
        report.succeeded_updates(),
        report.updates.len(),
        report.failed_updates().len()
    )?;

    Ok(report)
}

/// Full tool run: credentials, connect, execute.
///
/// `connect` is only invoked once credentials are present.
pub fn run<L, C, S, W>(
    lookup: L,
    connect: C,
    plan: &MaintenancePlan,
    out: &mut W,
) -> Result<MaintenanceReport, MaintenanceError>
where
    L: Fn(&str) -> Option<String>,
    C: FnOnce(&Credentials) -> Result<S, StoreError>,
    S: EmployeeStore,
    W: Write,
{
    let credentials = Credentials::from_lookup(lookup)?;
    writeln!(out, "🔄 Connecting to {}...", credentials.url)?;
    let store = connect(&credentials).map_err(MaintenanceError::Connect)?;
    execute(&store, plan, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ENV_SERVICE_KEY, ENV_URL};
    use crate::store::testing::{Call, MemoryStore};
    use std::cell::Cell;

    fn creds(name: &str) -> Option<String> {
        match name {
            ENV_URL => Some("https://example.supabase.co".to_string()),
            ENV_SERVICE_KEY => Some("key".to_string()),
            _ => None,
        }
    }

    fn staff() -> MemoryStore {
        let store = MemoryStore::with_employees(&[
            ("e1", "Leandro Da Silva Gomes E Silva", Some(37)),
            ("e2", "Maria Souza", Some(55)),
            ("e3", "Arthur Pizzani Silva", None),
        ]);
        store.add_history(1, "e1");
        store.add_history(2, "e1");
        store.add_history(3, "e2");
        store.add_history(4, "e3");
        store
    }

    fn plan() -> MaintenancePlan {
        MaintenancePlan::from_settings(&MaintenanceSettings::default())
    }

    fn ids(raw: &[&str]) -> Vec<EmployeeId> {
        raw.iter().map(|r| EmployeeId::new(*r)).collect()
    }

    #[test]
    fn test_ids_flow_unchanged_through_every_step() {
        let store = staff();
        let mut out = Vec::new();
        let report = execute(&store, &plan(), &mut out).unwrap();

        let expected = ids(&["e1", "e3"]);
        assert_eq!(report.ids(), expected);
        assert_eq!(
            *store.calls.borrow(),
            vec![
                Call::Find,
                Call::DeleteHistory(expected.clone()),
                Call::SetScore(EmployeeId::new("e1"), 10),
                Call::SetScore(EmployeeId::new("e3"), 10),
                Call::Fetch(expected),
            ]
        );
    }

    #[test]
    fn test_scores_reset_regardless_of_prior_value() {
        let store = staff();
        let report = execute(&store, &plan(), &mut Vec::new()).unwrap();

        assert_eq!(store.score_of("e1"), Some(10));
        assert_eq!(store.score_of("e3"), Some(10));
        // not matched, untouched
        assert_eq!(store.score_of("e2"), Some(55));

        let verified = report.verification.unwrap().unwrap();
        assert_eq!(verified.len(), 2);
        assert!(verified.iter().all(|e| e.score == Some(10)));
    }

    #[test]
    fn test_history_removed_only_for_matched() {
        let store = staff();
        execute(&store, &plan(), &mut Vec::new()).unwrap();

        let remaining: Vec<u32> = store.history.borrow().keys().copied().collect();
        assert_eq!(remaining, vec![3]);
    }

    #[test]
    fn test_no_match_issues_no_mutation() {
        let store = MemoryStore::with_employees(&[("e2", "Maria Souza", Some(55))]);
        let mut out = Vec::new();
        let err = execute(&store, &plan(), &mut out).unwrap_err();

        assert!(matches!(err, MaintenanceError::NoMatches));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(store.mutation_count(), 0);
        assert_eq!(*store.calls.borrow(), vec![Call::Find]);
        assert!(String::from_utf8(out).unwrap().contains("No employee found"));
    }

    #[test]
    fn test_lookup_failure_is_fatal() {
        let mut store = staff();
        store.fail_lookup = true;
        let err = execute(&store, &plan(), &mut Vec::new()).unwrap_err();

        assert!(matches!(err, MaintenanceError::Lookup(_)));
        assert_eq!(store.mutation_count(), 0);
    }

    #[test]
    fn test_single_update_failure_does_not_block_others() {
        let mut store = MemoryStore::with_employees(&[
            ("e1", "Leandro Silva Gomes", Some(1)),
            ("e3", "Arthur Pizzani", Some(2)),
            ("e4", "Arthur Pizzani Neto", Some(3)),
        ]);
        store.reject_update.insert(EmployeeId::new("e3"));

        let mut out = Vec::new();
        let report = execute(&store, &plan(), &mut out).unwrap();

        assert_eq!(report.updates.len(), 3);
        assert_eq!(report.succeeded_updates(), 2);
        let failed = report.failed_updates();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, EmployeeId::new("e3"));

        assert_eq!(store.score_of("e1"), Some(10));
        assert_eq!(store.score_of("e3"), Some(2));
        assert_eq!(store.score_of("e4"), Some(10));

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Failed to reset score for employee ID e3"));
        assert!(printed.contains("2 of 3 scores reset, 1 failed"));
    }

    #[test]
    fn test_history_failure_is_best_effort() {
        let mut store = staff();
        store.fail_delete = true;
        let mut out = Vec::new();
        let report = execute(&store, &plan(), &mut out).unwrap();

        assert!(matches!(report.history_cleanup, Some(Err(_))));
        assert_eq!(report.succeeded_updates(), 2);
        assert_eq!(store.history.borrow().len(), 4);
        assert!(String::from_utf8(out).unwrap().contains("Warning while deleting history"));
    }

    #[test]
    fn test_dry_run_only_looks_up() {
        let store = staff();
        let plan = MaintenancePlan {
            dry_run: true,
            ..plan()
        };
        let report = execute(&store, &plan, &mut Vec::new()).unwrap();

        assert_eq!(report.matched.len(), 2);
        assert!(report.history_cleanup.is_none());
        assert!(report.updates.is_empty());
        assert_eq!(store.mutation_count(), 0);
    }

    #[test]
    fn test_custom_target_score() {
        let store = staff();
        let plan = MaintenancePlan {
            target_score: 0,
            ..plan()
        };
        execute(&store, &plan, &mut Vec::new()).unwrap();
        assert_eq!(store.score_of("e1"), Some(0));
    }

    #[test]
    fn test_missing_credentials_never_connects() {
        let lookups: [fn(&str) -> Option<String>; 3] = [
            |_| None,
            |name| (name == ENV_URL).then(|| "https://example.supabase.co".to_string()),
            |name| (name == ENV_SERVICE_KEY).then(|| "key".to_string()),
        ];

        for lookup in lookups {
            let store = staff();
            let connects = Cell::new(0);
            let err = run(
                lookup,
                |_| {
                    connects.set(connects.get() + 1);
                    Ok(&store)
                },
                &plan(),
                &mut Vec::new(),
            )
            .unwrap_err();

            assert!(matches!(err, MaintenanceError::Config(_)));
            assert_eq!(err.exit_code(), 1);
            assert_eq!(connects.get(), 0);
            assert!(store.calls.borrow().is_empty());
        }
    }

    #[test]
    fn test_run_with_credentials() {
        let store = staff();
        let report = run(creds, |_| Ok(&store), &plan(), &mut Vec::new()).unwrap();
        assert_eq!(report.succeeded_updates(), 2);
    }

    #[test]
    fn test_configured_case_sensitivity_survives_cli_patterns() {
        let settings = MaintenanceSettings {
            case_sensitive: true,
            ..Default::default()
        };
        let overrides = PlanOverrides {
            patterns: vec!["%Arthur%".to_string()],
            ..Default::default()
        };
        let plan = MaintenancePlan::with_overrides(&settings, &overrides);

        assert!(plan.filter.case_sensitive());
        assert_eq!(plan.filter.patterns(), ["%Arthur%".to_string()]);
        assert!(!plan.filter.matches("arthur pizzani"));
        assert!(plan.filter.to_postgrest_or().contains(".like."));
    }

    #[test]
    fn test_configured_case_sensitivity_without_overrides() {
        let settings = MaintenanceSettings {
            case_sensitive: true,
            ..Default::default()
        };
        let plan = MaintenancePlan::with_overrides(&settings, &PlanOverrides::default());
        assert!(plan.filter.case_sensitive());
        assert_eq!(plan, MaintenancePlan::from_settings(&settings));
    }

    #[test]
    fn test_case_sensitive_flag_keeps_configured_patterns() {
        let overrides = PlanOverrides {
            case_sensitive: true,
            ..Default::default()
        };
        let settings = MaintenanceSettings::default();
        let plan = MaintenancePlan::with_overrides(&settings, &overrides);

        assert!(plan.filter.case_sensitive());
        assert_eq!(plan.filter.patterns(), settings.patterns.as_slice());
    }

    #[test]
    fn test_score_and_dry_run_overrides() {
        let settings = MaintenanceSettings::default();
        let plan = MaintenancePlan::with_overrides(&settings, &PlanOverrides::default());
        assert_eq!(plan.target_score, 10);
        assert!(!plan.dry_run);
        assert!(!plan.filter.case_sensitive());

        let overrides = PlanOverrides {
            score: Some(0),
            dry_run: true,
            ..Default::default()
        };
        let plan = MaintenancePlan::with_overrides(&settings, &overrides);
        assert_eq!(plan.target_score, 0);
        assert!(plan.dry_run);
    }
}
