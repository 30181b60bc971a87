/// Backend Naming Constants
///
/// Table, column and environment names shared by both tools. All remote
/// calls should use these constants instead of string literals.

/// Endpoint of the hosted project, e.g. `https://abc.supabase.co`
pub const ENV_URL: &str = "SUPABASE_URL";

/// Service-role key, sent both as `apikey` and bearer token
pub const ENV_SERVICE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";

/// Path prefix of the PostgREST interface below the project endpoint
pub const REST_PREFIX: &str = "/rest/v1";

pub const EMPLOYEES_TABLE: &str = "employees";
pub const EMPLOYEE_ID: &str = "id";
pub const EMPLOYEE_NAME: &str = "nome_completo";
pub const EMPLOYEE_SCORE: &str = "pontuacao";

pub const HISTORY_TABLE: &str = "employee_history";
pub const HISTORY_EMPLOYEE_REF: &str = "employee_id";

/// Score every matched employee is reset to
pub const DEFAULT_TARGET_SCORE: i64 = 10;

/// Name patterns of the two employees whose test data gets cleaned up
pub const DEFAULT_NAME_PATTERNS: [&str; 2] = ["%Leandro%Silva%Gomes%", "%Arthur%Pizzani%"];

/// Remote procedure taking the whole schema block (`{"sql": ...}`)
pub const PRIMARY_PROCEDURE: &str = "exec_sql";
pub const PRIMARY_ARGUMENT: &str = "sql";

/// Remote procedure taking one statement at a time (`{"query": ...}`)
pub const FALLBACK_PROCEDURE: &str = "exec";
pub const FALLBACK_ARGUMENT: &str = "query";

/// PostgREST: function not found in the schema cache
pub const PGRST_FUNCTION_NOT_FOUND: &str = "PGRST202";

/// Postgres: undefined_function
pub const PG_UNDEFINED_FUNCTION: &str = "42883";

/// Exit code for every fatal condition
pub const EXIT_FAILURE: i32 = 1;
