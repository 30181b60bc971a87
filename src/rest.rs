// PostgREST Client
//
// Blocking HTTP client for the hosted project's `/rest/v1` interface.
// Implements both store traits. Every request carries the service key as
// `apikey` header and bearer token; no timeout is set beyond the client
// defaults.

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::Credentials;
use crate::constants::{
    EMPLOYEES_TABLE, EMPLOYEE_ID, EMPLOYEE_SCORE, HISTORY_EMPLOYEE_REF, HISTORY_TABLE,
    PGRST_FUNCTION_NOT_FOUND, PG_UNDEFINED_FUNCTION, REST_PREFIX,
};
use crate::error::StoreError;
use crate::name_pattern::{quote_value, NameFilter};
use crate::store::{
    employee_columns, Employee, EmployeeId, EmployeeStore, ProcedureCall, SqlGateway,
};
use crate::telemetry::truncate_list;

/// Error body PostgREST returns for rejected requests
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

pub struct RestClient {
    http: Client,
    base: String,
}

impl RestClient {
    pub fn connect(credentials: &Credentials) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&credentials.service_key)?;
        key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", credentials.service_key))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("staffops/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base: rest_base(&credentials.url),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base, table)
    }

    fn rpc_url(&self, procedure: &str) -> String {
        format!("{}/rpc/{}", self.base, procedure)
    }
}

/// `https://x.supabase.co/` -> `https://x.supabase.co/rest/v1`
fn rest_base(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with(REST_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, REST_PREFIX)
    }
}

/// PostgREST `in.(a,b,c)` filter value
fn in_list(ids: &[EmployeeId]) -> String {
    let values: Vec<String> = ids.iter().map(|id| quote_value(id.as_str())).collect();
    format!("in.({})", values.join(","))
}

pub(crate) fn rejection(status: u16, body: &str) -> StoreError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let mut message = parsed.message.unwrap_or_else(|| body.trim().to_string());
    if let Some(details) = parsed.details.filter(|d| !d.is_empty()) {
        message = format!("{} ({})", message, details);
    }
    if let Some(hint) = parsed.hint.filter(|h| !h.is_empty()) {
        message = format!("{} hint: {}", message, hint);
    }
    StoreError::Rejected {
        status,
        code: parsed.code,
        message,
    }
}

/// Turn a missing-function rejection into `ProcedureUnavailable`.
///
/// Only a failure that points at the called procedure itself counts:
/// `PGRST202`, a 404 carrying no SQLSTATE, or `42883` naming `procedure`.
/// A 404 with some other code (a missing table inside the submitted SQL,
/// say) stays `Rejected`.
pub(crate) fn classify_rpc_error(procedure: &str, err: StoreError) -> StoreError {
    let unavailable = match &err {
        StoreError::Rejected {
            status,
            code,
            message,
        } => match code.as_deref() {
            Some(PGRST_FUNCTION_NOT_FOUND) => true,
            Some(PG_UNDEFINED_FUNCTION) => names_procedure(message, procedure),
            Some(_) => false,
            None => *status == 404,
        },
        _ => false,
    };
    if unavailable {
        StoreError::ProcedureUnavailable(procedure.to_string())
    } else {
        err
    }
}

/// `function exec(query => text) does not exist` names `exec`, while
/// `function gen_random_uuid() does not exist` does not
fn names_procedure(message: &str, procedure: &str) -> bool {
    let call = format!("{}(", procedure);
    message.match_indices(&call).any(|(at, _)| {
        message[..at]
            .chars()
            .next_back()
            .map_or(true, |c| c == ' ' || c == '.' || c == '"')
    })
}

fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(rejection(status.as_u16(), &body))
}

impl EmployeeStore for RestClient {
    fn find_by_name(&self, filter: &NameFilter) -> Result<Vec<Employee>, StoreError> {
        let or = filter.to_postgrest_or();
        debug!(filter = %or, "Selecting employees by name");

        let response = self
            .http
            .get(self.table_url(EMPLOYEES_TABLE))
            .query(&[("select", employee_columns()), ("or", or)])
            .send()?;
        Ok(check(response)?.json()?)
    }

    fn delete_history(&self, ids: &[EmployeeId]) -> Result<(), StoreError> {
        debug!(ids = %truncate_list(ids, 5), "Deleting history rows");

        let response = self
            .http
            .delete(self.table_url(HISTORY_TABLE))
            .query(&[(HISTORY_EMPLOYEE_REF, in_list(ids))])
            .header("Prefer", "return=minimal")
            .send()?;
        check(response)?;
        Ok(())
    }

    fn set_score(&self, id: &EmployeeId, score: i64) -> Result<(), StoreError> {
        let mut body = Map::new();
        body.insert(EMPLOYEE_SCORE.to_string(), json!(score));

        let response = self
            .http
            .patch(self.table_url(EMPLOYEES_TABLE))
            .query(&[(EMPLOYEE_ID, format!("eq.{}", quote_value(id.as_str())))])
            .header("Prefer", "return=representation")
            .json(&Value::Object(body))
            .send()?;
        let updated: Vec<Value> = check(response)?.json()?;
        if updated.is_empty() {
            return Err(StoreError::NoRowsAffected(format!("{}={}", EMPLOYEE_ID, id)));
        }
        Ok(())
    }

    fn fetch_by_ids(&self, ids: &[EmployeeId]) -> Result<Vec<Employee>, StoreError> {
        let response = self
            .http
            .get(self.table_url(EMPLOYEES_TABLE))
            .query(&[("select", employee_columns()), (EMPLOYEE_ID, in_list(ids))])
            .send()?;
        Ok(check(response)?.json()?)
    }
}

impl SqlGateway for RestClient {
    fn execute(&self, call: &ProcedureCall, sql: &str) -> Result<(), StoreError> {
        let mut args = Map::new();
        args.insert(call.argument.clone(), Value::String(sql.to_string()));
        debug!(procedure = %call.name, bytes = sql.len(), "Calling remote procedure");

        let response = self
            .http
            .post(self.rpc_url(&call.name))
            .json(&Value::Object(args))
            .send()?;
        check(response).map_err(|e| classify_rpc_error(&call.name, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_base() {
        assert_eq!(rest_base("https://x.supabase.co"), "https://x.supabase.co/rest/v1");
        assert_eq!(rest_base("https://x.supabase.co/"), "https://x.supabase.co/rest/v1");
        assert_eq!(rest_base("https://x.supabase.co/rest/v1/"), "https://x.supabase.co/rest/v1");
    }

    #[test]
    fn test_in_list() {
        let ids = vec![EmployeeId::new("a1"), EmployeeId::new("b2")];
        assert_eq!(in_list(&ids), "in.(a1,b2)");
    }

    #[test]
    fn test_rejection_parses_postgrest_body() {
        let body = concat!(
            r#"{"code":"42P01","message":"relation \"employee_history\" does not exist","#,
            r#""details":null,"hint":null}"#
        );
        match rejection(404, body) {
            StoreError::Rejected { status, code, message } => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("42P01"));
                assert!(message.contains("employee_history"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejection_plain_text_body() {
        match rejection(502, "Bad Gateway\n") {
            StoreError::Rejected { code, message, .. } => {
                assert!(code.is_none());
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_function_is_unavailable() {
        let body = concat!(
            r#"{"code":"PGRST202","#,
            r#""message":"Could not find the function public.exec_sql(sql) in the schema cache"}"#
        );
        let err = classify_rpc_error("exec_sql", rejection(404, body));
        assert!(err.is_unavailable());

        let undefined = StoreError::Rejected {
            status: 400,
            code: Some("42883".to_string()),
            message: "function exec(query => text) does not exist".to_string(),
        };
        assert!(classify_rpc_error("exec", undefined).is_unavailable());
    }

    #[test]
    fn test_sql_failure_is_not_unavailable() {
        let body = r#"{"code":"42601","message":"syntax error at or near \"CREAT\""}"#;
        let err = classify_rpc_error("exec_sql", rejection(400, body));
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_missing_table_inside_sql_is_rejected() {
        let body = r#"{"code":"42P01","message":"relation \"employees\" does not exist"}"#;
        match classify_rpc_error("exec_sql", rejection(404, body)) {
            StoreError::Rejected { status, code, .. } => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("42P01"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bare_not_found_is_unavailable() {
        assert!(classify_rpc_error("exec_sql", rejection(404, "")).is_unavailable());
        assert!(classify_rpc_error("exec_sql", rejection(404, "{}")).is_unavailable());
        assert!(!classify_rpc_error("exec_sql", rejection(500, "")).is_unavailable());
    }

    #[test]
    fn test_undefined_function_must_name_the_procedure() {
        let other = r#"{"code":"42883","message":"function gen_random_uuid() does not exist"}"#;
        let err = classify_rpc_error("exec_sql", rejection(400, other));
        assert!(matches!(err, StoreError::Rejected { .. }));

        let own = concat!(
            r#"{"code":"42883","#,
            r#""message":"function public.exec_sql(sql => text) does not exist"}"#
        );
        assert!(classify_rpc_error("exec_sql", rejection(404, own)).is_unavailable());

        // `exec` is not named by a message about `my_exec`
        let suffix = r#"{"code":"42883","message":"function my_exec(text) does not exist"}"#;
        assert!(!classify_rpc_error("exec", rejection(400, suffix)).is_unavailable());
    }

    #[test]
    fn test_non_rejection_errors_pass_through() {
        let err = StoreError::NoRowsAffected("e1".to_string());
        assert!(matches!(
            classify_rpc_error("exec_sql", err),
            StoreError::NoRowsAffected(_)
        ));
    }

    #[test]
    fn test_connect_builds_client() {
        let creds = Credentials {
            url: "https://example.supabase.co/".to_string(),
            service_key: "service-key".to_string(),
        };
        let client = RestClient::connect(&creds).unwrap();
        assert_eq!(
            client.table_url("employees"),
            "https://example.supabase.co/rest/v1/employees"
        );
        assert_eq!(
            client.rpc_url("exec_sql"),
            "https://example.supabase.co/rest/v1/rpc/exec_sql"
        );
    }
}
