// Name Filters
//
// SQL LIKE style patterns (`%` = any run, `_` = one character) used to pick
// employees by full name. A filter is a list of patterns joined with OR.
// The same filter renders to a PostgREST `or=(...)` parameter for the
// remote lookup and can be evaluated locally with `matches`.

use crate::constants::EMPLOYEE_NAME;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFilter {
    patterns: Vec<String>,
    case_sensitive: bool,
}

impl NameFilter {
    /// Blank patterns are dropped.
    pub fn new<I, S>(patterns: I, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.trim().is_empty())
            .collect();
        Self {
            patterns,
            case_sensitive,
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// True when `name` matches at least one pattern
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| {
            if self.case_sensitive {
                like_match(p, name)
            } else {
                like_match(&p.to_lowercase(), &name.to_lowercase())
            }
        })
    }

    /// Render as the value of a PostgREST `or` query parameter, e.g.
    /// `(nome_completo.ilike."*Arthur*Pizzani*")`
    pub fn to_postgrest_or(&self) -> String {
        let op = if self.case_sensitive { "like" } else { "ilike" };
        let terms: Vec<String> = self
            .patterns
            .iter()
            .map(|p| {
                let value = quote_value(&to_postgrest_wildcards(p));
                format!("{}.{}.{}", EMPLOYEE_NAME, op, value)
            })
            .collect();
        format!("({})", terms.join(","))
    }
}

/// PostgREST accepts `*` as an alias for `%`, which avoids percent-encoding
/// ambiguity in URLs.
fn to_postgrest_wildcards(pattern: &str) -> String {
    pattern.replace('%', "*")
}

/// Values containing PostgREST reserved characters must be double-quoted.
pub(crate) fn quote_value(value: &str) -> String {
    const RESERVED: [char; 6] = [',', '.', ':', '(', ')', '"'];
    if value.contains(|c: char| RESERVED.contains(&c) || c.is_whitespace()) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// LIKE matching over chars. `%` matches any run (including empty), `_`
/// exactly one char, everything else literally.
fn like_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    // Greedy with single backtrack point on the last `%`
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || (p[pi] != '%' && p[pi] == t[ti])) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '%' {
        pi += 1;
    }
    pi == p.len()
}
