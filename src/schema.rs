//! Schema text for the `performance_evaluations` table
//!
//! The statement block is rendered from a small typed description so every
//! policy is emitted as a drop-then-create pair and the block stays safe to
//! re-run (create-if-absent everywhere). Statements are separated by `;`,
//! which no statement body contains.

use std::path::Path;

use crate::error::ConfigError;

/// Command a row-level security policy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyCommand {
    Select,
    Insert,
    Update,
    Delete,
}

impl PolicyCommand {
    pub fn as_sql(&self) -> &'static str {
        match self {
            PolicyCommand::Select => "SELECT",
            PolicyCommand::Insert => "INSERT",
            PolicyCommand::Update => "UPDATE",
            PolicyCommand::Delete => "DELETE",
        }
    }

    /// INSERT policies only take a WITH CHECK clause
    fn clause(&self, expr: &str) -> String {
        match self {
            PolicyCommand::Insert => format!("WITH CHECK ({})", expr),
            _ => format!("USING ({})", expr),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub name: &'static str,
    pub command: PolicyCommand,
    pub expression: &'static str,
}

impl Policy {
    pub fn drop_sql(&self, table: &str) -> String {
        format!("DROP POLICY IF EXISTS \"{}\" ON {}", self.name, table)
    }

    pub fn create_sql(&self, table: &str) -> String {
        format!(
            "CREATE POLICY \"{}\" ON {}\n  FOR {} {}",
            self.name,
            table,
            self.command.as_sql(),
            self.command.clause(self.expression)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    /// Column definitions, one per entry, without trailing commas
    pub columns: &'static [&'static str],
    /// Indexed columns; index names are `idx_<table>_<column>`
    pub indexes: &'static [&'static str],
    pub policies: Vec<Policy>,
}

impl TableSchema {
    /// Full statement block, comments included
    pub fn render(&self) -> String {
        let mut sql = format!("-- {} table\n", self.name);
        sql.push_str(&format!("CREATE TABLE IF NOT EXISTS {} (\n", self.name));
        sql.push_str(&format!("  {}\n", self.columns.join(",\n  ")));
        sql.push_str(");\n");

        sql.push_str("\n-- Indexes\n");
        for column in self.indexes {
            sql.push_str(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column});\n",
                table = self.name,
                column = column
            ));
        }

        sql.push_str("\n-- Row level security\n");
        sql.push_str(&format!("ALTER TABLE {} ENABLE ROW LEVEL SECURITY;\n", self.name));

        sql.push_str("\n-- Policies (open access for every operation)\n");
        for policy in &self.policies {
            sql.push_str(&format!("{};\n", policy.drop_sql(self.name)));
            sql.push_str(&format!("{};\n\n", policy.create_sql(self.name)));
        }

        sql
    }
}

pub const EVALUATIONS_TABLE: &str = "performance_evaluations";

const EVALUATION_COLUMNS: &[&str] = &[
    "id UUID PRIMARY KEY DEFAULT gen_random_uuid()",
    "employee_id UUID REFERENCES employees(id) ON DELETE CASCADE",
    "avaliado TEXT NOT NULL",
    "tipo_avaliado TEXT NOT NULL CHECK (tipo_avaliado IN ('colaborador', 'lideranca'))",
    "avaliador TEXT NOT NULL",
    "tipo_avaliacao TEXT NOT NULL CHECK (tipo_avaliacao IN ('interna', 'externa'))",
    "tipo_formulario TEXT CHECK (tipo_formulario IN ('colega', 'lider'))",
    "data DATE NOT NULL",
    "pontuacao INTEGER NOT NULL",
    "status TEXT NOT NULL CHECK (status IN ('pendente', 'concluida'))",
    "link_externo TEXT",
    "observacoes TEXT",
    "created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()",
    "updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()",
];

const EVALUATION_INDEXES: &[&str] = &["employee_id", "data", "status"];

pub fn performance_evaluations() -> TableSchema {
    TableSchema {
        name: EVALUATIONS_TABLE,
        columns: EVALUATION_COLUMNS,
        indexes: EVALUATION_INDEXES,
        policies: vec![
            Policy {
                name: "Permitir leitura de avaliações",
                command: PolicyCommand::Select,
                expression: "true",
            },
            Policy {
                name: "Permitir inserção de avaliações",
                command: PolicyCommand::Insert,
                expression: "true",
            },
            Policy {
                name: "Permitir atualização de avaliações",
                command: PolicyCommand::Update,
                expression: "true",
            },
            Policy {
                name: "Permitir exclusão de avaliações",
                command: PolicyCommand::Delete,
                expression: "true",
            },
        ],
    }
}

/// Read a replacement statement block from disk
pub fn load_sql_file(path: &Path) -> Result<String, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{} is empty", path.display())));
    }
    Ok(text)
}
