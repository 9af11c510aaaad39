use sea_query::{Value, Values};

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCommand {
    pub sql: String,
    pub values: Vec<Value>,
}

impl GeneratedCommand {
    pub fn new(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }
}

impl From<(String, Values)> for GeneratedCommand {
    fn from((sql, values): (String, Values)) -> Self {
        Self {
            sql,
            values: values.iter().cloned().collect(),
        }
    }
}

impl std::fmt::Display for GeneratedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Commands that run on one session, in one transaction, yielding the first
/// column of the first row of `result`.
///
/// Identity retrieval functions such as `LAST_INSERT_ID()` are session
/// scoped, so the insert and the read must share a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarCommand {
    pub preparatory: Vec<GeneratedCommand>,
    pub result: GeneratedCommand,
}

impl ScalarCommand {
    pub fn new(preparatory: Vec<GeneratedCommand>, result: GeneratedCommand) -> Self {
        Self {
            preparatory,
            result,
        }
    }
}

/// An insert either returns the store-generated identity or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertCommand {
    Plain(GeneratedCommand),
    Identity(ScalarCommand),
}
