//! Typed record graph consumed by the code generation backends.
//!
//! Records arrive already parsed (see [`load`]); the backends only read
//! them, through the typed accessors below. A field holds one of a closed
//! set of value shapes, so a backend asking for the wrong shape gets a
//! fatal error naming the offending record and field instead of a
//! downcast panic.

pub mod load;

use anyhow::{Result, anyhow};

/// A single field value in the record graph.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// String literal.
    Str(String),
    /// Enumerated case name.
    Case(String),
    /// Ordered list of values.
    List(Vec<FieldValue>),
    /// Nested record.
    Record(Record),
}

impl FieldValue {
    fn shape(&self) -> &'static str {
        match self {
            FieldValue::Str(_) => "string",
            FieldValue::Case(_) => "case",
            FieldValue::List(_) => "list",
            FieldValue::Record(_) => "record",
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            FieldValue::Str(value) => Ok(value),
            other => Err(anyhow!("expected a string, found a {}", other.shape())),
        }
    }

    pub fn as_case(&self) -> Result<&str> {
        match self {
            FieldValue::Case(name) => Ok(name),
            other => Err(anyhow!("expected a case, found a {}", other.shape())),
        }
    }

    pub fn as_list(&self) -> Result<&[FieldValue]> {
        match self {
            FieldValue::List(values) => Ok(values),
            other => Err(anyhow!("expected a list, found a {}", other.shape())),
        }
    }

    pub fn as_record(&self) -> Result<&Record> {
        match self {
            FieldValue::Record(record) => Ok(record),
            other => Err(anyhow!("expected a record, found a {}", other.shape())),
        }
    }
}

/// A named record with ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub kind: String,
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Record {
            name: name.into(),
            kind: kind.into(),
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push((field.into(), value));
        self
    }

    fn label(&self) -> String {
        if self.name.is_empty() {
            format!("anonymous {}", self.kind)
        } else {
            format!("{} '{}'", self.kind, self.name)
        }
    }

    pub fn field(&self, name: &str) -> Result<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
            .ok_or_else(|| anyhow!("Schema: {} has no field '{}'", self.label(), name))
    }

    pub fn str_field(&self, name: &str) -> Result<&str> {
        self.field(name)?
            .as_str()
            .map_err(|err| anyhow!("Schema: field '{}' of {}: {}", name, self.label(), err))
    }

    pub fn case_field(&self, name: &str) -> Result<&str> {
        self.field(name)?
            .as_case()
            .map_err(|err| anyhow!("Schema: field '{}' of {}: {}", name, self.label(), err))
    }

    pub fn list_field(&self, name: &str) -> Result<&[FieldValue]> {
        self.field(name)?
            .as_list()
            .map_err(|err| anyhow!("Schema: field '{}' of {}: {}", name, self.label(), err))
    }

    pub fn record_field(&self, name: &str) -> Result<&Record> {
        self.field(name)?
            .as_record()
            .map_err(|err| anyhow!("Schema: field '{}' of {}: {}", name, self.label(), err))
    }
}

/// The full record graph, in declaration order.
#[derive(Debug, Default)]
pub struct RecordKeeper {
    records: Vec<Record>,
}

impl RecordKeeper {
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// All definitions of a kind, in declaration order.
    pub fn all_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Record> {
        self.records.iter().filter(move |record| record.kind == kind)
    }
}
