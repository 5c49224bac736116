//! Declarative validation of task option records.
//!
//! A task declares which of its option fields are required, which are
//! optional, and which groups need at least one member. Rules are checked in
//! declaration order and the first violation is reported, before the task
//! touches the filesystem.

use thiserror::Error;

/// A record of task options the validator can inspect.
pub trait OptionRecord {
    /// Name of the task the record belongs to, used in error messages
    fn record_name(&self) -> &'static str;

    /// Every field the record knows
    fn fields(&self) -> &'static [&'static str];

    /// Whether a field carries a value
    fn is_set(&self, field: &str) -> bool;
}

/// Error raised by option validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{task}: missing required option --{field}")]
    MissingRequired { task: String, field: String },

    #[error("{task}: at least one of {} is required", format_flags(.fields))]
    MissingOneOf { task: String, fields: Vec<String> },

    #[error("{task}: invalid --{field}: {message}")]
    Invalid { task: String, field: String, message: String },

    /// A rule names a field the record does not have
    #[error("{task}: rule refers to unknown option '{field}'")]
    UnknownField { task: String, field: String },
}

impl ValidationError {
    /// Fields this error is about
    pub fn fields(&self) -> Vec<&str> {
        match self {
            ValidationError::MissingRequired { field, .. }
            | ValidationError::Invalid { field, .. }
            | ValidationError::UnknownField { field, .. } => vec![field.as_str()],
            ValidationError::MissingOneOf { fields, .. } => {
                fields.iter().map(String::as_str).collect()
            }
        }
    }
}

fn format_flags(fields: &[String]) -> String {
    fields.iter().map(|f| format!("--{}", f)).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    Required(&'static str),
    Optional(&'static str),
    AtLeastOneOf(Vec<&'static str>),
}

/// Checked validation rules for one record type.
#[derive(Debug, Clone)]
pub struct Rules {
    task: &'static str,
    rules: Vec<Rule>,
}

impl Rules {
    /// Start building rules over a fixed field list
    pub fn builder(task: &'static str, fields: &'static [&'static str]) -> RulesBuilder {
        RulesBuilder { task, fields, rules: Vec::new() }
    }

    /// Start building rules over the fields a record declares
    pub fn for_record<R: OptionRecord + ?Sized>(record: &R) -> RulesBuilder {
        Self::builder(record.record_name(), record.fields())
    }
}

/// Builder for [`Rules`].
#[derive(Debug, Clone)]
pub struct RulesBuilder {
    task: &'static str,
    fields: &'static [&'static str],
    rules: Vec<Rule>,
}

impl RulesBuilder {
    pub fn required(mut self, field: &'static str) -> Self {
        self.rules.push(Rule::Required(field));
        self
    }

    pub fn optional(mut self, field: &'static str) -> Self {
        self.rules.push(Rule::Optional(field));
        self
    }

    /// Require at least one field of the group to be set
    pub fn at_least_one_of(mut self, fields: &[&'static str]) -> Self {
        self.rules.push(Rule::AtLeastOneOf(fields.to_vec()));
        self
    }

    /// Finish, rejecting rules that name fields outside the record's list
    pub fn build(self) -> Result<Rules, ValidationError> {
        for rule in &self.rules {
            let named: &[&'static str] = match rule {
                Rule::Required(field) | Rule::Optional(field) => std::slice::from_ref(field),
                Rule::AtLeastOneOf(fields) => fields,
            };
            if let Some(unknown) = named.iter().find(|f| !self.fields.contains(*f)) {
                return Err(ValidationError::UnknownField {
                    task: self.task.to_string(),
                    field: unknown.to_string(),
                });
            }
        }
        Ok(Rules { task: self.task, rules: self.rules })
    }
}

/// Check a record against rules, returning the first violation.
pub fn validate<R: OptionRecord + ?Sized>(record: &R, rules: &Rules) -> Result<(), ValidationError> {
    for rule in &rules.rules {
        match rule {
            Rule::Required(field) if !record.is_set(field) => {
                return Err(ValidationError::MissingRequired {
                    task: rules.task.to_string(),
                    field: field.to_string(),
                });
            }
            Rule::AtLeastOneOf(fields) if !fields.iter().any(|f| record.is_set(f)) => {
                return Err(ValidationError::MissingOneOf {
                    task: rules.task.to_string(),
                    fields: fields.iter().map(|f| f.to_string()).collect(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}
