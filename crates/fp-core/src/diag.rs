//! Severity-tagged diagnostics.
//!
//! The validator accumulates these across a whole model pass instead of
//! stopping at the first problem, so a caller can fix a model in one edit
//! cycle.

use core::fmt;

/// Diagnostic severity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which namespace a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Element,
    Data,
    Failure,
    Model,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Element => "element",
            EntityKind::Data => "data",
            EntityKind::Failure => "failure",
            EntityKind::Model => "model",
        }
    }
}

/// One finding: severity, originating entity, human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: EntityKind,
    /// Entity name; empty for model-level findings.
    pub entity: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: EntityKind, entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn warning(kind: EntityKind, entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn info(kind: EntityKind, entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            kind,
            entity: entity.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entity.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(
                f,
                "{} [{} \"{}\"]: {}",
                self.severity,
                self.kind.label(),
                self.entity,
                self.message
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn display_includes_entity() {
        let d = Diagnostic::error(EntityKind::Element, "pump", "no incoming control flow");
        assert_eq!(
            d.to_string(),
            "Error [element \"pump\"]: no incoming control flow"
        );
    }

    #[test]
    fn display_model_level() {
        let d = Diagnostic::error(EntityKind::Model, "", "no initial element");
        assert_eq!(d.to_string(), "Error: no initial element");
    }
}
