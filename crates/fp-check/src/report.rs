//! Accumulated validation findings.

use fp_core::{Diagnostic, EntityKind, Severity};

/// The outcome of a validation pass: every finding, in check order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: Report) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True if no error-severity finding was recorded.
    pub fn is_ok(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    /// Worst severity recorded for one entity, if any finding names it.
    pub fn entity_status(&self, kind: EntityKind, name: &str) -> Option<Severity> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == kind && d.entity == name)
            .map(|d| d.severity)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_severity_wins() {
        let mut report = Report::new();
        report.push(Diagnostic::info(EntityKind::Element, "a", "ok"));
        report.push(Diagnostic::warning(EntityKind::Element, "a", "odd"));
        assert_eq!(
            report.entity_status(EntityKind::Element, "a"),
            Some(Severity::Warning)
        );
        assert!(report.is_ok());
        assert!(report.has_warnings());

        report.push(Diagnostic::error(EntityKind::Element, "a", "broken"));
        assert_eq!(
            report.entity_status(EntityKind::Element, "a"),
            Some(Severity::Error)
        );
        assert!(!report.is_ok());
    }
}
