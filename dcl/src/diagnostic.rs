use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic as TermDiagnostic, Label, Severity};

/// An error or warning with source location information.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
    pub related: Vec<RelatedSpan>,
}

/// A second source location attached to a diagnostic, for example the
/// first definition when reporting a duplicate.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedSpan {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        Diagnostic {
            message: message.into(),
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
            related: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        Diagnostic {
            message: message.into(),
            span,
            file_id,
            severity: Severity::Warning,
            notes: Vec::new(),
            related: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Attach a second location, rendered as a secondary label.
    pub fn with_related(
        mut self,
        message: impl Into<String>,
        span: Range<usize>,
        file_id: usize,
    ) -> Self {
        self.related.push(RelatedSpan {
            message: message.into(),
            span,
            file_id,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> TermDiagnostic<usize> {
        let mut labels = vec![Label::primary(self.file_id, self.span.clone())];
        for related in &self.related {
            labels.push(
                Label::secondary(related.file_id, related.span.clone())
                    .with_message(related.message.clone()),
            );
        }
        TermDiagnostic::new(self.severity)
            .with_message(&self.message)
            .with_labels(labels)
            .with_notes(self.notes.clone())
    }
}

/// An ordered accumulator of diagnostics.
///
/// Validation stages append to one accumulator and callers gate on
/// `has_errors` at explicit checkpoints; warnings never stop a pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    diags: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics { diags: Vec::new() }
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.diags.push(diag);
    }

    /// Append every diagnostic from `other`, preserving order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.diags.extend(other.diags);
    }

    pub fn has_errors(&self) -> bool {
        self.diags.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diags.iter()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diag: Diagnostic) -> Self {
        Diagnostics { diags: vec![diag] }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diags.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diags.iter()
    }
}
