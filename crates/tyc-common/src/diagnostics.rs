//! Diagnostic types shared by every pipeline stage.
//!
//! Stages return their best-effort result plus a list of diagnostics;
//! the driver accumulates them per file and never silently drops one.
//! Codes are stable: editors and tests key off them.

use crate::span::Span;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Warning,
    Error,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

/// Stable diagnostic codes.
///
/// Grouped by the stage that emits them: 1xxx naming, 2xxx resolution,
/// 3xxx control-flow construction, 4xxx inference, 5xxx file-scoped.
pub mod diagnostic_codes {
    pub const REDECLARATION_KIND_CONFLICT: u32 = 1001;
    pub const UNRESOLVED_CONSTANT: u32 = 2001;
    pub const CYCLIC_ANCESTRY: u32 = 2002;
    pub const OVERRIDE_RETURN_MISMATCH: u32 = 2003;
    pub const OVERRIDE_PARAM_MISMATCH: u32 = 2004;
    pub const SUPERCLASS_NOT_CLASS: u32 = 2005;
    pub const MIXIN_NOT_MODULE: u32 = 2006;
    pub const READ_BEFORE_WRITE: u32 = 3001;
    pub const UNDEFINED_METHOD: u32 = 4001;
    pub const ARGUMENT_TYPE_MISMATCH: u32 = 4002;
    pub const ARGUMENT_COUNT_MISMATCH: u32 = 4003;
    pub const RETURN_TYPE_MISMATCH: u32 = 4004;
    pub const FIELD_TYPE_MISMATCH: u32 = 4005;
    pub const PARSE_FAILURE: u32 = 5001;
}

pub const DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = &[
    DiagnosticMessage {
        code: diagnostic_codes::REDECLARATION_KIND_CONFLICT,
        category: DiagnosticCategory::Error,
        message: "Cannot redeclare `{0}` as a {1}; it is already a {2}",
    },
    DiagnosticMessage {
        code: diagnostic_codes::UNRESOLVED_CONSTANT,
        category: DiagnosticCategory::Error,
        message: "Unable to resolve constant `{0}`",
    },
    DiagnosticMessage {
        code: diagnostic_codes::CYCLIC_ANCESTRY,
        category: DiagnosticCategory::Error,
        message: "Class `{0}` appears in its own ancestor chain",
    },
    DiagnosticMessage {
        code: diagnostic_codes::OVERRIDE_RETURN_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "Return type `{0}` of `{1}` is not a subtype of `{2}` declared in the overridden method",
    },
    DiagnosticMessage {
        code: diagnostic_codes::OVERRIDE_PARAM_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "Parameter `{0}` of `{1}` accepts `{2}`, which is narrower than `{3}` declared in the overridden method",
    },
    DiagnosticMessage {
        code: diagnostic_codes::SUPERCLASS_NOT_CLASS,
        category: DiagnosticCategory::Error,
        message: "Superclass of `{0}` must be a class, found `{1}`",
    },
    DiagnosticMessage {
        code: diagnostic_codes::MIXIN_NOT_MODULE,
        category: DiagnosticCategory::Error,
        message: "Argument to `{0}` must be a module, found `{1}`",
    },
    DiagnosticMessage {
        code: diagnostic_codes::READ_BEFORE_WRITE,
        category: DiagnosticCategory::Error,
        message: "Local variable `{0}` may be read before assignment",
    },
    DiagnosticMessage {
        code: diagnostic_codes::UNDEFINED_METHOD,
        category: DiagnosticCategory::Error,
        message: "Method `{0}` does not exist on `{1}`",
    },
    DiagnosticMessage {
        code: diagnostic_codes::ARGUMENT_TYPE_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "Expected `{0}` but found `{1}` for parameter `{2}`",
    },
    DiagnosticMessage {
        code: diagnostic_codes::ARGUMENT_COUNT_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "Wrong number of arguments for `{0}`: expected {1}, found {2}",
    },
    DiagnosticMessage {
        code: diagnostic_codes::RETURN_TYPE_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "Expected method to return `{0}` but found `{1}`",
    },
    DiagnosticMessage {
        code: diagnostic_codes::FIELD_TYPE_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "Cannot assign `{0}` to field `@{1}` of type `{2}`",
    },
    DiagnosticMessage {
        code: diagnostic_codes::PARSE_FAILURE,
        category: DiagnosticCategory::Error,
        message: "File could not be parsed; no analysis performed",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRelatedInformation {
    pub file: String,
    pub span: Span,
    pub message_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub file: String,
    pub span: Span,
    pub message_text: String,
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    pub fn error(file: impl Into<String>, span: Span, message: impl Into<String>, code: u32) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            message_text: message.into(),
            code,
            file: file.into(),
            span,
            related_information: Vec::new(),
        }
    }

    pub fn warning(
        file: impl Into<String>,
        span: Span,
        message: impl Into<String>,
        code: u32,
    ) -> Self {
        Self {
            category: DiagnosticCategory::Warning,
            message_text: message.into(),
            code,
            file: file.into(),
            span,
            related_information: Vec::new(),
        }
    }

    pub fn with_related(mut self, file: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            file: file.into(),
            span,
            message_text: message.into(),
        });
        self
    }
}

pub fn get_message_template(code: u32) -> Option<&'static str> {
    DIAGNOSTIC_MESSAGES
        .iter()
        .find(|m| m.code == code)
        .map(|m| m.message)
}

/// Substitute `{0}`, `{1}`, ... placeholders in a message template.
pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

/// Look up a template by code and substitute its placeholders.
/// Falls back to the bare arguments if the code is unknown.
pub fn message_for(code: u32, args: &[&str]) -> String {
    match get_message_template(code) {
        Some(template) => format_message(template, args),
        None => args.join(" "),
    }
}

/// Sort diagnostics into the stable output order: file, then span start,
/// then code. Determinism of the reported set is part of the contract.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then(a.span.start.cmp(&b.span.start))
            .then(a.code.cmp(&b.code))
    });
}
