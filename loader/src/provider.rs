use std::ops::Range;

use dcl::diagnostic::{Diagnostic, Diagnostics};

/// Produce the canonical form of a provider name, or explain why the name
/// can never be valid. Canonical names are lowercase ASCII letters, digits,
/// and dashes, with no dash at either end.
pub fn normalize_provider_name(name: &str) -> Result<String, String> {
    if name.is_empty() {
        return Err("provider names must not be empty".to_string());
    }
    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' {
            return Err(format!(
                "provider names may contain only letters, digits, and dashes, not '{}'",
                c
            ));
        }
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err("provider names must not start or end with a dash".to_string());
    }
    Ok(name.to_ascii_lowercase())
}

/// Check that a provider name as written is already in canonical form.
/// Returns an empty set when it is.
pub fn check_provider_name_normalized(
    name: &str,
    span: Range<usize>,
    file_id: usize,
) -> Diagnostics {
    let mut diags = Diagnostics::new();
    match normalize_provider_name(name) {
        Err(reason) => {
            diags.push(
                Diagnostic::error(format!("invalid provider name \"{}\"", name), span, file_id)
                    .with_note(reason),
            );
        }
        Ok(normalized) if normalized != name => {
            diags.push(
                Diagnostic::error(
                    format!("provider name \"{}\" is not normalized", name),
                    span,
                    file_id,
                )
                .with_note(format!("did you mean \"{}\"?", normalized)),
            );
        }
        Ok(_) => {}
    }
    diags
}
