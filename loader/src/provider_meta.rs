use std::ops::Range;

use dcl::body::{Block, Body};
use dcl::diagnostic::{Diagnostic, Diagnostics};
use dcl::eval::evaluate;

use crate::provider::check_provider_name_normalized;

/// A validated `provider_meta` block.
///
/// The body is carried through unevaluated: consumers resolve it against
/// their own schema and context later. Construction only proves that it
/// could be resolved without any external input.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMeta {
    /// The provider name from the block's single label.
    pub provider: String,
    /// The block body, exactly as parsed.
    pub config: Body,
    /// Span of the provider label.
    pub provider_range: Range<usize>,
    /// Span of the block header.
    pub decl_range: Range<usize>,
}

/// Decode one `provider_meta` block into a [`ProviderMeta`] record.
///
/// Validation accumulates into one diagnostic set and gates at fixed
/// points: after attribute extraction, and again after the label check.
/// Everything between the gates keeps running so a single decode reports
/// as many problems as possible. On success the returned diagnostics hold
/// only warnings; on failure the full accumulated set comes back and no
/// record is produced.
pub fn decode_provider_meta_block(
    block: Block,
    file_id: usize,
) -> Result<(ProviderMeta, Diagnostics), Diagnostics> {
    let mut diags = Diagnostics::new();

    // Exactly one label, the provider name. Checked before anything else
    // so no later stage can index a label that is not there.
    if block.labels.len() != 1 || block.label_ranges.len() != 1 {
        diags.push(Diagnostic::error(
            format!(
                "provider_meta blocks must have exactly one label, the provider name, but this one has {}",
                block.labels.len()
            ),
            block.def_range.clone(),
            file_id,
        ));
        return Err(diags);
    }
    let provider = block.labels[0].clone();
    let provider_range = block.label_ranges[0].clone();

    let (attrs, extract_diags) = block.body.just_attributes(file_id);
    diags.extend(extract_diags);
    if diags.has_errors() {
        return Err(diags);
    }

    // The body must be a static map: every attribute has to be evaluable
    // with no context at all. Failures accumulate instead of stopping the
    // loop so each offending attribute gets reported.
    for attr in attrs.values() {
        let (_, eval_diags) = evaluate(&attr.expr, None, file_id);
        for diag in eval_diags {
            diags.push(diag.with_note(format!("in attribute \"{}\"", attr.name)));
        }
    }

    // An unchecked label would otherwise end up in the record and be
    // compared or indexed by callers in its raw form. This gate covers the
    // evaluation failures above as well.
    diags.extend(check_provider_name_normalized(
        &provider,
        provider_range.clone(),
        file_id,
    ));
    if diags.has_errors() {
        return Err(diags);
    }

    Ok((
        ProviderMeta {
            provider,
            config: block.body,
            provider_range,
            decl_range: block.def_range,
        },
        diags,
    ))
}
