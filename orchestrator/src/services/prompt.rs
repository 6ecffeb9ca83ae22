use shared::ClassificationResult;

pub const REPORT_SECTIONS: [&str; 4] = [
    "General Information",
    "Typical Location",
    "Possible Symptoms",
    "Recommended Next Steps",
];

/// Prompt asking the report service for a structured explanation of a label.
///
/// The label is embedded verbatim so the report can always be matched back
/// to the classification it explains.
pub fn report_prompt(classification: &ClassificationResult) -> String {
    let sections = REPORT_SECTIONS
        .iter()
        .map(|section| format!("## {}", section))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "A brain MRI scan was classified by an image model as \"{label}\" ({name}).\n\
         Write a concise, structured report about this finding for a non-specialist reader.\n\
         Use markdown and exactly these sections, in this order:\n\
         {sections}\n\
         Keep each section to a short paragraph or a few bullet points. \
         End with one sentence noting that this is not a diagnosis and that a \
         qualified clinician must review the scan.",
        label = classification.label,
        name = classification.display_label(),
        sections = sections,
    )
}
