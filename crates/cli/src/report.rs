use comfy_table::Table;
use hearth_core::MemberDirectory;
use hearth_import::{ImportSession, LogicalField};

pub fn preview_table(session: &ImportSession, limit: usize) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "Description", "Amount", "Category", "Matched Type", "Member"]);
    for (i, (preview, row)) in session
        .preview(limit)
        .into_iter()
        .zip(session.rows())
        .enumerate()
    {
        table.add_row(vec![
            (i + 1).to_string(),
            preview.date,
            preview.description,
            preview.amount,
            preview.category,
            preview.matched_type,
            row.member_id().to_string(),
        ]);
    }
    table
}

pub fn preview_caption(session: &ImportSession, limit: usize) -> String {
    let shown = limit.min(session.len());
    format!("Showing preview of first {shown} rows (of {})", session.len())
}

/// Human-readable notes about the mapping and rows the operator should check
/// before committing.
pub fn review_notes(session: &ImportSession) -> Vec<String> {
    let mut notes = Vec::new();

    let missing = session.mapping().missing_required();
    if !missing.is_empty() {
        let names: Vec<_> = missing.iter().map(|f| f.name()).collect();
        notes.push(format!("Mapping incomplete, set: {}", names.join(", ")));
    }

    for (field, column) in session.mapping().unknown_columns(session.headers()) {
        notes.push(format!("{field} is mapped to '{column}', which is not a column in this file"));
    }

    if !session.mapping().is_set(LogicalField::Category) {
        notes.push("No category column mapped; every row will be Uncategorized".to_string());
    }

    let zero = session.zero_amount_rows();
    if !zero.is_empty() {
        let rows: Vec<_> = zero.iter().map(|i| (i + 1).to_string()).collect();
        notes.push(format!("Rows with a zero amount: {}", rows.join(", ")));
    }

    notes
}

/// Replaces a member name with its id when the directory knows it.
pub fn resolve_member(who: &str, directory: &MemberDirectory) -> String {
    if directory.contains(who) {
        return who.to_string();
    }
    directory
        .find_by_name(who)
        .map(|m| m.id.clone())
        .unwrap_or_else(|| who.to_string())
}

/// `Name (id)` for every member, for error messages.
pub fn member_options(directory: &MemberDirectory) -> String {
    if directory.is_empty() {
        return "none".to_string();
    }
    directory
        .options()
        .map(|(id, name)| format!("{name} ({id})"))
        .collect::<Vec<_>>()
        .join(", ")
}
