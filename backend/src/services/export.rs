use helpdesk_shared::Ticket;

const HEADER: [&str; 12] = [
    "id",
    "title",
    "description",
    "status",
    "priority",
    "category",
    "unit_id",
    "sector",
    "requester_id",
    "technician_name",
    "created_at",
    "updated_at",
];

/// Spreadsheets evaluate cells starting with these as formulas
const FORMULA_PREFIXES: [char; 4] = ['=', '+', '-', '@'];

/// Neutralize formula-like fields with a leading `'`, then quote the field
/// when it contains a separator, quote or line break.
fn escape(field: &str) -> String {
    let field = if field.starts_with(FORMULA_PREFIXES) {
        format!("'{}", field)
    } else {
        field.to_string()
    };

    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

fn write_row(out: &mut String, fields: &[&str]) {
    let row: Vec<String> = fields.iter().map(|f| escape(f)).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

/// Render tickets as CSV with a header row, in the order given.
pub fn tickets_csv<'a>(tickets: impl IntoIterator<Item = &'a Ticket>) -> String {
    let mut out = String::new();
    write_row(&mut out, &HEADER);

    for t in tickets {
        let created_at = t.created_at.to_rfc3339();
        let updated_at = t.updated_at.to_rfc3339();
        write_row(
            &mut out,
            &[
                t.id.as_str(),
                t.title.as_str(),
                t.description.as_str(),
                t.status.as_str(),
                t.priority.as_str(),
                t.category.as_deref().unwrap_or(""),
                t.unit_id.as_str(),
                t.sector.as_deref().unwrap_or(""),
                t.requester_id.as_str(),
                t.technician_name.as_deref().unwrap_or(""),
                created_at.as_str(),
                updated_at.as_str(),
            ],
        );
    }
    out
}
