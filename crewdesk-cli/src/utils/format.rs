use crewdesk_audit::audit::AuditEvent;

const HEADERS: [&str; 7] = ["TIME", "TYPE", "USER", "RESOURCE", "ACTION", "RESULT", "IP"];

/// Render events as a left-aligned, space-padded table ending in a newline
pub fn events_table(events: &[AuditEvent]) -> String {
    let rows: Vec<[String; 7]> = events.iter().map(event_row).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(String::from), &widths);
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    out
}

/// One table row for an event
pub fn event_row(event: &AuditEvent) -> [String; 7] {
    [
        event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        event.event_type.to_string(),
        user_label(event),
        resource_label(event),
        event.action.clone(),
        if event.success { "ok" } else { "FAILED" }.to_string(),
        event.ip_address.clone().unwrap_or_else(|| "-".to_string()),
    ]
}

/// `clients/42`, `clients`, or `-`
pub fn resource_label(event: &AuditEvent) -> String {
    match (&event.resource_type, event.resource_id) {
        (Some(kind), Some(id)) => format!("{}/{}", kind, id),
        (Some(kind), None) => kind.clone(),
        (None, _) => "-".to_string(),
    }
}

/// `dana@example.com (7)`, `#7`, or `anonymous`
pub fn user_label(event: &AuditEvent) -> String {
    match (event.user_id, &event.user_email) {
        (Some(id), Some(email)) => format!("{} ({})", email, id),
        (Some(id), None) => format!("#{}", id),
        (None, _) => "anonymous".to_string(),
    }
}

fn push_line(out: &mut String, cells: &[String; 7], widths: &[usize; 7]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}
