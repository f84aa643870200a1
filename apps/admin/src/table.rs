use std::fmt::Write as _;

use client_core::view::{RowView, TableBody, TableView};

const HEADERS: [&str; 8] = [
    "", "ID", "Name", "Email", "Phone", "Role", "Status", "Created",
];

fn cells(row: &RowView) -> [String; 8] {
    [
        if row.selected { "[x]" } else { "[ ]" }.to_string(),
        row.id.to_string(),
        format!("({}) {}", row.initials, row.name),
        row.email.clone(),
        row.phone.clone(),
        row.role_label.to_string(),
        row.status_label.to_string(),
        row.created_at.clone(),
    ]
}

/// Plain-text rendering of the table, its summary and the pager.
pub fn format_table(view: &TableView) -> String {
    let mut out = String::new();
    match &view.body {
        TableBody::Loading => out.push_str(client_core::view::LOADING_TEXT),
        TableBody::Empty { message, failed } => {
            out.push_str(message);
            if *failed {
                out.push_str(" (the user list could not be loaded)");
            }
        }
        TableBody::Rows(rows) => {
            let mut header = HEADERS.map(str::to_string);
            header[0] = if view.header_checked { "[x]" } else { "[ ]" }.to_string();
            let body: Vec<[String; 8]> = rows.iter().map(cells).collect();

            let mut widths = header.clone().map(|cell| cell.chars().count());
            for row in &body {
                for (width, cell) in widths.iter_mut().zip(row) {
                    *width = (*width).max(cell.chars().count());
                }
            }
            for line in std::iter::once(&header).chain(body.iter()) {
                let padded: Vec<String> = line
                    .iter()
                    .zip(widths)
                    .map(|(cell, width)| format!("{cell:<width$}"))
                    .collect();
                let _ = writeln!(out, "{}", padded.join("  ").trim_end());
            }
        }
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }

    let _ = writeln!(out, "{}", view.summary);
    let pages: Vec<String> = view
        .page_buttons
        .iter()
        .map(|button| {
            if button.current {
                format!("[{}]", button.number)
            } else {
                button.number.to_string()
            }
        })
        .collect();
    let _ = write!(
        out,
        "{} {} {} | {}",
        if view.prev_enabled { "<" } else { " " },
        pages.join(" "),
        if view.next_enabled { ">" } else { " " },
        view.page_label
    );
    out
}
