//! Admin report exports. CSV for all four report kinds, plus a minimal
//! single-page PDF (written by hand, no PDF crate) for issued books and
//! suggestions.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};

use crate::auth::{require_admin, CurrentUser};
use crate::database::{
    list_records, AppState, TABLE_FINES, TABLE_ISSUES, TABLE_SUGGESTIONS,
};
use crate::error::ApiError;
use crate::handler::{book_title, username_of};
use crate::model::{Fine, Issue, IssueStatus, Suggestion};

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_body(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&headers.join(","));
    out.push('\n');
    for row in rows {
        let fields: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_response(filename: &str, headers: &[&str], rows: &[Vec<String>]) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv_body(headers, rows),
    )
        .into_response()
}

/// Builds a one-page PDF by emitting the object structure directly:
/// catalog, page tree, page, a text content stream, and the built-in
/// Helvetica font, followed by the xref table.
fn render_pdf(title: &str, headers: &[&str], rows: &[Vec<String>]) -> Vec<u8> {
    fn esc(text: &str) -> String {
        text.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
    }

    let mut lines = vec![title.to_string(), headers.join(" | ")];
    for row in rows {
        let escaped: Vec<String> = row.iter().map(|f| esc(f)).collect();
        lines.push(escaped.join(" | "));
    }

    let mut text_ops = vec![
        "BT".to_string(),
        "/F1 12 Tf".to_string(),
        "50 780 Td".to_string(),
        "14 TL".to_string(),
    ];
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            text_ops.push("T*".to_string());
        }
        text_ops.push(format!("({line}) Tj"));
    }
    text_ops.push("ET".to_string());
    let stream = text_ops.join("\n");

    let mut body = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    let mut add_obj = |body: &mut String, num: usize, content: String| {
        offsets.push(body.len());
        body.push_str(&format!("{num} 0 obj\n{content}\nendobj\n"));
    };

    add_obj(&mut body, 1, "<< /Type /Catalog /Pages 2 0 R >>".to_string());
    add_obj(&mut body, 2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string());
    add_obj(
        &mut body,
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
    );
    add_obj(
        &mut body,
        4,
        format!("<< /Length {} >>\nstream\n{stream}\nendstream", stream.len()),
    );
    add_obj(
        &mut body,
        5,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    );

    let xref_start = body.len();
    body.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1));
    for offset in &offsets {
        body.push_str(&format!("{offset:010} 00000 n \n"));
    }
    body.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
        offsets.len() + 1
    ));
    body.into_bytes()
}

fn pdf_response(filename: &str, title: &str, headers: &[&str], rows: &[Vec<String>]) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        render_pdf(title, headers, rows),
    )
        .into_response()
}

fn issued_rows(state: &AppState) -> Result<Vec<Vec<String>>, ApiError> {
    let issues: Vec<Issue> = list_records(&state.db, TABLE_ISSUES)?;
    let mut rows = Vec::new();
    for issue in issues.iter().filter(|i| i.status == IssueStatus::Issued) {
        rows.push(vec![
            book_title(&state.db, issue.book_id)?,
            username_of(&state.db, issue.user_id)?,
            fmt_date(issue.issue_date),
            fmt_date(issue.due_date),
        ]);
    }
    Ok(rows)
}

fn suggestion_rows(state: &AppState) -> Result<Vec<Vec<String>>, ApiError> {
    let suggestions: Vec<Suggestion> = list_records(&state.db, TABLE_SUGGESTIONS)?;
    let mut rows = Vec::new();
    for s in suggestions {
        let username = username_of(&state.db, s.created_by)?;
        rows.push(vec![
            s.title,
            s.author,
            s.category,
            serde_json::to_value(s.status)?
                .as_str()
                .unwrap_or_default()
                .to_string(),
            username,
        ]);
    }
    Ok(rows)
}

const ISSUED_HEADERS: [&str; 4] = ["Book", "User", "Issue Date", "Due Date"];
const SUGGESTION_HEADERS: [&str; 5] = ["Title", "Author", "Category", "Status", "User"];

pub async fn issued_csv(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    require_admin(&user.0)?;
    let rows = issued_rows(&state)?;
    Ok(csv_response("issued_books.csv", &ISSUED_HEADERS, &rows))
}

pub async fn overdue_csv(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    require_admin(&user.0)?;

    let today = Utc::now().date_naive();
    let issues: Vec<Issue> = list_records(&state.db, TABLE_ISSUES)?;
    let mut rows = Vec::new();
    for issue in issues.iter().filter(|i| i.is_overdue(today)) {
        rows.push(vec![
            book_title(&state.db, issue.book_id)?,
            username_of(&state.db, issue.user_id)?,
            fmt_date(issue.due_date),
        ]);
    }
    Ok(csv_response(
        "overdue_books.csv",
        &["Book", "User", "Due Date"],
        &rows,
    ))
}

pub async fn fines_csv(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    require_admin(&user.0)?;

    let fines: Vec<Fine> = list_records(&state.db, TABLE_FINES)?;
    let mut rows = Vec::new();
    for fine in fines {
        let issue: Option<Issue> =
            crate::database::get_record(&state.db, TABLE_ISSUES, fine.issue_id)?;
        let (title, username) = match &issue {
            Some(issue) => (
                book_title(&state.db, issue.book_id)?,
                username_of(&state.db, issue.user_id)?,
            ),
            None => (String::new(), String::new()),
        };
        rows.push(vec![
            title,
            username,
            fine.amount.to_string(),
            fine.paid.to_string(),
            fine.created_at.to_rfc3339(),
        ]);
    }
    Ok(csv_response(
        "fines.csv",
        &["Book", "User", "Amount", "Paid", "Created"],
        &rows,
    ))
}

pub async fn suggestions_csv(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    require_admin(&user.0)?;
    let rows = suggestion_rows(&state)?;
    Ok(csv_response(
        "book_suggestions.csv",
        &SUGGESTION_HEADERS,
        &rows,
    ))
}

pub async fn issued_pdf(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    require_admin(&user.0)?;
    let rows = issued_rows(&state)?;
    Ok(pdf_response(
        "issued_books.pdf",
        "Issued Books",
        &ISSUED_HEADERS,
        &rows,
    ))
}

pub async fn suggestions_pdf(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    require_admin(&user.0)?;
    let rows = suggestion_rows(&state)?;
    Ok(pdf_response(
        "book_suggestions.pdf",
        "Book Suggestions",
        &SUGGESTION_HEADERS,
        &rows,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_escapes_quotes_and_commas() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_body_has_header_row() {
        let body = csv_body(&["A", "B"], &[vec!["1".into(), "2".into()]]);
        assert_eq!(body, "A,B\n1,2\n");
    }

    #[test]
    fn pdf_is_well_formed() {
        let bytes = render_pdf(
            "Issued Books",
            &["Book", "User"],
            &[vec!["Dune (1965)".into(), "paul".into()]],
        );
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.ends_with("%%EOF\n"));
        // Parentheses in data must be escaped inside the text stream
        assert!(text.contains("Dune \\(1965\\)"));
        assert!(text.contains("/BaseFont /Helvetica"));
    }
}
