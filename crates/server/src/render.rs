//! HTML rendering for the browsing pages.
//!
//! Issue bodies are upstream HTML and are emitted as-is. Everything else that
//! comes from outside (URLs, error bodies, identifiers) is escaped.

use std::fmt::Write;

use cwgview_client::SourceSummary;
use cwgview_core::{Issue, IssueId, UpstreamFailure};

/// Characters of an upstream error body shown on error pages.
pub const ERROR_EXCERPT_CHARS: usize = 1000;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

pub fn index_page(sources: &[SourceSummary], issues: &[(IssueId, String)]) -> String {
    let mut body = String::from("<h1>C++ Core Language Issues</h1>\n<ul class=\"sources\">\n");
    for source in sources {
        let size = source.size.as_deref().unwrap_or("not yet fetched");
        let _ = writeln!(
            body,
            "<li><a href=\"{url}\">{url}</a> ({status}, {size})</li>",
            url = escape(&source.url),
            status = escape(&source.status),
            size = escape(size),
        );
    }
    body.push_str("</ul>\n<ul class=\"issues\">\n");
    for (id, status) in issues {
        let _ = writeln!(
            body,
            "<li><a href=\"/cwg{id}\">CWG{id}</a> <span class=\"status\">{status}</span></li>",
            id = escape(id.as_str()),
            status = escape(status),
        );
    }
    body.push_str("</ul>");
    layout("C++ Core Language Issues", &body)
}

pub fn issue_page(issue: &Issue) -> String {
    let body = format!(
        "<p><a href=\"/\">All issues</a> | status: <span class=\"status\">{}</span></p>\n{}",
        escape(&issue.status),
        issue.body
    );
    layout(&format!("CWG{}", issue.id), &body)
}

pub fn no_such_issue(id: &str) -> String {
    let body = format!(
        "<h1>No such issue</h1>\n<p>CWG{} does not appear in the current issue list.</p>\n<p><a href=\"/\">All issues</a></p>",
        escape(id)
    );
    layout("No such issue", &body)
}

pub fn not_yet_available() -> String {
    layout(
        "Not yet available",
        "<h1>Not yet available</h1>\n<p>The issue list has not been fetched from upstream yet. Try again later.</p>",
    )
}

fn upstream_failure(heading: &str, failure: &UpstreamFailure) -> String {
    let status = failure.status.map_or_else(|| "none".to_string(), |s| s.to_string());
    let mut body = format!(
        "<h1>{}</h1>\n<p>URL: <a href=\"{url}\">{url}</a></p>\n<p>Status code: {}</p>\n",
        escape(heading),
        status,
        url = escape(&failure.url),
    );
    if let Some(reason) = &failure.reason {
        let _ = writeln!(body, "<p>Error: {}</p>", escape(reason));
    }
    let _ = write!(body, "<pre>{}</pre>", escape(failure.excerpt(ERROR_EXCERPT_CHARS)));
    layout(heading, &body)
}

pub fn upstream_unreachable(failure: &UpstreamFailure) -> String {
    upstream_failure("Upstream unreachable", failure)
}

pub fn upstream_not_parseable(failure: &UpstreamFailure) -> String {
    upstream_failure("Upstream not parseable", failure)
}

pub fn not_found(path: &str) -> String {
    let body = format!("<h1>Not found</h1>\n<p>{}</p>\n<p><a href=\"/\">All issues</a></p>", escape(path));
    layout("Not found", &body)
}

pub fn internal_error(message: &str) -> String {
    let body = format!("<h1>Internal error</h1>\n<p>{}</p>", escape(message));
    layout("Internal error", &body)
}
