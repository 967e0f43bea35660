//! HTML pages for the browser UI.
//!
//! Plain string rendering; everything user- or generator-supplied goes through
//! `escape_html`.

use crate::model::{AnalysisResult, OutputKind, Preset};
use std::fmt::Write as _;
use std::path::Path;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:52rem;margin:2rem auto;padding:0 1rem}\
label{display:block;margin-top:.8rem;font-weight:600}\
input,select,textarea{width:100%;padding:.4rem;box-sizing:border-box}\
textarea{min-height:6rem}pre{background:#f4f4f4;padding:.6rem;overflow:auto;max-height:24rem}\
.error{background:#fde8e8;border:1px solid #e0a0a0;padding:.6rem}\
.ok{color:#1a7f37}.failed{color:#b42318}";

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

/// Percent-encode one URL path segment.
pub fn encode_path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

/// Download link for a generated file, or `None` when it has no file name.
pub fn download_link(run_id: &str, path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    Some(format!(
        "/download/{}/{}",
        encode_path_segment(run_id),
        encode_path_segment(name)
    ))
}

/// `(kind, link)` for every output of a result.
pub fn result_links(result: &AnalysisResult) -> Vec<(OutputKind, String)> {
    result
        .outputs
        .as_ref()
        .map(|outputs| {
            outputs
                .iter()
                .filter_map(|(kind, path)| download_link(&result.run_id, path).map(|l| (kind, l)))
                .collect()
        })
        .unwrap_or_default()
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{title}</title><style>{STYLE}</style></head>\n<body>\n{body}\n</body></html>\n",
        title = escape_html(title),
    )
}

fn error_banner(error: Option<&str>) -> String {
    match error {
        Some(msg) => format!("<p class=\"error\">{}</p>\n", escape_html(msg)),
        None => String::new(),
    }
}

/// Everything the form page shows.
#[derive(Debug, Clone, Default)]
pub struct FormPage {
    pub presets: Vec<Preset>,
    pub instruction_presets: Vec<String>,
    pub preset_id: Option<i64>,
    pub competitor: String,
    pub baseline: String,
    pub file: String,
    pub instruction_preset: String,
    pub extra_instructions: String,
    pub error: Option<String>,
}

fn text_input(name: &str, label: &str, value: &str, placeholder: &str) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\
         <input id=\"{name}\" name=\"{name}\" value=\"{}\" placeholder=\"{}\">\n",
        escape_html(value),
        escape_html(placeholder),
    )
}

pub fn render_index(page: &FormPage) -> String {
    let mut body = String::from("<h1>Comparison report</h1>\n");
    body.push_str(&error_banner(page.error.as_deref()));

    // Choosing a preset reloads the page with the preset's values filled in.
    body.push_str("<form method=\"get\" action=\"/\">\n<label for=\"preset_pick\">Preset</label>");
    body.push_str("<select id=\"preset_pick\" name=\"preset_id\" onchange=\"this.form.submit()\">");
    body.push_str("<option value=\"\">(none)</option>");
    for p in &page.presets {
        let selected = if page.preset_id == Some(p.id) { " selected" } else { "" };
        let _ = write!(
            body,
            "<option value=\"{}\"{selected}>{}</option>",
            p.id,
            escape_html(&p.label())
        );
    }
    body.push_str("</select></form>\n");

    body.push_str("<form method=\"post\" action=\"/run\">\n");
    if let Some(id) = page.preset_id {
        let _ = writeln!(body, "<input type=\"hidden\" name=\"preset_id\" value=\"{id}\">");
    }
    body.push_str(&text_input("competitor", "Competitor", &page.competitor, "example.com"));
    body.push_str(&text_input("baseline", "Baseline (optional)", &page.baseline, ""));
    body.push_str(&text_input("file", "Source file (optional)", &page.file, ""));

    body.push_str("<label for=\"instruction_preset\">Instruction preset</label>");
    body.push_str("<select id=\"instruction_preset\" name=\"instruction_preset\">");
    body.push_str("<option value=\"\">(none)</option>");
    for key in &page.instruction_presets {
        let selected = if *key == page.instruction_preset { " selected" } else { "" };
        let key = escape_html(key);
        let _ = write!(body, "<option value=\"{key}\"{selected}>{key}</option>");
    }
    body.push_str("</select>\n");

    let _ = write!(
        body,
        "<label for=\"extra_instructions\">Extra instructions</label>\
         <textarea id=\"extra_instructions\" name=\"extra_instructions\">{}</textarea>\n",
        escape_html(&page.extra_instructions)
    );
    body.push_str("<p><button type=\"submit\">Run analysis</button></p>\n</form>");

    layout("Comparison report", &body)
}

pub fn render_result(result: &AnalysisResult) -> String {
    let status = result.status.as_str();
    let mut body = format!(
        "<h1>Run <span class=\"{status}\">{status}</span></h1>\n<table>\n\
         <tr><th>Competitor</th><td>{}</td></tr>\n\
         <tr><th>Baseline</th><td>{}</td></tr>\n\
         <tr><th>Generated</th><td>{}</td></tr>\n\
         <tr><th>Duration</th><td>{}</td></tr>\n\
         <tr><th>Exit code</th><td>{}</td></tr>\n",
        escape_html(&result.competitor),
        if result.baseline.is_empty() {
            "(none)".to_string()
        } else {
            escape_html(&result.baseline)
        },
        escape_html(&result.generated_at),
        humantime::format_duration(result.duration),
        result.exit_code,
    );
    if let Some(dir) = &result.run_dir {
        let _ = writeln!(
            body,
            "<tr><th>Run directory</th><td><code>{}</code></td></tr>",
            escape_html(&dir.display().to_string())
        );
    }
    body.push_str("</table>\n");

    if result.retried_without_prompt_flags {
        body.push_str(
            "<p class=\"error\">The report generator did not accept the instruction \
             options; the run was repeated without them.</p>\n",
        );
    }

    let links = result_links(result);
    if links.is_empty() {
        body.push_str("<p>No report files were found.</p>\n");
    } else {
        body.push_str("<h2>Reports</h2>\n<ul>\n");
        for (kind, link) in links {
            let _ = writeln!(
                body,
                "<li><a href=\"{}\">{}</a></li>",
                escape_html(&link),
                kind.label()
            );
        }
        body.push_str("</ul>\n");
    }

    for (title, tail) in [("stdout", &result.stdout_tail), ("stderr", &result.stderr_tail)] {
        if !tail.is_empty() {
            let _ = writeln!(body, "<h3>{title}</h3>\n<pre>{}</pre>", escape_html(tail));
        }
    }
    body.push_str("<p><a href=\"/\">New run</a></p>");

    layout(&format!("Run {status}"), &body)
}

pub fn render_error(message: &str) -> String {
    let body = format!(
        "<h1>Run not started</h1>\n{}<p><a href=\"/\">Back</a></p>",
        error_banner(Some(message))
    );
    layout("Error", &body)
}
