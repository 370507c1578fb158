//! 输出层：接收 Report，渲染 text 或 json

use crate::summarize::diagnostics::DiagnosticGroup;
use crate::summarize::record::CheckRecord;
use crate::summarize::report::Report;
use crate::utils::{CheckState, Result, SummarizerError};

pub fn display(report: &Report, format: &str, diagnostics: Option<&[DiagnosticGroup]>) -> Result<()> {
    match format {
        "json" => display_json(report, diagnostics),
        "text" => {
            print!("{}", render_text(report, diagnostics));
            Ok(())
        }
        other => Err(SummarizerError::Configuration(format!("unknown format: {}", other))),
    }
}

// ── JSON ────────────────────────────────────────────────────────────────────

fn display_json(report: &Report, diagnostics: Option<&[DiagnosticGroup]>) -> Result<()> {
    #[derive(serde::Serialize)]
    struct WithDiagnostics<'a> {
        report: &'a Report,
        diagnostics: &'a [DiagnosticGroup],
    }

    let json = match diagnostics {
        Some(tree) => serde_json::to_string_pretty(&WithDiagnostics { report, diagnostics: tree }),
        None => serde_json::to_string_pretty(report),
    }
    .map_err(|e| SummarizerError::Encode(format!("JSON serialize: {}", e)))?;
    println!("{}", json);
    Ok(())
}

// ── Text ────────────────────────────────────────────────────────────────────

pub fn render_text(report: &Report, diagnostics: Option<&[DiagnosticGroup]>) -> String {
    let mut out = String::new();

    section(&mut out, "REPORT");
    line(&mut out, format!("  Benchmark    : {}", report.version));
    line(&mut out, format!("  Schema       : v{}", report.schema_version));

    let s = &report.summary;
    line(&mut out, format!("  Checks       : {} total", s.total));
    line(&mut out, format!(
        "  Results      : {} pass  {} fail  {} warn  {} skip  {} n/a",
        s.pass, s.fail, s.warn, s.skip, s.not_applicable
    ));

    // ── Nodes ─────────────────────────────────────────────────────────────
    section(&mut out, "NODES");
    if report.nodes.is_empty() {
        line(&mut out, "  (no hosts reported)".to_string());
    }
    for (role, hosts) in report.nodes.iter() {
        let names: Vec<&str> = hosts.iter().map(String::as_str).collect();
        line(&mut out, format!("  {:<13}: {} ({})", role.to_string(), names.join(", "), hosts.len()));
    }

    // ── Checks ────────────────────────────────────────────────────────────
    section(&mut out, &format!("CHECKS ({})", report.check_count()));
    for g in &report.groups {
        line(&mut out, format!("  [{}] {}", g.id, g.description));
        for c in &g.checks {
            render_check(&mut out, c);
        }
    }

    // ── Diagnostics ───────────────────────────────────────────────────────
    if let Some(tree) = diagnostics {
        section(&mut out, "ACTUAL VALUES");
        for c in tree.iter().flat_map(|g| &g.checks) {
            if c.actual_values.is_empty() {
                continue;
            }
            line(&mut out, format!("  {} {}", c.id, c.description));
            for (host, value) in &c.actual_values {
                let value = if value.is_empty() { "(empty)" } else { value.as_str() };
                line(&mut out, format!("      {:<20} {}", host, value));
            }
        }
    }

    out
}

fn render_check(out: &mut String, c: &CheckRecord) {
    let icon = match c.state {
        Some(CheckState::Pass)          => "✓",
        Some(CheckState::Fail)          => "✗",
        Some(CheckState::Mixed)         => "±",
        Some(CheckState::Warn)          => "⚠",
        Some(CheckState::Skip)          => "-",
        Some(CheckState::NotApplicable) => "·",
        None                            => "?",
    };
    let state = c.state.map(|s| s.to_string()).unwrap_or_else(|| "unset".to_string());
    line(out, format!("    {} {:<10} [{}] {}", icon, c.id, state, c.description));
    if !c.deviating_nodes.is_empty() {
        line(out, format!("        deviating : {}", c.deviating_nodes.join(", ")));
    }
}

// ── 格式化工具 ───────────────────────────────────────────────────────────────

fn section(out: &mut String, title: &str) {
    out.push('\n');
    line(out, "─".repeat(60));
    line(out, format!("  {}", title));
    line(out, "─".repeat(60));
}

fn line(out: &mut String, text: String) {
    out.push_str(&text);
    out.push('\n');
}
