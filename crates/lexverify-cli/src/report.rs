//! Verdict reports.
//!
//! Rendering reads only the verdict: no graph access and no re-scoring.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::ValueEnum;
use lexverify_core::{CandidateRole, ConfidenceLevel, Finding, InterpretationCandidate, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Markdown,
    Json,
    Html,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

pub fn render(verdict: &Verdict, format: ReportFormat) -> anyhow::Result<String> {
    match format {
        ReportFormat::Markdown => Ok(render_markdown(verdict)),
        ReportFormat::Json => render_json(verdict),
        ReportFormat::Html => Ok(render_html(verdict)),
    }
}

pub fn render_json(verdict: &Verdict) -> anyhow::Result<String> {
    serde_json::to_string_pretty(verdict).context("serialising verdict")
}

/// `verdict-20261019-143000.md`
pub fn report_filename(format: ReportFormat, at: NaiveDateTime) -> String {
    format!("verdict-{}.{}", at.format("%Y%m%d-%H%M%S"), format.extension())
}

/// Write a rendered report into `dir`, creating it if needed.
pub fn write_report(
    dir: &Path,
    format: ReportFormat,
    rendered: &str,
    at: NaiveDateTime,
) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(report_filename(format, at));
    fs::write(&path, rendered).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

// ── Markdown ──

pub fn render_markdown(v: &Verdict) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_markdown(&mut out, v);
    out
}

fn write_markdown(out: &mut String, v: &Verdict) -> std::fmt::Result {
    writeln!(out, "# Verdict: {}", v.confidence)?;
    writeln!(out)?;
    writeln!(out, "- **Subject:** {}", v.claim.subject)?;
    writeln!(out, "- **Obligation:** {}", v.claim.obligation)?;
    if !v.claim.conditions.is_empty() {
        writeln!(out, "- **Conditions:** {}", v.claim.conditions.join("; "))?;
    }
    writeln!(out, "- **Rule set:** {}", v.ruleset_version)?;
    writeln!(out, "- **Confidence level:** {}", v.confidence_level.as_str())?;
    writeln!(out)?;

    writeln!(out, "## Score")?;
    writeln!(out)?;
    writeln!(out, "| Component | Score | Max | % | Status | Data |")?;
    writeln!(out, "|---|---:|---:|---:|---|---|")?;
    for ((name, s), row) in v.scores.entries().into_iter().zip(&v.breakdown) {
        let data = if s.available { "available" } else { "none supplied" };
        writeln!(
            out,
            "| {name} | {} | {} | {} | {} | {data} |",
            s.score,
            s.max,
            row.percent,
            row.status.as_str()
        )?;
    }
    writeln!(out, "| **total** | **{}** | **{}** | | | |", v.total, v.max_total)?;
    writeln!(out)?;

    writeln!(out, "## Recommendation")?;
    writeln!(out)?;
    writeln!(out, "{}", v.recommendation.summary)?;
    writeln!(out)?;
    for (i, step) in v.recommendation.steps.iter().enumerate() {
        writeln!(out, "{}. {step}", i + 1)?;
    }
    writeln!(out)?;

    writeln!(out, "## Findings")?;
    writeln!(out)?;
    if v.findings.is_empty() {
        writeln!(out, "None.")?;
    } else {
        writeln!(out, "| Check | Outcome | Rationale | Citations |")?;
        writeln!(out, "|---|---|---|---|")?;
        for f in &v.findings {
            write_finding_row(out, f)?;
        }
    }
    writeln!(out)?;

    writeln!(out, "## Principles")?;
    writeln!(out)?;
    for p in &v.principles {
        writeln!(out, "- **{}** ({}): {}", p.principle, p.stance.as_str(), p.rationale)?;
    }
    writeln!(out)?;

    writeln!(out, "## Interpretations")?;
    writeln!(out)?;
    let mut alt = 0;
    for c in &v.candidates {
        let heading = match c.role {
            CandidateRole::Primary => "Primary".to_string(),
            CandidateRole::Alternative => {
                alt += 1;
                match &c.proposed_by {
                    Some(by) => format!("Alternative {alt} (proposed by {by})"),
                    None => format!("Alternative {alt}"),
                }
            }
        };
        writeln!(out, "### {heading}")?;
        writeln!(out)?;
        write_candidate(out, c)?;
        writeln!(out)?;
    }

    writeln!(out, "## Ambiguities")?;
    writeln!(out)?;
    if v.ambiguities.is_empty() {
        writeln!(out, "None.")?;
    }
    for a in &v.ambiguities {
        match &a.prevailing {
            Some(winner) => writeln!(out, "- resolved in favour of {winner}: {}", a.description)?,
            None => writeln!(out, "- **unresolved:** {}", a.description)?,
        }
    }
    Ok(())
}

// ── HTML ──

/// Self-contained page: inline style, no scripts, every verdict string escaped.
pub fn render_html(v: &Verdict) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_html(&mut out, v);
    out
}

fn write_html(out: &mut String, v: &Verdict) -> std::fmt::Result {
    let tone = match v.confidence_level {
        ConfidenceLevel::High => "#28a745",
        ConfidenceLevel::Moderate => "#ffc107",
        ConfidenceLevel::Low => "#dc3545",
    };
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>Verdict: {}</title>", esc(&v.confidence))?;
    writeln!(out, "<style>")?;
    writeln!(out, "body {{ font-family: sans-serif; max-width: 60em; margin: 2em auto; color: #333; }}")?;
    writeln!(out, ".score {{ border-left: 6px solid {tone}; padding: 0.5em 1em; background: #f5f5f5; }}")?;
    writeln!(out, "table {{ border-collapse: collapse; width: 100%; }}")?;
    writeln!(out, "th, td {{ border: 1px solid #ddd; padding: 0.3em 0.6em; text-align: left; }}")?;
    writeln!(out, ".satisfied {{ color: #28a745; }} .violated {{ color: #dc3545; }} .indeterminate {{ color: #b8860b; }}")?;
    writeln!(out, "</style>")?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;

    writeln!(out, "<h1>Verdict: {}</h1>", esc(&v.confidence))?;
    writeln!(out, "<div class=\"score\">")?;
    writeln!(out, "<p><strong>{} / {}</strong>, {} confidence</p>", v.total, v.max_total, v.confidence_level.as_str())?;
    writeln!(
        out,
        "<p>{} requires: {}</p>",
        esc(&v.claim.subject),
        esc(&v.claim.obligation)
    )?;
    if !v.claim.conditions.is_empty() {
        writeln!(out, "<p>when: {}</p>", esc(&v.claim.conditions.join("; ")))?;
    }
    writeln!(out, "<p>Rule set {}</p>", esc(&v.ruleset_version))?;
    writeln!(out, "</div>")?;

    writeln!(out, "<h2>Score</h2>")?;
    writeln!(out, "<table>")?;
    writeln!(out, "<tr><th>Component</th><th>Score</th><th>Max</th><th>%</th><th>Status</th><th>Data</th></tr>")?;
    for ((name, s), row) in v.scores.entries().into_iter().zip(&v.breakdown) {
        let data = if s.available { "available" } else { "none supplied" };
        writeln!(
            out,
            "<tr><td>{name}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{data}</td></tr>",
            s.score,
            s.max,
            row.percent,
            row.status.as_str()
        )?;
    }
    writeln!(out, "</table>")?;

    writeln!(out, "<h2>Recommendation</h2>")?;
    writeln!(out, "<p>{}</p>", esc(&v.recommendation.summary))?;
    writeln!(out, "<ol>")?;
    for step in &v.recommendation.steps {
        writeln!(out, "<li>{}</li>", esc(step))?;
    }
    writeln!(out, "</ol>")?;

    writeln!(out, "<h2>Findings</h2>")?;
    if v.findings.is_empty() {
        writeln!(out, "<p>None.</p>")?;
    } else {
        writeln!(out, "<table>")?;
        writeln!(out, "<tr><th>Check</th><th>Outcome</th><th>Rationale</th><th>Citations</th></tr>")?;
        for f in &v.findings {
            let outcome = f.outcome.as_str();
            writeln!(
                out,
                "<tr><td>{}</td><td class=\"{outcome}\">{outcome}</td><td>{}</td><td>{}</td></tr>",
                esc(&f.check),
                esc(&f.rationale),
                esc(&f.citations.join("; "))
            )?;
        }
        writeln!(out, "</table>")?;
    }

    writeln!(out, "<h2>Principles</h2>")?;
    writeln!(out, "<ul>")?;
    for p in &v.principles {
        writeln!(
            out,
            "<li><strong>{}</strong> ({}): {}</li>",
            esc(&p.principle),
            p.stance.as_str(),
            esc(&p.rationale)
        )?;
    }
    writeln!(out, "</ul>")?;

    writeln!(out, "<h2>Interpretations</h2>")?;
    for c in &v.candidates {
        let heading = match (&c.role, &c.proposed_by) {
            (CandidateRole::Primary, _) => "Primary".to_string(),
            (CandidateRole::Alternative, Some(by)) => format!("Alternative (proposed by {by})"),
            (CandidateRole::Alternative, None) => "Alternative".to_string(),
        };
        writeln!(out, "<h3>{}</h3>", esc(&heading))?;
        writeln!(
            out,
            "<p>{} requires: {}</p>",
            esc(&c.claim.subject),
            esc(&c.claim.obligation)
        )?;
        writeln!(out, "<p><em>{}</em></p>", esc(&c.rationale))?;
    }

    writeln!(out, "<h2>Ambiguities</h2>")?;
    if v.ambiguities.is_empty() {
        writeln!(out, "<p>None.</p>")?;
    } else {
        writeln!(out, "<ul>")?;
        for a in &v.ambiguities {
            match &a.prevailing {
                Some(winner) => writeln!(
                    out,
                    "<li>resolved in favour of {}: {}</li>",
                    esc(winner),
                    esc(&a.description)
                )?,
                None => writeln!(out, "<li><strong>unresolved:</strong> {}</li>", esc(&a.description))?,
            }
        }
        writeln!(out, "</ul>")?;
    }

    writeln!(out, "</body>")?;
    writeln!(out, "</html>")
}

fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn write_finding_row(out: &mut String, f: &Finding) -> std::fmt::Result {
    writeln!(
        out,
        "| {} | {} | {} | {} |",
        f.check,
        f.outcome.as_str(),
        cell(&f.rationale),
        cell(&f.citations.join("; "))
    )
}

fn write_candidate(out: &mut String, c: &InterpretationCandidate) -> std::fmt::Result {
    writeln!(out, "{} requires: {}", c.claim.subject, c.claim.obligation)?;
    if !c.claim.conditions.is_empty() {
        writeln!(out, "when: {}", c.claim.conditions.join("; "))?;
    }
    writeln!(out)?;
    writeln!(out, "_{}_", c.rationale)?;
    writeln!(out)?;
    writeln!(out, "- supporting principles: {}", list(&c.supporting_principles))?;
    writeln!(out, "- contradicting principles: {}", list(&c.contradicting_principles))?;
    writeln!(out, "- supporting findings: {}", list(&c.supporting_findings))?;
    writeln!(out, "- conflicting findings: {}", list(&c.conflicting_findings))
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Keep table cells on one line and free of column separators.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lexverify_core::RuleSet;
    use lexverify_engine::Engine;
    use lexverify_store::JsonStore;

    fn data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("data")
    }

    fn sample_verdict() -> Verdict {
        let dir = data_dir();
        let provisions = JsonStore::open(&dir.join("provisions"))
            .unwrap()
            .load_provisions()
            .unwrap();
        let claim = JsonStore::load_claim(&dir.join("claims").join("first-dividend.json")).unwrap();
        Engine::new(RuleSet::default())
            .unwrap()
            .evaluate(&provisions, &claim, None)
            .unwrap()
    }

    #[test]
    fn markdown_shows_every_sub_score_and_missing_data() {
        let md = render_markdown(&sample_verdict());
        for name in ["| text |", "| logic |", "| timeline |", "| precedent | 0 | 10 | 0 | weak | none supplied |"] {
            assert!(md.contains(name), "missing {name}");
        }
        assert!(md.contains("**total**"));
    }

    #[test]
    fn markdown_lists_primary_before_alternatives() {
        let md = render_markdown(&sample_verdict());
        let primary = md.find("### Primary").unwrap();
        let alternative = md.find("### Alternative 1").unwrap();
        assert!(primary < alternative);
        assert!(md.contains("**unresolved:**"));
    }

    #[test]
    fn json_report_round_trips() {
        let verdict = sample_verdict();
        let json = render_json(&verdict).unwrap();
        let back: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, verdict);
    }

    #[test]
    fn markdown_shows_status_and_recommendation() {
        let v = sample_verdict();
        let md = render_markdown(&v);
        assert!(md.contains(&format!("- **Confidence level:** {}", v.confidence_level.as_str())));
        assert!(md.contains("| precedent | 0 | 10 | 0 | weak | none supplied |"));
        assert!(md.contains("## Recommendation"));
        assert!(md.contains(&format!("1. {}", v.recommendation.steps[0])));
    }

    #[test]
    fn html_report_is_escaped_and_complete() {
        let mut v = sample_verdict();
        v.claim.obligation = "pay <all> creditors & \"others\"".into();
        let html = render_html(&v);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains("pay &lt;all&gt; creditors &amp; &quot;others&quot;"));
        assert!(!html.contains("<all>"));
        for section in ["<h2>Score</h2>", "<h2>Recommendation</h2>", "<h2>Findings</h2>", "<h2>Ambiguities</h2>"] {
            assert!(html.contains(section), "missing {section}");
        }
        assert!(html.matches("<li>").count() >= v.recommendation.steps.len());
    }

    #[test]
    fn html_format_uses_html_extension() {
        let at = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(report_filename(ReportFormat::Html, at), "verdict-20261019-090500.html");
        assert!(render(&sample_verdict(), ReportFormat::Html).unwrap().contains("<table>"));
    }

    #[test]
    fn table_cells_escape_separators() {
        assert_eq!(cell("a | b\nc"), "a \\| b c");
    }

    #[test]
    fn report_written_with_timestamped_name() {
        let at = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(report_filename(ReportFormat::Markdown, at), "verdict-20261019-143000.md");

        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("reports");
        let path = write_report(&out, ReportFormat::Json, "{}", at).unwrap();
        assert_eq!(path, out.join("verdict-20261019-143000.json"));
        assert_eq!(fs::read_to_string(path).unwrap(), "{}");
    }
}
