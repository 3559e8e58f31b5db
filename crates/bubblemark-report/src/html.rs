//! HTML student report generator.
//!
//! Produces a self-contained HTML file with all CSS inlined. Output depends
//! only on the marking, so the same student always renders byte-identically.

use bubblemark_core::manifest::MAX_WRITING_SCORE;
use bubblemark_core::model::{percentage, LearningAreaResult, ScoreTotals, SubjectAnalysis};
use bubblemark_core::pipeline::StudentMarking;

/// Escape a string for safe HTML insertion.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate the HTML report for one student.
pub fn generate_html(marking: &StudentMarking) -> String {
    let analysis = &marking.analysis;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>Student Performance Report: {}</title>\n",
        html_escape(&analysis.student_name)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>Student Performance Report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Name: <strong>{}</strong></p>\n",
        html_escape(&analysis.student_name)
    ));
    html.push_str("</header>\n");

    // Score summary
    html.push_str("<section class=\"scores\">\n");
    html.push_str("<h2>Scores</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Subject</th><th>Score</th><th>Max</th><th>%</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    html.push_str(&score_row("Reading", &analysis.reading_totals));
    html.push_str(&score_row("QR/AR", &analysis.qr_ar_totals));
    let writing = ScoreTotals {
        correct: analysis.writing_score as usize,
        total: MAX_WRITING_SCORE as usize,
        percentage: percentage(analysis.writing_score as usize, MAX_WRITING_SCORE as usize),
    };
    html.push_str(&score_row("Writing", &writing));
    let total_score = analysis.reading_totals.correct + analysis.qr_ar_totals.correct + writing.correct;
    let total_max = analysis.reading_totals.total + analysis.qr_ar_totals.total + writing.total;
    html.push_str(&format!(
        "<tr class=\"total\"><td>Total</td><td>{total_score}</td><td>{total_max}</td><td>{:.1}%</td></tr>\n",
        percentage(total_score, total_max)
    ));
    html.push_str("</tbody></table>\n");

    html.push_str("<table class=\"subjects\">\n");
    html.push_str("<thead><tr><th>Subject</th><th>Correct</th><th>Incorrect</th><th>Unmarked</th><th>Total</th><th>%</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for r in &marking.subject_results {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td></tr>\n",
            html_escape(&r.subject_name),
            r.correct,
            r.incorrect,
            r.unmarked,
            r.total,
            r.percentage
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    for subject in &analysis.per_subject {
        html.push_str(&subject_section(subject));
    }

    html.push_str("</body>\n</html>");
    html
}

fn score_row(label: &str, totals: &ScoreTotals) -> String {
    format!(
        "<tr><td>{label}</td><td>{}</td><td>{}</td><td>{:.1}%</td></tr>\n",
        totals.correct, totals.total, totals.percentage
    )
}

fn subject_section(subject: &SubjectAnalysis) -> String {
    let mut html = String::new();
    html.push_str("<section class=\"subject\">\n");
    html.push_str(&format!(
        "<h2>{} Analysis</h2>\n",
        html_escape(&subject.subject)
    ));

    if subject.area_details.is_empty() {
        html.push_str("<p class=\"meta\">No learning-area mapping available for this subject.</p>\n");
    } else {
        html.push_str(&name_list("Done well", "pass", &subject.strengths));
        html.push_str(&name_list("Needs improvement", "fail", &subject.improvements));
        html.push_str(&area_table(&subject.area_details));
    }

    if !subject.unmapped_questions.is_empty() {
        html.push_str(&format!(
            "<p class=\"unmapped\">Questions not mapped to any learning area: {}</p>\n",
            html_escape(&subject.unmapped_questions.join(", "))
        ));
    }

    html.push_str("</section>\n");
    html
}

fn name_list(title: &str, class: &str, names: &[String]) -> String {
    if names.is_empty() {
        return String::new();
    }
    let mut html = format!("<h3>{title}</h3>\n<ul class=\"{class}\">\n");
    for name in names {
        html.push_str(&format!("<li>{}</li>\n", html_escape(name)));
    }
    html.push_str("</ul>\n");
    html
}

fn area_table(areas: &[LearningAreaResult]) -> String {
    let mut html = String::new();
    html.push_str("<table class=\"areas\">\n");
    html.push_str("<thead><tr><th>Learning Area</th><th>Correct</th><th>%</th><th>Status</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for area in areas {
        let (class, status) = if area.is_strength {
            ("pass", "Done well")
        } else {
            ("fail", "Needs improvement")
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}/{}</td><td>{:.1}%</td><td class=\"{class}\">{status}</td></tr>\n",
            html_escape(&area.area),
            area.correct,
            area.total,
            area.percentage
        ));
    }
    html.push_str("</tbody></table>\n");
    html
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #2c3e50; --accent: #3498db; --border: #e5e7eb; --pass: #dcfce7; --fail: #fdebd0; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --accent: #60a5fa; --border: #374151; --pass: #064e3b; --fail: #7c2d12; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1 { color: var(--accent); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--accent); color: #fff; }
tr.total { font-weight: bold; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
ul.pass, ul.fail { background: none; }
.unmapped { font-size: 0.9rem; color: #6b7280; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_marking;

    #[test]
    fn html_report_contains_required_elements() {
        let html = generate_html(&sample_marking());

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("Ada &lt;Lovelace&gt;"));
        assert!(html.contains("Reading Analysis"));
        assert!(html.contains("<td>Inference</td><td>2/3</td><td>66.7%</td>"));
        assert!(html.contains("<td>Vocabulary</td><td>0/1</td><td>0.0%</td>"));
        assert!(html.contains("Questions not mapped to any learning area: RC5"));
        assert!(html.contains("No learning-area mapping available"));
    }

    #[test]
    fn total_counts_writing_in_score_and_max() {
        let html = generate_html(&sample_marking());
        assert!(html.contains("<tr><td>Writing</td><td>25</td><td>100</td><td>25.0%</td></tr>"));
        // 3 reading + 1 QR + 25 writing out of 5 + 2 + 100
        assert!(html.contains(
            "<tr class=\"total\"><td>Total</td><td>29</td><td>107</td><td>27.1%</td></tr>"
        ));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(
            generate_html(&sample_marking()),
            generate_html(&sample_marking())
        );
    }
}
