//! Minijinja rendering of workflow reports.
//!
//! Subject and body are chosen by verdict. Body templates are named `*.html`
//! so minijinja auto-escapes rule output (issue texts come straight from
//! external commands). A fresh [`minijinja::Environment`] is created per
//! render call.

use caseflow_core::{Verdict, WorkflowResult};
use minijinja::Environment;
use serde::Serialize;

use crate::traits::{Notification, NotifyError};

const SUBJECT: &str = "\
{%- if result.verdict == 'PERFECT' %}{{ title }}: no manual checking required
{%- elif result.verdict == 'GOOD' %}{{ title }}: working well, minor attention
{%- elif result.verdict == 'ISSUES_FIXED' %}{{ title }}: issues auto-fixed, quick review
{%- else %}{{ title }}: CRITICAL, manual intervention required
{%- endif %}";

const PERFECT_BODY: &str = r#"<h2>Perfect run</h2>
<p><strong>{{ title }}</strong> completed successfully in {{ result.duration | seconds }} seconds.</p>
<h3>Rule status</h3>
<p>All rules enforced. Ready to deploy.</p>
"#;

const GOOD_BODY: &str = r#"<h2>Working well</h2>
<p><strong>{{ title }}</strong> completed in {{ result.duration | seconds }} seconds with minor issues.</p>
{%- if result.issues %}
<ul>
{%- for issue in result.issues %}
  <li>{{ issue }}</li>
{%- endfor %}
</ul>
{%- endif %}
<p>No immediate action needed.</p>
"#;

const ISSUES_FIXED_BODY: &str = r#"<h2>Issues auto-fixed</h2>
<p><strong>{{ title }}</strong> found issues and fixed what it could in {{ result.duration | seconds }} seconds.</p>
<h3>Remaining issues</h3>
<ul>
{%- for issue in result.issues %}
  <li>{{ issue }}</li>
{%- endfor %}
</ul>
<p>A short review is recommended.</p>
"#;

const CRITICAL_BODY: &str = r#"<h2>CRITICAL: manual intervention required</h2>
<p><strong>{{ title }}</strong> encountered critical issues in {{ result.duration | seconds }} seconds.</p>
<h3>Issues found</h3>
<ul>
{%- for issue in result.issues %}
  <li>{{ issue }}</li>
{%- endfor %}
</ul>
<h3>Next steps</h3>
<ol>
  <li>Check server status</li>
  <li>Review system logs</li>
  <li>Re-run the workflow once fixed</li>
</ol>
"#;

const SUMMARY: &str = "\
[{{ result.verdict }}] {{ title }} ({{ workflow }}) finished in {{ result.duration | seconds }}s
{%- for issue in result.issues %}
- {{ issue }}
{%- endfor %}";

/// Data available to report templates.
#[derive(Debug, Clone, Serialize)]
pub struct ReportContext {
    /// Result-store key of the workflow (`rule1`, `comprehensive`, ...).
    pub workflow: String,
    /// Display title of the rule.
    pub title: String,
    pub result: WorkflowResult,
}

impl ReportContext {
    pub fn new(workflow: &str, title: &str, result: &WorkflowResult) -> Self {
        Self {
            workflow: workflow.to_string(),
            title: title.to_string(),
            result: result.clone(),
        }
    }

    fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "workflowType": self.workflow,
            "title": self.title,
            "result": self.result,
        })
    }
}

/// Renders [`Notification`]s from workflow results.
#[derive(Debug, Default)]
pub struct ReportRenderer {
    _private: (),
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_env() -> Environment<'static> {
        let mut env = Environment::new();
        env.add_filter("seconds", seconds_filter);
        env
    }

    pub fn render(&self, ctx: &ReportContext) -> Result<Notification, NotifyError> {
        let env = Self::build_env();
        let (body_name, body_source) = body_template(ctx.result.verdict);

        Ok(Notification {
            subject: render_named(&env, "subject.txt", SUBJECT, ctx)?.trim().to_string(),
            html: render_named(&env, body_name, body_source, ctx)?,
            text: render_named(&env, "summary.txt", SUMMARY, ctx)?,
            payload: ctx.payload(),
        })
    }
}

fn body_template(verdict: Verdict) -> (&'static str, &'static str) {
    match verdict {
        Verdict::Perfect => ("perfect.html", PERFECT_BODY),
        Verdict::Good => ("good.html", GOOD_BODY),
        Verdict::IssuesFixed => ("issues_fixed.html", ISSUES_FIXED_BODY),
        Verdict::Critical => ("critical.html", CRITICAL_BODY),
    }
}

fn render_named(
    env: &Environment<'static>,
    name: &'static str,
    source: &'static str,
    ctx: &ReportContext,
) -> Result<String, NotifyError> {
    env.template_from_named_str(name, source)
        .and_then(|tmpl| tmpl.render(ctx))
        .map_err(|e| NotifyError::Template(e.to_string()))
}

/// Milliseconds to whole seconds, rounded.
fn seconds_filter(ms: u64) -> u64 {
    (ms + 500) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_core::RuleOutcome;
    use std::time::Duration;

    fn result(verdict_inputs: (bool, bool, u32), issues: &[&str], ms: u64) -> WorkflowResult {
        let (enforced, maximal, fixes) = verdict_inputs;
        WorkflowResult::from_outcome(
            RuleOutcome {
                success: enforced,
                enforced,
                maximal,
                issues: issues.iter().map(|s| s.to_string()).collect(),
                fixes_applied: fixes,
            },
            Duration::from_millis(ms),
        )
    }

    #[test]
    fn perfect_subject_and_body() {
        let r = result((true, true, 0), &[], 1500);
        let n = ReportRenderer::new()
            .render(&ReportContext::new("rule1", "UI Functionality Test", &r))
            .unwrap();
        assert_eq!(n.subject, "UI Functionality Test: no manual checking required");
        assert!(n.html.contains("in 2 seconds"));
        assert!(n.html.contains("All rules enforced"));
    }

    #[test]
    fn critical_body_lists_escaped_issues() {
        let r = WorkflowResult::failed("<script>alert(1)</script>", Duration::from_millis(300));
        let n = ReportRenderer::new()
            .render(&ReportContext::new("rule4", "Auto-Fix Until Perfect", &r))
            .unwrap();
        assert!(n.subject.contains("CRITICAL"));
        assert!(n.html.contains("&lt;script&gt;"));
        assert!(!n.html.contains("<script>"));
    }

    #[test]
    fn issues_fixed_subject() {
        let r = result((false, false, 2), &["layout shift"], 61_000);
        let n = ReportRenderer::new()
            .render(&ReportContext::new("rule3", "Cache Cleanup & Server Health", &r))
            .unwrap();
        assert_eq!(
            n.subject,
            "Cache Cleanup & Server Health: issues auto-fixed, quick review"
        );
        assert!(n.html.contains("in 61 seconds"));
        assert!(n.html.contains("<li>layout shift</li>"));
    }

    #[test]
    fn text_summary_is_not_escaped() {
        let r = result((true, false, 0), &["a < b"], 999);
        let n = ReportRenderer::new()
            .render(&ReportContext::new("ruleX", "Architecture Verification", &r))
            .unwrap();
        assert_eq!(
            n.text,
            "[GOOD] Architecture Verification (ruleX) finished in 1s\n- a < b"
        );
    }

    #[test]
    fn payload_carries_result() {
        let r = result((true, true, 0), &[], 10);
        let n = ReportRenderer::new()
            .render(&ReportContext::new("rule2", "Triple AI Verification", &r))
            .unwrap();
        assert_eq!(n.payload["workflowType"], "rule2");
        assert_eq!(n.payload["result"]["verdict"], "PERFECT");
        assert_eq!(n.payload["result"]["allRulesEnforced"], true);
    }

    #[test]
    fn seconds_rounds_half_up() {
        assert_eq!(seconds_filter(0), 0);
        assert_eq!(seconds_filter(499), 0);
        assert_eq!(seconds_filter(500), 1);
        assert_eq!(seconds_filter(2_400), 2);
    }
}
