//! Splunk Query Generator
//!
//! Renders the query catalog as a markdown report. With the honeypot filter
//! enabled every query drops events to or from the honeypot hosts.

pub mod honeypot;
pub mod queries;

pub use honeypot::{add_honeypot_filter, honeypot_pattern, verification_query};
pub use queries::{ALERT_RECOMMENDATIONS, COMBINED_QUERY, QUERIES};

use std::fmt::Write;

use chrono::{DateTime, Local};

/// Build the markdown report for the full catalog
pub fn render_report(generated_at: DateTime<Local>, honeypot_filter: bool) -> String {
    let mut out = String::new();
    let filtered = |query: &str| {
        if honeypot_filter {
            add_honeypot_filter(query)
        } else {
            query.to_string()
        }
    };

    let _ = writeln!(out, "# Splunk Security Analysis Queries");
    let _ = writeln!(out, "Generated: {}\n", generated_at.format("%Y-%m-%d %H:%M:%S"));

    out.push_str("## Overview\n");
    out.push_str("Queries for extracting security insights from syslog events indexed in Splunk.\n");
    if honeypot_filter {
        let _ = writeln!(
            out,
            "Events to or from honeypot hosts are excluded (`{}`).",
            honeypot_pattern()
        );
    }
    out.push('\n');

    out.push_str("## How to Use\n");
    out.push_str("1. Open the Splunk search app\n");
    out.push_str("2. Copy and paste each query into the search bar\n");
    out.push_str("3. Adjust time range as needed (default: last 24 hours)\n");
    out.push_str("4. Save useful queries as reports or alerts\n\n---\n\n");

    for (i, q) in QUERIES.iter().enumerate() {
        let _ = writeln!(out, "## {}. {}", i + 1, q.title);
        let _ = writeln!(out, "**Purpose**: {}\n", q.description);
        let _ = writeln!(out, "```spl\n{}\n```\n", filtered(q.query));
    }

    out.push_str("## Bonus: Combined Security Analysis\n\n");
    out.push_str("**Purpose**: Comprehensive security overview combining multiple detection methods\n\n");
    let _ = writeln!(out, "```spl\n{}\n```\n", filtered(COMBINED_QUERY));

    if honeypot_filter {
        out.push_str("## Verify Honeypot Filter\n\n");
        out.push_str("**Purpose**: Count events by whether the destination is a honeypot host\n\n");
        let _ = writeln!(out, "```spl\n{}\n```\n", verification_query());
    }

    out.push_str("## Alert Recommendations\n\n");
    out.push_str("Based on the analysis patterns, consider creating these alerts:\n\n");
    for (i, (name, rule)) in ALERT_RECOMMENDATIONS.iter().enumerate() {
        let _ = writeln!(out, "{}. **{}**: {}", i + 1, name, rule);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_report_lists_every_query_in_order() {
        let report = render_report(fixed_time(), false);

        assert!(report.starts_with("# Splunk Security Analysis Queries\nGenerated: 2024-03-01 12:30:00"));
        let first = report.find("## 1. Critical Security Events & Attacks").unwrap();
        let last = report.find("## 15. Security Event Timeline").unwrap();
        assert!(first < last);
        assert_eq!(report.matches("```spl").count(), QUERIES.len() + 1);
        assert!(report.contains("## Bonus: Combined Security Analysis"));
        assert!(!report.contains("regex src_ip!="));
    }

    #[test]
    fn test_report_with_honeypot_filter() {
        let report = render_report(fixed_time(), true);

        assert_eq!(report.matches("regex src_ip!=").count(), QUERIES.len() + 1);
        assert!(report.contains("## Verify Honeypot Filter"));
        assert!(report.contains(&honeypot_pattern()));
    }

    #[test]
    fn test_catalog_queries_target_syslog_index() {
        for q in QUERIES.iter() {
            assert!(q.query.starts_with("index=main sourcetype=syslog"), "{}", q.title);
            assert!(!q.description.is_empty());
        }
    }

    #[test]
    fn test_filtered_stats_query_keeps_stats_last() {
        let filtered = add_honeypot_filter(QUERIES[2].query);
        let stats = filtered.find("| stats count as attack_count").unwrap();
        let regex = filtered.find("| regex dst_ip!=").unwrap();
        assert!(regex < stats);
        assert!(filtered.trim_end().ends_with("| head 20"));
    }
}
