//! Honeypot Filter
//!
//! Drops events whose source or destination address ends in one of the
//! honeypot host suffixes. Filters are inserted after field extraction and
//! before the first command that reshapes results (stats, table, ...).

/// Last octets of the honeypot hosts
pub const HONEYPOT_SUFFIXES: [u16; 22] = [
    102, 88, 96, 86, 91, 98, 101, 10, 108, 6, 77, 78, 79, 80, 83, 84, 87, 89, 93, 97, 94, 95,
];

/// Commands after which per-event address fields are gone
const RESHAPING_COMMANDS: [&str; 7] = ["stats", "chart", "timechart", "table", "fields", "top", "rare"];

const SRC_EXTRACTION: &str = r#"rex field=_raw "\"src\":\s*{\s*\"ip\":\s*\"(?<src_ip>[^\"]+)\"""#;
const DST_EXTRACTION: &str = r#"rex field=_raw "\"dst\":\s*{\s*\"ip\":\s*\"(?<dst_ip>[^\"]+)\"""#;

/// Regex matching an address whose last octet is a honeypot suffix
pub fn honeypot_pattern() -> String {
    let alternatives: Vec<String> = HONEYPOT_SUFFIXES.iter().map(|s| s.to_string()).collect();
    format!(r"\.({})$", alternatives.join("|"))
}

/// `| regex <field>!="<pattern>"` clause body for one field
pub fn field_filter(field: &str) -> String {
    format!(r#"regex {}!="{}""#, field, honeypot_pattern())
}

/// Add src/dst honeypot filtering to a query.
///
/// Missing `src_ip`/`dst_ip` extractions are added first.
pub fn add_honeypot_filter(query: &str) -> String {
    let mut segments = split_pipeline(query);

    let mut additions = Vec::new();
    if !query.contains("(?<src_ip>") {
        additions.push(SRC_EXTRACTION.to_string());
    }
    if !query.contains("(?<dst_ip>") {
        additions.push(DST_EXTRACTION.to_string());
    }
    additions.push(field_filter("src_ip"));
    additions.push(field_filter("dst_ip"));

    let insert_at = segments
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, seg)| {
            let command = seg.split_whitespace().next().unwrap_or("");
            RESHAPING_COMMANDS.contains(&command)
        })
        .map(|(i, _)| i)
        .unwrap_or(segments.len());

    for (offset, addition) in additions.into_iter().enumerate() {
        segments.insert(insert_at + offset, addition);
    }

    segments.join("\n| ")
}

/// Query labelling each destination as honeypot or not, to check the filter
pub fn verification_query() -> String {
    format!(
        "index=main sourcetype=syslog\n| {}\n| eval is_honeypot=if(match(dst_ip, \"{}\"), \"YES\", \"NO\")\n| stats count by is_honeypot",
        DST_EXTRACTION,
        honeypot_pattern()
    )
}

/// Split on `|` outside double quotes, trimming each segment
fn split_pipeline(query: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in query.chars() {
        match ch {
            '\\' if !escaped => {
                escaped = true;
                current.push(ch);
                continue;
            }
            '"' if !escaped => in_quotes = !in_quotes,
            '|' if !in_quotes => {
                segments.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        escaped = false;
        current.push(ch);
    }
    segments.push(current.trim().to_string());

    segments.retain(|s| !s.is_empty());
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_pattern_lists_every_suffix() {
        let pattern = honeypot_pattern();
        assert!(pattern.starts_with(r"\.(102|88|"));
        assert!(pattern.ends_with("|94|95)$"));
    }

    #[test]
    fn test_pattern_matches_last_octet_only() {
        let re = Regex::new(&honeypot_pattern()).unwrap();
        let is_honeypot = |ip: &str| re.is_match(ip);

        assert!(is_honeypot("10.213.10.102"));
        assert!(is_honeypot("192.168.1.6"));
        assert!(!is_honeypot("192.168.1.60"));
        assert!(!is_honeypot("10.88.1.1"));
        assert!(!is_honeypot("192.168.1.106"));
    }

    #[test]
    fn test_adds_extraction_when_absent() {
        let filtered = add_honeypot_filter(r#"index=main sourcetype=syslog "ATTACK""#);
        let lines: Vec<&str> = filtered.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], r#"index=main sourcetype=syslog "ATTACK""#);
        assert!(lines[1].contains("(?<src_ip>"));
        assert!(lines[2].contains("(?<dst_ip>"));
        assert!(lines[3].starts_with("| regex src_ip!="));
        assert!(lines[4].starts_with("| regex dst_ip!="));
    }

    #[test]
    fn test_existing_extraction_not_duplicated() {
        let query = r#"index=main CVE-* | rex field=_raw "\"src\":\s*{\s*\"ip\":\s*\"(?<src_ip>[^\"]+)\"" | table _time, src_ip"#;
        let filtered = add_honeypot_filter(query);

        assert_eq!(filtered.matches("(?<src_ip>").count(), 1);
        assert_eq!(filtered.matches("(?<dst_ip>").count(), 1);
    }

    #[test]
    fn test_filter_goes_before_stats() {
        let query = r#"index=main | rex field=_raw "x(?<src_ip>a|b)" | stats count by src_ip | sort -count"#;
        let filtered = add_honeypot_filter(query);
        let lines: Vec<&str> = filtered.lines().collect();

        let regex_pos = lines.iter().position(|l| l.contains("regex dst_ip")).unwrap();
        let stats_pos = lines.iter().position(|l| l.contains("stats count")).unwrap();
        assert!(regex_pos < stats_pos);
        // Pipe inside the quoted rex stayed intact
        assert!(lines[1].contains("(?<src_ip>a|b)"));
    }

    #[test]
    fn test_verification_query_uses_pattern() {
        let q = verification_query();
        assert!(q.contains(&honeypot_pattern()));
        assert!(q.ends_with("stats count by is_honeypot"));
    }
}
