//! Query catalog for the syslog security events index

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplunkQuery {
    pub title: &'static str,
    pub description: &'static str,
    pub query: &'static str,
}

pub const QUERIES: [SplunkQuery; 15] = [
    SplunkQuery {
        title: "Critical Security Events & Attacks",
        description: "Find all critical security events, attacks, and exploits",
        query: r#"index=main sourcetype=syslog (severity>=4 OR "CRITICAL" OR "HIGH" OR "ATTACK" OR "EXPLOIT" OR "alert") | stats count by src, dst, s_msg, att_ck | sort -count"#,
    },
    SplunkQuery {
        title: "CVE Exploitation Attempts",
        description: "Detect specific CVE exploitation attempts (EternalBlue, Zyxel, etc.)",
        query: r#"index=main sourcetype=syslog (CVE-* OR "ETERNALBLUE" OR "WannaCry" OR "Unimplemented Trans2") | rex field=_raw "\"src\":\s*{\s*\"ip\":\s*\"(?<src_ip>[^\"]+)\"" | rex field=_raw "\"s_msg\":\s*\"(?<alert_msg>[^\"]+)\"" | table _time, src_ip, alert_msg, CVE* | sort -_time"#,
    },
    SplunkQuery {
        title: "Top Threat Actors",
        description: "Identify top attacking IPs with event counts",
        query: r#"index=main sourcetype=syslog ("ATTACK" OR "SUSPICIOUS" OR s_pr>=3) | rex field=_raw "\"src\":\s*{\s*\"ip\":\s*\"(?<attacker_ip>[^\"]+)\"" | stats count as attack_count by attacker_ip | sort -attack_count | head 20"#,
    },
    SplunkQuery {
        title: "DGA Domain Detection",
        description: "Find Domain Generation Algorithm (DGA) and C2 domains",
        query: r#"index=main sourcetype=syslog ("dga" OR "sophosxl.net" OR cat="dga") | rex field=_raw "\"dst\".*?\"dns\":\s*\"(?<suspicious_domain>[^\"]+)\"" | stats count by suspicious_domain | where count > 5 | sort -count"#,
    },
    SplunkQuery {
        title: "Reconnaissance Activity",
        description: "Detect IP checking and reconnaissance services",
        query: r#"index=main sourcetype=syslog ("ip_checkers" OR "api.ipify.org" OR "ip-api.com" OR "api.bigdatacloud.net") | rex field=_raw "\"src\":\s*{\s*\"ip\":\s*\"(?<recon_ip>[^\"]+)\"" | rex field=_raw "\"dst\".*?\"dns\":\s*\"(?<service>[^\"]+)\"" | stats dc(service) as unique_services, values(service) as services by recon_ip | where unique_services > 2"#,
    },
    SplunkQuery {
        title: "MITRE ATT&CK Techniques",
        description: "Map events to MITRE ATT&CK framework",
        query: r#"index=main sourcetype=syslog att_ck=* | rex field=_raw "\"att_ck\":\s*\[\"(?<technique>[^\"]+)\"\]" | rex field=_raw "\"s_cls\":\s*\"(?<attack_class>[^\"]+)\"" | stats count by technique, attack_class | sort -count"#,
    },
    SplunkQuery {
        title: "SMB Attack Patterns",
        description: "Detect SMB/anonymous share attacks",
        query: r#"index=main sourcetype=syslog ("Anonymous SMB" OR "IPC share" OR "SMB" OR port=445) | rex field=_raw "\"src\":\s*{\s*\"ip\":\s*\"(?<smb_attacker>[^\"]+)\"" | rex field=_raw "\"dst\":\s*{\s*\"ip\":\s*\"(?<target>[^\"]+)\"" | stats count by smb_attacker, target | sort -count"#,
    },
    SplunkQuery {
        title: "Geographic Threat Analysis",
        description: "Analyze threats by country of origin",
        query: r#"index=main sourcetype=syslog | rex field=_raw "\"src\":[^}]+\"country\":\s*\"(?<country>[^\"]+)\"" | rex field=_raw "\"cat\":\s*\"(?<category>[^\"]+)\"" | stats count by country, category | sort -count | head 20"#,
    },
    SplunkQuery {
        title: "Cobalt Strike Detection",
        description: "Detect Cobalt Strike beacons and C2",
        query: r#"index=main sourcetype=syslog ("cobalt_strike" OR "beacon" OR "CS-" OR cat="cobalt_strike") | rex field=_raw "\"src\":\s*{\s*\"ip\":\s*\"(?<c2_server>[^\"]+)\"" | rex field=_raw "\"dst\":\s*{\s*\"ip\":\s*\"(?<victim>[^\"]+)\"" | table _time, c2_server, victim, _raw"#,
    },
    SplunkQuery {
        title: "SSH Brute Force",
        description: "Detect SSH brute force attempts",
        query: r#"index=main sourcetype=syslog ("Paramiko" OR "SSH" OR dst.port=22) | rex field=_raw "\"src\":\s*{\s*\"ip\":\s*\"(?<ssh_attacker>[^\"]+)\"" | stats count as attempts by ssh_attacker | where attempts > 5 | sort -attempts"#,
    },
    SplunkQuery {
        title: "Payload Analysis",
        description: "Extract and analyze attack payloads",
        query: r#"index=main sourcetype=syslog payload=* | rex field=_raw "\"payload\":\s*\"(?<encoded_payload>[^\"]+)\"" | rex field=_raw "\"s_msg\":\s*\"(?<description>[^\"]+)\"" | eval decoded=urldecode(encoded_payload) | table _time, description, decoded | sort -_time"#,
    },
    SplunkQuery {
        title: "Real-time Threat Dashboard",
        description: "Combined threat overview for dashboard",
        query: r#"index=main sourcetype=syslog earliest=-1h | rex field=_raw "\"s_pr\":\s*(?<severity>\d+)" | rex field=_raw "\"cat\":\s*\"(?<category>[^\"]+)\"" | search (severity>=3 OR category IN ("dga", "exploit", "attack")) | timechart span=5m count by category"#,
    },
    SplunkQuery {
        title: "Indonesian Threat Actor (103.145.125.10)",
        description: "Track specific threat actor from Jakarta",
        query: r#"index=main sourcetype=syslog "103.145.125.10" | rex field=_raw "\"type\":\s*\"(?<event_type>[^\"]+)\"" | rex field=_raw "\"s_msg\":\s*\"(?<message>[^\"]+)\"" | table _time, event_type, message | sort _time"#,
    },
    SplunkQuery {
        title: "Suspicious Domain Pattern Analysis",
        description: "Analyze patterns in suspicious domains",
        query: r#"index=main sourcetype=syslog | rex field=_raw "\"dst\".*?\"dns\":\s*\"(?<domain>[^\"]+)\"" | eval is_suspicious=if(match(domain, "(sophosxl\.net|dkitrxmdwoqruvsi\.net|v2kyu1kjr\.com|pc8oeqtzy9\.com)"), 1, 0) | where is_suspicious=1 | stats count by domain | sort -count"#,
    },
    SplunkQuery {
        title: "Security Event Timeline",
        description: "Create timeline of all security events",
        query: r#"index=main sourcetype=syslog (s_pr>=3 OR "ATTACK" OR "CVE-") | bin _time span=1h | stats count by _time | eval severity=case(count>100, "CRITICAL", count>50, "HIGH", count>20, "MEDIUM", 1=1, "LOW")"#,
    },
];

/// Multi-signal overview appended after the numbered catalog
pub const COMBINED_QUERY: &str = r#"index=main sourcetype=syslog earliest=-24h
| eval threat_level=case(
    match(_raw, "CVE-2017-0144"), "CRITICAL - EternalBlue",
    match(_raw, "CVE-2023-28771"), "CRITICAL - Zyxel RCE",
    match(_raw, "cobalt_strike"), "HIGH - C2 Framework",
    match(_raw, "sophosxl\.net"), "HIGH - DGA Domain",
    s_pr>=4, "HIGH - Alert",
    s_pr>=3, "MEDIUM - Warning",
    1=1, "LOW"
)
| rex field=_raw "\"src\":\s*{\s*\"ip\":\s*\"(?<src_ip>[^\"]+)\""
| rex field=_raw "\"s_msg\":\s*\"(?<message>[^\"]+)\""
| stats count by threat_level, src_ip, message
| sort threat_level, -count"#;

pub const ALERT_RECOMMENDATIONS: [(&str, &str); 5] = [
    ("Critical CVE Exploitation", "Alert when CVE-2017-0144 or CVE-2023-28771 detected"),
    ("High Volume Attacker", "Alert when single IP generates >100 events/hour"),
    ("DGA Domain Communication", "Alert on connections to known DGA domains"),
    ("Geographic Anomaly", "Alert on attacks from new countries"),
    ("Cobalt Strike Beacon", "Alert on any Cobalt Strike indicators"),
];
