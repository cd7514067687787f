//! Parser for the line card trap statistics console table.
//!
//! The output of `show cda trapstats` looks like:
//!
//! ```text
//! SENT: Ukern command: show cda trapstats
//!
//! DEV TRAPCODE NAME                        COUNT      RATE
//!   0       12 arp-reply                     100         0
//!   0       13 ttl-exceeded                   50         3
//! ```
//!
//! Everything before the `DEV` header is preamble. Inside the table every
//! non-blank line must match the five-column grammar; anything else fails
//! the whole parse so that a garbled table is never read as "no drops".

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{VerifyError, VerifyResult};

/// Token that starts the table header line.
pub const TABLE_HEADER_TOKEN: &str = "DEV";

/// Console command that prints trap statistics for a line card.
pub const TRAP_STATS_COMMAND: &str = "show cda trapstats";

/// DEV, TRAPCODE, NAME, COUNT, RATE.
static TRAP_STATS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s+(\d+)\s+([\w.\s-]+)\s+(\d+)\s+(\d+)").expect("Invalid regex pattern")
});

/// One row of the trap statistics table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapStatRecord {
    pub dev: u32,
    pub trap_code: u32,
    pub name: String,
    /// Cumulative count since the counters were cleared.
    pub count: u64,
    /// Instantaneous rate.
    pub rate: u64,
}

/// Builds the PFE command that prints trap statistics for `linecard`.
pub fn trap_stats_command(linecard: &str) -> String {
    format!(
        "request pfe execute target {} command \"{}\" | no-more",
        linecard.to_lowercase(),
        TRAP_STATS_COMMAND
    )
}

/// Parses the console output of [`trap_stats_command`].
///
/// Returns an empty list when the header never appears.
pub fn parse_trap_stats(output: &str) -> VerifyResult<Vec<TrapStatRecord>> {
    let mut stats = Vec::new();
    let mut in_table = false;

    for line in output.lines() {
        if line.starts_with(TABLE_HEADER_TOKEN) {
            in_table = true;
            continue;
        }
        if !in_table {
            continue;
        }

        let Some(caps) = TRAP_STATS_RE.captures(line) else {
            if line.trim().is_empty() {
                continue;
            }
            return Err(VerifyError::MalformedLine {
                line: line.to_string(),
            });
        };

        let field = |idx: usize| caps.get(idx).map_or("", |m| m.as_str().trim());
        stats.push(TrapStatRecord {
            dev: parse_number("DEV", field(1), line)?,
            trap_code: parse_number("TRAPCODE", field(2), line)?,
            name: field(3).to_string(),
            count: parse_number("COUNT", field(4), line)?,
            rate: parse_number("RATE", field(5), line)?,
        });
    }

    Ok(stats)
}

fn parse_number<T>(field: &'static str, value: &str, line: &str) -> VerifyResult<T>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    value.parse().map_err(|source| VerifyError::InvalidNumber {
        field,
        line: line.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "DEV TRAPCODE NAME COUNT RATE\n  0    12   arp-reply   100   0\n  0    13   ttl-exceeded 50   3\n";

    fn record(dev: u32, trap_code: u32, name: &str, count: u64, rate: u64) -> TrapStatRecord {
        TrapStatRecord {
            dev,
            trap_code,
            name: name.to_string(),
            count,
            rate,
        }
    }

    #[test]
    fn test_parse_sample_table() {
        let stats = parse_trap_stats(SAMPLE).unwrap();
        assert_eq!(
            stats,
            vec![
                record(0, 12, "arp-reply", 100, 0),
                record(0, 13, "ttl-exceeded", 50, 3),
            ]
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(
            parse_trap_stats(SAMPLE).unwrap(),
            parse_trap_stats(SAMPLE).unwrap()
        );
    }

    #[test]
    fn test_no_header_is_empty() {
        assert!(parse_trap_stats("").unwrap().is_empty());
        assert!(parse_trap_stats("error: target not online\n").unwrap().is_empty());
        // Lines that look like data are ignored before the header.
        assert!(parse_trap_stats("  0  12  arp  100  0\n").unwrap().is_empty());
    }

    #[test]
    fn test_preamble_ignored() {
        let output = "SENT: Ukern command: show cda trapstats\n  1 2 junk 3 4\n\nDEV TRAPCODE NAME COUNT RATE\n  1   7 ipv4.options   9   0\n";
        let stats = parse_trap_stats(output).unwrap();
        assert_eq!(stats, vec![record(1, 7, "ipv4.options", 9, 0)]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let output = "DEV TRAPCODE NAME COUNT RATE\n\n   \n  0  1  a  2  0\n\t\n";
        assert_eq!(parse_trap_stats(output).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_line_reports_line() {
        let output = "DEV TRAPCODE NAME COUNT RATE\n  0  1  a  2  0\n  ---- truncated ----\n";
        match parse_trap_stats(output) {
            Err(VerifyError::MalformedLine { line }) => {
                assert_eq!(line, "  ---- truncated ----");
            }
            other => panic!("Expected MalformedLine, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_overflow_is_error() {
        let output = "DEV TRAPCODE NAME COUNT RATE\n  0  1  a  2  99999999999999999999999\n";
        match parse_trap_stats(output) {
            Err(VerifyError::InvalidNumber { field, .. }) => assert_eq!(field, "RATE"),
            other => panic!("Expected InvalidNumber, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_word_name_and_duplicates() {
        let output = "DEV TRAPCODE NAME COUNT RATE\n  0  5  l2 mtu exceeded  10  0\n  0  5  l2 mtu exceeded  11  0\n";
        let stats = parse_trap_stats(output).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "l2 mtu exceeded");
        assert_eq!(stats[1].count, 11);
    }

    #[test]
    fn test_repeated_header_is_skipped() {
        let output = "DEV TRAPCODE NAME COUNT RATE\n  0  1  a  2  0\nDEV TRAPCODE NAME COUNT RATE\n  1  1  a  2  0\n";
        let stats = parse_trap_stats(output).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].dev, 1);
    }

    #[test]
    fn test_trap_stats_command() {
        assert_eq!(
            trap_stats_command("FPC0"),
            "request pfe execute target fpc0 command \"show cda trapstats\" | no-more"
        );
    }
}
