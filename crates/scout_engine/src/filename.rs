use chrono::NaiveDateTime;

const MAX_KEYWORD_CHARS: usize = 80;

/// Filesystem-safe, deterministic output name:
/// `tweets_{sanitized_keyword}_{YYYYmmdd_HHMMSS}.csv`.
pub fn output_filename(keyword: &str, started_at: NaiveDateTime) -> String {
    let keyword = sanitize_keyword(keyword);
    let stamp = started_at.format("%Y%m%d_%H%M%S");
    format!("tweets_{keyword}_{stamp}.csv")
}

fn sanitize_keyword(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.trim().chars() {
        let c = if is_forbidden(c) || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }
    let trimmed: String = compacted
        .trim_matches(&['_', '.'][..])
        .chars()
        .take(MAX_KEYWORD_CHARS)
        .collect();
    if trimmed.is_empty() {
        "search".to_string()
    } else {
        trimmed
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}
