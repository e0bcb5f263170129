//! Delimited text records with RFC 4180 quoting
//!
//! Shared by the label-table readers and the overlap tables. Fields holding
//! the delimiter, a quote or a line break are quoted, and quotes are doubled.

/// Quote a field if needed
pub fn escape_field(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r')
    {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join fields into one line (no terminator)
pub fn format_record<S: AsRef<str>>(fields: &[S], delimiter: char) -> String {
    fields
        .iter()
        .map(|f| escape_field(f.as_ref(), delimiter))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

/// Split text into records
///
/// Quoted fields may span lines. Blank lines are skipped. Fails on an
/// unterminated quote with the 1-based line where the quote opened.
pub fn parse_records(text: &str, delimiter: char) -> Result<Vec<Vec<String>>, String> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quote_line = 0;
    let mut line = 1;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                line += 1;
                end_record(&mut records, &mut record, &mut field);
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(format!("unterminated quoted field starting on line {quote_line}"));
    }
    end_record(&mut records, &mut record, &mut field);
    Ok(records)
}

fn end_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, field: &mut String) {
    if record.is_empty() && field.trim().is_empty() {
        field.clear();
        return;
    }
    record.push(std::mem::take(field));
    records.push(std::mem::take(record));
}
