// SPDX-License-Identifier: Apache-2.0

// Example: feeding physical lines to both parsers by hand

use csvline::{CsvParser, LineParser, ParseError, Rfc4180Parser};

fn feed<P: LineParser>(name: &str, parser: &mut P, lines: &[&str]) -> Result<(), ParseError> {
    println!("{}:", name);
    for line in lines {
        match parser.parse_line_multi(line)? {
            Some(record) => println!("  {:<22} -> {:?}", line, record),
            None => println!("  {:<22} -> pending {:?}", line, parser.pending_text()),
        }
    }
    // end of input
    if let Some(record) = parser.tokenize(None, true)? {
        println!("  <eof> flushed {:?}", record);
    }
    Ok(())
}

fn main() -> Result<(), ParseError> {
    let lines = [
        r#"id,comment,author"#,
        r#"1,"spans"#,
        r#"two lines",glen"#,
        r#"2,"say ""hi""",ann"#,
        r#"3,"C:\temp",bob"#,
    ];

    feed("CsvParser", &mut CsvParser::default(), &lines)?;
    println!();
    feed("Rfc4180Parser", &mut Rfc4180Parser::default(), &lines)?;

    println!();
    let parser = CsvParser::default();
    let record = vec![
        Some("plain".to_string()),
        Some("with, comma".to_string()),
        Some("quote \" inside".to_string()),
        None,
    ];
    println!("Rendered: {}", parser.render(&record));
    Ok(())
}
