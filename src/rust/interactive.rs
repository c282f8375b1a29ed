//! Terminal front end: read a comment per line, print a verdict.

use std::io::{self, BufRead, Write};

use crate::classifier::{Classify, Verdict};

const PROMPT: &str = "comment> ";
const EXIT_COMMANDS: [&str; 3] = [":q", ":quit", ":exit"];

/// `severe_toxic` -> `Severe Toxic`.
pub fn display_category(name: &str) -> String {
    name.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Human-readable verdict: toxicity for toxic comments, confidence otherwise.
pub fn render_verdict(verdict: &Verdict) -> String {
    if verdict.is_toxic() {
        let mut out = format!("Toxic (Toxicity: {:.2}%)", verdict.toxicity_score * 100.0);
        let reasons: Vec<String> = verdict.present_categories().map(display_category).collect();
        if !reasons.is_empty() {
            out.push_str(&format!("\nReason(s): {}", reasons.join(", ")));
        }
        out
    } else {
        format!("Not Toxic (Confidence: {:.2}%)", verdict.non_toxic_confidence * 100.0)
    }
}

/// Runs the read-classify-print loop until end of input or an exit command.
///
/// Classification errors are reported and the loop continues.
pub fn run<R: BufRead, W: Write>(classifier: &dyn Classify, input: R, mut output: W) -> io::Result<()> {
    writeln!(output, "Type a comment and press Enter to check it ({} to quit).", EXIT_COMMANDS[0])?;
    write!(output, "{}", PROMPT)?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let text = line.trim();
        if EXIT_COMMANDS.contains(&text) {
            break;
        }
        if text.is_empty() {
            writeln!(output, "Please enter some text!")?;
        } else {
            match classifier.classify(text) {
                Ok(verdict) => writeln!(output, "{}", render_verdict(&verdict))?,
                Err(e) => {
                    log::error!("Classification failed: {}", e);
                    writeln!(output, "Error: {}", e)?;
                }
            }
        }
        write!(output, "{}", PROMPT)?;
        output.flush()?;
    }
    writeln!(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_category() {
        assert_eq!(display_category("severe_toxic"), "Severe Toxic");
        assert_eq!(display_category("identity_hate"), "Identity Hate");
        assert_eq!(display_category("toxic"), "Toxic");
        assert_eq!(display_category("OFFENSIVE"), "Offensive");
    }
}
