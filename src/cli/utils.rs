use serde_json::{json, Value};

use crate::cli::config::Session;
use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Output a collection: pretty JSON, or one pre-rendered line per item
pub fn output_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    items: Value,
    lines: Vec<String>,
    empty_message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: items }))?);
        }
        OutputFormat::Text if lines.is_empty() => {
            println!("{}", empty_message);
        }
        OutputFormat::Text => {
            for line in lines {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// Check the session's ability before calling the API. Prints the denial
/// and returns false when the role lacks the capability.
pub fn ensure_can(
    session: &Session,
    output_format: &OutputFormat,
    action: &str,
    subject: &str,
) -> anyhow::Result<bool> {
    if session.can(action, subject) {
        return Ok(true);
    }
    tracing::debug!(role_id = %session.user.role_id, action, subject, "capability missing");
    output_error(
        output_format,
        &format!("Permission denied: cannot {} {}", action, subject),
        Some("FORBIDDEN"),
    )?;
    Ok(false)
}

/// Fixed-width text progress bar for a 0..=100 percentage
pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (percent.min(100) as usize * width) / 100;
    format!("[{}{}] {:>3}%", "#".repeat(filled), "-".repeat(width - filled), percent.min(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(0, 10), "[----------]   0%");
        assert_eq!(progress_bar(42, 10), "[####------]  42%");
        assert_eq!(progress_bar(100, 4), "[####] 100%");
        assert_eq!(progress_bar(150, 4), "[####] 100%");
    }
}
