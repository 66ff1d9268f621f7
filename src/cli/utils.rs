use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format.
/// Object `data` is merged into the JSON envelope.
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(envelope)) = (data, response.as_object_mut()) {
                envelope.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print one `key: value` line per entry in text mode
pub fn output_fields(output_format: OutputFormat, title: &str, fields: &[(&str, String)]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let object: serde_json::Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ title: object }))?);
        }
        OutputFormat::Text => {
            println!("{}", title);
            for (key, value) in fields {
                println!("  {:<32} {}", key, value);
            }
        }
    }
    Ok(())
}
