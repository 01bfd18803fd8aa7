//! `appco values`: default local values of a chart version

use anyhow::{Context as _, Result};

use super::Context;
use crate::helm::LocalValue;

pub fn show(ctx: &Context, chart: &str, version: &str, from_backend: bool, json: bool) -> Result<()> {
    let values = if from_backend {
        ctx.backend()?.local_values(chart, version)?
    } else {
        ctx.helm().local_values(chart, version)?
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&values).context("Failed to encode values")?
        );
    } else if values.is_empty() {
        println!("{} {} has no local values", chart, version);
    } else {
        for value in &values {
            println!("{}", set_flag(value));
        }
    }
    Ok(())
}

/// Render a value as the `key=value` form `--set` accepts
fn set_flag(value: &LocalValue) -> String {
    match &value.value {
        serde_json::Value::String(s) => format!("{}={}", value.key, s),
        other => format!("{}={}", value.key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_flag() {
        let string = LocalValue {
            key: "auth.user".to_string(),
            value: json!("admin"),
        };
        assert_eq!(set_flag(&string), "auth.user=admin");

        let number = LocalValue {
            key: "replicas".to_string(),
            value: json!(3),
        };
        assert_eq!(set_flag(&number), "replicas=3");

        let empty = LocalValue {
            key: "extra".to_string(),
            value: json!({}),
        };
        assert_eq!(set_flag(&empty), "extra={}");
    }
}
