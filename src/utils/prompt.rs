//! User prompt utilities for interactive confirmation

use anyhow::Result;
use dialoguer::{Confirm, Input, Password};

/// Ask user for yes/no confirmation
pub fn confirm(prompt: &str) -> Result<bool> {
    let result = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(result)
}

/// Ask for a free-form value, pre-filled with `default` when given
pub fn input(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(value) = default {
        input = input.default(value.to_string());
    }
    Ok(input.interact_text()?)
}

/// Ask for a secret without echoing it
pub fn password(prompt: &str) -> Result<String> {
    Ok(Password::new().with_prompt(prompt).interact()?)
}
