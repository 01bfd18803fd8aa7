//! `appco notifications`: the extension's notification list, through the backend

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::store::{Notification, NotificationKind, NotificationUpdate};

fn kind_marker(kind: NotificationKind) -> colored::ColoredString {
    match kind {
        NotificationKind::Info => "info".blue(),
        NotificationKind::Success => "success".green(),
        NotificationKind::Warning => "warning".yellow(),
        NotificationKind::Error => "error".red(),
    }
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

pub fn list(ctx: &Context, all: bool) -> Result<()> {
    let notifications = ctx.backend()?.notifications()?;
    let visible: Vec<&Notification> = notifications
        .iter()
        .filter(|n| all || !n.dismissed)
        .collect();

    if visible.is_empty() {
        println!("No notifications");
        return Ok(());
    }

    for n in visible {
        let title = if n.dismissed {
            n.title.dimmed()
        } else {
            n.title.bold()
        };
        println!(
            "{}  {:<8} {}  {}",
            format_timestamp(n.timestamp),
            kind_marker(n.kind),
            title,
            n.id.dimmed()
        );
        if !n.description.is_empty() {
            println!("    {}", n.description);
        }
        if let Some(href) = &n.href {
            let text = n.action_text.as_deref().unwrap_or("Open");
            println!("    {}: {}", text, href);
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct AddOptions {
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
    pub href: Option<String>,
    pub action_text: Option<String>,
}

pub fn add(ctx: &Context, options: AddOptions) -> Result<()> {
    let mut notification = Notification::new(options.kind, options.title, options.description);
    notification.href = options.href;
    notification.action_text = options.action_text;

    let stored = ctx.backend()?.add_notification(&notification)?;
    println!("{} Added notification {}", "✓".green(), stored.id);
    Ok(())
}

pub fn dismiss(ctx: &Context, id: &str) -> Result<()> {
    ctx.backend()?
        .update_notification(id, &NotificationUpdate::dismiss())?;
    println!("{} Dismissed {}", "✓".green(), id);
    Ok(())
}

pub fn delete(ctx: &Context, id: &str) -> Result<()> {
    ctx.backend()?.delete_notification(id)?;
    println!("{} Deleted {}", "✓".green(), id);
    Ok(())
}
