//! CLI output formatting utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one reel's summary line.
    pub fn reel_info(shortcode: &str, owner: &str, views: Option<u64>) {
        let views_str = match views {
            Some(v) => format_count(v),
            None => "? views".to_string(),
        };
        println!(
            "  {} {} by @{} ({})",
            style("*").cyan(),
            style(shortcode).bold(),
            owner,
            style(views_str).dim()
        );
    }

    /// Print a script hook preview line.
    pub fn script_preview(index: usize, hook_type: &str, hook: &str) {
        println!(
            "  {} {} {}",
            style(format!("{:>2}.", index)).dim(),
            style(format!("[{}]", hook_type)).cyan(),
            hook
        );
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format a view/like count compactly (1.2M, 340K).
fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M views", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.0}K views", count as f64 / 1_000.0)
    } else {
        format!("{} views", count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_carries_message() {
        let pb = Output::spinner("working...");
        assert_eq!(pb.message(), "working...");
        pb.finish_and_clear();
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(999), "999 views");
        assert_eq!(format_count(340_000), "340K views");
        assert_eq!(format_count(1_200_000), "1.2M views");
    }
}
