use colored::Colorize;
use vhostkit::Host;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print captured service output verbatim, indented.
pub fn output(text: &str) {
    for line in text.lines() {
        println!("  {}", line.dimmed());
    }
}

/// Print an error with its cause chain and, for lifecycle errors, advice.
pub fn report(err: &anyhow::Error) {
    error(&err.to_string());
    for cause in err.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
    }
    if let Some(lifecycle) = err.downcast_ref::<vhostkit::Error>() {
        eprintln!("  {} {}", "kind:".dimmed(), lifecycle.kind().description());
        if let Some(output) = lifecycle.command_output().filter(|o| !o.trim().is_empty()) {
            eprintln!("  {}", "command output:".dimmed());
            for line in output.lines() {
                eprintln!("    {line}");
            }
        }
        eprintln!("  {} {}", "hint:".cyan(), lifecycle.kind().advice());
    }
}

/// The one-line listing format: `Host: http://<name>, config file => <path>`.
pub fn host_line(host: &Host) -> String {
    format!(
        "Host: {}, config file => {}",
        host.url(),
        host.config_path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vhostkit::{HostName, Layout};

    #[test]
    fn test_host_line() {
        let name = HostName::parse("example.test").unwrap();
        let host = Layout::default().host(&name);
        assert_eq!(
            host_line(&host),
            "Host: http://example.test, config file => /etc/apache2/sites-available/example.test.conf"
        );
    }
}
