//! Backup listing display

use crate::backup::BackupInfo;

/// Format a list of backups, newest first as given
pub fn format_backup_list(backups: &[BackupInfo]) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }

    let name_width = backups
        .iter()
        .map(|b| b.filename.len())
        .max()
        .unwrap_or(8)
        .max(8);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {:<19}  {:>10}\n",
        "Filename",
        "Created (UTC)",
        "Size",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<name_width$}  {:-<19}  {:->10}\n",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for backup in backups {
        output.push_str(&format!(
            "{:<name_width$}  {:<19}  {:>10}\n",
            backup.filename,
            backup.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            format_size(backup.size_bytes),
            name_width = name_width,
        ));
    }

    output.push_str(&format!("\n{} backup(s)\n", backups.len()));
    output
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(format_backup_list(&[]), "No backups found.");
    }
}
