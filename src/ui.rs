// UI layer: a simple interactive menu built with `dialoguer`.
// Each flow collects its inputs, calls the client and prints the outcome;
// a failed operation is reported and the menu keeps running.

use crate::api::Client;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main interactive menu. Runs a select loop until the user picks "Exit".
pub fn main_menu(client: &Client) -> Result<()> {
    let items = [
        "Upload file",
        "Download file",
        "Show file info",
        "Delete file version",
        "Show public URL",
        "Exit",
    ];
    loop {
        let selection = Select::new().items(&items).default(0).interact()?;
        let outcome = match selection {
            0 => handle_upload(client),
            1 => handle_download(client),
            2 => handle_file_info(client),
            3 => handle_delete(client),
            4 => handle_public_url(client),
            _ => break,
        };
        if let Err(e) = outcome {
            println!("Error: {:#}", e);
        }
    }
    Ok(())
}

fn handle_upload(client: &Client) -> Result<()> {
    let path: String = Input::new().with_prompt("Local file path").interact_text()?;
    let path = PathBuf::from(path);
    let default_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.bin")
        .to_string();
    let name: String = Input::new()
        .with_prompt("Name in bucket")
        .default(default_name)
        .interact_text()?;

    let mut file = File::open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let spinner = spinner("Uploading...");
    let result = client.upload_file(&name, &mut file);
    spinner.finish_and_clear();

    let info = result.context("Upload failed")?;
    println!("Uploaded {} ({} bytes), file id {}", info.file_name, info.content_length, info.file_id);
    Ok(())
}

fn handle_download(client: &Client) -> Result<()> {
    let name: String = Input::new().with_prompt("Name in bucket").interact_text()?;
    let base = dirs::download_dir().unwrap_or_else(|| PathBuf::from("."));
    let destination = download_destination(&base, &name);

    let spinner = spinner("Downloading...");
    let result = client.download_file(&name);
    spinner.finish_and_clear();

    let bytes = result.context("Download failed")?;
    std::fs::write(&destination, &bytes)
        .with_context(|| format!("Failed to write {}", destination.display()))?;
    println!("Saved {} bytes to {}", bytes.len(), destination.display());
    Ok(())
}

fn handle_file_info(client: &Client) -> Result<()> {
    let file_id: String = Input::new().with_prompt("File id").interact_text()?;
    let info = client.get_file_info(&file_id).context("Lookup failed")?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn handle_delete(client: &Client) -> Result<()> {
    let file_name: String = Input::new().with_prompt("File name").interact_text()?;
    let file_id: String = Input::new().with_prompt("File id").interact_text()?;
    let confirmed = Confirm::new()
        .with_prompt(format!("Delete {} ({})?", file_name, file_id))
        .default(false)
        .interact()?;
    if !confirmed {
        return Ok(());
    }

    let deleted = client
        .delete_file_version(&file_name, &file_id)
        .context("Delete failed")?;
    println!("Deleted {} ({})", deleted.file_name, deleted.file_id);
    Ok(())
}

fn handle_public_url(client: &Client) -> Result<()> {
    let name: String = Input::new().with_prompt("Name in bucket").interact_text()?;
    println!("{}", client.get_file_url(&name));
    Ok(())
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Local path for a downloaded object: the last segment of its bucket name
/// under `base`.
fn download_destination(base: &Path, name: &str) -> PathBuf {
    let file_name = name
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("download.bin");
    base.join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_uses_last_path_segment() {
        let base = Path::new("/tmp/downloads");
        assert_eq!(
            download_destination(base, "photos/2024/cat.jpg"),
            base.join("cat.jpg")
        );
        assert_eq!(download_destination(base, "notes.txt"), base.join("notes.txt"));
    }

    #[test]
    fn destination_falls_back_for_directory_like_names() {
        let base = Path::new(".");
        assert_eq!(download_destination(base, "dir/"), base.join("dir"));
        assert_eq!(download_destination(base, "/"), base.join("download.bin"));
    }
}
