//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{ExtractionProvider, Settings};
use crate::media::check_tool;
use crate::publish::S3Store;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Voicecast Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    let sections = [
        (
            "External Tools",
            vec![
                check_external_tool("yt-dlp", install_hint_ytdlp()).await,
                check_external_tool("ffmpeg", install_hint_ffmpeg()).await,
            ],
        ),
        ("API Keys", check_api_keys(settings)),
        ("Object Storage", vec![check_storage(settings)]),
        ("Directories", check_directories(settings)),
        ("Configuration", vec![check_config_file()]),
    ];

    for (title, results) in sections {
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        println!();
        checks.extend(results);
    }

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Voicecast.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Voicecast is ready to use.");
    }

    Ok(())
}

async fn check_external_tool(name: &str, hint: &str) -> CheckResult {
    match check_tool(name).await {
        Ok(()) => CheckResult::ok(name, "installed"),
        Err(e) => CheckResult::error(name, &e.to_string(), hint),
    }
}

/// Mask a secret for display, keeping only its ends.
fn mask(secret: &str) -> String {
    if secret.len() > 12 && secret.is_ascii() {
        format!("{}...{}", &secret[..4], &secret[secret.len() - 4..])
    } else {
        "****".to_string()
    }
}

fn check_key(name: &str, value: Option<&str>, needed_for: &str) -> CheckResult {
    match value {
        Some(key) if !key.trim().is_empty() => {
            CheckResult::ok(name, &format!("configured ({})", mask(key)))
        }
        _ => CheckResult::warning(
            name,
            "not set",
            &format!("Needed for {}. Set with: export {}='...'", needed_for, name),
        ),
    }
}

fn check_api_keys(settings: &Settings) -> Vec<CheckResult> {
    let mut results = vec![
        check_key(
            "ELEVENLABS_API_KEY",
            settings.voices.api_key.as_deref(),
            "identity mode",
        ),
        check_key(
            "FAL_KEY",
            settings.synthesis.dia_api_key.as_deref(),
            "reference mode",
        ),
    ];

    if settings.extraction.provider == ExtractionProvider::Whisper {
        let openai = std::env::var("OPENAI_API_KEY").ok();
        results.push(check_key(
            "OPENAI_API_KEY",
            openai.as_deref(),
            "reference text extraction",
        ));
    }

    results
}

fn check_storage(settings: &Settings) -> CheckResult {
    match S3Store::from_settings(&settings.storage) {
        Ok(_) => CheckResult::ok(
            "S3 bucket",
            &format!(
                "{} at {}",
                settings.storage.bucket.as_deref().unwrap_or_default(),
                settings.storage.endpoint.as_deref().unwrap_or_default()
            ),
        ),
        Err(e) => CheckResult::warning(
            "S3 bucket",
            &e.to_string(),
            "Reference mode needs S3_ENDPOINT, S3_BUCKET, S3_ACCESS_KEY and S3_SECRET_KEY",
        ),
    }
}

fn check_directory(name: &str, dir: &Path) -> CheckResult {
    if dir.exists() {
        CheckResult::ok(name, &format!("{}", dir.display()))
    } else {
        CheckResult::warning(
            name,
            &format!("{} (will be created)", dir.display()),
            "Directory will be created on first use",
        )
    }
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = vec![
        check_directory("Data directory", &settings.data_dir()),
        check_directory("Temp directory", &settings.temp_dir()),
    ];

    if settings.media.cookies.is_some() {
        results.push(CheckResult::ok("Cookies", "from YOUTUBE_COOKIES"));
    } else if let Some(path) = settings.cookies_file().filter(|p| p.is_file()) {
        results.push(CheckResult::ok("Cookies", &format!("{}", path.display())));
    } else {
        results.push(CheckResult::warning(
            "Cookies",
            "none",
            "Some videos need cookies. Set YOUTUBE_COOKIES or media.cookies_file",
        ));
    }

    results
}

fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create {} to override defaults", config_path.display()),
        )
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
