use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use sd_metaview::config::{self, OutputConfig, View};
use sd_metaview::metadata::NormalizedMetadata;
use sd_metaview::pipeline;

#[derive(Parser, Debug)]
#[command(
    name = "sd-metaview",
    version,
    about = "Show the prompts, generation parameters and camera data embedded in PNG, JPEG and WebP images"
)]
struct Cli {
    /// Image files or directories to inspect
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: sd-metaview.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default sd-metaview.json and exit
    #[arg(long)]
    init: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Show every raw chunk instead of the formatted view
    #[arg(long, conflicts_with_all = ["json", "tags"])]
    raw: bool,

    /// Show prompts as tag lists
    #[arg(long, conflicts_with = "json")]
    tags: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let config = config::Config::load(cli.config.as_deref())?;
    let view = if cli.json {
        View::Json
    } else if cli.raw {
        View::Raw
    } else if cli.tags {
        View::Tags
    } else {
        config.output.view
    };
    let palette = Palette::new(config.output.color && std::io::stdout().is_terminal());

    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }
    log::debug!("Found {} image(s)", images.len());

    let total = images.len();
    let mut records = Vec::new();
    let mut failed = 0usize;
    let mut empty = 0usize;

    for image_path in &images {
        match pipeline::extract_path(image_path, &config.extraction) {
            Ok(meta) => {
                if !meta.has_metadata() {
                    empty += 1;
                }
                match view {
                    View::Json => {}
                    View::Formatted => print_formatted(&meta, image_path, &palette),
                    View::Raw => print_raw(&meta, image_path, &config.output, &palette),
                    View::Tags => print_tags(&meta, image_path, &palette),
                }
                records.push(meta);
            }
            Err(e) => {
                log::error!("{}: {e}", image_path.display());
                failed += 1;
            }
        }
    }

    if view == View::Json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }

    // Summary
    log::info!(
        "Done: {} read ({empty} without metadata), {failed} failed out of {total} images",
        records.len()
    );

    Ok(())
}

/// ANSI escapes, or empty strings when color is off.
struct Palette {
    bold: &'static str,
    dim: &'static str,
    green: &'static str,
    red: &'static str,
    reset: &'static str,
}

impl Palette {
    fn new(color: bool) -> Self {
        if color {
            Self {
                bold: "\x1b[1m",
                dim: "\x1b[2m",
                green: "\x1b[32m",
                red: "\x1b[31m",
                reset: "\x1b[0m",
            }
        } else {
            Self {
                bold: "",
                dim: "",
                green: "",
                red: "",
                reset: "",
            }
        }
    }
}

fn print_header(meta: &NormalizedMetadata, path: &std::path::Path, p: &Palette) {
    println!();
    println!("{}File:{} {}", p.bold, p.reset, path.display());
    let size = meta
        .file_info
        .as_ref()
        .and_then(|f| Some(format!("  {}x{}", f.width?, f.height?)))
        .unwrap_or_default();
    println!("{}Source:{} {}{size}", p.bold, p.reset, meta.source_label);
    println!("{}{}{}", p.dim, "═".repeat(72), p.reset);
}

fn print_section(title: &str, p: &Palette) {
    println!("  {}{title}{}", p.bold, p.reset);
    println!("  {}{}{}", p.dim, "─".repeat(70), p.reset);
}

fn print_formatted(meta: &NormalizedMetadata, path: &std::path::Path, p: &Palette) {
    print_header(meta, path, p);

    if let Some(ref err) = meta.parse_error {
        println!("  {}Could not fully parse: {err}{}", p.red, p.reset);
        println!();
    }

    if let Some(ref prompt) = meta.prompt {
        print_section("Prompt", p);
        print_block(prompt);
        println!();
    }
    if let Some(ref negative) = meta.negative_prompt {
        print_section("Negative Prompt", p);
        print_block(negative);
        println!();
    }
    if !meta.parameters.is_empty() {
        print_section("Parameters", p);
        for param in meta.parameters.iter() {
            print_row(&param.key, &param.value);
        }
        println!();
    }

    if let Some(ref camera) = meta.camera {
        print_section("Camera", p);
        for (label, value) in camera.rows() {
            print_row(label, &value);
        }
        println!();
    }
    if let Some(editor) = meta.editing_software {
        print_row("Edited with", editor.label());
        println!();
    }

    if !meta.has_metadata() {
        println!("  {}(no metadata found){}", p.dim, p.reset);
        if let Some(ref text) = meta.raw_text {
            print_block(text);
        }
        println!();
    } else if meta.prompt.is_none() && meta.parameters.is_empty() && meta.camera.is_none() {
        if let Some(ref text) = meta.raw_text {
            print_section("Raw", p);
            print_block(text);
            println!();
        }
    }
}

fn print_raw(
    meta: &NormalizedMetadata,
    path: &std::path::Path,
    output: &OutputConfig,
    p: &Palette,
) {
    print_header(meta, path, p);
    if meta.raw_entries.is_empty() {
        println!("  {}(no metadata chunks){}", p.dim, p.reset);
    }
    for entry in &meta.raw_entries {
        print_section(&entry.key, p);
        let shown: String = entry.value.chars().take(output.raw_value_limit).collect();
        println!("{shown}");
        let total = entry.value.chars().count();
        if total > output.raw_value_limit {
            println!(
                "{}... ({} more characters){}",
                p.dim,
                total - output.raw_value_limit,
                p.reset
            );
        }
        println!();
    }
}

fn print_tags(meta: &NormalizedMetadata, path: &std::path::Path, p: &Palette) {
    print_header(meta, path, p);
    let prompt = meta.prompt_tags();
    let negative = meta.negative_tags();
    if prompt.is_empty() && negative.is_empty() {
        println!("  {}(no prompt){}", p.dim, p.reset);
        return;
    }
    if !prompt.is_empty() {
        print_section("Prompt tags", p);
        for tag in &prompt {
            println!("  {}•{} {tag}", p.green, p.reset);
        }
        println!();
    }
    if !negative.is_empty() {
        print_section("Negative tags", p);
        for tag in &negative {
            println!("  {}•{} {tag}", p.red, p.reset);
        }
        println!();
    }
}

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print a single key/value row.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Print free text wrapped at 70 columns, keeping its line breaks.
fn print_block(text: &str) {
    for paragraph in text.lines() {
        for line in wrap_text(paragraph, 70) {
            println!("  {line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
