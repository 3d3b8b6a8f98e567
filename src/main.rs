use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dialoguer::{Confirm, FuzzySelect, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use vascii::{
    copy_audio, resolve_charset, AppConfig, AsciiConverter, CancelToken, ConversionOptions,
    FfmpegSource, OutputMode, Progress, ProgressPhase,
};
use walkdir::WalkDir;

fn load_config() -> Result<AppConfig> {
    // Look for vascii.json in app support, current dir fallback, then
    // built-in default.
    let mut tried: Vec<PathBuf> = Vec::new();
    if let Some(mut d) = dirs::data_dir() {
        d.push("vascii");
        d.push("vascii.json");
        tried.push(d);
    }
    tried.push(PathBuf::from("vascii.json"));

    for p in &tried {
        if p.exists() {
            let text =
                fs::read_to_string(p).with_context(|| format!("reading config {}", p.display()))?;
            let cfg: AppConfig = serde_json::from_str(&text).context("parsing config json")?;
            return Ok(cfg);
        }
    }

    Ok(AppConfig::default())
}

#[derive(Parser, Debug)]
#[command(version, about = "Interactive video to ASCII animation converter.")]
struct Args {
    /// Input video file
    input: Option<PathBuf>,

    /// Output directory for the generated frames
    out: Option<PathBuf>,

    /// Target width in characters
    #[arg(long)]
    width: Option<u32>,

    /// Native frames advanced between two sampled instants
    #[arg(long)]
    frame_skip: Option<u32>,

    /// Character set: simple, standard, extended, or a literal
    /// darkest-to-lightest string
    #[arg(long)]
    charset: Option<String>,

    /// Use the configured default preset without prompting
    #[arg(long, default_value_t = false, conflicts_with_all = &["small", "large"])]
    default: bool,

    /// Use smaller default values for quality settings
    #[arg(long, short, default_value_t = false, conflicts_with_all = &["default", "large"])]
    small: bool,

    /// Use larger default values for quality settings
    #[arg(long, short, default_value_t = false, conflicts_with_all = &["default", "small"])]
    large: bool,

    /// Skip audio extraction
    #[arg(long, default_value_t = false)]
    no_audio: bool,

    /// Write plain .txt frames only
    #[arg(long, default_value_t = false, conflicts_with = "color_only")]
    text_only: bool,

    /// Write combined .cframe color frames only
    #[arg(long, default_value_t = false)]
    color_only: bool,

    /// Keep the latest low-fidelity preview as preview.jpg in the output
    /// directory while converting
    #[arg(long, default_value_t = false)]
    preview: bool,

    /// Log generation details to standard output
    #[arg(long, default_value_t = false)]
    log_details: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let mut args = Args::parse();
    let is_interactive = !(args.default || args.small || args.large);

    let cfg = load_config()?;
    let converter = AsciiConverter::with_config(cfg.clone())?;

    // --- Interactive prompts ---
    if args.input.is_none() {
        if !is_interactive {
            return Err(anyhow!("Input file must be provided when using a preset."));
        }
        let files = find_media_files()?;
        if files.is_empty() {
            return Err(anyhow!("No video files found in current directory."));
        }
        let selection = FuzzySelect::with_theme(&dialoguer::theme::ColorfulTheme::default())
            .with_prompt("Choose an input video")
            .default(0)
            .items(&files)
            .interact()?;
        args.input = Some(PathBuf::from(&files[selection]));
    }

    let input_path = args.input.as_ref().unwrap();
    if !input_path.is_file() {
        return Err(anyhow!("Input path does not exist"));
    }

    let mut output_path = args.out.unwrap_or_else(|| PathBuf::from("."));
    let file_stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("vascii_output");
    output_path.push(file_stem);

    // Decide the active preset.
    let active_preset_name = if args.small {
        "small"
    } else if args.large {
        "large"
    } else {
        cfg.default_preset.as_str()
    };
    let active = cfg
        .presets
        .get(active_preset_name)
        .ok_or_else(|| anyhow!("Missing preset '{}' in config", active_preset_name))?;

    if is_interactive {
        if args.width.is_none() {
            args.width = Some(
                Input::new()
                    .with_prompt("Width (characters)")
                    .default(active.width)
                    .interact()?,
            );
        }
        if args.frame_skip.is_none() {
            args.frame_skip = Some(
                Input::new()
                    .with_prompt("Frame skip (1 = every native frame)")
                    .default(active.frame_skip)
                    .interact()?,
            );
        }
        if args.charset.is_none() {
            args.charset = Some(
                Input::new()
                    .with_prompt("Character set (simple/standard/extended or literal)")
                    .default("simple".to_string())
                    .interact()?,
            );
        }
    }

    let width = args.width.unwrap_or(active.width);
    let frame_skip = args.frame_skip.unwrap_or(active.frame_skip);
    let charset = match args.charset.as_deref() {
        Some(name) => resolve_charset(name)
            .map(str::to_string)
            .unwrap_or_else(|| name.to_string()),
        None => cfg.charset.clone(),
    };

    let options = ConversionOptions::default()
        .with_target_width(width)
        .with_frame_skip(frame_skip)
        .with_charset(charset.clone())
        .with_audio(!args.no_audio);

    // --- Execution ---
    fs::create_dir_all(&output_path).context("creating output dir")?;

    // Check if the output directory already contains frames.
    let has_frames = WalkDir::new(&output_path)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .any(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|s| s.starts_with("frame_"))
        });

    if has_frames {
        if is_interactive
            && !Confirm::new()
                .with_prompt(format!(
                    "Output directory {} already contains frames. Overwrite?",
                    output_path.display()
                ))
                .default(false)
                .interact()?
        {
            println!("Operation cancelled.");
            return Ok(());
        }
        remove_stale_frames(&output_path)?;
    }

    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel()).context("installing Ctrl-C handler")?;

    println!("Loading {}...", input_path.display());
    let mut source = FfmpegSource::open(input_path)
        .with_context(|| format!("loading {}", input_path.display()))?;

    let mut bar: Option<ProgressBar> = None;
    let preview_path = output_path.join("preview.jpg");
    let write_preview = args.preview;

    let result = converter.convert_source(
        &mut source,
        &options,
        |progress: Progress| match progress.phase {
            ProgressPhase::ExtractingAudio => println!("Extracting audio..."),
            ProgressPhase::ConvertingFrames => {
                let pb = bar.get_or_insert_with(|| {
                    let pb = ProgressBar::new(progress.total as u64);
                    pb.set_style(
                        ProgressStyle::default_bar()
                            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
                            .unwrap()
                            .progress_chars("#>-"),
                    );
                    pb.set_message("Converting frames");
                    pb
                });
                pb.set_position(progress.completed.min(progress.total) as u64);
                if write_preview {
                    if let Some(jpeg) = &progress.preview {
                        let _ = fs::write(&preview_path, jpeg);
                    }
                }
            }
            ProgressPhase::Complete => {}
        },
        &token,
    )?;

    if let Some(pb) = bar {
        pb.finish_with_message("Done");
    }

    if token.is_cancelled() {
        println!("\nConversion cancelled; partial frames discarded.");
        return Ok(());
    }

    let mode = if args.color_only {
        OutputMode::ColorOnly
    } else if args.text_only {
        OutputMode::TextOnly
    } else {
        OutputMode::TextAndColor
    };
    let frame_count = vascii::write_frames(&result, &output_path, &mode)
        .with_context(|| format!("writing frames to {}", output_path.display()))?;

    if let Some(audio) = &result.audio {
        copy_audio(audio, &output_path).context("copying audio track")?;
        let _ = fs::remove_file(&audio.path);
    }

    println!("\nASCII generation complete in {}", output_path.display());

    // --- Create details.md ---
    let mut details = format!(
        "Version: {}\nFrames: {}\nFPS: {}\nWidth: {}\nFrame Skip: {}\nCharset: {}",
        env!("CARGO_PKG_VERSION"),
        frame_count,
        result.fps,
        width,
        frame_skip,
        charset
    );
    if result.audio.is_some() {
        details.push_str("\nAudio: audio.mp3");
    }

    let details_path = output_path.join("details.md");
    fs::write(details_path, &details).context("writing details file")?;

    if args.log_details {
        println!("\n--- Generation Details ---");
        println!("{}", details);
    }

    Ok(())
}

fn find_media_files() -> Result<Vec<String>> {
    Ok(WalkDir::new(".")
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path().extension().is_some_and(|ext| {
                    matches!(ext.to_str(), Some("mp4" | "mkv" | "mov" | "avi" | "webm"))
                })
        })
        .map(|e| e.path().to_str().unwrap_or("").to_string())
        .collect())
}

fn remove_stale_frames(dir: &std::path::Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            if name.starts_with("frame_") && (name.ends_with(".txt") || name.ends_with(".cframe"))
            {
                fs::remove_file(path)?;
            }
        }
    }
    Ok(())
}
