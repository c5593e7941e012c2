//! tts-audiobook - Convert EPUB files to audiobooks with an external TTS engine

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, LevelFilter};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tts_audiobook::assembler::{Assembly, ChapterAssembler};
use tts_audiobook::audio::{package_m4b, write_cover_image, Ffmpeg};
use tts_audiobook::config::AudiobookConfig;
use tts_audiobook::epub::{load_book, ExtractedBook};
use tts_audiobook::narrator::{attach_existing_audio, Narrator};
use tts_audiobook::text::{SeamsSplitter, Segmenter};
use tts_audiobook::tts::{CommandBackend, TtsOptions};

#[derive(Parser, Debug)]
#[command(name = "tts-audiobook")]
#[command(about = "Convert EPUB files to audiobooks with an external TTS engine", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the EPUB (or .txt) file
    input: Option<PathBuf>,

    /// Output file path (default: <input-name>.m4b)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum characters per text segment
    #[arg(long)]
    max_length: Option<usize>,

    /// Path to voice reference audio for voice cloning
    #[arg(long)]
    voice: Option<PathBuf>,

    /// Language code passed to the TTS engine
    #[arg(long)]
    language: Option<String>,

    /// Chapter range to narrate (e.g., "0-10" or "5")
    #[arg(long)]
    chapters: Option<String>,

    /// Ignore chapter audio left by an earlier run
    #[arg(long)]
    no_resume: bool,

    /// Narrate chapters but do not build the M4B
    #[arg(long)]
    skip_package: bool,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract and segment a book, then print the result
    Segment {
        /// Path to the EPUB (or .txt) file
        input: PathBuf,

        /// Maximum characters per text segment
        #[arg(long)]
        max_length: Option<usize>,

        /// Print the book as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default maximum segment length
    SetMaxLength {
        /// Characters per segment
        value: usize,
    },
    /// Set default voice reference
    SetVoice {
        /// Path to voice reference audio
        path: PathBuf,
    },
    /// Set default language
    SetLanguage {
        /// Language code, e.g. "en"
        language: String,
    },
    /// Set the TTS program and its arguments
    SetCommand {
        program: String,
        /// Arguments; {output}, {voice}, {language}, and {text} are substituted
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    match &args.command {
        Some(Commands::Config { action }) => return handle_config_command(action),
        Some(Commands::Segment {
            input,
            max_length,
            json,
        }) => return handle_segment_command(input, *max_length, *json),
        None => {}
    }

    let input = args
        .input
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Input file path is required. Run 'tts-audiobook --help' for usage."))?;

    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let mut config = AudiobookConfig::load().context("Failed to load configuration")?;
    apply_overrides(&mut config, &args)?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| input.with_file_name(format!("{}.m4b", file_stem(&input))));
    let book_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| input.parent().map(Path::to_path_buf).unwrap_or_default())
        .join(file_stem(&input));

    debug!("Input: {}", input.display());
    debug!("Output: {}", output_path.display());
    debug!("Chapter audio: {}", book_dir.display());
    debug!("Config: {:?}", config);

    eprintln!("Reading: {}", input.display());
    let extracted = load_book(&input).context("Failed to read book")?;
    let cover_image = extracted.cover_image.clone();

    let Assembly { mut book, failures } = assemble(extracted, &config)?;
    eprintln!("Book: \"{}\" by {}", book.title(), book.author());
    eprintln!(
        "Chapters: {}, Segments: {}, Words: ~{}",
        book.chapters().len(),
        book.total_segments(),
        book.total_words()
    );
    for failure in &failures {
        eprintln!(
            "Warning: chapter {} \"{}\" could not be segmented: {}",
            failure.index, failure.title, failure.error
        );
    }

    if book.chapters().is_empty() {
        anyhow::bail!("No chapters found in {}", input.display());
    }

    let range = parse_chapter_range(args.chapters.as_deref(), book.chapters().len())?;

    if !args.no_resume {
        let found = attach_existing_audio(&mut book, &book_dir);
        if found > 0 {
            eprintln!("Resuming: {} chapter(s) already narrated", found);
        }
    }

    let ffmpeg = Ffmpeg::new(config.ffmpeg.clone(), config.ffprobe.clone());
    let mut options = TtsOptions::new().with_language(config.language.clone());
    if let Some(voice) = &config.voice_ref {
        options = options.with_voice_ref(voice);
    }

    let narrator = Narrator::new(
        CommandBackend::from_config(&config.tts),
        ffmpeg.clone(),
        &book_dir,
    )
    .with_options(options)
    .with_max_retries(config.max_retries);

    let report = narrator.narrate(&mut book, range).await?;
    eprintln!(
        "\nCompleted: {}, Skipped: {}, Failed: {}",
        report.completed.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for (index, error) in &report.failed {
        eprintln!("  chapter {}: {}", index, error);
    }

    if args.skip_package {
        eprintln!("Chapter audio: {}", book_dir.display());
        return Ok(());
    }

    if !ffmpeg.is_available() {
        anyhow::bail!("ffmpeg not found. Install it or set 'ffmpeg' in the config file.");
    }

    let cover_path = cover_image
        .as_deref()
        .map(|bytes| write_cover_image(bytes, &book_dir))
        .transpose()?;

    eprintln!("\nAssembling audiobook...");
    package_m4b(&ffmpeg, &book, &output_path, cover_path.as_deref())?;

    let metadata = std::fs::metadata(&output_path)?;
    let size_mb = metadata.len() as f64 / (1024.0 * 1024.0);
    eprintln!("Output: {} ({:.1} MB)", output_path.display(), size_mb);

    Ok(())
}

fn init_logging(debug: bool) {
    let default_level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}

fn apply_overrides(config: &mut AudiobookConfig, args: &Args) -> Result<()> {
    if let Some(max_length) = args.max_length {
        config.max_length = max_length;
    }
    if let Some(voice) = &args.voice {
        config.voice_ref = Some(voice.clone());
    }
    if let Some(language) = &args.language {
        config.language = language.clone();
    }
    config.validate()
}

fn assemble(extracted: ExtractedBook, config: &AudiobookConfig) -> Result<Assembly> {
    let splitter = SeamsSplitter::init().context("Failed to initialize sentence detector")?;
    let assembler = ChapterAssembler::new(Segmenter::new(splitter, config.segmenter_config()?))
        .with_normalization(config.normalize_text);

    Ok(assembler.assemble(extracted.title, extracted.author, extracted.chapters))
}

fn handle_segment_command(input: &Path, max_length: Option<usize>, json: bool) -> Result<()> {
    let mut config = AudiobookConfig::load().context("Failed to load configuration")?;
    if let Some(max_length) = max_length {
        config.max_length = max_length;
    }
    config.validate()?;

    let extracted = load_book(input).context("Failed to read book")?;
    let Assembly { book, failures } = assemble(extracted, &config)?;

    for failure in &failures {
        eprintln!(
            "Warning: chapter {} \"{}\" could not be segmented: {}",
            failure.index, failure.title, failure.error
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&book)?);
    } else {
        println!("{}", book.to_text());
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audiobook".to_string())
}

/// Parse chapter range string like "0-10" or "5". Both ends are inclusive.
fn parse_chapter_range(range: Option<&str>, total: usize) -> Result<Range<usize>> {
    let Some(r) = range else {
        return Ok(0..total);
    };

    let (start, end) = match r.split_once('-') {
        Some((start, end)) => {
            let start: usize = start.trim().parse().context("Invalid start chapter")?;
            let end: usize = end.trim().parse().context("Invalid end chapter")?;
            if end < start {
                anyhow::bail!("Invalid chapter range '{}': end is before start", r);
            }
            (start, end + 1)
        }
        None => {
            let chapter: usize = r.trim().parse().context("Invalid chapter number")?;
            (chapter, chapter + 1)
        }
    };

    Ok(start.min(total)..end.min(total))
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AudiobookConfig::load()?;
            println!("Configuration file: {:?}", AudiobookConfig::config_path()?);
            println!();
            println!("max_length = {}", config.max_length);
            println!("normalize_text = {}", config.normalize_text);
            println!("long_word_policy = {:?}", config.long_word_policy);
            if let Some(voice) = &config.voice_ref {
                println!("voice_ref = \"{}\"", voice.display());
            } else {
                println!("voice_ref = (none)");
            }
            println!("language = \"{}\"", config.language);
            if let Some(dir) = &config.output_dir {
                println!("output_dir = \"{}\"", dir.display());
            } else {
                println!("output_dir = (next to input)");
            }
            println!("max_retries = {}", config.max_retries);
            println!("tts = {} {}", config.tts.program, config.tts.args.join(" "));
        }
        ConfigAction::SetMaxLength { value } => {
            let mut config = AudiobookConfig::load()?;
            config.max_length = *value;
            config.save()?;
            println!("Default max length set to: {}", value);
        }
        ConfigAction::SetVoice { path } => {
            let mut config = AudiobookConfig::load()?;
            config.voice_ref = Some(path.clone());
            config.save()?;
            println!("Default voice reference set to: {}", path.display());
        }
        ConfigAction::SetLanguage { language } => {
            let mut config = AudiobookConfig::load()?;
            config.language = language.clone();
            config.save()?;
            println!("Default language set to: {}", language);
        }
        ConfigAction::SetCommand { program, args } => {
            let mut config = AudiobookConfig::load()?;
            config.tts.program = program.clone();
            config.tts.args = args.clone();
            config.save()?;
            println!("TTS command set to: {} {}", program, args.join(" "));
        }
    }
    Ok(())
}
