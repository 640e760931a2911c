use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};

use affiliate_studio::angles::AnalysisResult;
use affiliate_studio::config::Config;
use affiliate_studio::gemini::{self, CapabilityProvider, ClientConfig, GeminiClient, PollPolicy};
use affiliate_studio::media::{self, DataUri};
use affiliate_studio::prompt::{GenerationInputs, Ratio, Tone, VisualStyle};

/// Parse and validate an aspect ratio (9:16, 16:9, 1:1)
fn parse_ratio(s: &str) -> Result<Ratio, String> {
    Ratio::from_str(s)
        .ok_or_else(|| format!("Unknown ratio '{}'. Available ratios: 9:16, 16:9, 1:1", s))
}

/// Parse a visual style preset
fn parse_visual_style(s: &str) -> Result<VisualStyle, String> {
    VisualStyle::from_str(s).ok_or_else(|| {
        format!(
            "Unknown style '{}'. Available styles: realistic, hyper-realistic, cinematic, \
             aesthetic, warm-indonesia-rural, urban-clean",
            s
        )
    })
}

/// Parse a caption tone preset
fn parse_tone(s: &str) -> Result<Tone, String> {
    Tone::from_str(s).ok_or_else(|| {
        format!(
            "Unknown tone '{}'. Available tones: soft-sell, hard-sell, storytelling, \
             edukasi, luxury, friendly",
            s
        )
    })
}

/// Parse and validate a video wait limit in seconds (must be > 0)
fn parse_timeout_secs(s: &str) -> Result<u64, String> {
    let secs: u64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number of seconds", s))?;
    if secs == 0 {
        return Err("Timeout must be greater than 0 seconds".to_string());
    }
    Ok(secs)
}

/// affiliate-studio: TikTok affiliate content studio powered by Gemini
#[derive(Parser)]
#[command(name = "affiliate-studio")]
#[command(version, about = "TikTok affiliate content studio powered by Gemini")]
#[command(long_about = "Analyze a product link into ten ready-to-shoot video angles \
    (Veo prompt, hook, script, caption, and hashtags per angle), edit product \
    photos with the image model, and animate them into short vertical videos.")]
#[command(after_help = "EXAMPLES:
    # Analyze a product link with default settings
    affiliate-studio generate --link https://shop.example/product/123

    # Cinematic hard-sell angles in landscape
    affiliate-studio generate -l https://shop.example/item -s cinematic -t hard-sell -r 16:9

    # Give a product photo a cinematic regrade
    affiliate-studio edit-image --image photo.jpg

    # Animate a product photo into a vertical clip
    affiliate-studio animate --image photo.jpg --prompt \"Slow dolly-in on the product\"

ENVIRONMENT:
    GEMINI_API_KEY    Your Gemini API key. Video generation additionally
                      requires the key to belong to a billing-enabled project.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the ten-angle affiliate analysis for a product link
    ///
    /// Sends the product link to the text model and prints the product
    /// analysis followed by the parsed angle blocks.
    #[command(after_help = "EXAMPLES:
    affiliate-studio generate --link https://shop.example/product/123
    affiliate-studio generate -l https://shop.example/item --style aesthetic --tone storytelling
    affiliate-studio generate -l https://shop.example/item --output analysis.txt

ENVIRONMENT:
    GEMINI_API_KEY    Required. Your Gemini API key.")]
    Generate {
        /// Product page URL to analyze
        #[arg(long, short = 'l')]
        link: String,

        /// Aspect ratio for the video concepts (9:16, 16:9, 1:1)
        /// Default: 9:16 (or from config file)
        #[arg(long, short = 'r', value_parser = parse_ratio)]
        ratio: Option<Ratio>,

        /// Visual style for the Veo prompts (realistic, hyper-realistic,
        /// cinematic, aesthetic, warm-indonesia-rural, urban-clean)
        /// Default: hyper-realistic (or from config file)
        #[arg(long, short = 's', value_parser = parse_visual_style)]
        style: Option<VisualStyle>,

        /// Caption tone (soft-sell, hard-sell, storytelling, edukasi, luxury, friendly)
        /// Default: soft-sell (or from config file)
        #[arg(long, short = 't', value_parser = parse_tone)]
        tone: Option<Tone>,

        /// Save the raw model output to a file as well
        #[arg(long, short = 'O')]
        output: Option<PathBuf>,

        /// Custom config file path (default: ~/.config/affiliate-studio/config.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Edit a product photo with the image model
    ///
    /// Uploads the photo with an edit instruction and saves the image the
    /// model returns.
    #[command(after_help = "EXAMPLES:
    affiliate-studio edit-image --image photo.jpg
    affiliate-studio edit-image -i photo.png --instruction \"Place the product on a marble table\"
    affiliate-studio edit-image -i photo.png -O studio-shot.png

ENVIRONMENT:
    GEMINI_API_KEY    Required. Your Gemini API key.")]
    EditImage {
        /// Path to the source image (png, jpg, jpeg, webp, gif, bmp)
        #[arg(long, short = 'i')]
        image: PathBuf,

        /// Edit instruction for the model
        /// Default: a stock "more cinematic" instruction
        #[arg(long)]
        instruction: Option<String>,

        /// Output file path (default: edited-<hash>.<ext> in the current directory)
        #[arg(long, short = 'O')]
        output: Option<PathBuf>,

        /// Custom config file path (default: ~/.config/affiliate-studio/config.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Animate a product photo into a short vertical video
    ///
    /// Submits the photo to the Veo model, polls until the job finishes,
    /// and downloads the result. Requires a paid-tier API key.
    #[command(after_help = "EXAMPLES:
    affiliate-studio animate --image photo.jpg
    affiliate-studio animate -i photo.jpg --prompt \"Steam rising from the cup, soft light\"
    affiliate-studio animate -i photo.jpg --timeout-secs 1200
    affiliate-studio animate -i photo.jpg --wait-forever -O clip.mp4

ENVIRONMENT:
    GEMINI_API_KEY    Required. Must belong to a billing-enabled project;
                      Veo is not available on the free tier.")]
    Animate {
        /// Path to the source image (png, jpg, jpeg, webp, gif, bmp)
        #[arg(long, short = 'i')]
        image: PathBuf,

        /// Animation prompt for the video model
        /// Default: a stock "animate cinematically" prompt
        #[arg(long, short = 'p')]
        prompt: Option<String>,

        /// Output file path (default: animated-<hash>.mp4 in the current directory)
        #[arg(long, short = 'O')]
        output: Option<PathBuf>,

        /// How long to wait for the video before giving up, in seconds
        /// Default: 600 (or from config file)
        #[arg(long, value_parser = parse_timeout_secs)]
        timeout_secs: Option<u64>,

        /// Keep polling until the job finishes, with no time limit
        #[arg(long, conflicts_with = "timeout_secs")]
        wait_forever: bool,

        /// Custom config file path (default: ~/.config/affiliate-studio/config.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

/// CLI gate for the paid video capability: checks the environment for a key
/// and walks the user through configuring one when it is missing.
struct EnvKeyCheck;

impl CapabilityProvider for EnvKeyCheck {
    fn has_credential(&self) -> bool {
        std::env::var(gemini::GEMINI_API_KEY_ENV)
            .map(|key| !key.is_empty())
            .unwrap_or(false)
    }

    fn request_credential(&self) {
        eprintln!("GEMINI_API_KEY environment variable is not set.");
        eprintln!();
        eprintln!("Video generation runs on the paid Veo tier. Add a key from a");
        eprintln!("billing-enabled project to a .env file:");
        eprintln!("    echo 'GEMINI_API_KEY=your-api-key-here' >> .env");
        eprintln!();
        eprintln!("Or set it as an environment variable:");
        eprintln!("    export GEMINI_API_KEY=\"your-api-key-here\"");
        eprintln!();
        eprintln!("Billing details: https://ai.google.dev/gemini-api/docs/billing");
    }
}

/// Load the config file for a command.
///
/// An explicit --config path must load; a missing or broken file at the
/// default path only warns and falls back to defaults.
fn load_config(path: Option<&Path>) -> Result<Config, String> {
    match Config::load(path) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            if path.is_some() {
                return Err(e.to_string());
            }
            eprintln!("Warning: Failed to load config file: {}", e);
            eprintln!("Using default settings.\n");
            Ok(Config::default())
        }
    }
}

/// API settings for one command invocation.
///
/// The key is read from the environment on every call rather than once at
/// startup, so a key exported mid-session is picked up by the next command.
fn build_client_config(cfg: &Config) -> ClientConfig {
    match cfg.api.base_url.as_deref() {
        Some(base_url) => {
            let api_key = std::env::var(gemini::GEMINI_API_KEY_ENV).unwrap_or_default();
            ClientConfig::with_base_url(api_key, base_url)
        }
        None => ClientConfig::from_env(),
    }
}

/// Resolve how long the animate command waits for a video.
fn resolve_poll_policy(wait_forever: bool, timeout_secs: Option<u64>, cfg: &Config) -> PollPolicy {
    // Poll policy: CLI flags > config file > built-in default (bounded)
    if wait_forever {
        PollPolicy::Unbounded
    } else if let Some(secs) = timeout_secs {
        PollPolicy::Bounded(Duration::from_secs(secs))
    } else if cfg.video.wait_forever.unwrap_or(false) {
        PollPolicy::Unbounded
    } else {
        let secs = cfg
            .video
            .timeout_secs
            .unwrap_or(gemini::DEFAULT_GENERATION_TIMEOUT.as_secs());
        PollPolicy::Bounded(Duration::from_secs(secs))
    }
}

/// Read an image file and determine its MIME type from the extension.
fn read_image(path: &Path) -> Result<(Vec<u8>, &'static str), String> {
    let mime_type = media::mime_for_path(path).ok_or_else(|| {
        format!(
            "Unsupported image type '{}'. Supported extensions: png, jpg, jpeg, webp, gif, bmp",
            path.display()
        )
    })?;
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read image '{}': {}", path.display(), e))?;
    Ok((bytes, mime_type))
}

/// Format a byte count in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Print the parsed analysis: the general section first, then each angle
/// under its own title.
fn print_analysis(analysis: &AnalysisResult) {
    let general = analysis.general_analysis.trim();
    if !general.is_empty() {
        println!("{}", general);
    }

    if analysis.angles.is_empty() {
        println!();
        println!("(no angle sections found in the model output)");
        return;
    }

    for angle in &analysis.angles {
        println!();
        println!("─── {} ───", angle.title);
        println!("{}", angle.content.trim());
    }
}

/// Run the generate command: analyze a product link into angle concepts
fn run_generate(
    link: &str,
    ratio: Option<Ratio>,
    style: Option<VisualStyle>,
    tone: Option<Tone>,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<(), String> {
    let cfg = load_config(config_path)?;

    // Merge settings: CLI args > config file > built-in defaults
    // Ratio: CLI > config > default (9:16)
    let ratio = match ratio {
        Some(r) => r,
        None => match cfg.generator.ratio.as_deref() {
            Some(s) => parse_ratio(s).map_err(|e| format!("Invalid ratio in config file: {}", e))?,
            None => Ratio::default(),
        },
    };

    // Style: CLI > config > default (hyper-realistic)
    let style = match style {
        Some(s) => s,
        None => match cfg.generator.visual_style.as_deref() {
            Some(s) => {
                parse_visual_style(s).map_err(|e| format!("Invalid style in config file: {}", e))?
            }
            None => VisualStyle::default(),
        },
    };

    // Tone: CLI > config > default (soft-sell)
    let tone = match tone {
        Some(t) => t,
        None => match cfg.generator.tone.as_deref() {
            Some(s) => parse_tone(s).map_err(|e| format!("Invalid tone in config file: {}", e))?,
            None => Tone::default(),
        },
    };

    let inputs = GenerationInputs {
        product_link: link.to_string(),
        ratio,
        visual_style: style,
        tone,
    };
    let client_config = build_client_config(&cfg);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    rt.block_on(async {
        let client =
            GeminiClient::new().map_err(|e| format!("Failed to create API client: {}", e))?;

        println!("Analyzing product link: {}", inputs.product_link);
        println!("  Ratio: {}   Style: {}   Tone: {}", ratio, style, tone);
        println!();
        print!("Generating angles... ");
        std::io::Write::flush(&mut std::io::stdout()).ok();

        let analysis = client
            .generate_affiliate_content(&client_config, &inputs)
            .await
            .map_err(|e| format!("Generation failed: {}", e))?;
        println!("done");
        println!();

        print_analysis(&analysis);

        if let Some(path) = output {
            std::fs::write(path, &analysis.raw)
                .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
            println!();
            println!("Raw output saved to: {}", path.display());
        }

        Ok(())
    })
}

/// Run the edit-image command: regrade a product photo and save the result
fn run_edit_image(
    image: &Path,
    instruction: Option<&str>,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<(), String> {
    let cfg = load_config(config_path)?;
    let (image_bytes, mime_type) = read_image(image)?;
    let client_config = build_client_config(&cfg);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    rt.block_on(async {
        let client =
            GeminiClient::new().map_err(|e| format!("Failed to create API client: {}", e))?;

        print!("Editing image... ");
        std::io::Write::flush(&mut std::io::stdout()).ok();

        // Empty instruction falls back to the stock one inside the client
        let data_uri = client
            .edit_image(
                &client_config,
                &image_bytes,
                mime_type,
                instruction.unwrap_or(""),
            )
            .await
            .map_err(|e| format!("Image edit failed: {}", e))?;
        println!("done");

        let parsed = DataUri::parse(&data_uri)
            .map_err(|e| format!("Model returned an unusable image payload: {}", e))?;

        let dest = match output {
            Some(path) => path.to_path_buf(),
            None => {
                let stem = media::stable_stem(&[
                    image_bytes.as_slice(),
                    instruction.unwrap_or("").as_bytes(),
                ]);
                PathBuf::from(format!(
                    "edited-{}.{}",
                    stem,
                    media::extension_for_mime(&parsed.mime_type)
                ))
            }
        };

        std::fs::write(&dest, &parsed.data)
            .map_err(|e| format!("Failed to write '{}': {}", dest.display(), e))?;

        println!();
        println!("Edited image ready!");
        println!("  Path: {}", dest.display());
        println!("  Size: {}", format_size(parsed.data.len() as u64));

        Ok(())
    })
}

/// Run the animate command: turn a product photo into a short video
fn run_animate(
    image: &Path,
    prompt: Option<&str>,
    output: Option<&Path>,
    timeout_secs: Option<u64>,
    wait_forever: bool,
    config_path: Option<&Path>,
) -> Result<(), String> {
    let cfg = load_config(config_path)?;

    // Gate the paid video capability before doing any work at all
    let capability = EnvKeyCheck;
    if !capability.has_credential() {
        capability.request_credential();
        return Err("Video generation requires a configured API key".to_string());
    }

    let (image_bytes, mime_type) = read_image(image)?;
    let policy = resolve_poll_policy(wait_forever, timeout_secs, &cfg);
    let client_config = build_client_config(&cfg);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    rt.block_on(async {
        let client =
            GeminiClient::new().map_err(|e| format!("Failed to create API client: {}", e))?;

        println!("Animating image: {}", image.display());
        match policy {
            PollPolicy::Bounded(limit) => println!(
                "  Waiting up to {}s, polling every {}s",
                limit.as_secs(),
                gemini::DEFAULT_POLL_INTERVAL.as_secs()
            ),
            PollPolicy::Unbounded => println!(
                "  Waiting without a time limit, polling every {}s",
                gemini::DEFAULT_POLL_INTERVAL.as_secs()
            ),
        }
        print!("Generating video... ");
        std::io::Write::flush(&mut std::io::stdout()).ok();

        let video_url = client
            .animate_image(
                &client_config,
                &capability,
                &image_bytes,
                mime_type,
                prompt,
                policy,
            )
            .await
            .map_err(|e| match e {
                gemini::GeminiError::Timeout => "Video generation timed out. Pass a larger \
                     --timeout-secs, or --wait-forever to keep waiting."
                    .to_string(),
                other => other.to_string(),
            })?;
        println!("done");

        print!("Downloading video... ");
        std::io::Write::flush(&mut std::io::stdout()).ok();

        let dest = match output {
            Some(path) => path.to_path_buf(),
            None => {
                let stem = media::stable_stem(&[
                    image_bytes.as_slice(),
                    prompt.unwrap_or("").as_bytes(),
                ]);
                PathBuf::from(format!("animated-{}.mp4", stem))
            }
        };

        let saved = client
            .download_video(&video_url, &dest)
            .await
            .map_err(|e| format!("Failed to download video: {}", e))?;
        println!("done");

        let size = std::fs::metadata(&saved).map(|m| m.len()).unwrap_or(0);
        println!();
        println!("Video ready!");
        println!("  Path: {}", saved.display());
        println!("  Size: {}", format_size(size));

        Ok(())
    })
}

/// Load .env file and check for GEMINI_API_KEY
///
/// Loads environment variables from .env file in the project root.
/// Does not override existing environment variables.
/// Warns if GEMINI_API_KEY is not set.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();

    let missing = std::env::var(gemini::GEMINI_API_KEY_ENV)
        .map(|key| key.is_empty())
        .unwrap_or(true);
    if missing {
        eprintln!("Warning: GEMINI_API_KEY environment variable not set.");
        eprintln!("         Generation commands will fail until a key is configured.");
        eprintln!("         Set GEMINI_API_KEY in .env or the environment.\n");
    }
}

fn main() {
    // Load .env file before anything else
    load_env();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            link,
            ratio,
            style,
            tone,
            output,
            config,
        } => {
            if let Err(e) = run_generate(
                &link,
                ratio,
                style,
                tone,
                output.as_deref(),
                config.as_deref(),
            ) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::EditImage {
            image,
            instruction,
            output,
            config,
        } => {
            if let Err(e) = run_edit_image(
                &image,
                instruction.as_deref(),
                output.as_deref(),
                config.as_deref(),
            ) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Animate {
            image,
            prompt,
            output,
            timeout_secs,
            wait_forever,
            config,
        } => {
            if let Err(e) = run_animate(
                &image,
                prompt.as_deref(),
                output.as_deref(),
                timeout_secs,
                wait_forever,
                config.as_deref(),
            ) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use affiliate_studio::config::VideoConfig;

    #[test]
    fn test_parse_ratio_accepts_known_labels() {
        assert_eq!(parse_ratio("9:16"), Ok(Ratio::Portrait));
        assert_eq!(parse_ratio("16:9"), Ok(Ratio::Landscape));
        assert_eq!(parse_ratio("1:1"), Ok(Ratio::Square));
    }

    #[test]
    fn test_parse_ratio_rejects_unknown() {
        let err = parse_ratio("4:3").unwrap_err();
        assert!(err.contains("Unknown ratio"));
        assert!(err.contains("9:16"));
    }

    #[test]
    fn test_parse_visual_style_accepts_kebab_and_label() {
        assert_eq!(
            parse_visual_style("warm-indonesia-rural"),
            Ok(VisualStyle::WarmIndonesiaRural)
        );
        assert_eq!(
            parse_visual_style("Hyper-Realistic"),
            Ok(VisualStyle::HyperRealistic)
        );
        assert!(parse_visual_style("sketchy").is_err());
    }

    #[test]
    fn test_parse_tone_accepts_kebab_and_label() {
        assert_eq!(parse_tone("hard-sell"), Ok(Tone::HardSell));
        assert_eq!(parse_tone("Soft Sell"), Ok(Tone::SoftSell));
        assert!(parse_tone("aggressive").is_err());
    }

    #[test]
    fn test_parse_timeout_secs() {
        assert_eq!(parse_timeout_secs("600"), Ok(600));
        assert!(parse_timeout_secs("0").is_err());
        assert!(parse_timeout_secs("ten").is_err());
    }

    fn config_with_video(timeout_secs: Option<u64>, wait_forever: Option<bool>) -> Config {
        Config {
            video: VideoConfig {
                timeout_secs,
                wait_forever,
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_resolve_poll_policy_cli_beats_config() {
        let cfg = config_with_video(Some(60), Some(true));

        // Explicit CLI timeout wins over the config's wait_forever
        assert_eq!(
            resolve_poll_policy(false, Some(120), &cfg),
            PollPolicy::Bounded(Duration::from_secs(120))
        );
        // The CLI flag wins over everything
        assert_eq!(resolve_poll_policy(true, None, &cfg), PollPolicy::Unbounded);
    }

    #[test]
    fn test_resolve_poll_policy_config_and_default() {
        let cfg = config_with_video(Some(60), None);
        assert_eq!(
            resolve_poll_policy(false, None, &cfg),
            PollPolicy::Bounded(Duration::from_secs(60))
        );

        let cfg = config_with_video(None, Some(true));
        assert_eq!(resolve_poll_policy(false, None, &cfg), PollPolicy::Unbounded);

        let cfg = Config::default();
        assert_eq!(
            resolve_poll_policy(false, None, &cfg),
            PollPolicy::Bounded(gemini::DEFAULT_GENERATION_TIMEOUT)
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_cli_parses_generate_command() {
        let cli = Cli::try_parse_from([
            "affiliate-studio",
            "generate",
            "--link",
            "https://shop.example/item",
            "--style",
            "cinematic",
            "--tone",
            "hard-sell",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate {
                link, style, tone, ..
            } => {
                assert_eq!(link, "https://shop.example/item");
                assert_eq!(style, Some(VisualStyle::Cinematic));
                assert_eq!(tone, Some(Tone::HardSell));
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_cli_rejects_wait_forever_with_timeout() {
        let result = Cli::try_parse_from([
            "affiliate-studio",
            "animate",
            "--image",
            "photo.png",
            "--wait-forever",
            "--timeout-secs",
            "60",
        ]);
        assert!(result.is_err());
    }
}
