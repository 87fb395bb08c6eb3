//! `Tapdesk` CLI - Diagnostics for the `Tapdesk` input and clipboard core
//!
//! Provides commands for checking keyboard layout files, inspecting how keys
//! translate for each remote protocol, encoding and decoding Extended
//! Clipboard payloads, and managing the input settings file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tapdesk_core::clipboard::{compress_clipboard_text, decompress_clipboard_text};
use tapdesk_core::config::{ConfigManager, InputSettings};
use tapdesk_core::input::layout::split_scancode;
use tapdesk_core::input::{
    KeyIdentity, KeyTranslator, KeyboardLayout, LayoutKey, ModifierMask, UsCharacterMap,
};
use tapdesk_core::TapdeskError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// `Tapdesk` command-line interface for input and clipboard diagnostics
#[derive(Parser)]
#[command(name = "tapdesk-cli")]
#[command(author, version, about = "Tapdesk input and clipboard diagnostics")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration directory (defaults to ~/.config/tapdesk)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Keyboard layout files
    #[command(subcommand)]
    Layout(LayoutCommands),

    /// Key translation
    #[command(subcommand)]
    Keys(KeysCommands),

    /// Extended Clipboard payloads
    #[command(subcommand)]
    Clip(ClipCommands),

    /// Input settings file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Layout subcommands
#[derive(Subcommand)]
pub enum LayoutCommands {
    /// Parse a layout file and report its size
    Check {
        /// Path to the layout file
        file: PathBuf,
    },

    /// Show the scancodes a layout assigns to a key
    Lookup {
        #[command(flatten)]
        key: KeyArgs,
    },
}

/// Key translation subcommands
#[derive(Subcommand)]
pub enum KeysCommands {
    /// Translate a key for a remote protocol
    Translate {
        /// Target protocol
        #[arg(short, long, value_enum)]
        protocol: ProtocolArg,

        #[command(flatten)]
        key: KeyArgs,
    },
}

/// Clipboard subcommands
#[derive(Subcommand)]
pub enum ClipCommands {
    /// Compress text into a PROVIDE payload, printed as hex
    Encode {
        /// Clipboard text
        text: String,
    },

    /// Decompress a hex PROVIDE payload into text
    Decode {
        /// Payload as hex digits
        hex: String,
    },
}

/// Settings subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings
    Show,

    /// Write the default settings file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// A key given by platform key code or by character
#[derive(Args)]
pub struct KeyArgs {
    /// Platform key code
    #[arg(long, required_unless_present = "character", conflicts_with = "character")]
    code: Option<u32>,

    /// Character, typed as a synthesized Unicode key
    #[arg(long = "char")]
    character: Option<char>,

    /// Shift is held
    #[arg(long)]
    shift: bool,

    /// Alt is held
    #[arg(long)]
    alt: bool,
}

impl KeyArgs {
    fn identity(&self) -> Result<KeyIdentity, CliError> {
        match (self.code, self.character) {
            (Some(code), None) => Ok(KeyIdentity::Code(code)),
            (None, Some(ch)) => Ok(KeyIdentity::Unicode(ch)),
            _ => Err(CliError::Config(
                "Exactly one of --code and --char is required".to_string(),
            )),
        }
    }

    fn meta(&self) -> ModifierMask {
        let mut meta = ModifierMask::NONE;
        meta.set(ModifierMask::SHIFT_LEFT, self.shift);
        meta.set(ModifierMask::ALT_LEFT, self.alt);
        meta
    }
}

/// Remote protocol argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProtocolArg {
    /// VNC (keysyms)
    Rfb,
    /// RDP (virtual keys)
    Rdp,
    /// SPICE (scancodes)
    Spice,
}

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, layout, or I/O errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Decode failure - input could not be decoded
    pub const DECODE_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Keyboard layout error
    #[error("Layout error: {0}")]
    Layout(String),

    /// Input could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Error reported by the core library
    #[error(transparent)]
    Core(#[from] TapdeskError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 1: General error (configuration, layout, IO)
    /// - 2: Decode failure, including clipboard payload errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Decode(_) | Self::Core(TapdeskError::Clipboard(_)) => {
                exit_codes::DECODE_FAILURE
            }
            Self::Config(_) | Self::Layout(_) | Self::Io(_) | Self::Core(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(&cli).map(|output| print!("{output}"));

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

/// Runs a command and returns what it prints
fn run(cli: &Cli) -> Result<String, CliError> {
    let manager = config_manager(cli.config.as_deref())?;
    match &cli.command {
        Commands::Layout(LayoutCommands::Check { file }) => cmd_layout_check(file),
        Commands::Layout(LayoutCommands::Lookup { key }) => cmd_layout_lookup(&manager, key),
        Commands::Keys(KeysCommands::Translate { protocol, key }) => {
            cmd_keys_translate(&manager, *protocol, key)
        }
        Commands::Clip(ClipCommands::Encode { text }) => cmd_clip_encode(text),
        Commands::Clip(ClipCommands::Decode { hex }) => cmd_clip_decode(hex),
        Commands::Config(ConfigCommands::Show) => cmd_config_show(&manager),
        Commands::Config(ConfigCommands::Init { force }) => cmd_config_init(&manager, *force),
    }
}

fn config_manager(dir: Option<&Path>) -> Result<ConfigManager, CliError> {
    match dir {
        Some(dir) => Ok(ConfigManager::with_config_dir(dir.to_path_buf())),
        None => ConfigManager::new()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}"))),
    }
}

/// Layout check command handler
fn cmd_layout_check(file: &Path) -> Result<String, CliError> {
    let text = std::fs::read_to_string(file)?;
    let name = file
        .file_name()
        .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned());
    let layout = KeyboardLayout::parse(&name, &text).map_err(|e| CliError::Layout(e.to_string()))?;
    Ok(format!("{}: {} keys\n", layout.name(), layout.len()))
}

/// Layout lookup command handler
fn cmd_layout_lookup(manager: &ConfigManager, key: &KeyArgs) -> Result<String, CliError> {
    let layout = manager.load_keyboard_layout()?;
    let identity = key.identity()?;
    debug!("Looking up {identity} in layout {}", layout.name());

    let Some(entries) = layout.lookup(LayoutKey::from(identity)) else {
        return Ok(format!("{identity}: not mapped in {}\n", layout.name()));
    };

    let mut output = format!("{identity} in {}:\n", layout.name());
    for raw in entries {
        let (scancode, modifiers) = split_scancode(*raw);
        let _ = write!(output, "  scancode {scancode:#06x}");
        if !modifiers.is_empty() {
            let _ = write!(output, " with {modifiers}");
        }
        output.push('\n');
    }
    Ok(output)
}

/// Keys translate command handler
fn cmd_keys_translate(
    manager: &ConfigManager,
    protocol: ProtocolArg,
    key: &KeyArgs,
) -> Result<String, CliError> {
    let char_map = Arc::new(UsCharacterMap);
    let translator = match protocol {
        ProtocolArg::Rfb => KeyTranslator::rfb(char_map),
        ProtocolArg::Rdp => KeyTranslator::rdp(char_map),
        ProtocolArg::Spice => KeyTranslator::spice(Arc::new(manager.load_keyboard_layout()?), char_map),
    };

    let identity = key.identity()?;
    let translated = translator.translate(identity, key.meta());
    if translated.is_empty() {
        return Ok(format!(
            "{identity}: no {} mapping, the key would be dropped\n",
            translator.protocol()
        ));
    }

    let mut output = String::new();
    for entry in translated {
        let _ = write!(output, "{}", entry.key);
        if !entry.modifiers.is_empty() {
            let _ = write!(output, " with {}", entry.modifiers);
        }
        output.push('\n');
    }
    Ok(output)
}

/// Clip encode command handler
fn cmd_clip_encode(text: &str) -> Result<String, CliError> {
    let compressed = compress_clipboard_text(text).map_err(TapdeskError::from)?;
    Ok(format!("{}\n", hex::encode(compressed)))
}

/// Clip decode command handler
fn cmd_clip_decode(payload: &str) -> Result<String, CliError> {
    let digits: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let data = hex::decode(digits).map_err(|e| CliError::Decode(format!("invalid hex: {e}")))?;
    match decompress_clipboard_text(&data).map_err(TapdeskError::from)? {
        Some(text) => Ok(format!("{text}\n")),
        None => Err(CliError::Decode("payload carries no text".to_string())),
    }
}

/// Config show command handler
fn cmd_config_show(manager: &ConfigManager) -> Result<String, CliError> {
    let settings = manager
        .load_settings()
        .map_err(|e| CliError::Config(format!("Failed to load settings: {e}")))?;
    let text = toml::to_string_pretty(&settings)
        .map_err(|e| CliError::Config(format!("Failed to serialize settings: {e}")))?;
    Ok(format!("# {}\n{text}", manager.settings_path().display()))
}

/// Config init command handler
fn cmd_config_init(manager: &ConfigManager, force: bool) -> Result<String, CliError> {
    let path = manager.settings_path();
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    manager
        .save_settings(&InputSettings::default())
        .map_err(|e| CliError::Config(format!("Failed to save settings: {e}")))?;
    Ok(format!("Wrote {}\n", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapdesk_core::input::keycodes::KEYCODE_A;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tapdesk-cli").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_clip_encode_decode() {
        let hex = cmd_clip_encode("hello\nworld").unwrap();
        assert_eq!(cmd_clip_decode(hex.trim()).unwrap(), "hello\nworld\n");
    }

    #[test]
    fn test_clip_decode_errors_use_decode_exit_code() {
        let err = cmd_clip_decode("abc").unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::DECODE_FAILURE);

        let err = cmd_clip_decode("zz").unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::DECODE_FAILURE);

        let err = cmd_clip_decode("deadbeef").unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::DECODE_FAILURE);
    }

    #[test]
    fn test_clip_decode_ignores_whitespace() {
        let hex = cmd_clip_encode("spaced").unwrap();
        let (head, tail) = hex.trim().split_at(6);
        let wrapped = format!("  {head}\n{tail} ");
        assert_eq!(cmd_clip_decode(&wrapped).unwrap(), "spaced\n");
    }

    #[test]
    fn test_clip_decode_bad_hex_is_decode_error() {
        assert!(matches!(cmd_clip_decode("0g"), Err(CliError::Decode(_))));
        assert!(matches!(
            cmd_clip_decode("deadbeef"),
            Err(CliError::Core(TapdeskError::Clipboard(_)))
        ));
    }

    #[test]
    fn test_keys_translate_rfb() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().to_string_lossy().into_owned();
        let cli = cli(&[
            "--config", &config, "keys", "translate", "--protocol", "rfb", "--char", "a",
        ]);
        let output = run(&cli).unwrap();
        assert_eq!(output, "keysym 0x0061\n");
    }

    #[test]
    fn test_keys_translate_spice_uses_layout() {
        let dir = TempDir::new().unwrap();
        let code = KEYCODE_A.to_string();
        let config = dir.path().to_string_lossy().into_owned();
        let cli = cli(&[
            "--config", &config, "keys", "translate", "--protocol", "spice", "--code", &code,
        ]);
        let output = run(&cli).unwrap();
        assert!(output.starts_with("scancode"), "{output}");
    }

    #[test]
    fn test_keys_translate_spice_reports_bad_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("input.toml"), "[keyboard]\nlayout = \" \"\n").unwrap();
        let config = dir.path().to_string_lossy().into_owned();
        let cli = cli(&[
            "--config", &config, "keys", "translate", "--protocol", "spice", "--char", "a",
        ]);
        let err = run(&cli).unwrap_err();
        assert!(matches!(err, CliError::Core(TapdeskError::Config(_))), "{err}");
        assert_eq!(err.exit_code(), exit_codes::GENERAL_ERROR);
    }

    #[test]
    fn test_key_args_are_exclusive() {
        let result = Cli::try_parse_from([
            "tapdesk-cli", "keys", "translate", "--protocol", "rdp", "--code", "29", "--char", "a",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_init_and_show() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("tapdesk").to_string_lossy().into_owned();

        let output = run(&cli(&["--config", &config, "config", "init"])).unwrap();
        assert!(output.starts_with("Wrote"));
        assert!(run(&cli(&["--config", &config, "config", "init"])).is_err());
        assert!(run(&cli(&["--config", &config, "config", "init", "--force"])).is_ok());

        let shown = run(&cli(&["--config", &config, "config", "show"])).unwrap();
        assert!(shown.contains("layout = \"en-us\""));
        assert!(shown.contains("rdp_modifier_delay_ms = 20"));
    }

    #[test]
    fn test_layout_check() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test-layout");
        std::fs::write(&path, "29 0x1e\n").unwrap();
        let output = cmd_layout_check(&path).unwrap();
        assert_eq!(output, "test-layout: 1 keys\n");
    }
}
