mod capture;

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value};
use snapfit_contracts::capture::{CapturedImage, StoredCapture};
use snapfit_contracts::result::{IdentificationResult, MergedIdentification};
use snapfit_contracts::search::{build_search_url, SearchTerms, DEFAULT_SEARCH_BASE};
use snapfit_contracts::storage::{CaptureStore, FlashSetting, JsonFileStore};
use snapfit_engine::config::timeout_from_seconds;
use snapfit_engine::prompts::PromptContract;
use snapfit_engine::{
    BrandInferenceClient, DryrunIdentifier, EngineConfig, IdentificationSession, Identifier,
    ResultMerger, VisionTagClient,
};

use crate::capture::{prepare_capture, DEFAULT_MAX_DIM};

const DEFAULT_STORE_PATH: &str = ".snapfit/store.json";

#[derive(Debug, Parser)]
#[command(name = "snapfit", version, about = "Identify the garment in a photo")]
struct Cli {
    /// JSON file holding the last capture and settings.
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Identify(IdentifyArgs),
    Last(LastArgs),
    Flash(FlashArgs),
    SearchUrl(SearchUrlArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Unified,
    Dual,
    Dryrun,
}

#[derive(Debug, Parser)]
struct IdentifyArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long, value_enum, default_value_t = Mode::Unified)]
    mode: Mode,
    #[arg(long)]
    model: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<f64>,
    #[arg(long)]
    prompt_file: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_MAX_DIM)]
    max_dim: u32,
    #[arg(long, default_value = DEFAULT_SEARCH_BASE)]
    search_base: String,
}

#[derive(Debug, Parser)]
struct LastArgs {
    #[arg(long)]
    clear: bool,
    #[arg(long, default_value = DEFAULT_SEARCH_BASE)]
    search_base: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FlashArg {
    On,
    Off,
    Auto,
}

impl From<FlashArg> for FlashSetting {
    fn from(value: FlashArg) -> Self {
        match value {
            FlashArg::On => FlashSetting::On,
            FlashArg::Off => FlashSetting::Off,
            FlashArg::Auto => FlashSetting::Auto,
        }
    }
}

#[derive(Debug, Parser)]
struct FlashArgs {
    #[arg(long, value_enum)]
    set: Option<FlashArg>,
}

#[derive(Debug, Parser)]
struct SearchUrlArgs {
    /// A saved identification result (unified or dual).
    #[arg(long)]
    result: PathBuf,
    #[arg(long, default_value = DEFAULT_SEARCH_BASE)]
    base: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("snapfit error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let store_path = resolve_store_path(cli.store);
    match cli.command {
        Command::Identify(args) => run_identify(args, store_path),
        Command::Last(args) => run_last(args, store_path),
        Command::Flash(args) => run_flash(args, store_path),
        Command::SearchUrl(args) => run_search_url(args),
    }
}

fn resolve_store_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| {
        env::var("SNAPFIT_STORE")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
}

fn open_store(path: PathBuf) -> Result<JsonFileStore> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create store directory {}", parent.display()))?;
    }
    Ok(JsonFileStore::new(path))
}

fn engine_config(args: &IdentifyArgs) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env();
    if let Some(model) = args.model.as_deref().map(str::trim).filter(|model| !model.is_empty()) {
        config.openai_model = model.to_string();
    }
    if let Some(seconds) = args.timeout {
        config.request_timeout = timeout_from_seconds(seconds);
    }
    if let Some(path) = args.prompt_file.as_deref() {
        config.identify_prompt = PromptContract::from_file(path)?;
    }
    Ok(config)
}

fn run_identify(args: IdentifyArgs, store_path: PathBuf) -> Result<i32> {
    let config = engine_config(&args)?;
    let image = prepare_capture(&args.image, args.max_dim)?;
    let store = open_store(store_path)?;
    match args.mode {
        Mode::Unified => {
            let result = identify_with(BrandInferenceClient::new(&config)?, store, &image)?;
            print_with_search_url(&result, &args.search_base)?;
        }
        Mode::Dual => {
            let merger = ResultMerger::new(
                VisionTagClient::new(&config)?,
                BrandInferenceClient::new(&config)?,
            );
            let merged = identify_with(merger, store, &image)?;
            print_with_search_url(&merged, &args.search_base)?;
            if !merged.has_findings() {
                eprintln!("snapfit: neither service returned any findings");
                return Ok(2);
            }
        }
        Mode::Dryrun => {
            let result = identify_with(DryrunIdentifier::new(), store, &image)?;
            print_with_search_url(&result, &args.search_base)?;
        }
    }
    Ok(0)
}

fn identify_with<I: Identifier>(
    identifier: I,
    store: JsonFileStore,
    image: &CapturedImage,
) -> Result<I::Output> {
    let session = IdentificationSession::new(identifier, store);
    let name = session.identifier().name().to_string();
    session
        .identify(image)
        .with_context(|| format!("{name} identification failed"))
}

fn run_last(args: LastArgs, store_path: PathBuf) -> Result<i32> {
    let store = CaptureStore::new(open_store(store_path)?);
    if args.clear {
        store.clear_last_capture();
        return Ok(0);
    }
    let Some(capture) = store.last_capture::<Value>() else {
        eprintln!("snapfit: no capture stored");
        return Ok(1);
    };
    let search_url = capture
        .result
        .as_ref()
        .and_then(|result| search_url_for_value(result, &args.search_base));
    let StoredCapture {
        image_uri,
        timestamp,
        result,
    } = capture;
    print_json(&json!({
        "imageUri": image_uri,
        "timestamp": timestamp,
        "result": result,
        "searchUrl": search_url,
    }))?;
    Ok(0)
}

fn run_flash(args: FlashArgs, store_path: PathBuf) -> Result<i32> {
    let store = CaptureStore::new(open_store(store_path)?);
    if let Some(setting) = args.set {
        store.set_flash_setting(setting.into());
    }
    print_json(&store.flash_setting())?;
    Ok(0)
}

fn run_search_url(args: SearchUrlArgs) -> Result<i32> {
    let raw = fs::read_to_string(&args.result)
        .with_context(|| format!("failed to read {}", args.result.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", args.result.display()))?;
    if value.get("imageUri").is_some() && value.get("result").is_some() {
        bail!("{} is a stored capture; pass its result object", args.result.display());
    }
    match search_url_for_value(&value, &args.base) {
        Some(url) => {
            println!("{url}");
            Ok(0)
        }
        None => {
            eprintln!("snapfit: result has no searchable fields");
            Ok(1)
        }
    }
}

/// Reads either result shape back and builds its deep link.
fn search_url_for_value(value: &Value, base: &str) -> Option<String> {
    if let Ok(result) = serde_json::from_value::<IdentificationResult>(value.clone()) {
        return build_search_url(&result, base);
    }
    if let Ok(merged) = serde_json::from_value::<MergedIdentification>(value.clone()) {
        return build_search_url(&merged, base);
    }
    log::warn!("stored result matches neither identification shape");
    None
}

fn print_with_search_url<R: Serialize + SearchTerms>(result: &R, search_base: &str) -> Result<()> {
    let mut value = serde_json::to_value(result)?;
    if let Value::Object(object) = &mut value {
        object.insert(
            "searchUrl".to_string(),
            json!(build_search_url(result, search_base)),
        );
    }
    print_json(&value)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
