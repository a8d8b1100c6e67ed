use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crf_core::dictionary::DrugCatalog;
use crf_core::payload::Payload;
use crf_core::progress::ColorBand;
use crf_core::{schema, therapy, FormState, RecordId};
use crf_types::{DictCode, RegistryType};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "crf")]
#[command(about = "Registry form engine inspection CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sections of a registry schema
    Sections {
        /// Registry type (ALK or ROS1)
        registry: String,
    },
    /// Show per-section completion for a stored record
    Progress {
        /// Registry type (ALK or ROS1)
        registry: String,
        /// Path to the record payload (flat JSON object)
        record: PathBuf,
        /// Drug catalog JSON ({"DRUG_CODE": "PARENT_CLASS", ...})
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Report date-rule violations in a stored record
    Validate {
        /// Registry type (ALK or ROS1)
        registry: String,
        /// Path to the record payload (flat JSON object)
        record: PathBuf,
        /// Drug catalog JSON ({"DRUG_CODE": "PARENT_CLASS", ...})
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Classify a drug selection into therapy class and regimen
    Classify {
        /// Drug codes
        drugs: Vec<String>,
        /// Drug catalog JSON ({"DRUG_CODE": "PARENT_CLASS", ...})
        #[arg(long)]
        catalog: PathBuf,
    },
}

fn load_catalog(path: Option<&PathBuf>) -> Result<DrugCatalog, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(DrugCatalog::default());
    };
    let raw = fs::read_to_string(path)?;
    let pairs: std::collections::BTreeMap<String, String> = serde_json::from_str(&raw)?;
    Ok(DrugCatalog::from_pairs(
        pairs.iter().map(|(code, parent)| (code.as_str(), parent.as_str())),
    ))
}

fn load_state(
    registry: &str,
    record: &PathBuf,
    catalog: Option<&PathBuf>,
) -> Result<FormState, Box<dyn std::error::Error>> {
    let registry: RegistryType = registry.parse()?;
    let raw = fs::read_to_string(record)?;
    let payload: Payload = serde_json::from_str(&raw)?;
    let catalog = load_catalog(catalog)?;
    Ok(FormState::load(registry, RecordId::new(), &payload, catalog))
}

fn band_label(band: ColorBand) -> &'static str {
    match band {
        ColorBand::None => "-",
        ColorBand::Red => "red",
        ColorBand::Yellow => "yellow",
        ColorBand::Green => "green",
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("crf=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Sections { registry }) => {
            let registry: RegistryType = registry.parse()?;
            for section in schema::sections(registry) {
                println!("{}: {}", section.id, section.title);
            }
        }
        Some(Commands::Progress {
            registry,
            record,
            catalog,
        }) => {
            let state = load_state(&registry, &record, catalog.as_ref())?;
            for overview in state.section_list() {
                println!(
                    "{:<22} {:>3}%  {:?} ({})",
                    overview.id,
                    overview.progress.percentage,
                    overview.progress.status,
                    band_label(overview.progress.color())
                );
            }
        }
        Some(Commands::Validate {
            registry,
            record,
            catalog,
        }) => {
            let state = load_state(&registry, &record, catalog.as_ref())?;
            let errors = state.validation_errors();
            if errors.is_empty() {
                println!("No date-rule violations.");
            } else {
                for (field, message) in errors {
                    println!("{field}: {message}");
                }
            }
        }
        Some(Commands::Classify { drugs, catalog }) => {
            let catalog = load_catalog(Some(&catalog))?;
            let codes = drugs
                .into_iter()
                .map(DictCode::new)
                .collect::<Result<std::collections::BTreeSet<_>, _>>()?;
            let composition = therapy::resolve(&codes, &catalog);
            match (composition.class, composition.regimen) {
                (Some(class), Some(regimen)) => {
                    println!("class: {}", class.as_code());
                    println!("regimen: {}", regimen.as_code());
                }
                _ => println!("unclassified (no drugs selected)"),
            }
        }
        None => {
            println!("Use 'crf --help' for commands");
        }
    }

    Ok(())
}
