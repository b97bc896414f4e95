//! Command-line surface.
//!
//! The interactive form UI of the legacy tool is out of scope; its
//! operations survive as subcommands over the same settings store and
//! generation pipeline.

use crate::config::{AppConfig, CONFIG_FILE};
use crate::core::{compose, expand, ledger::TripLedger};
use crate::errors::{Error, Result};
use crate::models::UserRecord;
use clap::{Parser, Subcommand};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "travel-claims", version, about = "差旅费报销文件生成工具")]
pub struct Cli {
    /// Settings store path.
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print station info, rates and claimants.
    Show,
    /// Manage claimants.
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Update the office identity.
    Station {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        county: Option<String>,
        #[arg(long)]
        city: Option<String>,
    },
    /// Update reimbursement rates (yuan).
    Rates {
        #[arg(long)]
        local_food: Option<f64>,
        #[arg(long)]
        local_misc: Option<f64>,
        #[arg(long)]
        county_one_way: Option<f64>,
        #[arg(long)]
        county_round_trip: Option<f64>,
        #[arg(long)]
        city_one_way: Option<f64>,
        #[arg(long)]
        city_round_trip: Option<f64>,
    },
    /// Expand a trips file into a ledger and generate the three documents.
    Generate {
        /// JSON array of trip requests.
        #[arg(long)]
        trips: PathBuf,
        /// Filing date, YYYY-MM-DD.
        #[arg(long)]
        date: String,
        /// Claimant name; defaults to the configured default claimant.
        #[arg(long)]
        claimant: Option<String>,
        /// Output directory for the generated documents.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum UserAction {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        bank: String,
        #[arg(long, default_value = "")]
        card: String,
    },
    Remove {
        name: String,
    },
    SetDefault {
        name: String,
    },
}

/// Parses arguments, loads the settings store and dispatches.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_or_default(&cli.config);

    match cli.command {
        Command::Show => show(&config),
        Command::User { action } => {
            match action {
                UserAction::List => {
                    for (i, user) in config.users.iter().enumerate() {
                        let marker = if i as i64 == config.current_user_index {
                            "*"
                        } else {
                            " "
                        };
                        println!("{marker} {}  {}  {}  {}", user.name, user.phone, user.bank, user.card);
                    }
                    return Ok(());
                }
                UserAction::Add {
                    name,
                    phone,
                    bank,
                    card,
                } => config.add_user(UserRecord {
                    name,
                    phone,
                    bank,
                    card,
                })?,
                UserAction::Remove { name } => config.remove_user(&name)?,
                UserAction::SetDefault { name } => config.set_default_user(&name)?,
            }
            config.save(&cli.config)
        }
        Command::Station { name, county, city } => {
            if let Some(name) = name {
                config.station_info.name = name;
            }
            if let Some(county) = county {
                config.station_info.county = county;
            }
            if let Some(city) = city {
                config.station_info.city = city;
            }
            config.save(&cli.config)
        }
        Command::Rates {
            local_food,
            local_misc,
            county_one_way,
            county_round_trip,
            city_one_way,
            city_round_trip,
        } => {
            let rules = &mut config.rules;
            if let Some(v) = local_food {
                rules.local.food = v;
            }
            if let Some(v) = local_misc {
                rules.local.per_diem_misc = v;
            }
            if let Some(v) = county_one_way {
                rules.county.misc_one_way = v;
            }
            if let Some(v) = county_round_trip {
                rules.county.misc_round_trip = v;
            }
            if let Some(v) = city_one_way {
                rules.city.misc_one_way = v;
            }
            if let Some(v) = city_round_trip {
                rules.city.misc_round_trip = v;
            }
            config.save(&cli.config)
        }
        Command::Generate {
            trips,
            date,
            claimant,
            out_dir,
        } => generate(&config, &trips, &date, claimant.as_deref(), &out_dir),
    }
}

fn show(config: &AppConfig) -> Result<()> {
    let station = &config.station_info;
    println!("供电所: {}  县城: {}  城市: {}", station.name, station.county, station.city);
    let rules = &config.rules;
    println!(
        "辖区: 伙食 {} / 杂费 {}",
        rules.local.food, rules.local.per_diem_misc
    );
    println!(
        "县城: 单程 {} / 往返 {}",
        rules.county.misc_one_way, rules.county.misc_round_trip
    );
    println!(
        "市区: 单程 {} / 往返 {}",
        rules.city.misc_one_way, rules.city.misc_round_trip
    );
    println!("报销人 ({} 位):", config.users.len());
    for user in &config.users {
        println!("  {}", user.name);
    }
    Ok(())
}

fn generate(
    config: &AppConfig,
    trips_path: &Path,
    date: &str,
    claimant: Option<&str>,
    out_dir: &Path,
) -> Result<()> {
    let fill_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| Error::InvalidDate(date.to_string()))?;

    let user = match claimant {
        Some(name) => config
            .user_by_name(name)
            .ok_or_else(|| Error::UnknownUser(name.to_string()))?,
        None => config.current_user().ok_or(Error::NoClaimant)?,
    };

    let contents = fs::read_to_string(trips_path)
        .map_err(|e| Error::Config(format!("Failed to read trips file {trips_path:?}: {e}")))?;
    let requests: Vec<expand::TripRequest> = serde_json::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse trips file {trips_path:?}: {e}")))?;

    let mut ledger = TripLedger::new();
    for request in &requests {
        ledger.append(expand::expand(request, config)?);
    }

    for (date, route, cost, no_car) in ledger.summary_rows() {
        println!("{date}  {route}  {cost} 元{}", if no_car { "  [未派车]" } else { "" });
    }
    println!("总金额: {} 元", ledger.total());

    let report = compose::generate(config, user, fill_date, &ledger, out_dir)?;
    println!("生成完毕, 共 {} 份文件:", report.files.len());
    for file in &report.files {
        println!("  {}", file.display());
    }
    if report.skipped_cells > 0 {
        println!("警告: {} 个单元格因合并区域损坏被跳过", report.skipped_cells);
    }
    Ok(())
}
