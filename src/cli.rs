use crate::infra::{build_engine, empty_string_as_none, load_weights, parse_date, FixtureDataset};
use crate::server;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dealflow::config::AppConfig;
use dealflow::error::AppError;
use dealflow::motivation::{
    IqStatus, MotivationEngine, MotivationRequest, PostalAddress, PropertyId, ScoreType,
    ScoringResult,
};
use dealflow::telemetry;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "DealFlow Motivation",
    about = "Score seller motivation for properties from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a single property and print the breakdown
    Score(ScoreArgs),
    /// Score every property listed in a CSV file
    Batch(BatchArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct DataArgs {
    /// JSON dataset backing the providers (defaults to the built-in demo data)
    #[arg(long)]
    pub(crate) fixtures: Option<PathBuf>,
    /// JSON file overriding the scoring weight tables
    #[arg(long)]
    pub(crate) weights: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ScoreTypeArg {
    #[default]
    Standard,
    Iq,
    Both,
}

impl From<ScoreTypeArg> for ScoreType {
    fn from(value: ScoreTypeArg) -> Self {
        match value {
            ScoreTypeArg::Standard => ScoreType::Standard,
            ScoreTypeArg::Iq => ScoreType::Iq,
            ScoreTypeArg::Both => ScoreType::Both,
        }
    }
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Property identifier known to the store
    #[arg(long)]
    property_id: Option<String>,
    /// Street line of the property address
    #[arg(long)]
    line1: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    /// Postal code of the property; also overrides the market zip when given alone
    #[arg(long)]
    zip: Option<String>,
    #[arg(long, value_enum, default_value_t = ScoreTypeArg::Standard)]
    score_type: ScoreTypeArg,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    as_of: Option<NaiveDate>,
    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
    #[command(flatten)]
    data: DataArgs,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// CSV with property_id, line1, city, state, zip columns
    csv: PathBuf,
    #[arg(long, value_enum, default_value_t = ScoreTypeArg::Standard)]
    score_type: ScoreTypeArg,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    as_of: Option<NaiveDate>,
    /// Print the full results as JSON
    #[arg(long)]
    json: bool,
    #[command(flatten)]
    data: DataArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args).await,
        Command::Batch(args) => run_batch(args).await,
    }
}

fn load_config_for_cli() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

pub(crate) fn engine_from(config: &AppConfig, data: &DataArgs) -> Result<MotivationEngine, AppError> {
    let dataset = FixtureDataset::load(data.fixtures.as_deref())?;
    let weights = load_weights(data.weights.as_deref())?;
    Ok(build_engine(config, dataset, weights))
}

async fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = load_config_for_cli()?;
    let engine = engine_from(&config, &args.data)?;

    let request = score_request(&args);
    let result = engine.calculate_seller_motivation(&request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        render_result(&result);
    }
    Ok(())
}

fn score_request(args: &ScoreArgs) -> MotivationRequest {
    let address = args.line1.as_ref().map(|line1| {
        PostalAddress::new(
            line1.clone(),
            args.city.clone().unwrap_or_default(),
            args.state.clone().unwrap_or_default(),
            args.zip.clone().unwrap_or_default(),
        )
    });
    let zip = if address.is_none() {
        args.zip.clone()
    } else {
        None
    };

    MotivationRequest {
        property_id: args.property_id.clone().map(PropertyId),
        address,
        zip,
        score_type: args.score_type.into(),
        force_refresh: false,
        as_of: args.as_of,
    }
}

async fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = load_config_for_cli()?;
    let engine = engine_from(&config, &args.data)?;

    let mut requests = read_property_csv_from_path(&args.csv)?;
    for request in &mut requests {
        request.score_type = args.score_type.into();
        request.as_of = args.as_of;
    }

    let outcomes = engine.batch_calculate_motivation(requests).await;
    if args.json {
        let payload: Vec<serde_json::Value> = outcomes
            .iter()
            .map(|outcome| match outcome {
                Ok(result) => serde_json::json!({ "result": result }),
                Err(err) => serde_json::json!({ "error": err.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!(
        "{:<4} {:<24} {:>5}  {:<9} {:<34} recommendation",
        "#", "property", "score", "band", "owner class"
    );
    for (index, outcome) in outcomes.iter().enumerate() {
        match outcome {
            Ok(result) => println!(
                "{:<4} {:<24} {:>5}  {:<9} {:<34} {}",
                index + 1,
                property_label(result),
                result.standard.score,
                result.standard.band.label(),
                result.classification.label(),
                result.standard.recommendation
            ),
            Err(err) => println!("{:<4} {:<24} error: {}", index + 1, "-", err),
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct PropertyRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    property_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    line1: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    city: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    state: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    zip: Option<String>,
}

impl PropertyRow {
    fn into_request(self) -> MotivationRequest {
        let PropertyRow {
            property_id,
            line1,
            city,
            state,
            zip,
        } = self;

        let address = line1.map(|line1| {
            PostalAddress::new(
                line1,
                city.unwrap_or_default(),
                state.unwrap_or_default(),
                zip.clone().unwrap_or_default(),
            )
        });
        MotivationRequest {
            property_id: property_id.map(PropertyId),
            zip: if address.is_none() { zip } else { None },
            address,
            ..MotivationRequest::default()
        }
    }
}

fn read_property_csv_from_path(path: &Path) -> Result<Vec<MotivationRequest>, AppError> {
    let file = std::fs::File::open(path)?;
    read_property_csv(file)
}

/// Rows lacking both an id and an address are kept so the batch reports them by position.
fn read_property_csv<R: Read>(reader: R) -> Result<Vec<MotivationRequest>, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut requests = Vec::new();
    for record in csv_reader.deserialize::<PropertyRow>() {
        requests.push(record?.into_request());
    }
    Ok(requests)
}

fn property_label(result: &ScoringResult) -> String {
    result
        .property_id
        .as_ref()
        .map(ToString::to_string)
        .or_else(|| result.address.as_ref().map(|address| address.line1.clone()))
        .unwrap_or_else(|| "-".to_string())
}

fn render_result(result: &ScoringResult) {
    let standard = &result.standard;
    println!("Seller Motivation Report");
    println!("========================");
    println!("Property: {}", property_label(result));
    if let Some(owner) = &result.owner_name {
        println!("Owner: {owner}");
    }
    println!(
        "Owner class: {} (confidence {:.2})",
        result.classification.label(),
        result.classification.confidence
    );
    println!("As of: {}", result.as_of);
    println!();
    println!(
        "Score: {} / 100 [{}]  model: {:?}  confidence: {:.2}",
        standard.score,
        standard.band.label(),
        standard.model,
        standard.confidence
    );
    println!("Recommendation: {}", standard.recommendation);

    println!();
    println!("Factors");
    println!("-------");
    for factor in &standard.factors {
        println!(
            "{:>+6.1}  {:<28} {}",
            factor.weight, factor.name, factor.description
        );
    }

    if !standard.risk_factors.is_empty() {
        println!();
        println!("Risks");
        println!("-----");
        for risk in &standard.risk_factors {
            println!("- {risk}");
        }
    }

    match (&result.iq, &result.iq_status) {
        (Some(iq), _) => {
            println!();
            println!("DealFlow IQ: {} (base {})", iq.iq_score, iq.base_score);
            for adjustment in &iq.ai_adjustments {
                let marker = if adjustment.clamped { " (clamped)" } else { "" };
                println!(
                    "{:>+4}  {}{}: {}",
                    adjustment.adjustment, adjustment.factor, marker, adjustment.reasoning
                );
            }
            println!("Time to decision: {}", iq.predictions.time_to_decision);
            println!("Best approach: {}", iq.predictions.best_approach_timing);
            if let Some(range) = &iq.predictions.optimal_offer_range {
                println!("Offer range: ${} - ${}", range.min, range.max);
            }
        }
        (None, IqStatus::Unavailable { reason }) => {
            println!();
            println!("DealFlow IQ unavailable: {reason}");
        }
        (None, _) => {}
    }

    if !result.errors.is_empty() {
        println!();
        println!("Source errors");
        println!("-------------");
        for error in &result.errors {
            println!("- {:?}: {}", error.source, error.error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn property_csv_rows_become_requests() {
        let csv = "property_id,line1,city,state,zip\n\
                   prop-smith,,,,\n\
                   ,881 Elm Ave,Des Moines,IA,50315\n\
                   ,,,,\n";
        let requests = read_property_csv(Cursor::new(csv)).expect("csv parses");

        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[0].property_id,
            Some(PropertyId("prop-smith".to_string()))
        );
        assert!(requests[0].address.is_none());

        let address = requests[1].address.as_ref().expect("address row");
        assert_eq!(address.zip, "50315");
        assert!(requests[1].zip.is_none());

        assert!(requests[2].property_id.is_none());
        assert!(requests[2].address.is_none());
    }

    #[test]
    fn bare_zip_is_used_as_market_override() {
        let args = ScoreArgs {
            property_id: Some("prop-abc".to_string()),
            line1: None,
            city: None,
            state: None,
            zip: Some("50317".to_string()),
            score_type: ScoreTypeArg::Both,
            as_of: None,
            json: false,
            data: DataArgs::default(),
        };
        let request = score_request(&args);
        assert_eq!(request.zip.as_deref(), Some("50317"));
        assert_eq!(request.score_type, ScoreType::Both);
    }
}
