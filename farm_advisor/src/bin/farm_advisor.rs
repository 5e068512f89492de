use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use farm_advisor::{
    app::{App, build_weather, credentials_from_env},
    config::{AppConfig, load_config_path},
    db::migrate,
    history::{DEFAULT_HISTORY_DAYS, HistoryEntry, HistoryQuery, HistorySource, load_history},
    records::{AnalysisQuery, SoilQuery},
    session::SignUpResult,
    soil::{NewSoilSample, SoilInput, validate_sample_input},
    tz::{DayRange, local_today},
    weather_rules::{FAVORABLE_CONDITIONS, generate_weather_alerts, generate_weather_recommendations},
};
use farm_data_ingestor::{models::image::ImageUpload, providers::WeatherProvider};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Farm advisor CLI")]
struct Cli {
    /// Path to the config file (farm_advisor.toml)
    #[arg(short, long, default_value = "farm_advisor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply pending database migrations
    Migrate,
    Soil(SoilCmd),
    Crop(CropCmd),
    /// Current conditions and farming advice for a location
    Weather {
        location: String,
        /// Also show the 5-day forecast
        #[arg(long)]
        forecast: bool,
    },
    /// Soil samples and crop analyses, newest first
    History {
        #[arg(long, default_value = "all")]
        source: HistorySource,
        /// First day (YYYY-MM-DD); defaults to a week ago
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD); defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    Auth(AuthCmd),
}

#[derive(Args)]
struct SoilCmd {
    #[command(subcommand)]
    sub: SoilSub,
}

#[derive(Subcommand)]
enum SoilSub {
    /// Evaluate a sample without saving it
    Check(SoilForm),
    /// Save a sample with its recommendations
    Record(SoilForm),
    List {
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        soil_type: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
    },
}

/// Raw form values; validated the same way the input form is.
#[derive(Args)]
struct SoilForm {
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long, default_value = "")]
    ph: String,
    #[arg(long, default_value = "")]
    nitrogen: String,
    #[arg(long, default_value = "")]
    phosphorus: String,
    #[arg(long, default_value = "")]
    potassium: String,
    #[arg(long, default_value = "")]
    organic_matter: String,
    #[arg(long, default_value = "")]
    moisture: String,
    #[arg(long, default_value = "")]
    soil_type: String,
}

impl From<SoilForm> for SoilInput {
    fn from(f: SoilForm) -> Self {
        Self {
            location: f.location,
            ph_level: f.ph,
            nitrogen: f.nitrogen,
            phosphorus: f.phosphorus,
            potassium: f.potassium,
            organic_matter: f.organic_matter,
            moisture: f.moisture,
            soil_type: f.soil_type,
        }
    }
}

#[derive(Args)]
struct CropCmd {
    #[command(subcommand)]
    sub: CropSub,
}

#[derive(Subcommand)]
enum CropSub {
    /// Upload a JPEG/PNG and run disease detection (Ctrl-C cancels)
    Analyze { file: PathBuf },
    List {
        #[arg(long)]
        crop: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[derive(Args)]
struct AuthCmd {
    #[command(subcommand)]
    sub: AuthSub,
}

#[derive(Subcommand)]
enum AuthSub {
    /// Create an account from FARM_EMAIL / FARM_PASSWORD
    SignUp {
        #[arg(long)]
        name: String,
    },
    /// Show the signed-in user's profile
    Whoami,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let Cli { config, cmd } = Cli::parse();
    let load = || load_config_path(&config);

    match cmd {
        Cmd::Soil(SoilCmd {
            sub: SoilSub::Check(form),
        }) => soil_check(form.into()),
        Cmd::Migrate => run_migrate(&load()?),
        Cmd::Weather { location, forecast } => {
            let weather = build_weather(&load()?)?;
            show_weather(weather.as_ref(), &location, forecast).await
        }
        Cmd::Auth(AuthCmd {
            sub: AuthSub::SignUp { name },
        }) => sign_up(&App::from_config(load()?)?, &name).await,
        Cmd::Auth(AuthCmd { sub: AuthSub::Whoami }) => whoami(&App::from_config(load()?)?).await,
        Cmd::Soil(SoilCmd { sub }) => soil(&App::from_config(load()?)?, sub).await,
        Cmd::Crop(CropCmd { sub }) => crop(&App::from_config(load()?)?, sub).await,
        Cmd::History { source, from, to } => history(&App::from_config(load()?)?, source, from, to).await,
    }
}

fn run_migrate(config: &AppConfig) -> Result<()> {
    let applied = migrate::run_sqlite(&config.database.url)?;
    println!("Applied {applied} migration(s)");
    Ok(())
}

fn soil_check(mut input: SoilInput) -> Result<()> {
    if input.location.trim().is_empty() {
        input.location = "unsaved sample".to_string();
    }
    let sample = report_form(&input)?;
    for (parameter, status) in sample.measurements.statuses() {
        let value = sample.measurements.value(parameter);
        let range = parameter.ideal_range();
        println!(
            "{:<16} {:>10}  {:<8} (ideal {}-{})",
            parameter.label(),
            parameter.format_value(value),
            status,
            range.min,
            range.max
        );
    }
    println!();
    for rec in sample.recommendations() {
        println!("- {rec}");
    }
    Ok(())
}

/// Prints advisories, then parses the form or fails with every blocking
/// problem.
fn report_form(input: &SoilInput) -> Result<NewSoilSample> {
    for (field, check) in validate_sample_input(input) {
        if !check.is_blocking() {
            eprintln!("note: {field}: {}", check.message());
        }
    }
    Ok(input.parse()?)
}

async fn sign_up(app: &App, name: &str) -> Result<()> {
    let (email, password) = credentials_from_env()?;
    match app.sessions.sign_up(&email, &password, name).await? {
        SignUpResult::SignedIn(session) => println!("Signed up as {}", session.user.email),
        SignUpResult::ConfirmationRequired(user) => {
            println!("Check {} for a confirmation link, then sign in", user.email)
        }
    }
    Ok(())
}

async fn whoami(app: &App) -> Result<()> {
    let session = app.sign_in_from_env().await?;
    match app.sessions.profile().await? {
        Some(p) => println!("{} <{}> since {}", p.name, p.email, p.created_at.format("%Y-%m-%d")),
        None => println!("{} (no profile)", session.user.email),
    }
    Ok(())
}

async fn soil(app: &App, sub: SoilSub) -> Result<()> {
    let form = match sub {
        SoilSub::Check(form) => return soil_check(form.into()),
        SoilSub::Record(form) => form,
        SoilSub::List {
            location,
            soil_type,
            limit,
        } => {
            let session = app.sign_in_from_env().await?;
            let query = SoilQuery {
                location,
                soil_type,
                limit,
                ..Default::default()
            };
            for s in app.records.list_soil(&session, &query).await?.iter() {
                println!(
                    "#{:<5} {}  {:<20} {:<7} pH {:.1}",
                    s.id,
                    s.recorded_at.format("%Y-%m-%d %H:%M"),
                    s.location,
                    s.soil_type,
                    s.measurements.ph
                );
            }
            return Ok(());
        }
    };

    let sample = report_form(&form.into())?;
    let session = app.sign_in_from_env().await?;
    let saved = app.records.record_soil(&session, &sample).await?;
    println!("Saved soil sample #{} for {}", saved.id, saved.location);
    for rec in &saved.recommendations {
        println!("- {rec}");
    }
    Ok(())
}

async fn crop(app: &App, sub: CropSub) -> Result<()> {
    let session = app.sign_in_from_env().await?;
    match sub {
        CropSub::Analyze { file } => {
            let image = ImageUpload::load(&file)
                .await
                .with_context(|| format!("read {}", file.display()))?;
            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });
            let record = app
                .pipeline
                .submit_observed(Some(&session), &image, &cancel, |state| eprintln!("{state}"))
                .await?;
            println!(
                "{}: {} ({:.0}% confidence)",
                record.crop_name.as_deref().unwrap_or("Crop"),
                record.disease_detected.as_deref().unwrap_or("no disease detected"),
                record.confidence * 100.0
            );
            println!("{}", record.recommendation_text);
        }
        CropSub::List { crop, limit } => {
            let query = AnalysisQuery {
                crop_name: crop,
                limit,
                ..Default::default()
            };
            for c in app.records.list_analyses(&session, &query).await?.iter() {
                println!(
                    "#{:<5} {}  {:<16} {:<24} {:.0}%",
                    c.id,
                    c.created_at.format("%Y-%m-%d %H:%M"),
                    c.crop_name.as_deref().unwrap_or("-"),
                    c.disease_detected.as_deref().unwrap_or("healthy"),
                    c.confidence * 100.0
                );
            }
        }
    }
    Ok(())
}

async fn history(app: &App, source: HistorySource, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
    let tz = app.config.tz()?;
    let now = Utc::now();
    let range = match (from, to) {
        (None, None) => DayRange::last_days(DEFAULT_HISTORY_DAYS, tz, now)?,
        (from, to) => {
            let to = to.unwrap_or_else(|| local_today(tz, now));
            let from = match from {
                Some(from) => from,
                None => to
                    .checked_sub_days(Days::new(DEFAULT_HISTORY_DAYS))
                    .context("date out of range")?,
            };
            DayRange::local(from, to, tz)?
        }
    };

    let session = app.sign_in_from_env().await?;
    let entries = load_history(&app.records, &session, &HistoryQuery { source, range }).await?;
    if entries.is_empty() {
        println!("No records between {} and {}", range.start, range.end);
    }
    for entry in &entries {
        print_history_entry(entry);
    }
    Ok(())
}

fn print_history_entry(entry: &HistoryEntry) {
    let title = match entry {
        HistoryEntry::Soil(s) => format!("soil  {} ({})", s.location, s.soil_type),
        HistoryEntry::Crop(c) => format!(
            "crop  {} - {}",
            c.crop_name.as_deref().unwrap_or("Crop"),
            c.disease_detected.as_deref().unwrap_or("healthy")
        ),
    };
    println!("{}  {title}", entry.timestamp().format("%Y-%m-%d %H:%M"));
    println!("      {}", entry.recommendation_text());
}

async fn show_weather(weather: &dyn WeatherProvider, location: &str, forecast: bool) -> Result<()> {
    let now = weather.current(location).await?;
    println!(
        "{location}: {}°C, {}, humidity {}%, wind {} km/h, dew point {}°C",
        now.temperature, now.description, now.humidity, now.wind_speed, now.dew_point
    );

    for alert in generate_weather_alerts(&now) {
        println!("[{:?}] {}", alert.severity, alert.message);
    }
    let advice = generate_weather_recommendations(&now);
    if advice.is_empty() {
        println!("- {FAVORABLE_CONDITIONS}");
    }
    for line in advice {
        println!("- {line}");
    }

    if forecast {
        println!();
        for day in weather.forecast(location).await? {
            println!(
                "{}  {:>4}°C  {:>3}% rain  {}",
                day.date, day.temperature, day.precipitation, day.description
            );
        }
    }
    Ok(())
}
