use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use ed_core::{
    Actor, CoreConfig, MemoryStore, Permission, SearchMode, SeedFile, Specialty, TriageService,
    UrgencyLevel,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ed")]
#[command(about = "Inspect an ED triage roster from the command line")]
struct Cli {
    /// YAML roster with patients, the day's triage records and doctors
    #[arg(long, env = "ED_ROSTER")]
    roster: PathBuf,
    /// Operational day to load (YYYY-MM-DD, defaults to today in UTC)
    #[arg(long)]
    day: Option<NaiveDate>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show who is next in acute care
    Next,
    /// Count queued patients per urgency level
    Stats,
    /// Estimated waits (target bound times queue depth) next to each level's target
    Estimate {
        /// Only this level
        level: Option<UrgencyLevel>,
    },
    /// Search patients by name
    Search {
        query: String,
        #[arg(long, value_enum, default_value_t = Mode::Prefix)]
        mode: Mode,
    },
    /// List patients waiting longer than their level's target
    Overdue {
        /// Evaluate at this instant (RFC 3339) instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// List active doctors for a specialty
    Doctors { specialty: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Exact,
    Prefix,
    Contains,
}

impl From<Mode> for SearchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Exact => SearchMode::Exact,
            Mode::Prefix => SearchMode::Prefix,
            Mode::Contains => SearchMode::Contains,
        }
    }
}

/// Builds a service over an in-memory store seeded from the roster file, with the day loaded.
fn load_service(roster: &Path, day: NaiveDate) -> anyhow::Result<TriageService> {
    let text = std::fs::read_to_string(roster)
        .with_context(|| format!("failed to read roster {}", roster.display()))?;
    let seed = SeedFile::parse(&text)?;

    // Read-only inspection: nothing is mutated on behalf of a user.
    let service = TriageService::new(
        Arc::new(CoreConfig::default()),
        Arc::new(MemoryStore::seeded(&seed)),
        Arc::new(|_: &Actor, _: Permission| false),
    );
    service.load_roster(seed.doctors);
    service.load_operational_day(day)?;
    Ok(service)
}

fn minutes(d: std::time::Duration) -> u64 {
    d.as_secs() / 60
}

fn run(
    command: Commands,
    service: &TriageService,
    now: DateTime<Utc>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let queue = service.queue();
    match command {
        Commands::Next => match queue.next_patient() {
            Some(record) => writeln!(
                out,
                "{} {} ({}), waiting {} min",
                record.folio,
                record.patient.name,
                record.urgency.map(|l| l.as_str()).unwrap_or("-"),
                minutes(record.waiting_for(now))
            )?,
            None => writeln!(out, "No acute patients waiting.")?,
        },
        Commands::Stats => {
            let stats = queue.stats_per_level();
            for level in UrgencyLevel::ALL {
                writeln!(out, "{level:<10} {}", stats.count(level))?;
            }
            writeln!(out, "{:<10} {}", "total", stats.total())?;
            if queue.has_critical_patients() {
                writeln!(out, "!! critical patients waiting")?;
            }
        }
        Commands::Estimate { level } => {
            let levels = match level {
                Some(level) => vec![level],
                None => UrgencyLevel::ALL.to_vec(),
            };
            let targets = queue.targets();
            for level in levels {
                writeln!(
                    out,
                    "{level:<10} ~{} min (target {} min)",
                    minutes(queue.wait_time_estimate(level)),
                    minutes(targets.bound(level))
                )?;
            }
        }
        Commands::Search { query, mode } => {
            let found = service.search_patients(&query, mode.into());
            if found.is_empty() {
                writeln!(out, "No patients found.")?;
            }
            for entry in found {
                writeln!(out, "{} {}", entry.patient_id, entry.name)?;
            }
        }
        Commands::Overdue { at } => {
            let at = at.unwrap_or(now);
            let overdue = queue.overdue_patients(at);
            if overdue.is_empty() {
                writeln!(out, "No overdue patients.")?;
            }
            for record in overdue {
                writeln!(
                    out,
                    "{} {} ({}), waiting {} min",
                    record.folio,
                    record.patient.name,
                    record.urgency.map(|l| l.as_str()).unwrap_or("-"),
                    minutes(record.waiting_for(at))
                )?;
            }
        }
        Commands::Doctors { specialty } => {
            let specialty = Specialty::new(&specialty)?;
            let doctors = service.doctors_for(&specialty);
            if doctors.is_empty() {
                writeln!(out, "No active doctors for {specialty}.")?;
            }
            for doctor in doctors {
                writeln!(out, "{} {}", doctor.id, doctor.name)?;
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'ed --help' for commands");
        return Ok(());
    };

    let now = Utc::now();
    let service = load_service(&cli.roster, cli.day.unwrap_or(now.date_naive()))?;
    run(command, &service, now, &mut std::io::stdout().lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    const ROSTER: &str = r#"
records:
  - folio: ED-20261018-0001
    patient: { name: Lucía Herrera }
    arrived_at: 2026-10-18T08:00:00Z
    urgency: low
  - folio: ED-20261018-0002
    patient: { name: Diego Herrera }
    arrived_at: 2026-10-18T08:20:00Z
    urgency: urgent
  - folio: ED-20261018-0003
    patient: { name: Sofía Molina }
    arrived_at: 2026-10-18T08:30:00Z
  - folio: ED-20261017-0009
    patient: { name: Raúl Ortiz }
    arrived_at: 2026-10-17T22:00:00Z
    urgency: critical
doctors:
  - specialty: Cardiology
    name: Dr. Salas
"#;

    fn roster_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ROSTER.as_bytes()).unwrap();
        file
    }

    fn output(command: Commands, now: DateTime<Utc>) -> String {
        let file = roster_file();
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let service = load_service(file.path(), day).unwrap();
        let mut out = Vec::new();
        run(command, &service, now, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn nine_am() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_next_prefers_severity() {
        let text = output(Commands::Next, nine_am());
        assert_eq!(text.trim(), "ED-20261018-0002 Diego Herrera (urgent), waiting 40 min");
    }

    #[test]
    fn test_stats_ignores_other_days_and_untriaged() {
        let text = output(Commands::Stats, nine_am());
        assert!(text.contains("urgent     1"));
        assert!(text.contains("low        1"));
        assert!(text.contains("critical   0"));
        assert!(text.contains("total      2"));
        assert!(!text.contains("!!"));
    }

    #[test]
    fn test_estimate_single_level() {
        let text = output(
            Commands::Estimate {
                level: Some(UrgencyLevel::Low),
            },
            nine_am(),
        );
        assert_eq!(text.trim(), "low        ~120 min (target 120 min)");
    }

    #[test]
    fn test_search_modes() {
        let text = output(
            Commands::Search {
                query: "herrera".into(),
                mode: Mode::Contains,
            },
            nine_am(),
        );
        assert_eq!(text.lines().count(), 2);

        let text = output(
            Commands::Search {
                query: "sof".into(),
                mode: Mode::Prefix,
            },
            nine_am(),
        );
        assert!(text.contains("Sofía Molina"));
    }

    #[test]
    fn test_overdue_lists_patients_past_target() {
        // Urgent target is 10 min, low is 120 min: only the urgent patient is overdue at 09:00.
        let text = output(Commands::Overdue { at: None }, nine_am());
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("ED-20261018-0002"));
    }

    #[test]
    fn test_doctors_for_specialty() {
        let text = output(
            Commands::Doctors {
                specialty: "cardiology".into(),
            },
            nine_am(),
        );
        assert!(text.contains("Dr. Salas"));
    }

    #[test]
    fn test_missing_roster_is_an_error() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let err = load_service(Path::new("/nonexistent/roster.yaml"), day)
            .err()
            .unwrap();
        assert!(err.to_string().contains("failed to read roster"));
    }

    #[test]
    fn test_cli_parses_arguments() {
        let cli = Cli::try_parse_from([
            "ed",
            "--roster",
            "r.yaml",
            "--day",
            "2026-10-18",
            "search",
            "ana",
            "--mode",
            "exact",
        ])
        .unwrap();
        assert_eq!(cli.day, NaiveDate::from_ymd_opt(2026, 10, 18));
        assert!(matches!(
            cli.command,
            Some(Commands::Search {
                mode: Mode::Exact,
                ..
            })
        ));
    }
}
