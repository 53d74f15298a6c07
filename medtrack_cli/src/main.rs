use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use medtrack_core::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "medtrack")]
#[command(about = "Medication schedule and adherence tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Signup {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        confirm_password: String,

        /// patient or caretaker
        #[arg(long, default_value = "patient")]
        role: UserRole,
    },

    /// Log in with a registered e-mail
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Log out
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Add a medication
    Add {
        #[arg(long)]
        name: String,

        /// Free text, e.g. "10mg" or "1 tablet"
        #[arg(long)]
        dosage: String,

        /// daily, twice-daily, three-times-daily, weekly, as-needed
        #[arg(long, default_value = "daily")]
        frequency: Frequency,

        /// Time to take (HH:MM); repeat for several
        #[arg(long = "time")]
        times: Vec<DoseTime>,

        /// Register the medication as inactive
        #[arg(long)]
        inactive: bool,
    },

    /// Edit a medication
    Edit {
        id: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        dosage: Option<String>,

        #[arg(long)]
        frequency: Option<Frequency>,

        /// Replace the scheduled times (HH:MM); repeat for several
        #[arg(long = "time")]
        times: Vec<DoseTime>,

        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a medication (its dose history is kept)
    Remove { id: Uuid },

    /// List medications
    List,

    /// Show today's schedule
    Today,

    /// Mark a dose as taken
    Take {
        id: Uuid,

        /// Scheduled time (HH:MM)
        time: DoseTime,

        #[arg(long)]
        note: Option<String>,
    },

    /// Show weekly adherence and streak
    Stats,

    /// Show stats and today's schedule (default)
    Dashboard,

    /// Export the dose log to CSV
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    medtrack_core::logging::init_with_level(&config.logging.level);

    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    let now = Utc::now();

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Signup {
            name,
            email,
            password,
            confirm_password,
            role,
        } => cmd_signup(
            &data_dir,
            SignupRequest {
                name,
                email,
                password,
                confirm_password,
                role,
            },
            now,
        ),
        Commands::Login { email, password } => cmd_login(&data_dir, &email, &password, now),
        Commands::Logout => cmd_logout(&data_dir),
        Commands::Whoami => {
            let session = require_session(&data_dir)?;
            let user = &session.user;
            println!("{} <{}> ({})", user.name, user.email, user.role);
            Ok(())
        }
        Commands::Add {
            name,
            dosage,
            frequency,
            times,
            inactive,
        } => {
            let draft = MedicationDraft {
                name,
                dosage,
                frequency,
                time_to_take: times,
                is_active: !inactive,
            };
            cmd_add(&data_dir, draft, &config, now)
        }
        Commands::Edit {
            id,
            name,
            dosage,
            frequency,
            times,
            active,
        } => cmd_edit(&data_dir, id, name, dosage, frequency, times, active),
        Commands::Remove { id } => cmd_remove(&data_dir, id),
        Commands::List => cmd_list(&data_dir),
        Commands::Today => cmd_today(&data_dir, &config),
        Commands::Take { id, time, note } => cmd_take(&data_dir, id, time, note, now),
        Commands::Stats => cmd_stats(&data_dir, &config),
        Commands::Dashboard => cmd_dashboard(&data_dir, &config),
        Commands::Export { output } => cmd_export(&data_dir, output),
    }
}

// ============================================================================
// Account commands
// ============================================================================

fn cmd_signup(data_dir: &Path, request: SignupRequest, now: DateTime<Utc>) -> Result<()> {
    let mut registry = UserRegistry::load(UserRegistry::default_path(data_dir))?;
    let user = registry.register(request, now)?;

    Session::new(user.clone(), now).save(&Session::default_path(data_dir))?;

    println!("✓ Welcome to MedTrack, {}!", user.name);
    print_role_notice(&user);
    Ok(())
}

fn cmd_login(data_dir: &Path, email: &str, password: &str, now: DateTime<Utc>) -> Result<()> {
    if password.is_empty() {
        return Err(Error::Validation("Please fill in all fields".into()));
    }

    let registry = UserRegistry::load(UserRegistry::default_path(data_dir))?;
    let user = registry.login(email)?;

    Session::new(user.clone(), now).save(&Session::default_path(data_dir))?;

    println!("✓ Welcome back, {}!", user.name);
    print_role_notice(&user);
    Ok(())
}

fn cmd_logout(data_dir: &Path) -> Result<()> {
    if Session::clear(&Session::default_path(data_dir))? {
        println!("✓ Logged out");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

fn print_role_notice(user: &User) {
    if user.role == UserRole::Caretaker {
        println!("  Caretaker features are not available yet.");
    }
}

fn require_session(data_dir: &Path) -> Result<Session> {
    Session::load(&Session::default_path(data_dir))?
        .ok_or_else(|| Error::Auth("Not logged in. Run `medtrack login` first.".into()))
}

fn require_patient(data_dir: &Path) -> Result<User> {
    let session = require_session(data_dir)?;
    Ok(session.require_patient()?.clone())
}

// ============================================================================
// Medication commands
// ============================================================================

fn cmd_add(data_dir: &Path, draft: MedicationDraft, config: &Config, now: DateTime<Utc>) -> Result<()> {
    let user = require_patient(data_dir)?;

    if draft.time_to_take.is_empty() {
        let options: Vec<String> = config
            .schedule
            .time_options
            .iter()
            .map(|t| t.to_string())
            .collect();
        eprintln!("Pick at least one --time, e.g. {}", options.join(", "));
    }

    let mut repo = FileRepository::new(data_dir);
    let medication = add_medication(&mut repo, user.id, draft, now)?;

    println!("✓ Medication added: {} ({})", medication.name, medication.dosage);
    println!("  id: {}", medication.id);
    Ok(())
}

fn cmd_edit(
    data_dir: &Path,
    id: Uuid,
    name: Option<String>,
    dosage: Option<String>,
    frequency: Option<Frequency>,
    times: Vec<DoseTime>,
    active: Option<bool>,
) -> Result<()> {
    let user = require_patient(data_dir)?;
    let mut repo = FileRepository::new(data_dir);

    let medications = repo.load_medications(user.id)?;
    let existing = find_medication(&medications, id)
        .ok_or_else(|| Error::NotFound(format!("medication {}", id)))?;

    let mut draft = MedicationDraft::from_medication(existing);
    if let Some(name) = name {
        draft.name = name;
    }
    if let Some(dosage) = dosage {
        draft.dosage = dosage;
    }
    if let Some(frequency) = frequency {
        draft.frequency = frequency;
    }
    if !times.is_empty() {
        draft.time_to_take = times;
    }
    if let Some(active) = active {
        draft.is_active = active;
    }

    let medication = update_medication(&mut repo, user.id, id, draft)?;
    println!("✓ Medication updated: {} ({})", medication.name, medication.dosage);
    Ok(())
}

fn cmd_remove(data_dir: &Path, id: Uuid) -> Result<()> {
    let user = require_patient(data_dir)?;
    let mut repo = FileRepository::new(data_dir);

    let removed = delete_medication(&mut repo, user.id, id)?;
    println!("✓ Medication deleted: {}", removed.name);
    Ok(())
}

fn cmd_list(data_dir: &Path) -> Result<()> {
    let user = require_patient(data_dir)?;
    let repo = FileRepository::new(data_dir);
    let medications = repo.load_medications(user.id)?;

    if medications.is_empty() {
        println!("No medications yet.");
        println!("Add your first medication to start tracking your medication schedule.");
        return Ok(());
    }

    for medication in &medications {
        display_medication(medication);
    }
    Ok(())
}

fn cmd_take(
    data_dir: &Path,
    id: Uuid,
    time: DoseTime,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<()> {
    let user = require_patient(data_dir)?;
    let mut repo = FileRepository::new(data_dir);

    let medications = repo.load_medications(user.id)?;
    let logs = repo.load_logs(user.id)?;

    let medication = find_medication(&medications, id)
        .ok_or_else(|| Error::NotFound(format!("medication {}", id)))?;
    if !schedule::is_scheduled(medication, time) {
        return Err(Error::Validation(format!(
            "{} is not scheduled at {}",
            medication.name, time
        )));
    }

    let already_taken = expand_today(&medications, &logs, &now.with_timezone(&Local))
        .iter()
        .any(|entry| entry.medication.id == id && entry.time == time && entry.taken);
    if already_taken {
        println!("{} at {} is already marked as taken today.", medication.name, time);
        return Ok(());
    }

    mark_taken(&mut repo, user.id, id, time, note, now)?;
    println!("✓ Marked {} ({}) at {} as taken", medication.name, medication.dosage, time);
    Ok(())
}

// ============================================================================
// Dashboard commands
// ============================================================================

fn cmd_today(data_dir: &Path, config: &Config) -> Result<()> {
    let user = require_patient(data_dir)?;
    let repo = FileRepository::new(data_dir);

    let medications = config.schedule.tracked(&repo.load_medications(user.id)?);
    let logs = repo.load_logs(user.id)?;

    display_today(&medications, &logs, &Local::now());
    Ok(())
}

fn cmd_stats(data_dir: &Path, config: &Config) -> Result<()> {
    let user = require_patient(data_dir)?;
    let repo = FileRepository::new(data_dir);

    let all_medications = repo.load_medications(user.id)?;
    let medications = config.schedule.tracked(&all_medications);
    let logs = repo.load_logs(user.id)?;

    let stats = adherence_stats(&medications, &logs, &Local::now());
    display_stats(&stats, &all_medications);
    Ok(())
}

fn cmd_dashboard(data_dir: &Path, config: &Config) -> Result<()> {
    let user = require_patient(data_dir)?;
    let repo = FileRepository::new(data_dir);

    let all_medications = repo.load_medications(user.id)?;
    let medications = config.schedule.tracked(&all_medications);
    let logs = repo.load_logs(user.id)?;
    let now = Local::now();

    println!("Welcome back, {}", user.name);
    println!();
    display_stats(&adherence_stats(&medications, &logs, &now), &all_medications);
    println!();
    display_today(&medications, &logs, &now);
    Ok(())
}

fn cmd_export(data_dir: &Path, output: Option<PathBuf>) -> Result<()> {
    let user = require_patient(data_dir)?;
    let repo = FileRepository::new(data_dir);

    let medications = repo.load_medications(user.id)?;
    let logs = repo.load_logs(user.id)?;
    let output = output.unwrap_or_else(|| data_dir.join("medication_logs.csv"));

    let orphaned = orphaned_logs(&medications, &logs).len();
    if orphaned > 0 {
        tracing::warn!("{} dose logs reference deleted medications", orphaned);
    }

    let count = export_logs(&medications, &logs, &output)?;
    println!("✓ Exported {} dose logs", count);
    println!("  CSV: {}", output.display());
    Ok(())
}

// ============================================================================
// Display helpers
// ============================================================================

fn display_medication(medication: &Medication) {
    let status = if medication.is_active { "Active" } else { "Inactive" };
    let times: Vec<String> = medication.time_to_take.iter().map(|t| t.to_string()).collect();

    println!("{} ({}) [{}]", medication.name, medication.dosage, status);
    println!("  id:        {}", medication.id);
    println!("  frequency: {}", medication.frequency);
    println!("  times:     {}", times.join(", "));
}

fn display_today(medications: &[Medication], logs: &[MedicationLog], now: &DateTime<Local>) {
    println!("Today's Schedule: {}", now.format("%A, %B %-d, %Y"));

    let entries = expand_today(medications, logs, now);
    if entries.is_empty() {
        println!("  No medications scheduled for today");
        return;
    }

    for entry in &entries {
        let mark = if entry.taken { "✓" } else { " " };
        let status = if entry.taken { "Taken" } else { "Pending" };
        println!(
            "  [{}] {}  {} {}  {}  ({})",
            mark,
            entry.time,
            entry.medication.name,
            entry.medication.dosage,
            status,
            entry.medication.id
        );
    }

    let pending = pending_doses(&entries).len();
    if pending > 0 {
        println!("  {} dose(s) left today", pending);
    }
}

fn display_stats(stats: &AdherenceStats, medications: &[Medication]) {
    let active = medications.iter().filter(|m| m.is_active).count();

    println!("Weekly adherence:   {}%", stats.percentage);
    println!(
        "  {} of {} doses taken",
        stats.taken_doses, stats.total_doses
    );
    println!("Current streak:     {} days", stats.streak);
    println!("Active medications: {}", active);
}
