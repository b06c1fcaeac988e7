use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, CaptureController, CaptureEvent, CaptureState, DeskApi, RosterStore,
};
use shared::domain::StudentForm;
use tokio::time::timeout;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Operator console for the RFID registration desk")]
struct Cli {
    /// Backend base URL; overrides scandesk.toml and environment settings.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a capture session and print state changes until Ctrl-C.
    Watch,
    /// Wait for a scan, then submit one registration.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        matric_no: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        level: String,
        #[arg(long)]
        department: String,
        /// How long to wait for a scan before giving up.
        #[arg(long, default_value_t = 60)]
        wait_secs: u64,
    },
    /// List registered students.
    Roster,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    let api = DeskApi::new(&settings.server_url, settings.request_timeout())?;

    match (&cli.username, &cli.password) {
        (Some(username), Some(password)) => {
            api.login(username, password).await?;
            info!("logged in as {username}");
        }
        (None, None) => {}
        _ => bail!("--username and --password must be given together"),
    }

    match cli.command {
        Command::Watch => watch(api, settings.poll_interval()).await,
        Command::Register {
            name,
            matric_no,
            email,
            phone,
            level,
            department,
            wait_secs,
        } => {
            let form = StudentForm {
                name,
                matric_no,
                email,
                phone,
                level,
                department,
            };
            register(api, settings.poll_interval(), form, Duration::from_secs(wait_secs)).await
        }
        Command::Roster => roster(api).await,
    }
}

fn describe(state: &CaptureState) -> String {
    match state {
        CaptureState::Idle => "session closed".to_string(),
        CaptureState::Waiting => "waiting for RFID scan...".to_string(),
        CaptureState::Captured(captured) => format!("captured uid={}", captured.value),
        CaptureState::Refreshing => "refreshing...".to_string(),
        CaptureState::Failed(reason) => format!("refresh failed: {reason}"),
    }
}

async fn watch(api: Arc<DeskApi>, poll_interval: Duration) -> Result<()> {
    let controller = CaptureController::new(api.clone(), api, poll_interval);
    let mut events = controller.subscribe();
    controller.open_session().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(CaptureEvent::StateChanged(state)) => println!("{}", describe(&state)),
                Ok(CaptureEvent::RegistrationAccepted(record)) => {
                    println!("registered {} ({})", record.name, record.matric_no);
                }
                Err(_) => break,
            },
        }
    }

    controller.close_session().await;
    Ok(())
}

async fn register(
    api: Arc<DeskApi>,
    poll_interval: Duration,
    form: StudentForm,
    wait: Duration,
) -> Result<()> {
    let controller = CaptureController::new(api.clone(), api, poll_interval);
    let mut events = controller.subscribe();
    controller.open_session().await;
    println!("waiting for RFID scan...");

    let captured = timeout(wait, async {
        loop {
            match events.recv().await {
                Ok(CaptureEvent::StateChanged(CaptureState::Captured(captured))) => {
                    return Ok(captured)
                }
                Ok(_) => {}
                Err(err) => bail!("capture events closed: {err}"),
            }
        }
    })
    .await
    .context("no scan arrived in time")??;
    println!("captured uid={}", captured.value);

    let record = controller.register_student(form).await?;
    println!(
        "registered {} ({}) uid={}",
        record.name,
        record.matric_no,
        record.uid.map(|uid| uid.to_string()).unwrap_or_default()
    );
    Ok(())
}

async fn roster(api: Arc<DeskApi>) -> Result<()> {
    let students = api.list_students().await?;
    if students.is_empty() {
        println!("no students registered yet");
        return Ok(());
    }
    println!("{} student(s):", students.len());
    for student in students {
        println!(
            "  {}  {}  {} level  {}  uid={}",
            student.matric_no,
            student.name,
            student.level,
            student.department,
            student
                .uid
                .map(|uid| uid.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
    }
    Ok(())
}
