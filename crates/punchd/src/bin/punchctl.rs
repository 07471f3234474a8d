//! punchctl - admin CLI for punchd

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use punch_api::{AttendanceOutcome, Command, ResponsePayload, ResponseResult, ShiftView};
use punch_ipc::IpcClient;
use punch_util::{OriginContext, UserId, default_socket_path, format_duration_hm};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "punchctl")]
#[command(about = "Inspect and administer the punchd attendance service", long_about = None)]
struct Args {
    /// Socket path (or set PUNCH_SOCKET env var)
    #[arg(short, long, env = "PUNCH_SOCKET", default_value_os_t = default_socket_path())]
    socket: PathBuf,

    /// Print raw JSON responses
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Attendance state of one user
    Status { user_id: String },
    /// Users currently clocked in
    Open {
        /// Only shifts opened in this origin context
        #[arg(long)]
        origin: Option<String>,
    },
    /// Users excluded from tracking
    Excluded,
    /// Exclude a user (discards any open shift)
    Exclude { user_id: String },
    /// Re-include an excluded user
    Include { user_id: String },
    /// Close a user's shift now
    ForceOut { user_id: String },
    /// Service health
    Health,
}

impl Cmd {
    fn into_command(self) -> Command {
        match self {
            Cmd::Status { user_id } => Command::GetStatus {
                user_id: UserId::new(user_id),
            },
            Cmd::Open { origin } => Command::ListOpen {
                origin_context: origin.map(OriginContext::new),
            },
            Cmd::Excluded => Command::ListExcluded,
            Cmd::Exclude { user_id } => Command::Exclude {
                user_id: UserId::new(user_id),
            },
            Cmd::Include { user_id } => Command::Include {
                user_id: UserId::new(user_id),
            },
            Cmd::ForceOut { user_id } => Command::ForceClockOut {
                user_id: UserId::new(user_id),
            },
            Cmd::Health => Command::GetHealth,
        }
    }
}

fn shift_line(shift: &ShiftView) -> String {
    format!(
        "{:<24} {:<20} since {}  ({})",
        shift.user_id,
        shift.display_name.as_deref().unwrap_or("-"),
        shift.clock_in_at.format("%Y-%m-%d %H:%M"),
        format_duration_hm(shift.elapsed),
    )
}

fn print_payload(payload: &ResponsePayload) {
    match payload {
        ResponsePayload::Status(status) => {
            println!("user:           {}", status.user_id);
            println!("excluded:       {}", status.excluded);
            match &status.open_shift {
                Some(shift) => println!("on duty:        {}", shift_line(shift)),
                None => println!("on duty:        no"),
            }
            match status.last_clock_out {
                Some(at) => println!("last clock-out: {}", at.format("%Y-%m-%d %H:%M:%S")),
                None => println!("last clock-out: never"),
            }
        }
        ResponsePayload::OpenShifts { shifts } => {
            if shifts.is_empty() {
                println!("Nobody is clocked in");
            }
            for shift in shifts {
                println!("{}", shift_line(shift));
            }
        }
        ResponsePayload::ExcludedUsers { users } => {
            for user in users {
                println!("{user}");
            }
        }
        ResponsePayload::Excluded {
            user_id,
            discarded_shift,
        } => {
            println!("Excluded {user_id}");
            if let Some(shift) = discarded_shift {
                println!("Discarded open shift: {}", shift_line(shift));
            }
        }
        ResponsePayload::Included {
            user_id,
            was_excluded,
        } => {
            if *was_excluded {
                println!("Included {user_id}");
            } else {
                println!("{user_id} was not excluded");
            }
        }
        ResponsePayload::Outcome { outcome } => match outcome {
            AttendanceOutcome::ClockedOut { shift: Some(shift), .. } => {
                println!("Clocked out: {}", shift_line(shift));
            }
            AttendanceOutcome::Denied { reason } => println!("Refused: {reason}"),
            other => println!("{other:?}"),
        },
        ResponsePayload::Health(health) => {
            println!("live:        {}", health.live);
            println!("ready:       {}", health.ready);
            println!("store_ok:    {}", health.store_ok);
            println!("open shifts: {}", health.open_shifts);
        }
        other => println!("{other:?}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut client = IpcClient::connect(&args.socket)
        .await
        .with_context(|| format!("Failed to connect to punchd at {:?}", args.socket))?;

    let response = client.send(args.command.into_command()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    match response.result {
        ResponseResult::Ok(payload) => {
            print_payload(&payload);
            Ok(())
        }
        ResponseResult::Err(e) => bail!("{:?}: {}", e.code, e.message),
    }
}
