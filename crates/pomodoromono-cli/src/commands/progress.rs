use clap::Args;
use pomodoromono_core::timer::format_clock;
use pomodoromono_core::ProgressSnapshot;

#[derive(Args)]
pub struct ProgressArgs {
    /// Seconds left on the countdown
    #[arg(long)]
    remaining: u64,
    /// Full duration in seconds
    #[arg(long)]
    total: u64,
    /// Countdown has finished
    #[arg(long)]
    finished: bool,
}

pub fn run(args: ProgressArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.remaining > args.total {
        return Err(format!(
            "remaining ({}) cannot exceed total ({})",
            args.remaining, args.total
        )
        .into());
    }
    let snapshot = ProgressSnapshot::map(args.remaining, args.total, args.finished);
    let out = serde_json::json!({
        "clock": format_clock(args.remaining),
        "ratio": snapshot.ratio,
        "scale": snapshot.scale,
        "sweep_degrees": snapshot.sweep_degrees,
        "conic_stop": snapshot.conic_stop(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
