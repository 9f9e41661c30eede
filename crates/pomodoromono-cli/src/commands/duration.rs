use clap::Args;
use pomodoromono_core::DurationInput;

#[derive(Args)]
pub struct DurationArgs {
    /// Text as typed into the custom duration field
    text: String,
}

pub fn run(args: DurationArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = DurationInput::new();
    let buffer = input.edit(&args.text)?.to_string();
    let minutes = input.commit()?;
    let out = serde_json::json!({
        "input": args.text,
        "buffer": buffer,
        "minutes": minutes,
        "total_secs": u64::from(minutes) * 60,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
