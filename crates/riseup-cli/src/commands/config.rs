use clap::Subcommand;
use riseup_core::storage;
use riseup_core::CoreError;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "theme", "snooze_duration_min")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = storage::open_settings()?;
    match action {
        ConfigAction::Get { key } => match settings.get().get(&key) {
            Some(value) => println!("{value}"),
            None => {
                eprintln!("unknown key: {key}");
                std::process::exit(1);
            }
        },
        ConfigAction::Set { key, value } => {
            settings.try_update::<_, CoreError>(|s| Ok(s.set(&key, &value)?))?;
            println!("ok");
        }
        ConfigAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(settings.get())?);
            } else {
                for (key, value) in settings.get().entries() {
                    println!("{key} = {value}");
                }
            }
        }
        ConfigAction::Reset => {
            settings.reset()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
