use chrono::Local;
use clap::Subcommand;
use riseup_core::storage;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Show wake-up statistics
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear all statistics and daily records
    Reset,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = storage::open_stats()?;

    match action {
        StatsAction::Show { json } => {
            let now = Local::now().naive_local();
            let stats = tracker.stats();
            let weekly = tracker.weekly_performance(now);
            if json {
                let out = serde_json::json!({
                    "stats": stats,
                    "streak_status": tracker.streak_status(),
                    "weekly": weekly,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("Total alarms:      {}", stats.total_alarms);
                println!("This week:         {}", stats.alarms_this_week);
                println!("On-time wakeups:   {}", stats.on_time_wakeups);
                println!("Snoozes:           {}", stats.snooze_count);
                println!("Average wake-up:   {}", stats.average_wake_up_time);
                println!("Favourite:         {}", stats.favorite_category);
                println!("Quotes shown:      {}", stats.quotes_shown);
                println!("Streak:            {}", tracker.streak_status());
                println!(
                    "Weekly on time:    {}/{} days ({}%)",
                    weekly.on_time_days, weekly.total_days, weekly.percentage
                );
            }
        }
        StatsAction::Reset => {
            tracker.reset()?;
            println!("stats reset");
        }
    }
    Ok(())
}
