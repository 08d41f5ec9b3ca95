//! Static content shown by the ringing screen: quotes, categories, sounds.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::alarm::Category;

pub const DEFAULT_SOUND: &str = "motivational-speech.mp3";

pub const MOTIVATIONAL_QUOTES: &[&str] = &[
    "Your future is created by what you do today, not tomorrow!",
    "Believe you can and you're halfway there!",
    "Dreams don't work unless you do!",
    "The best way to predict the future is to create it!",
    "Every morning is a new chance to become the best version of yourself!",
    "Action is the foundational key to all success!",
    "Wake up with determination, go to bed with satisfaction!",
    "Small steps every day lead to big results over time!",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundOption {
    pub id: &'static str,
    pub name: &'static str,
    pub file: &'static str,
}

pub const SOUND_OPTIONS: &[SoundOption] = &[
    SoundOption { id: "1", name: "Morning Motivation", file: "motivational-speech.mp3" },
    SoundOption { id: "2", name: "Energy Boost", file: "energy-boost.mp3" },
    SoundOption { id: "3", name: "Rise and Shine", file: "rise-and-shine.mp3" },
    SoundOption { id: "4", name: "Seize the Day", file: "seize-the-day.mp3" },
    SoundOption { id: "5", name: "Success Awaits", file: "success-awaits.mp3" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInfo {
    pub category: Category,
    pub name: &'static str,
    pub default_sound: &'static str,
    pub quotes: &'static [&'static str],
}

pub const CATEGORIES: &[CategoryInfo] = &[
    CategoryInfo {
        category: Category::Work,
        name: "Work & Productivity",
        default_sound: "success-awaits.mp3",
        quotes: &[
            "Time to make your mark on the world!",
            "Today's work shapes tomorrow's success!",
        ],
    },
    CategoryInfo {
        category: Category::Exercise,
        name: "Fitness & Health",
        default_sound: "energy-boost.mp3",
        quotes: &[
            "Stronger than yesterday, better than before!",
            "Champions are made in the morning!",
        ],
    },
    CategoryInfo {
        category: Category::Meditation,
        name: "Mindfulness & Peace",
        default_sound: "rise-and-shine.mp3",
        quotes: &[
            "Find your center and embrace the day!",
            "Breathe in possibility, breathe out doubt!",
        ],
    },
    CategoryInfo {
        category: Category::General,
        name: "General Motivation",
        default_sound: DEFAULT_SOUND,
        quotes: &["Today is your day to shine!", "Great days start with great mornings!"],
    },
];

pub fn category_info(category: Category) -> &'static CategoryInfo {
    CATEGORIES
        .iter()
        .find(|info| info.category == category)
        .unwrap_or(&CATEGORIES[CATEGORIES.len() - 1])
}

pub fn random_quote<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    MOTIVATIONAL_QUOTES.choose(rng).copied().unwrap_or_default()
}

/// A quote from the category's own pool.
pub fn random_category_quote<R: Rng + ?Sized>(category: Category, rng: &mut R) -> &'static str {
    category_info(category)
        .quotes
        .choose(rng)
        .copied()
        .unwrap_or_else(|| random_quote(rng))
}
