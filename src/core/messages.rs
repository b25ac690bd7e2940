use crate::core::error::GenerationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fa,
}

/// User-facing strings for one locale.
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn writing_story(&self) -> &'static str {
        match self.locale {
            Locale::En => "Writing a new story...",
            Locale::Fa => "در حال نوشتن یک داستان جدید...",
        }
    }

    pub fn creating_image(&self, index: usize, total: usize) -> String {
        match self.locale {
            Locale::En => format!("Creating image {} of {}...", index, total),
            Locale::Fa => format!("در حال ساخت تصویر {} از {}...", index, total),
        }
    }

    pub fn book_ready(&self) -> &'static str {
        match self.locale {
            Locale::En => "Your book is ready!",
            Locale::Fa => "کتاب شما آماده است!",
        }
    }

    pub fn error_prefix(&self) -> &'static str {
        match self.locale {
            Locale::En => "Sorry, something went wrong: ",
            Locale::Fa => "متاسفانه مشکلی پیش آمد: ",
        }
    }

    pub fn incomplete_story(&self) -> &'static str {
        match self.locale {
            Locale::En => "The story was not fully received.",
            Locale::Fa => "داستان به طور کامل دریافت نشد.",
        }
    }

    pub fn unparsable_story(&self) -> &'static str {
        match self.locale {
            Locale::En => "Could not understand the story received from the AI.",
            Locale::Fa => "داستان دریافت شده از هوش مصنوعی قابل فهم نبود.",
        }
    }

    pub fn image_failed(&self) -> &'static str {
        match self.locale {
            Locale::En => "Image generation failed.",
            Locale::Fa => "ساخت تصویر با شکست مواجه شد.",
        }
    }

    pub fn unknown_error(&self) -> &'static str {
        match self.locale {
            Locale::En => "An unknown error occurred.",
            Locale::Fa => "یک خطای ناشناخته رخ داد.",
        }
    }

    /// Human-readable description of a failed run, without the prefix.
    pub fn describe(&self, err: &GenerationError) -> String {
        match err {
            GenerationError::IncompleteStory { .. } | GenerationError::MisnumberedStory { .. } => {
                self.incomplete_story().to_string()
            }
            GenerationError::Parse(_) => self.unparsable_story().to_string(),
            GenerationError::ImageMissing => self.image_failed().to_string(),
            GenerationError::Remote(msg)
            | GenerationError::Config(msg)
            | GenerationError::InvalidRequest(msg) => {
                if msg.trim().is_empty() {
                    self.unknown_error().to_string()
                } else {
                    msg.clone()
                }
            }
            GenerationError::RunInProgress => err.to_string(),
        }
    }

    /// Full text stored in `error_message` when a run aborts.
    pub fn run_failed(&self, err: &GenerationError) -> String {
        format!("{}{}", self.error_prefix(), self.describe(err))
    }
}
