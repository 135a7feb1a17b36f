//! Pure derivation of the client screen from workflow progress.
//!
//! Every observer derives the screen from the server-confirmed step number,
//! never from private client state, so any number of clients converge on the
//! same screen for the same workflow.

use crate::domain::types::StepNumber;
use serde::{Deserialize, Serialize};

/// Screens a client renders as the pipeline progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Research,
    HeadlineSelection,
    StyleInput,
    Working,
    ContentReview,
    ImageSelection,
    ThemeSelection,
    FinalPreview,
    Complete,
}

/// Inclusive step ranges mapped to screens. Steps past the last range fall
/// through to `Complete`.
const SCREEN_RANGES: &[(u32, u32, Screen)] = &[
    (1, 3, Screen::Research),
    (4, 4, Screen::HeadlineSelection),
    (5, 5, Screen::StyleInput),
    (6, 7, Screen::Working),
    (8, 8, Screen::ContentReview),
    (9, 9, Screen::ImageSelection),
    (10, 10, Screen::ThemeSelection),
    (11, 11, Screen::FinalPreview),
];

/// Maps a 1-based step number to the screen that renders it.
///
/// Total over all step numbers: anything past the final preview (including a
/// completed workflow's N+1 position) lands on `Complete`.
pub fn screen_for(step_number: StepNumber) -> Screen {
    for (start, end, screen) in SCREEN_RANGES {
        if (*start..=*end).contains(&step_number.0) {
            return *screen;
        }
    }
    Screen::Complete
}

impl Screen {
    /// 1-based screen position for progress indicators.
    pub fn index(&self) -> u32 {
        match self {
            Screen::Research => 1,
            Screen::HeadlineSelection => 2,
            Screen::StyleInput => 3,
            Screen::Working => 4,
            Screen::ContentReview => 5,
            Screen::ImageSelection => 6,
            Screen::ThemeSelection => 7,
            Screen::FinalPreview => 8,
            Screen::Complete => 9,
        }
    }

    /// Returns a human-readable label for this screen.
    pub fn label(&self) -> &'static str {
        match self {
            Screen::Research => "Research",
            Screen::HeadlineSelection => "Headline Selection",
            Screen::StyleInput => "Style Input",
            Screen::Working => "Working",
            Screen::ContentReview => "Content Review",
            Screen::ImageSelection => "Image Selection",
            Screen::ThemeSelection => "Theme Selection",
            Screen::FinalPreview => "Final Preview",
            Screen::Complete => "Complete",
        }
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
