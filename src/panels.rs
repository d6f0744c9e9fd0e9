//! Presets for the four assistant panels.

use std::fmt;

use assist_transport::SlotKey;

use crate::distributor::{Heading, HeadingClassified, HeadingMatch, SectionDistributor, SingleSlot};
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    HintLadder,
    CodeReview,
    Debugger,
    SolutionExplainer,
}

impl PanelKind {
    pub const ALL: [Self; 4] = [
        Self::HintLadder,
        Self::CodeReview,
        Self::Debugger,
        Self::SolutionExplainer,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HintLadder => "hint",
            Self::CodeReview => "review",
            Self::Debugger => "debug",
            Self::SolutionExplainer => "explain",
        }
    }

    /// Endpoint path, relative to the API base URL.
    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::HintLadder => "/ai/hint",
            Self::CodeReview => "/ai/review",
            Self::Debugger => "/ai/debug",
            Self::SolutionExplainer => "/ai/explain",
        }
    }

    /// Ordered heading sentinels; empty for the hint ladder.
    #[must_use]
    pub fn headings(self) -> Vec<Heading> {
        let pairs: &[(&str, &str)] = match self {
            Self::HintLadder => &[],
            Self::CodeReview => &[
                ("✅ What You Did Well", "strengths"),
                ("⚠️ Issues Found", "issues"),
                ("🚀 Suggestions", "suggestions"),
                ("⏱️ Complexity Analysis", "complexity"),
            ],
            Self::Debugger => &[
                ("🐛 The Bug", "bug"),
                ("🔍 Root Cause", "cause"),
                ("🛠️ The Fix", "fix"),
                ("🧪 Test Cases to Try", "tests"),
            ],
            Self::SolutionExplainer => &[
                ("🧠 The Core Idea", "idea"),
                ("📋 Step-by-Step Walkthrough", "walkthrough"),
                ("🔑 Key Concepts", "concepts"),
                ("💡 Why This Works", "why"),
            ],
        };

        pairs
            .iter()
            .map(|(sentinel, key)| Heading::new(*sentinel, *key))
            .collect()
    }

    #[must_use]
    pub fn distributor(self, mode: HeadingMatch) -> Box<dyn SectionDistributor> {
        match self {
            Self::HintLadder => Box::new(SingleSlot),
            _ => Box::new(HeadingClassified::new(self.headings()).with_match(mode)),
        }
    }

    /// Slot used by panels that stream one multi-section result.
    #[must_use]
    pub fn panel_slot(self) -> SlotKey {
        SlotKey::from(self.as_str())
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rung of the hint ladder, 1 (gentle nudge) through 4 (near solution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HintLevel(u8);

impl HintLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(level: u8) -> Result<Self, EngineError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(EngineError::InvalidHintLevel(level))
        }
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl TryFrom<u8> for HintLevel {
    type Error = EngineError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<HintLevel> for SlotKey {
    fn from(level: HintLevel) -> Self {
        SlotKey::from(level.0)
    }
}
