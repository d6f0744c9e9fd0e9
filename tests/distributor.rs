use assert_matches::assert_matches;
use assist_engine::{
    EngineError, Heading, HeadingClassified, HeadingMatch, HintLevel, PanelKind,
    SectionDistributor, SingleSlot, SlotKey, DEFAULT_SECTION,
};
use pretty_assertions::assert_eq;

const EXPLANATION: &str = "Sure, let's break it down.\n\
🧠 The Core Idea\n\
Keep a map of values you've seen.\n\
📋 Step-by-Step Walkthrough\n\
1. Walk the array.\n\
2. Look up the complement.\n\
🔑 Key Concepts\n\
Hash maps give O(1) lookups.\n\
💡 Why This Works\n\
Every pair is checked exactly once.\n";

fn explainer(mode: HeadingMatch) -> Box<dyn SectionDistributor> {
    PanelKind::SolutionExplainer.distributor(mode)
}

#[test]
fn explainer_output_is_split_into_its_four_sections() {
    let sections = explainer(HeadingMatch::Contains).classify(EXPLANATION);

    assert_eq!(
        sections.iter().collect::<Vec<_>>(),
        vec![
            ("idea", "Keep a map of values you've seen.\n"),
            (
                "walkthrough",
                "1. Walk the array.\n2. Look up the complement.\n"
            ),
            ("concepts", "Hash maps give O(1) lookups.\n"),
            ("why", "Every pair is checked exactly once.\n"),
        ]
    );
}

#[test]
fn classification_is_a_pure_function_of_the_buffer() {
    let distributor = explainer(HeadingMatch::Contains);

    assert_eq!(distributor.classify(EXPLANATION), distributor.classify(EXPLANATION));
}

#[test]
fn growing_buffer_never_shrinks_finished_sections() {
    let distributor = explainer(HeadingMatch::Contains);
    let lines: Vec<&str> = EXPLANATION.split_inclusive('\n').collect();
    let mut buffer = String::new();
    let mut previous = distributor.classify(&buffer);

    for line in lines {
        buffer.push_str(line);
        let next = distributor.classify(&buffer);
        for (key, text) in previous.iter() {
            let grown = next.get(key).unwrap_or_default();
            assert!(grown.starts_with(text), "section {key} lost text");
        }
        previous = next;
    }
}

#[test]
fn review_headings_match_with_markdown_decoration() {
    let buffer = "### ✅ What You Did Well\nClear names.\n\
**⚠️ Issues Found**\nOff by one.\n\
## 🚀 Suggestions\nUse iterators.\n\
⏱️ Complexity Analysis\nO(n) time.\n";

    for mode in [HeadingMatch::Contains, HeadingMatch::Anchored] {
        let sections = PanelKind::CodeReview.distributor(mode).classify(buffer);
        assert_eq!(sections.get("strengths"), Some("Clear names.\n"), "{mode:?}");
        assert_eq!(sections.get("issues"), Some("Off by one.\n"), "{mode:?}");
        assert_eq!(sections.get("suggestions"), Some("Use iterators.\n"), "{mode:?}");
        assert_eq!(sections.get("complexity"), Some("O(n) time.\n"), "{mode:?}");
    }
}

#[test]
fn anchored_mode_ignores_sentinel_mentioned_mid_sentence() {
    let distributor = HeadingClassified::new([
        Heading::new("🐛 The Bug", "bug"),
        Heading::new("🛠️ The Fix", "fix"),
    ]);
    let buffer = "🐛 The Bug\nBefore we get to the fix, note the loop.\nSee the fix below.\n🛠️ The Fix\nUse <=.\n";

    let strict = distributor.clone().with_match(HeadingMatch::Anchored).classify(buffer);
    assert_eq!(
        strict.get("bug"),
        Some("Before we get to the fix, note the loop.\nSee the fix below.\n")
    );
    assert_eq!(strict.get("fix"), Some("Use <=.\n"));
}

#[test]
fn missing_sections_stay_present_and_empty() {
    let sections = PanelKind::Debugger
        .distributor(HeadingMatch::Contains)
        .classify("🐛 The Bug\nNull deref.\n");

    assert_eq!(sections.get("bug"), Some("Null deref.\n"));
    assert_eq!(sections.get("cause"), Some(""));
    assert_eq!(sections.get("fix"), Some(""));
    assert_eq!(sections.get("tests"), Some(""));
}

#[test]
fn single_slot_keeps_preamble_and_headings() {
    let sections = SingleSlot.classify(EXPLANATION);

    assert_eq!(sections.get(DEFAULT_SECTION), Some(EXPLANATION));
    assert_eq!(SingleSlot.section_keys(), vec![DEFAULT_SECTION.to_string()]);
}

#[test]
fn hint_levels_outside_ladder_are_rejected() {
    assert_matches!(HintLevel::new(0), Err(EngineError::InvalidHintLevel(0)));
    assert_matches!(HintLevel::try_from(5u8), Err(EngineError::InvalidHintLevel(5)));
    assert_eq!(
        HintLevel::all().map(SlotKey::from).collect::<Vec<_>>(),
        vec![
            SlotKey::from(1u8),
            SlotKey::from(2u8),
            SlotKey::from(3u8),
            SlotKey::from(4u8)
        ]
    );
}
