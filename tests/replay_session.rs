use std::path::Path;

use swipedeck::config::Profile;
use swipedeck::interaction::EngagementLevel;
use swipedeck::runtime::replay::{Script, run_replay};

fn demo_script() -> Script {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/swipe_session.json");
    Script::load(&path).unwrap()
}

#[test]
fn demo_session_replays_to_expected_events() {
    let mut out = Vec::new();
    let stats = run_replay(&Profile::builtin().unwrap(), &demo_script(), &mut out).unwrap();

    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let summary: Vec<(String, String)> = lines
        .iter()
        .map(|l| {
            let kind = l["type"].as_str().unwrap_or_default().to_string();
            let detail = match kind.as_str() {
                "swipe" => format!("{} {}", l["item_id"].as_str().unwrap(), l["direction"].as_str().unwrap()),
                "press" => l["item_id"].as_str().unwrap().to_string(),
                _ => String::new(),
            };
            (kind, detail)
        })
        .collect();

    let expected = [
        ("swipe", "jazz-bryant-park right"),
        ("swipe", "ramen-crawl up"),
        ("press", "moma-late"),
        ("swipe", "moma-late left"),
        ("stack_empty", ""),
    ];
    assert_eq!(summary.len(), expected.len(), "{summary:?}");
    for ((kind, detail), (ek, ed)) in summary.iter().zip(expected) {
        assert_eq!(kind, ek);
        assert_eq!(detail, ed);
    }

    assert_eq!(lines[1]["action"], "going_shared");
    assert_eq!(stats.total_swipes, 3);
    assert_eq!(stats.right_swipes, 1);
    assert_eq!(stats.up_swipes, 1);
    assert_eq!(stats.left_swipes, 1);
    assert_eq!(stats.down_swipes, 0);
    assert_eq!(stats.engagement, EngagementLevel::Minimal);
    assert!(stats.show_secondary_ui);
}
