/// Tests for the navigation engine driven through a built `CodeView`.
///
/// Coverage areas:
/// 1. Deep-link round trip for every blame range
/// 2. Window invariants under random transition sequences
/// 3. Bounded teleports across very long transcripts
/// 4. A full intent / render / settle / scroll cycle
mod sessions;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;
use sessions::{random_session, transcript};
use transcript_blame::navigation::coordinator::{
    NavEffect, NavigationCoordinator, NavigationIntent, NavigationOutcome, UnavailableReason,
};
use transcript_blame::navigation::deep_link::DeepLink;
use transcript_blame::navigation::events::{Direction, NavEvent};
use transcript_blame::navigation::window::{WindowConfig, WindowManager, WindowTransition};
use transcript_blame::navigation::xref::MessageIndex;
use transcript_blame::provenance::operation::FileOperation;
use transcript_blame::provenance::session::{BuildOptions, build_code_view};

fn window_config(chunk_size: usize) -> WindowConfig {
    WindowConfig {
        chunk_size,
        ..WindowConfig::default()
    }
}

#[rstest]
#[case(2)]
#[case(17)]
fn test_deep_link_round_trip_for_every_range(#[case] seed: u64) {
    let (operations, messages) = random_session(seed, 120);
    let view = build_code_view(operations, messages, &BuildOptions::default()).unwrap();
    let mut nav = NavigationCoordinator::new(&view, window_config(10));

    let mut checked = 0;
    for file in view.files.values() {
        for range in &file.blame_ranges {
            let link = DeepLink::new(&range.path, range.start_line).to_string();
            let outcome = nav.navigate(NavigationIntent::DeepLink(link.clone()));

            if range.is_pre_session() {
                assert!(outcome.is_unavailable());
                continue;
            }
            assert!(!outcome.is_unavailable(), "{} should resolve", link);
            let highlight = nav.state().highlight.clone().unwrap();
            assert_eq!(highlight.path, range.path);
            assert_eq!((highlight.start_line, highlight.end_line), (range.start_line, range.end_line));
            assert!(outcome.effects().contains(&NavEffect::SetDeepLink(
                link.parse::<DeepLink>().unwrap()
            )));
            checked += 1;
        }
    }
    assert!(checked > 0);
}

#[rstest]
#[case(5, 7)]
#[case(9, 3)]
#[case(31, 50)]
fn test_window_invariants_under_random_transitions(#[case] seed: u64, #[case] prompt_every: usize) {
    let total = 2_000;
    let messages = MessageIndex::build(transcript(total, prompt_every)).unwrap();
    let mut manager = WindowManager::new(window_config(25), total);
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..500 {
        let target = rng.gen_range(0..total);
        match rng.gen_range(0..4) {
            0 => {
                let _ = manager.extend_down_chunk();
            }
            1 => {
                let _ = manager.extend_up_chunk();
            }
            2 => {
                manager.teleport(target, &messages).unwrap();
            }
            _ => {
                manager.ensure_visible(target, &messages).unwrap();
                let window = manager.window();
                let prompt = messages.governing_prompt(target).unwrap_or(target);
                assert!(window.contains(target), "target {} outside {}", target, window);
                assert!(window.contains(prompt), "prompt {} outside {}", prompt, window);
            }
        }
        let window = manager.window();
        if let Some(end) = window.end() {
            assert!(window.start() <= end + 1);
            assert!(end < total);
        }
    }
}

#[rstest]
#[case(25)]
#[case(50)]
#[case(100)]
fn test_teleport_bound_on_long_transcript(#[case] chunk_size: usize) {
    let operations = vec![
        FileOperation::write("early.rs", "early\n", 1, "m5"),
        FileOperation::write("late.rs", "late\n", 2, "m9990"),
    ];
    let view = build_code_view(operations, transcript(10_000, 20), &BuildOptions::default()).unwrap();
    let mut nav = NavigationCoordinator::new(&view, window_config(chunk_size));

    nav.navigate(NavigationIntent::SelectCodeLine {
        path: "early.rs".to_string(),
        line: 1,
    });
    nav.handle(NavEvent::RenderCommitted { generation: 1 });
    let rendered_before = nav.state().window.rendered();

    let outcome = nav.navigate(NavigationIntent::SelectCodeLine {
        path: "late.rs".to_string(),
        line: 1,
    });
    assert!(outcome.effects().iter().any(|e| matches!(
        e,
        NavEffect::Window(WindowTransition::Teleported { start: 9980, .. })
    )));

    let window = nav.state().window.window();
    assert!(window.contains(9990) && window.contains(9980));
    assert!(window.len() <= 3 * chunk_size, "window {} too large", window);
    assert!(nav.state().window.rendered() - rendered_before <= 3 * chunk_size);
}

#[test]
fn test_full_navigation_cycle() {
    let operations = vec![
        FileOperation::write("src/lib.rs", "a\nb\n", 1, "m3"),
        FileOperation::edit("src/lib.rs", "b", "B", 2, "m400"),
    ];
    let view = build_code_view(operations, transcript(500, 10), &BuildOptions::default()).unwrap();
    let mut nav = NavigationCoordinator::new(&view, window_config(20));

    nav.push(NavEvent::Intent(NavigationIntent::DeepLink("src/lib.rs:L2".to_string())));
    nav.push(NavEvent::SentinelVisible(Direction::Down));
    nav.push(NavEvent::Scrolled {
        first_visible: 0,
        at_ms: 0,
    });
    nav.push(NavEvent::RenderCommitted { generation: 1 });
    nav.push(NavEvent::ScrollSettled { generation: 1 });
    nav.push(NavEvent::Scrolled {
        first_visible: 405,
        at_ms: 100,
    });
    let outcomes = nav.run();

    assert_eq!(outcomes.len(), 6);
    assert!(matches!(
        outcomes[0].effects()[1],
        NavEffect::Window(WindowTransition::Teleported { start: 400, .. })
    ));
    // Teleport in flight: sentinel coalesced, scroll suppressed
    assert!(outcomes[1].effects().is_empty());
    assert!(outcomes[2].effects().is_empty());
    assert_eq!(
        outcomes[3].effects(),
        &[NavEffect::ScrollToMessage {
            index: 400,
            generation: 1
        }]
    );
    assert_eq!(
        outcomes[5].effects(),
        &[NavEffect::StickyPrompt {
            index: Some(400),
            prompt_number: Some(41)
        }]
    );

    // Back from the transcript to code
    let back = nav.navigate(NavigationIntent::SelectMessage { index: 350 });
    assert!(back.effects().contains(&NavEffect::ScrollToLine {
        path: "src/lib.rs".to_string(),
        line: 2
    }));
}

#[test]
fn test_pre_session_lines_are_unavailable() {
    let operations = vec![
        FileOperation::edit("a.txt", "b", "B", 1, "m1").with_original_content("a\nb\n"),
    ];
    let view = build_code_view(operations, transcript(5, 2), &BuildOptions::default()).unwrap();
    let mut nav = NavigationCoordinator::new(&view, window_config(10));
    assert_eq!(
        nav.navigate(NavigationIntent::DeepLink("a.txt:L1".to_string())),
        NavigationOutcome::Unavailable(UnavailableReason::PreSessionLine {
            path: "a.txt".to_string(),
            line: 1
        })
    );
    assert!(!nav.navigate(NavigationIntent::DeepLink("a.txt:L2".to_string())).is_unavailable());
}
