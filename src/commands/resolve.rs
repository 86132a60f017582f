use crate::commands::build::build_view;
use crate::commands::load_session;
use crate::config::Config;
use crate::error::BlameError;
use crate::navigation::coordinator::{
    NavEffect, NavigationCoordinator, NavigationIntent, NavigationOutcome,
};
use crate::provenance::session::CodeView;
use std::path::Path;

pub fn handle_resolve(session: &Path, link: &str) -> Result<(), BlameError> {
    let config = Config::get();
    let view = build_view(load_session(session)?, config, false)?;
    let report = resolve_link(&view, link)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// The range and message a deep link points at, as JSON
pub fn resolve_link(view: &CodeView, link: &str) -> Result<serde_json::Value, BlameError> {
    let mut coordinator = NavigationCoordinator::new(view, Config::get().window_config());
    let outcome = coordinator.navigate(NavigationIntent::DeepLink(link.to_string()));

    let effects = match outcome {
        NavigationOutcome::Applied(effects) => effects,
        NavigationOutcome::Unavailable(reason) => {
            return Err(BlameError::Generic(format!(
                "cannot resolve {}: {}",
                link, reason
            )));
        }
    };

    let highlight = effects
        .iter()
        .find_map(|effect| match effect {
            NavEffect::Highlight(h) => Some(h),
            _ => None,
        })
        .ok_or_else(|| BlameError::Generic(format!("{} resolved to nothing", link)))?;
    let range = view
        .range_at(&highlight.path, highlight.start_line)
        .ok_or_else(|| BlameError::Generic(format!("{} resolved to nothing", link)))?;

    Ok(serde_json::json!({
        "link": format!("{}:L{}", highlight.path, highlight.start_line),
        "messageIndex": highlight.message_index,
        "range": range,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::message::Message;
    use crate::provenance::operation::FileOperation;
    use crate::provenance::session::{BuildOptions, build_code_view};

    fn view() -> CodeView {
        build_code_view(
            vec![
                FileOperation::write("src/a.rs", "a\nb\nc\n", 1, "m1"),
                FileOperation::edit("src/a.rs", "b", "B", 2, "m2"),
            ],
            vec![
                Message::new("u", 0, true),
                Message::new("m1", 1, false),
                Message::new("m2", 2, false),
            ],
            &BuildOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_link_reports_owning_range() {
        let view = view();
        let report = resolve_link(&view, "src/a.rs:L2").unwrap();
        assert_eq!(report["link"], "src/a.rs:L2");
        assert_eq!(report["messageIndex"], 2);
        assert_eq!(report["range"]["messageId"], "m2");
    }

    #[test]
    fn test_unresolvable_link_is_an_error() {
        let view = view();
        let err = resolve_link(&view, "L2").unwrap_err();
        assert!(err.to_string().contains("no file is open"));
        assert!(resolve_link(&view, "src/a.rs:L40").is_err());
    }
}
